use async_trait::async_trait;
use chrono::NaiveDate;
use crate::{AnalysisError, PriceBar};

/// Trait for historical daily price providers
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Short provider name used in logs
    fn name(&self) -> &'static str;

    /// Fetch daily bars for `ticker` between `start` and `end` (inclusive).
    /// Implementations return an error rather than an empty vector when the
    /// provider has no rows for the range.
    async fn daily_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, AnalysisError>;
}
