use analysis_core::{closes, AnalysisError, DerivedColumn, PriceFrame};
use serde::{Deserialize, Serialize};

use crate::indicators::*;

/// Window sizes for the derived columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSettings {
    pub short_ma_window: usize,
    pub long_ma_window: usize,
    pub volatility_window: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            short_ma_window: 10,
            long_ma_window: 20,
            volatility_window: 10,
        }
    }
}

/// Annotates a price frame with moving averages and rolling volatility,
/// computed independently for every ticker group.
pub struct IndicatorEngine {
    settings: IndicatorSettings,
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self::with_settings(IndicatorSettings::default())
    }

    pub fn with_settings(settings: IndicatorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &IndicatorSettings {
        &self.settings
    }

    /// Fill MA10 and MA20 (short and long windows) from closing prices.
    pub fn with_moving_averages(&self, frame: PriceFrame) -> Result<PriceFrame, AnalysisError> {
        let short = self.settings.short_ma_window;
        let long = self.settings.long_ma_window;
        tracing::debug!(short, long, rows = frame.len(), "computing moving averages");

        frame
            .with_derived(DerivedColumn::Ma10, |rows| rolling_mean(&closes(rows), short))?
            .with_derived(DerivedColumn::Ma20, |rows| rolling_mean(&closes(rows), long))
    }

    /// Fill volatility: trailing sample std of the per-ticker percentage change.
    pub fn with_volatility(&self, frame: PriceFrame) -> Result<PriceFrame, AnalysisError> {
        let window = self.settings.volatility_window;
        tracing::debug!(window, rows = frame.len(), "computing volatility");

        frame.with_derived(DerivedColumn::Volatility, |rows| {
            rolling_volatility(&closes(rows), window)
        })
    }

    /// Both steps in order
    pub fn annotate(&self, frame: PriceFrame) -> Result<PriceFrame, AnalysisError> {
        let frame = self.with_moving_averages(frame)?;
        self.with_volatility(frame)
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::PriceBar;
    use chrono::{Duration, NaiveDate};

    fn table(ticker: &str, closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                ticker: ticker.to_string(),
                date: start + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 100,
            })
            .collect()
    }

    #[test]
    fn test_groups_do_not_share_windows() {
        let a: Vec<f64> = (1..=12).map(|i| i as f64).collect();
        let b = vec![1000.0; 12];
        let frame = PriceFrame::stack(vec![table("AAPL", &a), table("MSFT", &b)]).unwrap();

        let frame = IndicatorEngine::new().annotate(frame).unwrap();
        let msft = frame.group("MSFT").unwrap();

        // First MSFT rows must not borrow AAPL history
        assert!(msft[..9].iter().all(|r| r.ma10.is_none()));
        assert_eq!(msft[9].ma10, Some(1000.0));
        assert!(msft[..10].iter().all(|r| r.volatility.is_none()));
        assert_eq!(msft[10].volatility, Some(0.0));
    }

    #[test]
    fn test_ma_values_follow_sorted_dates() {
        let mut bars = table("NFLX", &(1..=10).map(|i| i as f64).collect::<Vec<_>>());
        bars.reverse();
        let frame = PriceFrame::stack(vec![bars]).unwrap();

        let frame = IndicatorEngine::new().with_moving_averages(frame).unwrap();
        let last = frame.rows().last().unwrap();
        assert_eq!(last.bar.close, 10.0);
        assert_eq!(last.ma10, Some(5.5));
        assert!(last.ma20.is_none());
    }

    #[test]
    fn test_custom_settings() {
        let engine = IndicatorEngine::with_settings(IndicatorSettings {
            short_ma_window: 2,
            long_ma_window: 3,
            volatility_window: 2,
        });
        let frame = PriceFrame::stack(vec![table("GOOG", &[1.0, 2.0, 4.0])]).unwrap();
        let frame = engine.annotate(frame).unwrap();

        assert_eq!(frame.column(DerivedColumn::Ma10), vec![None, Some(1.5), Some(3.0)]);
        assert_eq!(frame.column(DerivedColumn::Ma20), vec![None, None, Some(7.0 / 3.0)]);
        // pct changes: None, 1.0, 1.0 -> std of [1, 1] at the last row
        assert_eq!(frame.column(DerivedColumn::Volatility), vec![None, None, Some(0.0)]);
    }
}
