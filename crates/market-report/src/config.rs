use analysis_core::{Company, PriceSource};
use anyhow::{bail, Context, Result};
use chrono::{Months, NaiveDate};
use polygon_client::PolygonClient;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use yahoo_client::YahooClient;

/// Companies covered by the report, in report order
pub const COMPANIES: [Company; 4] = [
    Company::new("AAPL", "Apple"),
    Company::new("MSFT", "Microsoft"),
    Company::new("NFLX", "Netflix"),
    Company::new("GOOG", "Google"),
];

/// (x, y) ticker pairs for the correlation scatter plots
pub const CORRELATION_PAIRS: [(&str, &str); 4] = [
    ("AAPL", "MSFT"),
    ("NFLX", "GOOG"),
    ("NFLX", "AAPL"),
    ("GOOG", "MSFT"),
];

/// Trailing window of daily history, in calendar months
pub const LOOKBACK_MONTHS: u32 = 3;

pub fn company_name(ticker: &str) -> Option<&'static str> {
    COMPANIES.iter().find(|c| c.ticker == ticker).map(|c| c.name)
}

/// `(today - LOOKBACK_MONTHS, today)`
pub fn trailing_window(today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let start = today
        .checked_sub_months(Months::new(LOOKBACK_MONTHS))
        .with_context(|| format!("cannot go back {} months from {}", LOOKBACK_MONTHS, today))?;
    Ok((start, today))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Yahoo,
    Polygon,
}

impl FromStr for DataSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(DataSource::Yahoo),
            "polygon" => Ok(DataSource::Polygon),
            other => bail!("unknown MARKET_DATA_SOURCE '{}', expected 'yahoo' or 'polygon'", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub source: DataSource,
    pub polygon_api_key: Option<String>,
    pub polygon_rate_limit: usize, // requests per minute
    pub output_dir: PathBuf,
    pub chart_width: u32,
    pub chart_height: u32,
}

impl ReportConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key/value lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            source: var("MARKET_DATA_SOURCE", "yahoo").parse()?,
            polygon_api_key: lookup("POLYGON_API_KEY").filter(|k| !k.trim().is_empty()),
            polygon_rate_limit: var("POLYGON_RATE_LIMIT", &polygon_client::DEFAULT_RATE_LIMIT.to_string())
                .parse()
                .context("POLYGON_RATE_LIMIT must be a positive integer")?,
            output_dir: PathBuf::from(var("CHART_OUTPUT_DIR", "charts")),
            chart_width: var("CHART_WIDTH", "1024")
                .parse()
                .context("CHART_WIDTH must be a positive integer")?,
            chart_height: var("CHART_HEIGHT", "576")
                .parse()
                .context("CHART_HEIGHT must be a positive integer")?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.source == DataSource::Polygon && self.polygon_api_key.is_none() {
            bail!("POLYGON_API_KEY must be set when MARKET_DATA_SOURCE=polygon");
        }
        if self.polygon_rate_limit == 0 {
            bail!("POLYGON_RATE_LIMIT must be at least 1");
        }
        if self.chart_width < 200 || self.chart_height < 150 {
            bail!(
                "chart size {}x{} is too small (minimum 200x150)",
                self.chart_width,
                self.chart_height
            );
        }
        Ok(())
    }

    /// Price source selected by `MARKET_DATA_SOURCE`
    pub fn price_source(&self) -> Box<dyn PriceSource> {
        match (self.source, &self.polygon_api_key) {
            (DataSource::Polygon, Some(key)) => {
                Box::new(PolygonClient::new(key.clone(), self.polygon_rate_limit))
            }
            _ => Box::new(YahooClient::new()),
        }
    }
}
