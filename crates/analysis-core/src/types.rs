use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar for one ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// A single (date, value) observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatedValue {
    pub date: NaiveDate,
    pub value: f64,
}

/// Two-column view of one ticker's closing prices, ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedSeries {
    pub name: String,
    pub points: Vec<DatedValue>,
}

impl DatedSeries {
    pub fn new(name: impl Into<String>, points: Vec<DatedValue>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// Ticker symbol paired with the company name used in chart titles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Company {
    pub ticker: &'static str,
    pub name: &'static str,
}

impl Company {
    pub const fn new(ticker: &'static str, name: &'static str) -> Self {
        Self { ticker, name }
    }
}
