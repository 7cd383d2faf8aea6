use std::collections::HashSet;
use std::ops::Range;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{AnalysisError, DatedSeries, DatedValue, PriceBar};

/// Columns derived from closing prices during processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DerivedColumn {
    Ma10,
    Ma20,
    Volatility,
}

impl DerivedColumn {
    pub fn name(&self) -> &'static str {
        match self {
            DerivedColumn::Ma10 => "MA10",
            DerivedColumn::Ma20 => "MA20",
            DerivedColumn::Volatility => "volatility",
        }
    }

    pub fn get(&self, row: &PriceRow) -> Option<f64> {
        match self {
            DerivedColumn::Ma10 => row.ma10,
            DerivedColumn::Ma20 => row.ma20,
            DerivedColumn::Volatility => row.volatility,
        }
    }

    fn set(&self, row: &mut PriceRow, value: Option<f64>) {
        match self {
            DerivedColumn::Ma10 => row.ma10 = value,
            DerivedColumn::Ma20 => row.ma20 = value,
            DerivedColumn::Volatility => row.volatility = value,
        }
    }
}

/// One row of the long-format table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    #[serde(flatten)]
    pub bar: PriceBar,
    #[serde(rename = "MA10")]
    pub ma10: Option<f64>,
    #[serde(rename = "MA20")]
    pub ma20: Option<f64>,
    pub volatility: Option<f64>,
}

impl From<PriceBar> for PriceRow {
    fn from(bar: PriceBar) -> Self {
        Self {
            bar,
            ma10: None,
            ma20: None,
            volatility: None,
        }
    }
}

/// Long-format price table keyed by (ticker, date).
///
/// Rows for a ticker are contiguous, tickers keep the order they were stacked
/// in, and each ticker's rows are ascending by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceFrame {
    rows: Vec<PriceRow>,
}

impl PriceFrame {
    pub const COLUMNS: [&'static str; 10] = [
        "ticker", "date", "open", "high", "low", "close", "volume", "MA10", "MA20", "volatility",
    ];

    /// Stack per-ticker bar tables into one frame.
    ///
    /// Each inner vector must hold bars of a single ticker and no ticker may
    /// appear in two inner vectors. Bars are sorted by date within each table,
    /// and a date may appear only once per ticker.
    pub fn stack(tables: Vec<Vec<PriceBar>>) -> Result<Self, AnalysisError> {
        let mut seen = HashSet::new();
        let mut rows = Vec::with_capacity(tables.iter().map(Vec::len).sum());

        for mut table in tables {
            let ticker = match table.first() {
                Some(bar) => bar.ticker.clone(),
                None => {
                    return Err(AnalysisError::InsufficientData(
                        "cannot stack an empty price table".to_string(),
                    ))
                }
            };

            if let Some(other) = table.iter().find(|b| b.ticker != ticker) {
                return Err(AnalysisError::InvalidData(format!(
                    "price table for {} contains a bar for {}",
                    ticker, other.ticker
                )));
            }

            if !seen.insert(ticker.clone()) {
                return Err(AnalysisError::InvalidData(format!(
                    "ticker {} stacked more than once",
                    ticker
                )));
            }

            table.sort_by_key(|b| b.date);
            if let Some(pair) = table.windows(2).find(|w| w[0].date == w[1].date) {
                return Err(AnalysisError::InvalidData(format!(
                    "duplicate bar for ({}, {})",
                    ticker, pair[0].date
                )));
            }
            rows.extend(table.into_iter().map(PriceRow::from));
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First `n` rows (fewer if the frame is shorter)
    pub fn head(&self, n: usize) -> &[PriceRow] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// Tickers in stacking order
    pub fn tickers(&self) -> Vec<&str> {
        self.group_ranges()
            .into_iter()
            .map(|r| self.rows[r.start].bar.ticker.as_str())
            .collect()
    }

    /// Per-ticker row slices in stacking order
    pub fn groups(&self) -> Vec<(&str, &[PriceRow])> {
        self.group_ranges()
            .into_iter()
            .map(|r| (self.rows[r.start].bar.ticker.as_str(), &self.rows[r]))
            .collect()
    }

    /// Per-ticker groups ordered by ticker symbol, each with the frame
    /// position of its first row
    pub fn groups_by_ticker(&self) -> Vec<(usize, &str, &[PriceRow])> {
        let mut groups: Vec<(usize, &str, &[PriceRow])> = self
            .group_ranges()
            .into_iter()
            .map(|r| (r.start, self.rows[r.start].bar.ticker.as_str(), &self.rows[r]))
            .collect();
        groups.sort_by_key(|&(_, ticker, _)| ticker);
        groups
    }

    pub fn group(&self, ticker: &str) -> Option<&[PriceRow]> {
        self.groups()
            .into_iter()
            .find(|(t, _)| *t == ticker)
            .map(|(_, rows)| rows)
    }

    /// Earliest and latest date across all tickers
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.rows.first()?.bar.date;
        Some(self.rows.iter().fold((first, first), |(lo, hi), row| {
            (lo.min(row.bar.date), hi.max(row.bar.date))
        }))
    }

    /// All values of a derived column, in row order
    pub fn column(&self, column: DerivedColumn) -> Vec<Option<f64>> {
        self.rows.iter().map(|row| column.get(row)).collect()
    }

    /// Narrow one ticker to its (date, close) series, named after the ticker.
    pub fn closing_series(&self, ticker: &str) -> Result<DatedSeries, AnalysisError> {
        let rows = self.group(ticker).ok_or_else(|| {
            AnalysisError::InvalidData(format!("ticker {} not present in frame", ticker))
        })?;

        let points = rows
            .iter()
            .map(|row| DatedValue {
                date: row.bar.date,
                value: row.bar.close,
            })
            .collect();

        Ok(DatedSeries::new(ticker, points))
    }

    /// Return a new frame with `column` filled group by group.
    ///
    /// `derive` receives one ticker's rows and must return exactly one value
    /// per row.
    pub fn with_derived<F>(mut self, column: DerivedColumn, mut derive: F) -> Result<Self, AnalysisError>
    where
        F: FnMut(&[PriceRow]) -> Vec<Option<f64>>,
    {
        for range in self.group_ranges() {
            let values = derive(&self.rows[range.clone()]);
            if values.len() != range.len() {
                return Err(AnalysisError::CalculationError(format!(
                    "{} produced {} values for {} rows of {}",
                    column.name(),
                    values.len(),
                    range.len(),
                    self.rows[range.start].bar.ticker
                )));
            }
            for (row, value) in self.rows[range].iter_mut().zip(values) {
                column.set(row, value);
            }
        }
        Ok(self)
    }

    fn group_ranges(&self) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut start = 0;
        for i in 1..=self.rows.len() {
            if i == self.rows.len() || self.rows[i].bar.ticker != self.rows[start].bar.ticker {
                ranges.push(start..i);
                start = i;
            }
        }
        ranges
    }
}

/// Closing prices of a row slice
pub fn closes(rows: &[PriceRow]) -> Vec<f64> {
    rows.iter().map(|row| row.bar.close).collect()
}
