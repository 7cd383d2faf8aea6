use std::collections::HashMap;

use analysis_core::{AnalysisError, DatedSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// One date present in both series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JoinedPoint {
    pub date: NaiveDate,
    pub x: f64,
    pub y: f64,
}

/// Result of an inner join of two dated series on date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedSeries {
    pub x_name: String,
    pub y_name: String,
    pub points: Vec<JoinedPoint>,
}

impl JoinedSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn xs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }
}

/// Ordinary-least-squares line `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OlsFit {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation; `None` when y has no variance
    pub r: Option<f64>,
    pub r_squared: Option<f64>,
    pub n: usize,
}

impl OlsFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Joined pair plus its fitted trend line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationSummary {
    pub joined: JoinedSeries,
    pub fit: OlsFit,
}

/// Inner join on date. Dates present in only one series are dropped; a date
/// repeated in either input yields every pairing of its values. Output is
/// ascending by date.
pub fn inner_join(x: &DatedSeries, y: &DatedSeries) -> JoinedSeries {
    let mut y_by_date: HashMap<NaiveDate, Vec<f64>> = HashMap::with_capacity(y.len());
    for p in &y.points {
        y_by_date.entry(p.date).or_default().push(p.value);
    }

    let mut points = Vec::with_capacity(x.len().min(y.len()));
    for px in &x.points {
        if let Some(ys) = y_by_date.get(&px.date) {
            points.extend(ys.iter().map(|&value| JoinedPoint {
                date: px.date,
                x: px.value,
                y: value,
            }));
        }
    }
    points.sort_by_key(|p| p.date);

    JoinedSeries {
        x_name: x.name.clone(),
        y_name: y.name.clone(),
        points,
    }
}

/// Fit `y` on `x` by ordinary least squares.
pub fn fit_ols(x: &[f64], y: &[f64]) -> Result<OlsFit, AnalysisError> {
    if x.len() != y.len() {
        return Err(AnalysisError::InvalidData(format!(
            "x has {} values but y has {}",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(AnalysisError::InsufficientData(format!(
            "Need at least 2 points for a trend line, got {}",
            x.len()
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(AnalysisError::InvalidData("non-finite value in trend line input".to_string()));
    }

    let x_var = x.variance();
    if x_var == 0.0 {
        return Err(AnalysisError::CalculationError(
            "x has zero variance, slope is undefined".to_string(),
        ));
    }

    let covariance = x.covariance(y);
    let slope = covariance / x_var;
    let intercept = y.mean() - slope * x.mean();

    let y_var = y.variance();
    let r = if y_var > 0.0 {
        Some((covariance / (x_var.sqrt() * y_var.sqrt())).clamp(-1.0, 1.0))
    } else {
        None
    };

    Ok(OlsFit {
        slope,
        intercept,
        r,
        r_squared: r.map(|r| r * r),
        n: x.len(),
    })
}

/// Join-and-fit for pairs of closing-price series
pub struct CorrelationEngine;

impl CorrelationEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, x: &DatedSeries, y: &DatedSeries) -> Result<CorrelationSummary, AnalysisError> {
        let joined = inner_join(x, y);
        tracing::debug!(
            x = %x.name,
            y = %y.name,
            x_rows = x.len(),
            y_rows = y.len(),
            joined = joined.len(),
            "joined series on date"
        );

        let fit = fit_ols(&joined.xs(), &joined.ys()).map_err(|e| match e {
            AnalysisError::InsufficientData(msg) => AnalysisError::InsufficientData(format!(
                "{} vs {}: {}",
                x.name, y.name, msg
            )),
            other => other,
        })?;

        Ok(CorrelationSummary { joined, fit })
    }
}

impl Default for CorrelationEngine {
    fn default() -> Self {
        Self::new()
    }
}
