//! Small descriptive-statistics helpers shared by the window aggregators.
//!
//! Both functions treat their input as a complete sample; callers decide what
//! to do with missing observations before slicing.

/// Compute the mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Compute sample standard deviation (n - 1 denominator).
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    variance.sqrt()
}

/// Period-over-period fractional change between two prices.
/// Returns `None` when the previous price is zero or either value is not finite.
pub fn fractional_change(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 || !previous.is_finite() || !current.is_finite() {
        return None;
    }
    Some((current - previous) / previous)
}
