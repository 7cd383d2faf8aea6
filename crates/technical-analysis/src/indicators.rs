use analysis_core::stats;

/// Simple Moving Average over full windows only.
///
/// The output has `data.len() - period + 1` entries; entry `k` covers
/// `data[k..k + period]`.
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    for i in period - 1..data.len() {
        let sum: f64 = data[i + 1 - period..=i].iter().sum();
        result.push(sum / period as f64);
    }
    result
}

/// Trailing moving average aligned with the input.
///
/// Position `i` holds the mean of `data[i + 1 - period..=i]`, or `None` while
/// fewer than `period` values are available.
pub fn rolling_mean(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let averages = sma(data, period);
    let warmup = data.len() - averages.len();

    let mut result = vec![None; warmup];
    result.extend(averages.into_iter().map(Some));
    result
}

/// Period-over-period fractional change, aligned with the input.
/// The first position has no predecessor and is `None`.
pub fn pct_change(data: &[f64]) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(data.len());
    if data.is_empty() {
        return result;
    }

    result.push(None);
    for w in data.windows(2) {
        result.push(stats::fractional_change(w[0], w[1]));
    }
    result
}

/// Trailing sample standard deviation over an input that may have gaps.
///
/// A window is defined only when all `period` values in it are present, so a
/// leading `None` pushes the first defined output one position later. A
/// sample std needs two observations, so `period < 2` yields no values.
pub fn rolling_std(data: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    if period < 2 {
        return vec![None; data.len()];
    }

    let mut result = Vec::with_capacity(data.len());
    let mut window: Vec<f64> = Vec::with_capacity(period);

    for i in 0..data.len() {
        if i + 1 < period {
            result.push(None);
            continue;
        }

        window.clear();
        window.extend(data[i + 1 - period..=i].iter().flatten());
        if window.len() == period {
            result.push(Some(stats::std_dev(&window)));
        } else {
            result.push(None);
        }
    }
    result
}

/// Rolling volatility: trailing sample std of percentage change of `closes`.
pub fn rolling_volatility(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling_std(&pct_change(closes), period)
}

/// Number of defined values in an aligned indicator
pub fn defined_count(values: &[Option<f64>]) -> usize {
    values.iter().filter(|v| v.is_some()).count()
}
