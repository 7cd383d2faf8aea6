use chrono::{Duration, NaiveDate};

/// Named date-indexed series; undefined values are left out by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct DateSeries {
    pub name: String,
    pub points: Vec<(NaiveDate, f64)>,
}

impl DateSeries {
    pub fn new(name: impl Into<String>, points: Vec<(NaiveDate, f64)>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    /// Build from aligned optional values, dropping the undefined ones.
    pub fn from_optional<I>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, Option<f64>)>,
    {
        let points = values
            .into_iter()
            .filter_map(|(date, value)| value.map(|v| (date, v)))
            .collect();
        Self::new(name, points)
    }
}

/// Multi-series line chart over dates
#[derive(Debug, Clone)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<DateSeries>,
    /// x-axis span used when no series has a point
    pub date_domain: Option<(NaiveDate, NaiveDate)>,
}

impl LineChart {
    pub fn with_date_domain(mut self, domain: Option<(NaiveDate, NaiveDate)>) -> Self {
        self.date_domain = domain;
        self
    }
}

/// One area panel per series, side by side with a shared y-axis
#[derive(Debug, Clone)]
pub struct FacetedAreaChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Prefix for panel captions, e.g. "Company" gives "Company=AAPL"
    pub facet_label: String,
    pub facets: Vec<DateSeries>,
}

/// Scatter of paired values with an optional fitted line
#[derive(Debug, Clone)]
pub struct ScatterChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(f64, f64)>,
    /// (slope, intercept)
    pub trend: Option<(f64, f64)>,
}

/// Padded [min, max] of finite values, or `None` if there are none.
pub fn value_range<I>(values: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = f64>,
{
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    if !min.is_finite() {
        return None;
    }

    let span = max - min;
    let pad = if span > 0.0 {
        span * 0.05
    } else if min != 0.0 {
        min.abs() * 0.05
    } else {
        1.0
    };
    Some((min - pad, max + pad))
}

/// First and last date across series, widened so the range is never empty.
pub fn date_range<'a, I>(series: I) -> Option<(NaiveDate, NaiveDate)>
where
    I: IntoIterator<Item = &'a DateSeries>,
{
    let mut dates = series.into_iter().flat_map(|s| s.points.iter().map(|(d, _)| *d));
    let first = dates.next()?;
    let span = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    Some(widen_dates(span))
}

/// Pad a single-day span by a day on each side.
pub fn widen_dates((start, end): (NaiveDate, NaiveDate)) -> (NaiveDate, NaiveDate) {
    if start == end {
        (start - Duration::days(1), end + Duration::days(1))
    } else {
        (start, end)
    }
}

/// File-name slug for a chart title: lowercase ASCII alphanumerics joined by `_`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("chart");
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(
            slugify("Stock Market Performance for the Last 3 Months"),
            "stock_market_performance_for_the_last_3_months"
        );
        assert_eq!(slugify("AAPL Moving Averages"), "aapl_moving_averages");
        assert_eq!(
            slugify("Stock Prices for Apple, Microsoft, Netflix and Google "),
            "stock_prices_for_apple_microsoft_netflix_and_google"
        );
        assert_eq!(slugify("  --  "), "chart");
    }

    #[test]
    fn test_value_range_pads() {
        let (lo, hi) = value_range(vec![10.0, 20.0, f64::NAN]).unwrap();
        assert!((lo - 9.5).abs() < 1e-12);
        assert!((hi - 20.5).abs() < 1e-12);
    }

    #[test]
    fn test_value_range_flat_and_empty() {
        let (lo, hi) = value_range(vec![0.0, 0.0]).unwrap();
        assert!(lo < 0.0 && hi > 0.0);
        let (lo, hi) = value_range(vec![100.0]).unwrap();
        assert!(lo < 100.0 && hi > 100.0);
        assert!(value_range(Vec::<f64>::new()).is_none());
    }

    #[test]
    fn test_date_range() {
        let a = DateSeries::new("a", vec![(day(3), 1.0), (day(5), 2.0)]);
        let b = DateSeries::new("b", vec![(day(1), 1.0)]);
        assert_eq!(date_range([&a, &b]), Some((day(1), day(5))));

        let single = DateSeries::new("s", vec![(day(2), 1.0)]);
        assert_eq!(date_range([&single]), Some((day(1), day(3))));
        assert_eq!(date_range(Vec::<&DateSeries>::new()), None);
    }

    #[test]
    fn test_from_optional_drops_undefined() {
        let s = DateSeries::from_optional("MA10", vec![(day(1), None), (day(2), Some(3.0))]);
        assert_eq!(s.points, vec![(day(2), 3.0)]);
    }
}
