//! Yahoo Finance daily price source.
//!
//! Queries the public chart endpoint, which needs no API key:
//! `GET /v8/finance/chart/{symbol}?period1=..&period2=..&interval=1d`

use analysis_core::{AnalysisError, PriceBar, PriceSource};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate};
use reqwest::Client;
use serde::Deserialize;

const BASE_URL: &str = "https://query2.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    /// Point the client at another host (mirrors, proxies).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Get daily bars for `symbol` from `start` through `end` inclusive.
    pub async fn get_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, AnalysisError> {
        if end < start {
            return Err(AnalysisError::InvalidData(format!(
                "end date {} is before start date {}",
                end, start
            )));
        }

        // period2 is exclusive on Yahoo's side
        let period1 = start.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
        let period2 = (end + Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp());
        let (period1, period2) = match (period1, period2) {
            (Some(p1), Some(p2)) => (p1, p2),
            _ => {
                return Err(AnalysisError::InvalidData(format!(
                    "cannot convert {}..{} to timestamps",
                    start, end
                )))
            }
        };

        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        tracing::debug!(%url, period1, period2, "requesting Yahoo chart");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "Yahoo HTTP {} for {}: {}",
                response.status(),
                symbol,
                response.text().await.unwrap_or_default()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        let bars = parse_chart_response(symbol, &body)?;
        tracing::debug!(symbol, bars = bars.len(), "parsed Yahoo chart");

        Ok(bars
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect())
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for YahooClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn daily_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, AnalysisError> {
        let bars = self.get_daily_bars(ticker, start, end).await?;
        if bars.is_empty() {
            return Err(AnalysisError::InsufficientData(format!(
                "Yahoo returned no bars for {} between {} and {}",
                ticker, start, end
            )));
        }
        Ok(bars)
    }
}

/// Parse a chart API body into bars.
///
/// Rows where any OHLCV field is null (halted sessions, partial days) are
/// skipped. Dates are taken in the exchange's local time using the
/// `gmtoffset` reported in the response metadata. Consecutive rows on the
/// same date collapse into the last one.
pub fn parse_chart_response(symbol: &str, body: &str) -> Result<Vec<PriceBar>, AnalysisError> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| AnalysisError::ApiError(format!("invalid Yahoo chart body: {}", e)))?;

    if let Some(err) = response.chart.error {
        return Err(AnalysisError::ApiError(format!(
            "Yahoo error {}: {}",
            err.code, err.description
        )));
    }

    let data = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| AnalysisError::InsufficientData(format!("No chart data for {}", symbol)))?;

    let timestamps = data.timestamp.unwrap_or_default();
    let quote = match data.indicators.quote.into_iter().next() {
        Some(q) => q,
        None if timestamps.is_empty() => return Ok(Vec::new()),
        None => {
            return Err(AnalysisError::InvalidData(format!(
                "Chart for {} has timestamps but no quote block",
                symbol
            )))
        }
    };

    let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let mut bars: Vec<PriceBar> = Vec::with_capacity(timestamps.len());
    let mut skipped = 0usize;
    let mut merged = 0usize;

    for (i, &ts) in timestamps.iter().enumerate() {
        let (open, high, low, close, volume) = match (
            value_at(&quote.open, i),
            value_at(&quote.high, i),
            value_at(&quote.low, i),
            value_at(&quote.close, i),
            value_at(&quote.volume, i),
        ) {
            (Some(o), Some(h), Some(l), Some(c), Some(v)) => (o, h, l, c, v),
            _ => {
                skipped += 1;
                continue;
            }
        };

        let date = DateTime::from_timestamp(ts + offset, 0)
            .ok_or_else(|| AnalysisError::InvalidData(format!("Invalid timestamp {}", ts)))?
            .date_naive();

        let bar = PriceBar {
            ticker: symbol.to_string(),
            date,
            open,
            high,
            low,
            close,
            volume,
        };

        // The live session can arrive as a second row for the same day; keep the later one
        match bars.last_mut() {
            Some(last) if last.date == bar.date => {
                *last = bar;
                merged += 1;
            }
            _ => bars.push(bar),
        }
    }

    if skipped > 0 {
        tracing::warn!(symbol, skipped, "skipped Yahoo rows with missing fields");
    }
    if merged > 0 {
        tracing::debug!(symbol, merged, "merged same-day Yahoo rows");
    }

    Ok(bars)
}

fn value_at<T: Copy>(values: &[Option<T>], i: usize) -> Option<T> {
    values.get(i).copied().flatten()
}

// Response structures
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-01 and 2024-03-04 14:30 UTC (09:30 New York), plus a null row
    const BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": { "symbol": "AAPL", "gmtoffset": -18000 },
                "timestamp": [1709303400, 1709562600, 1709649000],
                "indicators": {
                    "quote": [{
                        "open":   [179.55, 176.15, null],
                        "high":   [180.53, 176.90, 172.0],
                        "low":    [177.38, 173.79, 170.0],
                        "close":  [179.66, 175.10, 171.0],
                        "volume": [73488000, 81510100, 90000000]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_chart_response() {
        let bars = parse_chart_response("AAPL", BODY).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].ticker, "AAPL");
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(bars[0].close, 179.66);
        assert_eq!(bars[1].volume, 81_510_100);
    }

    #[test]
    fn test_parse_merges_live_bar_on_same_day() {
        // 2024-03-04 14:30 UTC open bar, then a 19:55 UTC live bar the same day
        let body = r#"{
            "chart": {
                "result": [{
                    "meta": { "symbol": "AAPL", "gmtoffset": -18000 },
                    "timestamp": [1709303400, 1709562600, 1709582100],
                    "indicators": {
                        "quote": [{
                            "open":   [179.55, 176.15, 176.15],
                            "high":   [180.53, 176.90, 177.20],
                            "low":    [177.38, 173.79, 173.79],
                            "close":  [179.66, 175.10, 175.90],
                            "volume": [73488000, 81510100, 85000000]
                        }]
                    }
                }],
                "error": null
            }
        }"#;

        let bars = parse_chart_response("AAPL", body).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(bars[1].close, 175.90);
        assert_eq!(bars[1].volume, 85_000_000);
    }

    #[test]
    fn test_parse_chart_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart_response("ZZZZ", body).unwrap_err();
        assert!(matches!(err, AnalysisError::ApiError(_)));
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn test_parse_empty_range() {
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":-14400},"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(parse_chart_response("AAPL", body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_chart_response("AAPL", "<html>"),
            Err(AnalysisError::ApiError(_))
        ));
    }
}
