use analysis_core::{AnalysisError, PriceBar, PriceSource};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://api.polygon.io";

/// Default 500 req/min for the Starter plan. Free tier users should use 5.
pub const DEFAULT_RATE_LIMIT: usize = 500;

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let sleep_dur = match ts.front() {
                Some(&oldest) => (oldest + self.window).duration_since(now) + Duration::from_millis(50),
                None => Duration::from_millis(50),
            };
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for Polygon API slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

#[derive(Clone)]
pub struct PolygonClient {
    api_key: String,
    base_url: String,
    client: Client,
    rate_limiter: RateLimiter,
}

impl PolygonClient {
    /// `rate_limit` is requests per minute.
    pub fn new(api_key: String, rate_limit: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            base_url: BASE_URL.to_string(),
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, AnalysisError> {
        let request = builder.build().map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request.try_clone()
                .ok_or_else(|| AnalysisError::ApiError("Cannot clone request".to_string()))?;
            let response = self.client.execute(req_clone).await
                .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 15u64;
            tracing::warn!("Polygon 429 rate limited, waiting {}s before retry {}/3", wait_secs, attempt + 1);
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(AnalysisError::ApiError("Rate limited by Polygon after 3 retries".to_string()))
    }

    /// Get daily aggregates (bars) for a symbol, `from` and `to` inclusive.
    pub async fn get_daily_aggregates(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceBar>, AnalysisError> {
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/1/day/{}/{}",
            self.base_url,
            symbol,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );
        tracing::debug!(%url, "requesting Polygon aggregates");

        let response = self.send_request(
            self.client.get(&url).query(&[
                ("apiKey", self.api_key.as_str()),
                ("adjusted", "true"),
                ("sort", "asc"),
                ("limit", "50000"),
            ])
        ).await?;

        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        parse_aggregates(symbol, &body)
    }
}

#[async_trait]
impl PriceSource for PolygonClient {
    fn name(&self) -> &'static str {
        "polygon"
    }

    async fn daily_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, AnalysisError> {
        let bars = self.get_daily_aggregates(ticker, start, end).await?;
        if bars.is_empty() {
            return Err(AnalysisError::InsufficientData(format!(
                "Polygon returned no bars for {} between {} and {}",
                ticker, start, end
            )));
        }
        Ok(bars)
    }
}

/// Parse an aggregates body. Daily bar timestamps are midnight US/Eastern,
/// which falls on the same calendar day in UTC.
pub fn parse_aggregates(symbol: &str, body: &str) -> Result<Vec<PriceBar>, AnalysisError> {
    let agg_response: AggregateResponse = serde_json::from_str(body)
        .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

    if agg_response.status.as_deref() == Some("ERROR") {
        return Err(AnalysisError::ApiError(format!(
            "Polygon error for {}: {}",
            symbol,
            agg_response.error.unwrap_or_else(|| "unknown error".to_string())
        )));
    }

    agg_response
        .results
        .into_iter()
        .map(|r| {
            let date = DateTime::from_timestamp_millis(r.t)
                .ok_or_else(|| AnalysisError::InvalidData(format!("Invalid timestamp {}", r.t)))?
                .date_naive();
            Ok(PriceBar {
                ticker: symbol.to_string(),
                date,
                open: r.o,
                high: r.h,
                low: r.l,
                close: r.c,
                volume: r.v.max(0.0).round() as u64,
            })
        })
        .collect()
}

// Response structures
#[derive(Debug, Deserialize)]
struct AggregateResponse {
    status: Option<String>,
    error: Option<String>,
    #[serde(default)]
    results: Vec<AggregateResult>,
}

#[derive(Debug, Deserialize)]
struct AggregateResult {
    t: i64, // timestamp
    o: f64, // open
    h: f64, // high
    l: f64, // low
    c: f64, // close
    v: f64, // volume
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aggregates() {
        // 2024-03-01 and 2024-03-04 at 05:00 UTC (midnight New York)
        let body = r#"{
            "ticker": "MSFT", "status": "OK", "adjusted": true, "resultsCount": 2,
            "results": [
                {"v": 31119630.0, "vw": 413.1, "o": 411.27, "c": 415.5, "h": 415.87, "l": 410.88, "t": 1709269200000, "n": 401000},
                {"v": 17596658.0, "vw": 414.0, "o": 413.44, "c": 414.92, "h": 417.35, "l": 412.32, "t": 1709528400000, "n": 298000}
            ]
        }"#;

        let bars = parse_aggregates("MSFT", body).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].ticker, "MSFT");
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(bars[0].volume, 31_119_630);
        assert_eq!(bars[1].close, 414.92);
    }

    #[test]
    fn test_parse_aggregates_no_results() {
        let body = r#"{"ticker":"MSFT","status":"OK","resultsCount":0}"#;
        assert!(parse_aggregates("MSFT", body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_aggregates_error_status() {
        let body = r#"{"status":"ERROR","error":"Unknown API Key"}"#;
        let err = parse_aggregates("MSFT", body).unwrap_err();
        assert!(err.to_string().contains("Unknown API Key"));
    }

    #[test]
    fn test_with_base_url_trims_trailing_slash() {
        let client = PolygonClient::new("test-key".to_string(), 5).with_base_url("http://localhost:8089/");
        assert_eq!(client.base_url, "http://localhost:8089");
        assert_eq!(PolygonClient::new("test-key".to_string(), 5).base_url, BASE_URL);
    }

    #[tokio::test]
    async fn test_rate_limiter_admits_up_to_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(limiter.timestamps.lock().await.len(), 3);
    }
}
