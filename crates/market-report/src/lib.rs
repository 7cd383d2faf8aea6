//! Three-month performance report for a fixed set of large-cap stocks.
//!
//! Fetches daily bars, derives moving averages, volatility and pairwise
//! correlations, prints text previews and writes SVG charts.

pub mod config;
pub mod pipeline;
pub mod report;

pub use config::{DataSource, ReportConfig, COMPANIES, CORRELATION_PAIRS};
pub use pipeline::{fetch_frame, MarketReport, PairCorrelation, ReportOutput};
