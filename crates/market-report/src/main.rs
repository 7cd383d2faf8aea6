//! market-report: Fetch three months of daily prices and write the performance report.
//!
//! Usage:
//!   cargo run -p market-report
//!   MARKET_DATA_SOURCE=polygon POLYGON_API_KEY=... cargo run -p market-report
//!   CHART_OUTPUT_DIR=out RUST_LOG=market_report=debug cargo run -p market-report

use anyhow::Context;
use chrono::Local;
use market_charts::ChartRenderer;
use market_report::config::trailing_window;
use market_report::{MarketReport, ReportConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let default_filter = "market_report=info,market_charts=info,yahoo_client=warn,polygon_client=warn";
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
            )
            .init();
    }

    // Panic hook: log panic info before crashing
    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));

    let config = ReportConfig::from_env().context("loading configuration")?;
    tracing::info!(
        source = ?config.source,
        output_dir = %config.output_dir.display(),
        "configuration loaded"
    );

    let renderer = ChartRenderer::new(&config.output_dir, config.chart_width, config.chart_height)?;
    let (start, end) = trailing_window(Local::now().date_naive())?;

    let report = MarketReport::new(config.price_source(), renderer);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let output = report.run(start, end, &mut out).await?;

    tracing::info!(
        rows = output.frame.len(),
        charts = output.charts.len(),
        "report written"
    );
    Ok(())
}
