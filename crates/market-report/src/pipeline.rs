use std::io::Write;
use std::path::PathBuf;

use analysis_core::{Company, DerivedColumn, PriceFrame, PriceRow, PriceSource};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use market_charts::{line_chart, ChartRenderer, DateSeries, FacetedAreaChart, LineChart, ScatterChart};
use quant_analysis::{CorrelationEngine, CorrelationSummary};
use technical_analysis::IndicatorEngine;

use crate::config::{company_name, COMPANIES, CORRELATION_PAIRS, LOOKBACK_MONTHS};
use crate::report;

/// Fit results for one (x, y) ticker pair
#[derive(Debug, Clone)]
pub struct PairCorrelation {
    pub x: Company,
    pub y: Company,
    pub summary: CorrelationSummary,
}

/// Everything a finished run produced
#[derive(Debug)]
pub struct ReportOutput {
    pub frame: PriceFrame,
    pub charts: Vec<PathBuf>,
    pub correlations: Vec<PairCorrelation>,
}

/// Fetch each company's bars in turn and stack them into one frame.
pub async fn fetch_frame(
    source: &dyn PriceSource,
    companies: &[Company],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceFrame> {
    let mut tables = Vec::with_capacity(companies.len());
    for company in companies {
        let bars = source
            .daily_bars(company.ticker, start, end)
            .await
            .with_context(|| format!("fetching {} from {}", company.ticker, source.name()))?;
        tracing::info!(ticker = company.ticker, bars = bars.len(), source = source.name(), "fetched daily bars");
        tables.push(bars);
    }

    let frame = PriceFrame::stack(tables).context("combining price tables")?;
    Ok(frame)
}

fn close_series(ticker: &str, rows: &[PriceRow]) -> DateSeries {
    DateSeries::new(ticker, rows.iter().map(|r| (r.bar.date, r.bar.close)).collect())
}

fn derived_series(name: &str, rows: &[PriceRow], column: DerivedColumn) -> DateSeries {
    DateSeries::from_optional(name, rows.iter().map(|r| (r.bar.date, column.get(r))))
}

fn display_name(ticker: &str) -> &str {
    company_name(ticker).unwrap_or(ticker)
}

/// "Apple, Microsoft, Netflix and Google"
fn join_names(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

/// Closing price of every ticker on one set of axes.
pub fn performance_chart(frame: &PriceFrame) -> LineChart {
    line_chart(
        format!("Stock Market Performance for the Last {} Months", LOOKBACK_MONTHS),
        "Date",
        "Close",
        frame.groups().into_iter().map(|(t, rows)| close_series(t, rows)).collect(),
    )
}

/// One closing-price area panel per ticker.
pub fn price_facets(frame: &PriceFrame) -> FacetedAreaChart {
    let groups = frame.groups();
    let names: Vec<&str> = groups.iter().map(|&(t, _)| display_name(t)).collect();

    FacetedAreaChart {
        title: format!("Stock Prices for {}", join_names(&names)),
        x_label: "Date".to_string(),
        y_label: "Closing Price".to_string(),
        facet_label: "Company".to_string(),
        facets: groups.into_iter().map(|(t, rows)| close_series(t, rows)).collect(),
    }
}

pub fn moving_average_chart(ticker: &str, rows: &[PriceRow]) -> LineChart {
    line_chart(
        format!("{} Moving Averages", ticker),
        "Date",
        "Price",
        vec![
            close_series("Close", rows),
            derived_series("MA10", rows, DerivedColumn::Ma10),
            derived_series("MA20", rows, DerivedColumn::Ma20),
        ],
    )
}

pub fn volatility_chart(frame: &PriceFrame) -> LineChart {
    line_chart(
        "Volatility of All Companies",
        "Date",
        "Volatility",
        frame
            .groups()
            .into_iter()
            .map(|(t, rows)| derived_series(t, rows, DerivedColumn::Volatility))
            .collect(),
    )
    .with_date_domain(frame.date_span())
}

pub fn correlation_chart(pair: &PairCorrelation) -> ScatterChart {
    ScatterChart {
        title: format!("The Correlation between {} and {}", pair.x.name, pair.y.name),
        x_label: pair.x.ticker.to_string(),
        y_label: pair.y.ticker.to_string(),
        points: pair.summary.joined.points.iter().map(|p| (p.x, p.y)).collect(),
        trend: Some((pair.summary.fit.slope, pair.summary.fit.intercept)),
    }
}

/// Join-and-fit every configured pair on closing prices.
pub fn correlate(frame: &PriceFrame, engine: &CorrelationEngine) -> Result<Vec<PairCorrelation>> {
    CORRELATION_PAIRS
        .iter()
        .map(|&(x_ticker, y_ticker)| -> Result<PairCorrelation> {
            let x = frame
                .closing_series(x_ticker)
                .with_context(|| format!("no closing prices for {}", x_ticker))?;
            let y = frame
                .closing_series(y_ticker)
                .with_context(|| format!("no closing prices for {}", y_ticker))?;
            let summary = engine
                .analyze(&x, &y)
                .with_context(|| format!("correlating {} with {}", x_ticker, y_ticker))?;

            Ok(PairCorrelation {
                x: Company::new(x_ticker, display_name(x_ticker)),
                y: Company::new(y_ticker, display_name(y_ticker)),
                summary,
            })
        })
        .collect()
}

/// The linear report: fetch, preview, indicators, correlations, charts.
pub struct MarketReport {
    source: Box<dyn PriceSource>,
    companies: Vec<Company>,
    indicators: IndicatorEngine,
    correlation: CorrelationEngine,
    renderer: ChartRenderer,
}

impl MarketReport {
    pub fn new(source: Box<dyn PriceSource>, renderer: ChartRenderer) -> Self {
        Self {
            source,
            companies: COMPANIES.to_vec(),
            indicators: IndicatorEngine::new(),
            correlation: CorrelationEngine::new(),
            renderer,
        }
    }

    /// Run every step for `start..=end`, writing text sections to `out`.
    pub async fn run<W: Write>(&self, start: NaiveDate, end: NaiveDate, out: &mut W) -> Result<ReportOutput> {
        tracing::info!(%start, %end, source = self.source.name(), "starting market report");
        let mut charts = Vec::new();

        // 1. Fetch and stack
        let frame = fetch_frame(self.source.as_ref(), &self.companies, start, end).await?;
        tracing::info!(rows = frame.len(), tickers = frame.tickers().len(), "price table ready");
        report::write_preview(out, &frame)?;
        report::write_separator(out)?;

        // 2. Closing prices
        charts.push(self.renderer.line_chart(&performance_chart(&frame))?);
        charts.push(self.renderer.faceted_area_chart(&price_facets(&frame))?);

        // 3. Moving averages
        let frame = self
            .indicators
            .with_moving_averages(frame)
            .context("computing moving averages")?;
        report::write_moving_averages(out, &frame)?;
        report::write_separator(out)?;
        for (_, ticker, rows) in frame.groups_by_ticker() {
            charts.push(self.renderer.line_chart(&moving_average_chart(ticker, rows))?);
        }

        // 4. Volatility
        let frame = self
            .indicators
            .with_volatility(frame)
            .context("computing volatility")?;
        charts.push(self.renderer.line_chart(&volatility_chart(&frame))?);
        report::write_separator(out)?;

        // 5. Correlations
        let correlations = correlate(&frame, &self.correlation)?;
        for pair in &correlations {
            writeln!(out, "{}", report::correlation_line(pair.x.name, pair.y.name, &pair.summary))?;
            charts.push(self.renderer.scatter_chart(&correlation_chart(pair))?);
        }
        report::write_separator(out)?;

        tracing::info!(
            charts = charts.len(),
            output_dir = %self.renderer.output_dir().display(),
            "market report complete"
        );

        Ok(ReportOutput {
            frame,
            charts,
            correlations,
        })
    }
}
