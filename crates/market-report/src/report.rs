//! Plain-text sections written to stdout between the charts.

use std::io::{self, Write};

use analysis_core::{PriceFrame, PriceRow};
use quant_analysis::CorrelationSummary;

pub const SEPARATOR_WIDTH: usize = 70;

/// Rows shown in the table preview
pub const PREVIEW_ROWS: usize = 5;

pub fn separator() -> String {
    "=".repeat(SEPARATOR_WIDTH)
}

pub fn write_separator<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", separator())
}

/// Undefined values print as `NaN`.
pub fn fmt_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.6}", v),
        None => "NaN".to_string(),
    }
}

fn fmt_row(idx: usize, row: &PriceRow) -> String {
    format!(
        "{:>4}  {:<6} {:<10} {:>12.6} {:>12.6} {:>12.6} {:>12.6} {:>12} {:>12} {:>12} {:>12}",
        idx,
        row.bar.ticker,
        row.bar.date.format("%Y-%m-%d").to_string(),
        row.bar.open,
        row.bar.high,
        row.bar.low,
        row.bar.close,
        row.bar.volume,
        fmt_value(row.ma10),
        fmt_value(row.ma20),
        fmt_value(row.volatility),
    )
}

/// First `PREVIEW_ROWS` rows of the frame with every column.
pub fn write_preview<W: Write>(out: &mut W, frame: &PriceFrame) -> io::Result<()> {
    let c = PriceFrame::COLUMNS;
    writeln!(
        out,
        "{:>4}  {:<6} {:<10} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "", c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7], c[8], c[9]
    )?;
    for (idx, row) in frame.head(PREVIEW_ROWS).iter().enumerate() {
        writeln!(out, "{}", fmt_row(idx, row))?;
    }
    writeln!(out, "[{} rows x {} columns]", frame.len(), c.len())
}

/// Every MA10/MA20 value for each ticker in symbol order, indexed by row
/// position in the frame.
pub fn write_moving_averages<W: Write>(out: &mut W, frame: &PriceFrame) -> io::Result<()> {
    for (offset, ticker, rows) in frame.groups_by_ticker() {
        writeln!(out, "Moving Averages for {}", ticker)?;
        writeln!(out, "{:>6} {:>12} {:>12}", "", "MA10", "MA20")?;
        for (i, row) in rows.iter().enumerate() {
            writeln!(
                out,
                "{:>6} {:>12} {:>12}",
                offset + i,
                fmt_value(row.ma10),
                fmt_value(row.ma20)
            )?;
        }
    }
    Ok(())
}

pub fn correlation_line(x_name: &str, y_name: &str, summary: &CorrelationSummary) -> String {
    let fit = &summary.fit;
    format!(
        "{} vs {}: n={} slope={:.6} intercept={:.6} r={} R²={}",
        x_name,
        y_name,
        fit.n,
        fit.slope,
        fit.intercept,
        fmt_value(fit.r),
        fmt_value(fit.r_squared),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::PriceBar;
    use chrono::{Duration, NaiveDate};

    fn frame(tickers: &[&str], n: i64) -> PriceFrame {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let tables = tickers
            .iter()
            .map(|t| {
                (0..n)
                    .map(|i| PriceBar {
                        ticker: t.to_string(),
                        date: start + Duration::days(i),
                        open: 10.0,
                        high: 11.0,
                        low: 9.0,
                        close: 10.0 + i as f64,
                        volume: 1_000,
                    })
                    .collect()
            })
            .collect();
        PriceFrame::stack(tables).unwrap()
    }

    fn render<F>(write: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        write(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_separator() {
        assert_eq!(separator().len(), 70);
        assert!(separator().chars().all(|c| c == '='));
    }

    #[test]
    fn test_preview_shows_head_and_shape() {
        let text = render(|out| write_preview(out, &frame(&["AAPL", "MSFT"], 8)));
        let lines: Vec<&str> = text.lines().collect();

        // header + 5 rows + shape line
        assert_eq!(lines.len(), 7);
        assert!(lines[0].contains("volatility"));
        assert!(lines[1].contains("AAPL") && lines[1].contains("2024-01-02"));
        assert!(lines[1].contains("NaN"));
        assert_eq!(lines[6], "[16 rows x 10 columns]");
    }

    #[test]
    fn test_moving_averages_per_ticker() {
        let text = render(|out| write_moving_averages(out, &frame(&["AAPL", "MSFT"], 3)));
        assert!(text.contains("Moving Averages for AAPL"));
        assert!(text.contains("Moving Averages for MSFT"));
        // 2 headings + 2 column headers + 6 rows
        assert_eq!(text.lines().count(), 10);
        // MSFT rows continue the frame index
        assert!(text.lines().any(|l| l.trim_start().starts_with("5 ")));
    }

    #[test]
    fn test_moving_averages_in_symbol_order() {
        let text = render(|out| write_moving_averages(out, &frame(&["MSFT", "AAPL"], 2)));
        let headings: Vec<&str> = text.lines().filter(|l| l.starts_with("Moving Averages")).collect();
        assert_eq!(headings, vec!["Moving Averages for AAPL", "Moving Averages for MSFT"]);

        // AAPL was stacked second, so its rows sit at positions 2 and 3
        let aapl_first_row = text.lines().nth(2).unwrap();
        assert!(aapl_first_row.trim_start().starts_with("2 "));
    }

    #[test]
    fn test_fmt_value() {
        assert_eq!(fmt_value(None), "NaN");
        assert_eq!(fmt_value(Some(1.5)), "1.500000");
    }
}
