use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use plotters::prelude::*;

use crate::series::{
    date_range, slugify, value_range, widen_dates, DateSeries, FacetedAreaChart, LineChart, ScatterChart,
};

// Plotly's default qualitative palette
const PALETTE: [RGBColor; 6] = [
    RGBColor(99, 110, 250),
    RGBColor(239, 85, 59),
    RGBColor(0, 204, 150),
    RGBColor(171, 99, 250),
    RGBColor(255, 161, 90),
    RGBColor(25, 211, 243),
];

const FONT: &str = "sans-serif";

pub fn series_color(idx: usize) -> RGBColor {
    PALETTE[idx % PALETTE.len()]
}

/// Writes SVG charts into one output directory.
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    output_dir: PathBuf,
    width: u32,
    height: u32,
}

impl ChartRenderer {
    /// Create the renderer, creating `output_dir` if needed.
    pub fn new(output_dir: impl Into<PathBuf>, width: u32, height: u32) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("creating chart directory {}", output_dir.display()))?;

        Ok(Self {
            output_dir,
            width,
            height,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn path_for(&self, title: &str) -> PathBuf {
        self.output_dir.join(format!("{}.svg", slugify(title)))
    }

    /// Multi-series line chart; each series gets its own color and legend entry.
    pub fn line_chart(&self, spec: &LineChart) -> Result<PathBuf> {
        let path = self.path_for(&spec.title);
        let (x_start, x_end) = date_range(&spec.series)
            .or_else(|| spec.date_domain.map(widen_dates))
            .ok_or_else(|| anyhow!("No data to chart for '{}'", spec.title))?;
        // Empty series still get axes and legend entries
        let (y_min, y_max) =
            value_range(spec.series.iter().flat_map(|s| s.points.iter().map(|p| p.1))).unwrap_or((0.0, 1.0));

        {
            let root = SVGBackend::new(&path, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(spec.title.trim(), (FONT, 22.0).into_font())
                .margin(15)
                .x_label_area_size(45)
                .y_label_area_size(70)
                .build_cartesian_2d(x_start..x_end, y_min..y_max)?;

            chart
                .configure_mesh()
                .x_desc(&spec.x_label)
                .y_desc(&spec.y_label)
                .x_labels(8)
                .x_label_formatter(&|d: &NaiveDate| d.format("%b %d").to_string())
                .draw()?;

            for (idx, series) in spec.series.iter().enumerate() {
                let color = series_color(idx);
                chart
                    .draw_series(LineSeries::new(series.points.iter().copied(), color.stroke_width(2)))?
                    .label(series.name.clone())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
            }

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;

            root.present()?;
        }

        tracing::info!(path = %path.display(), "wrote line chart");
        Ok(path)
    }

    /// Area chart split into one panel per facet, sharing the y-axis range.
    pub fn faceted_area_chart(&self, spec: &FacetedAreaChart) -> Result<PathBuf> {
        if spec.facets.is_empty() {
            return Err(anyhow!("No facets to chart for '{}'", spec.title));
        }

        let path = self.path_for(&spec.title);
        // Areas are filled down to zero
        let (_, y_max) = value_range(spec.facets.iter().flat_map(|s| s.points.iter().map(|p| p.1)))
            .ok_or_else(|| anyhow!("No finite values to chart for '{}'", spec.title))?;
        let y_max = y_max.max(1.0);

        {
            let root = SVGBackend::new(&path, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE)?;
            let root = root.titled(spec.title.trim(), (FONT, 22.0).into_font())?;
            let panels = root.split_evenly((1, spec.facets.len()));
            let date_fmt = |d: &NaiveDate| d.format("%m-%d").to_string();

            for (idx, (panel, facet)) in panels.iter().zip(&spec.facets).enumerate() {
                let color = series_color(idx);
                let (x_start, x_end) = date_range([facet])
                    .ok_or_else(|| anyhow!("Facet {} has no data", facet.name))?;

                let mut chart = ChartBuilder::on(panel)
                    .caption(format!("{}={}", spec.facet_label, facet.name), (FONT, 15.0).into_font())
                    .margin(8)
                    .x_label_area_size(40)
                    .y_label_area_size(if idx == 0 { 65 } else { 35 })
                    .build_cartesian_2d(x_start..x_end, 0.0..y_max)?;

                let mut mesh = chart.configure_mesh();
                mesh.x_labels(3)
                    .x_desc(&spec.x_label)
                    .x_label_formatter(&date_fmt);
                if idx == 0 {
                    mesh.y_desc(&spec.y_label);
                }
                mesh.draw()?;

                chart.draw_series(
                    AreaSeries::new(facet.points.iter().copied(), 0.0, color.mix(0.3).filled())
                        .border_style(color.stroke_width(2)),
                )?;
            }

            root.present()?;
        }

        tracing::info!(path = %path.display(), facets = spec.facets.len(), "wrote faceted area chart");
        Ok(path)
    }

    /// Scatter plot with the fitted line drawn across the x range.
    pub fn scatter_chart(&self, spec: &ScatterChart) -> Result<PathBuf> {
        let path = self.path_for(&spec.title);
        let (x_min, x_max) = value_range(spec.points.iter().map(|p| p.0))
            .ok_or_else(|| anyhow!("No points to chart for '{}'", spec.title))?;

        let trend_points: Vec<(f64, f64)> = spec
            .trend
            .map(|(slope, intercept)| {
                vec![(x_min, slope * x_min + intercept), (x_max, slope * x_max + intercept)]
            })
            .unwrap_or_default();
        let (y_min, y_max) = value_range(
            spec.points.iter().chain(trend_points.iter()).map(|p| p.1),
        )
        .ok_or_else(|| anyhow!("No finite values to chart for '{}'", spec.title))?;

        {
            let root = SVGBackend::new(&path, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(spec.title.trim(), (FONT, 22.0).into_font())
                .margin(15)
                .x_label_area_size(45)
                .y_label_area_size(70)
                .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

            chart
                .configure_mesh()
                .x_desc(&spec.x_label)
                .y_desc(&spec.y_label)
                .draw()?;

            let point_color = series_color(0);
            chart.draw_series(
                spec.points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 4, point_color.filled())),
            )?;

            if !trend_points.is_empty() {
                let trend_color = series_color(1);
                chart
                    .draw_series(LineSeries::new(trend_points, trend_color.stroke_width(2)))?
                    .label("OLS trendline")
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], trend_color.stroke_width(2)));

                chart
                    .configure_series_labels()
                    .position(SeriesLabelPosition::UpperLeft)
                    .background_style(WHITE.mix(0.8))
                    .border_style(BLACK)
                    .draw()?;
            }

            root.present()?;
        }

        tracing::info!(path = %path.display(), points = spec.points.len(), "wrote scatter chart");
        Ok(path)
    }
}

/// Build a `LineChart` spec
pub fn line_chart(title: impl Into<String>, x_label: &str, y_label: &str, series: Vec<DateSeries>) -> LineChart {
    LineChart {
        title: title.into(),
        x_label: x_label.to_string(),
        y_label: y_label.to_string(),
        series,
        date_domain: None,
    }
}
