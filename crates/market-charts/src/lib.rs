//! SVG chart rendering for the market report.
//!
//! Specs are plain data (`LineChart`, `FacetedAreaChart`, `ScatterChart`);
//! `ChartRenderer` turns each into one `.svg` file named after its title.

pub mod render;
pub mod series;

pub use render::*;
pub use series::*;
