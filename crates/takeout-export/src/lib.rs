//! Output side of the Fitbit Takeout extractor: CSV tables and SVG charts.

pub mod charts;
pub mod error;
pub mod tables;

pub use error::{ExportError, Result};
