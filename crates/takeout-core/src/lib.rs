//! Shared domain types for the Fitbit Takeout extractor.
//!
//! Metrics, time points, series and aggregation periods, the error taxonomy,
//! timestamp and value parsing helpers, and the command-line settings.

pub mod calculations;
pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{Result, TakeoutError};
