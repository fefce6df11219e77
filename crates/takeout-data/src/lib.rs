//! Data layer for the Fitbit Takeout extractor.
//!
//! Finds metric files inside a Takeout export, flattens their record
//! layouts into time points, merges them into series and aggregates those
//! by period. Also hosts the structure inspector used to explore unknown
//! exports.

pub mod aggregator;
pub mod extractor;
pub mod flattener;
pub mod inspector;
pub mod scanner;

pub use takeout_core as core;
