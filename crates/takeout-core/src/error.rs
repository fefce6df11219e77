use std::path::PathBuf;
use thiserror::Error;

use crate::models::Metric;

/// All errors produced by the Takeout extractor.
#[derive(Error, Debug)]
pub enum TakeoutError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The Takeout root does not exist or is not a directory.
    #[error("Takeout path not found or not a directory: {0}")]
    NotFound(PathBuf),

    /// No files for the metric were found under the Takeout root.
    #[error("No {metric} files found under {root}; check that the Takeout path points at a Fitbit export")]
    EmptyData { metric: Metric, root: PathBuf },

    /// A JSON file parsed but matched none of the known record layouts.
    #[error("Unrecognised record layout in {0}")]
    UnrecognizedShape(PathBuf),

    /// A user-supplied file-name pattern is not a valid regular expression.
    #[error("Invalid file pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Convenience alias used throughout the takeout crates.
pub type Result<T> = std::result::Result<T, TakeoutError>;
