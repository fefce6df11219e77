use thiserror::Error;

/// Errors raised while writing tables or charts.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A plotting backend failure, flattened to its message.
    #[error("Failed to draw chart: {0}")]
    Plot(String),

    /// The rows contained no plottable point.
    #[error("Nothing to plot for {0}")]
    NothingToPlot(String),
}

pub type Result<T> = std::result::Result<T, ExportError>;
