//! CSV tables for series and aggregates.

use std::path::Path;

use takeout_core::models::{AggregateRow, Series, Window};
use tracing::debug;

use crate::error::Result;

/// Timestamp layout used in every table.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Write `datetime,<value column>` rows for every point. Returns the row count.
pub fn write_series_csv(path: &Path, series: &Series) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["datetime", series.metric().value_column()])?;

    for point in series.points() {
        writer.write_record([
            point.timestamp.format(DATETIME_FORMAT).to_string(),
            point.value.to_string(),
        ])?;
    }
    writer.flush()?;

    debug!("Wrote {} row(s) to {}", series.len(), path.display());
    Ok(series.len())
}

/// Write aggregate rows as the window's key columns followed by `column`.
///
/// An empty `rows` slice still produces the header line.
pub fn write_aggregate_csv(
    path: &Path,
    window: Window,
    rows: &[AggregateRow],
    column: &str,
) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header: Vec<&str> = window.key_columns().to_vec();
    header.push(column);
    writer.write_record(&header)?;

    for row in rows {
        let mut record = row.period.key_fields();
        record.push(row.value.to_string());
        writer.write_record(&record)?;
    }
    writer.flush()?;

    debug!("Wrote {} aggregate row(s) to {}", rows.len(), path.display());
    Ok(rows.len())
}
