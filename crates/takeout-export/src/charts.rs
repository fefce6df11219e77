//! SVG charts for aggregated series.
//!
//! Dated aggregates are drawn as a line over days since the first bucket;
//! the hour-of-day profile is drawn as 24 bars.

use std::path::Path;

use chrono::{Duration, NaiveDateTime};
use plotters::prelude::*;
use takeout_core::models::{AggregateRow, Period};
use tracing::debug;

use crate::error::{ExportError, Result};

const CHART_SIZE: (u32, u32) = (1200, 600);
const SECONDS_PER_DAY: f64 = 86_400.0;

fn plot_err<E: std::fmt::Display>(err: E) -> ExportError {
    ExportError::Plot(err.to_string())
}

/// Line chart of dated rows (day, hour, week or month buckets).
///
/// Hour-of-day rows carry no calendar position and are ignored; a slice
/// with nothing dated fails with [`ExportError::NothingToPlot`].
pub fn plot_aggregate_svg(path: &Path, rows: &[AggregateRow], title: &str, y_label: &str) -> Result<()> {
    let dated: Vec<(NaiveDateTime, f64)> = rows
        .iter()
        .filter_map(|row| Some((row.period.start()?, row.value)))
        .collect();
    let Some(&(origin, _)) = dated.first() else {
        return Err(ExportError::NothingToPlot(title.to_string()));
    };

    let points: Vec<(f64, f64)> = dated
        .iter()
        .map(|&(at, value)| ((at - origin).num_seconds() as f64 / SECONDS_PER_DAY, value))
        .collect();
    let x_end = points.last().map(|&(x, _)| x).unwrap_or(0.0).max(1.0);
    let (y_min, y_max) = value_bounds(points.iter().map(|&(_, y)| y));

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..x_end, y_min..y_max)
        .map_err(plot_err)?;

    let date_label = |x: &f64| {
        let at = origin + Duration::seconds((x * SECONDS_PER_DAY) as i64);
        at.format("%Y-%m-%d").to_string()
    };
    chart
        .configure_mesh()
        .x_desc("date")
        .y_desc(y_label)
        .x_labels(8)
        .x_label_formatter(&date_label)
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
        .map_err(plot_err)?;
    root.present().map_err(plot_err)?;

    debug!("Plotted {} point(s) to {}", points.len(), path.display());
    Ok(())
}

/// Bar chart of an hour-of-day profile. Rows of other windows are ignored.
pub fn plot_hour_of_day_svg(path: &Path, rows: &[AggregateRow], title: &str, y_label: &str) -> Result<()> {
    let bars: Vec<(u32, f64)> = rows
        .iter()
        .filter_map(|row| match row.period {
            Period::HourOfDay(hour) => Some((hour, row.value)),
            _ => None,
        })
        .collect();
    if bars.is_empty() {
        return Err(ExportError::NothingToPlot(title.to_string()));
    }

    let (y_min, y_max) = value_bounds(bars.iter().map(|&(_, y)| y).chain(std::iter::once(0.0)));

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..24f64, y_min..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("hour of day")
        .y_desc(y_label)
        .x_labels(24)
        .x_label_formatter(&|x: &f64| format!("{:02}", *x as u32))
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(bars.iter().map(|&(hour, value)| {
            let left = f64::from(hour) + 0.1;
            Rectangle::new([(left, 0.0), (left + 0.8, value)], BLUE.filled())
        }))
        .map_err(plot_err)?;
    root.present().map_err(plot_err)?;

    debug!("Plotted {} bar(s) to {}", bars.len(), path.display());
    Ok(())
}

/// Padded `(min, max)` of the values; never an empty range.
fn value_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((hi - lo) * 0.05).max(1.0);
    (lo - pad, hi + pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn day(d: u32, value: f64) -> AggregateRow {
        AggregateRow {
            period: Period::Day(NaiveDate::from_ymd_opt(2024, 1, d).unwrap()),
            value,
            count: 1,
        }
    }

    #[test]
    fn test_plot_aggregate_svg_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("daily_heart_rate.svg");
        let rows = vec![day(1, 61.0), day(2, 64.5), day(3, 59.0)];

        plot_aggregate_svg(&path, &rows, "Daily heart rate", "bpm").unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("polyline") || svg.contains("path"));
    }

    #[test]
    fn test_plot_aggregate_svg_single_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("single.svg");
        plot_aggregate_svg(&path, &[day(1, 100.0)], "Single", "kcal").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_plot_aggregate_svg_rejects_hour_of_day_rows() {
        let dir = TempDir::new().unwrap();
        let rows = vec![AggregateRow { period: Period::HourOfDay(3), value: 1.0, count: 1 }];
        let err = plot_aggregate_svg(&dir.path().join("x.svg"), &rows, "Profile", "kcal").unwrap_err();
        assert!(matches!(err, ExportError::NothingToPlot(_)));
    }

    #[test]
    fn test_plot_hour_of_day_svg_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hour_of_day_calories.svg");
        let rows: Vec<AggregateRow> = (0..24)
            .map(|h| AggregateRow { period: Period::HourOfDay(h), value: f64::from(h) * 2.0, count: 4 })
            .collect();

        plot_hour_of_day_svg(&path, &rows, "Calories by hour", "kcal").unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("<rect"));
    }

    #[test]
    fn test_plot_hour_of_day_svg_empty() {
        let dir = TempDir::new().unwrap();
        let err = plot_hour_of_day_svg(&dir.path().join("x.svg"), &[], "Profile", "kcal").unwrap_err();
        assert!(matches!(err, ExportError::NothingToPlot(_)));
    }

    #[test]
    fn test_value_bounds() {
        assert_eq!(value_bounds(std::iter::empty()), (0.0, 1.0));
        let (lo, hi) = value_bounds([10.0, 10.0].into_iter());
        assert!(lo < 10.0 && hi > 10.0);
    }
}
