//! Period aggregation over a flattened series.
//!
//! Buckets are formed by truncating each timestamp to its period (no
//! rounding, no timezone conversion) and reduced with an explicit
//! [`Reduction`].

use std::collections::BTreeMap;

use takeout_core::models::{AggregateRow, Period, Reduction, Series, Window};

// ── SeriesAggregator ──────────────────────────────────────────────────────────

/// Stateless helper that groups series points by time period.
pub struct SeriesAggregator;

impl SeriesAggregator {
    /// Aggregate by calendar day.
    pub fn daily(series: &Series, reduction: Reduction) -> Vec<AggregateRow> {
        Self::aggregate(series, Window::Day, reduction)
    }

    /// Aggregate by `(date, hour)`.
    pub fn hourly(series: &Series, reduction: Reduction) -> Vec<AggregateRow> {
        Self::aggregate(series, Window::Hour, reduction)
    }

    /// Aggregate by Monday-based calendar week.
    pub fn weekly(series: &Series, reduction: Reduction) -> Vec<AggregateRow> {
        Self::aggregate(series, Window::Week, reduction)
    }

    /// Aggregate by calendar month.
    pub fn monthly(series: &Series, reduction: Reduction) -> Vec<AggregateRow> {
        Self::aggregate(series, Window::Month, reduction)
    }

    /// Profile by hour of day (0-23), pooling every date.
    pub fn hour_of_day(series: &Series, reduction: Reduction) -> Vec<AggregateRow> {
        Self::aggregate(series, Window::HourOfDay, reduction)
    }

    /// Generic aggregation driver.
    ///
    /// Returns one row per non-empty period, sorted by period ascending.
    pub fn aggregate(series: &Series, window: Window, reduction: Reduction) -> Vec<AggregateRow> {
        let mut buckets: BTreeMap<Period, Vec<f64>> = BTreeMap::new();

        for point in series.points() {
            buckets
                .entry(window.period_of(point.timestamp))
                .or_default()
                .push(point.value);
        }

        buckets
            .into_iter()
            .filter_map(|(period, values)| {
                let value = reduction.apply(&values)?;
                Some(AggregateRow {
                    period,
                    value,
                    count: values.len(),
                })
            })
            .collect()
    }

    /// Sum of the row values and of the row counts.
    pub fn calculate_totals(rows: &[AggregateRow]) -> (f64, usize) {
        rows.iter()
            .fold((0.0, 0), |(value, count), row| (value + row.value, count + row.count))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
