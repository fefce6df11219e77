//! Per-metric extraction pipeline.
//!
//! Scans the export for a metric's files, flattens each one, merges the
//! points into one chronological [`Series`] and reports what was skipped.

use std::path::Path;

use regex::Regex;
use takeout_core::models::{
    AggregateRow, ExtractionReport, Metric, Series, Statistics, TimePoint, Window,
};
use takeout_core::settings::ExtractorConfig;
use takeout_core::{Result, TakeoutError};
use tracing::{debug, info, warn};

use crate::aggregator::SeriesAggregator;
use crate::flattener::flatten_file;
use crate::scanner::find_metric_files;

// ── Public types ──────────────────────────────────────────────────────────────

/// The series extracted for one metric plus the run's counters.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub series: Series,
    pub report: ExtractionReport,
}

/// Extracts one metric from a Takeout export.
#[derive(Debug, Clone)]
pub struct Extractor {
    metric: Metric,
    config: ExtractorConfig,
    pattern: Regex,
}

impl Extractor {
    /// Create an extractor, compiling the configured or default file pattern.
    pub fn new(metric: Metric, config: ExtractorConfig) -> Result<Self> {
        let pattern = Regex::new(
            config
                .file_pattern
                .as_deref()
                .unwrap_or_else(|| metric.default_file_pattern()),
        )?;
        Ok(Self {
            metric,
            config,
            pattern,
        })
    }

    /// Heart rate extractor with default configuration (mean reduction).
    pub fn heart_rate() -> Result<Self> {
        Self::new(Metric::HeartRate, ExtractorConfig::for_metric(Metric::HeartRate))
    }

    /// Calories extractor with default configuration (sum reduction).
    pub fn calories() -> Result<Self> {
        Self::new(Metric::Calories, ExtractorConfig::for_metric(Metric::Calories))
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    // ── Extraction ────────────────────────────────────────────────────────────

    /// Run the full pipeline against the export rooted at `root`.
    ///
    /// 1. Find the metric's files (sorted; truncated to `file_limit`).
    /// 2. Flatten each file, skipping files that cannot be read or parsed.
    /// 3. Sort all points by timestamp and resolve duplicates.
    ///
    /// Fails with [`TakeoutError::NotFound`] for a bad root and
    /// [`TakeoutError::EmptyData`] when no file matches. Unparsable files
    /// only increase the skip counters.
    pub fn extract_all(&self, root: &Path) -> Result<Extraction> {
        // ── Step 1: Scan ──────────────────────────────────────────────────────
        let mut files = find_metric_files(root, &self.pattern)?;
        if files.is_empty() {
            return Err(TakeoutError::EmptyData {
                metric: self.metric,
                root: root.to_path_buf(),
            });
        }
        if let Some(limit) = self.config.file_limit.filter(|&n| n > 0) {
            files.truncate(limit);
        }

        info!("Processing {} {} file(s)...", files.len(), self.metric);

        let mut report = ExtractionReport {
            files_matched: files.len(),
            ..ExtractionReport::default()
        };

        // ── Step 2: Flatten ───────────────────────────────────────────────────
        let mut points: Vec<TimePoint> = Vec::new();
        for path in &files {
            match flatten_file(path, self.metric) {
                Ok(outcome) => {
                    debug!(
                        "File {}: {:?}, {} point(s), {} skipped",
                        path.display(),
                        outcome.shape,
                        outcome.points.len(),
                        outcome.skipped
                    );
                    report.files_parsed += 1;
                    report.records_skipped += outcome.skipped;
                    points.extend(outcome.points);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    report.files_skipped += 1;
                }
            }
        }

        // ── Step 3: Merge ─────────────────────────────────────────────────────
        let (series, duplicates_removed) =
            Series::from_points(self.metric, points, self.config.duplicate_policy);
        report.duplicates_removed = duplicates_removed;

        info!(
            "Extracted {} {} point(s) from {} file(s); skipped {} file(s) and {} record(s), {} duplicate(s) resolved",
            series.len(),
            self.metric,
            report.files_parsed,
            report.files_skipped,
            report.records_skipped,
            report.duplicates_removed
        );

        Ok(Extraction { series, report })
    }

    // ── Derived views ─────────────────────────────────────────────────────────

    /// Summary statistics, with the daily average taken under this
    /// extractor's reduction.
    pub fn get_statistics(&self, series: &Series) -> Statistics {
        Statistics::from_series(series).with_daily_average(&self.daily(series))
    }

    /// Per-day aggregate under the configured reduction.
    pub fn daily(&self, series: &Series) -> Vec<AggregateRow> {
        SeriesAggregator::daily(series, self.config.reduction)
    }

    /// Per-(date, hour) aggregate under the configured reduction.
    pub fn hourly(&self, series: &Series) -> Vec<AggregateRow> {
        SeriesAggregator::hourly(series, self.config.reduction)
    }

    /// Any window under the configured reduction.
    pub fn aggregate(&self, series: &Series, window: Window) -> Vec<AggregateRow> {
        SeriesAggregator::aggregate(series, window, self.config.reduction)
    }

    /// Column name for aggregates, e.g. `average_heart_rate`.
    pub fn aggregate_column(&self) -> String {
        format!(
            "{}_{}",
            self.config.reduction.column_prefix(),
            self.metric.value_column()
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
