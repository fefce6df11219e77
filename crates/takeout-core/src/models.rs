use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

use crate::calculations::{mean, sample_stddev};

// ── Metric ────────────────────────────────────────────────────────────────────

/// A data type exported by Fitbit that the extractor knows how to flatten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Per-second or per-few-seconds heart rate samples (`bpm`, `confidence`).
    HeartRate,
    /// Per-minute estimated energy expenditure.
    Calories,
}

impl Metric {
    /// Column name used for the value in exported tables.
    pub fn value_column(self) -> &'static str {
        match self {
            Metric::HeartRate => "heart_rate",
            Metric::Calories => "calories",
        }
    }

    /// Case-insensitive regex matched against file names (not full paths).
    pub fn default_file_pattern(self) -> &'static str {
        match self {
            Metric::HeartRate => r"(?i)^heart_rate.*\.json$",
            Metric::Calories => r"(?i)^calories.*\.json$",
        }
    }

    /// Reduction an extractor uses unless configured otherwise.
    pub fn default_reduction(self) -> Reduction {
        match self {
            Metric::HeartRate => Reduction::Mean,
            Metric::Calories => Reduction::Sum,
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::HeartRate => "bpm",
            Metric::Calories => "kcal",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::HeartRate => "heart rate",
            Metric::Calories => "calories",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Reduction ─────────────────────────────────────────────────────────────────

/// How the values falling into one aggregation period are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    Mean,
    Sum,
    Min,
    Max,
    Count,
}

impl Reduction {
    /// Reduce `values`; `None` for an empty slice.
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        match self {
            Reduction::Mean => mean(values),
            Reduction::Sum => Some(values.iter().sum()),
            Reduction::Min => values.iter().copied().reduce(f64::min),
            Reduction::Max => values.iter().copied().reduce(f64::max),
            Reduction::Count => Some(values.len() as f64),
        }
    }

    /// Prefix used to name aggregate columns, e.g. `average_heart_rate`.
    pub fn column_prefix(self) -> &'static str {
        match self {
            Reduction::Mean => "average",
            Reduction::Sum => "total",
            Reduction::Min => "min",
            Reduction::Max => "max",
            Reduction::Count => "count",
        }
    }
}

// ── DuplicatePolicy ───────────────────────────────────────────────────────────

/// Which value survives when several points share a timestamp.
///
/// Encounter order is the scanner's path order, then the order within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DuplicatePolicy {
    /// Keep the first point seen for a timestamp.
    #[default]
    #[value(name = "first")]
    FirstSeen,
    /// Keep the last point seen for a timestamp.
    #[value(name = "last")]
    LastSeen,
    /// Replace all points for a timestamp with their mean.
    Mean,
}

// ── TimePoint / Series ────────────────────────────────────────────────────────

/// One flattened sample: a naive wall-clock timestamp and its numeric value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimePoint {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl TimePoint {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Chronological, duplicate-free samples of one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    metric: Metric,
    points: Vec<TimePoint>,
}

impl Series {
    /// An empty series for `metric`.
    pub fn empty(metric: Metric) -> Self {
        Self {
            metric,
            points: Vec::new(),
        }
    }

    /// Build a series from points in encounter order.
    ///
    /// Points are stably sorted by timestamp and collapsed per `policy`.
    /// Returns the series and the number of duplicate points removed.
    pub fn from_points(
        metric: Metric,
        mut points: Vec<TimePoint>,
        policy: DuplicatePolicy,
    ) -> (Self, usize) {
        points.sort_by_key(|p| p.timestamp);

        let mut unique: Vec<TimePoint> = Vec::with_capacity(points.len());
        let mut removed = 0usize;
        // Running sum/len of the current timestamp group, for the mean policy.
        let mut group_sum = 0.0;
        let mut group_len = 0usize;

        for point in points {
            match unique.last_mut() {
                Some(last) if last.timestamp == point.timestamp => {
                    removed += 1;
                    match policy {
                        DuplicatePolicy::FirstSeen => {}
                        DuplicatePolicy::LastSeen => last.value = point.value,
                        DuplicatePolicy::Mean => {
                            group_sum += point.value;
                            group_len += 1;
                            last.value = group_sum / group_len as f64;
                        }
                    }
                }
                _ => {
                    group_sum = point.value;
                    group_len = 1;
                    unique.push(point);
                }
            }
        }

        (Self { metric, points: unique }, removed)
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    /// Timestamp of the earliest point.
    pub fn start(&self) -> Option<NaiveDateTime> {
        self.points.first().map(|p| p.timestamp)
    }

    /// Timestamp of the latest point.
    pub fn end(&self) -> Option<NaiveDateTime> {
        self.points.last().map(|p| p.timestamp)
    }
}

// ── Window / Period ───────────────────────────────────────────────────────────

/// Grouping applied by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Day,
    Hour,
    /// Calendar week starting on Monday.
    Week,
    Month,
    /// Hour of day (0-23) pooled across every date.
    HourOfDay,
}

impl Window {
    /// The period `timestamp` falls into, truncating (never rounding).
    pub fn period_of(self, timestamp: NaiveDateTime) -> Period {
        let date = timestamp.date();
        match self {
            Window::Day => Period::Day(date),
            Window::Hour => Period::Hour(date, timestamp.hour()),
            Window::Week => {
                let offset = i64::from(date.weekday().num_days_from_monday());
                Period::Week(date - Duration::days(offset))
            }
            Window::Month => Period::Month(date.year(), date.month()),
            Window::HourOfDay => Period::HourOfDay(timestamp.hour()),
        }
    }

    /// Key column names written ahead of the value column in tables.
    pub fn key_columns(self) -> &'static [&'static str] {
        match self {
            Window::Day => &["date"],
            Window::Hour => &["date", "hour"],
            Window::Week => &["week_start"],
            Window::Month => &["month"],
            Window::HourOfDay => &["hour"],
        }
    }
}

/// Aggregation bucket. Variants never mix within one aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Period {
    Day(NaiveDate),
    Hour(NaiveDate, u32),
    /// Monday of the week.
    Week(NaiveDate),
    Month(i32, u32),
    HourOfDay(u32),
}

impl Period {
    /// Start of the bucket on the calendar; `None` for hour-of-day buckets.
    pub fn start(&self) -> Option<NaiveDateTime> {
        match *self {
            Period::Day(d) | Period::Week(d) => d.and_hms_opt(0, 0, 0),
            Period::Hour(d, h) => d.and_hms_opt(h, 0, 0),
            Period::Month(y, m) => NaiveDate::from_ymd_opt(y, m, 1)?.and_hms_opt(0, 0, 0),
            Period::HourOfDay(_) => None,
        }
    }

    /// Field values matching [`Window::key_columns`].
    pub fn key_fields(&self) -> Vec<String> {
        match *self {
            Period::Day(d) | Period::Week(d) => vec![d.format("%Y-%m-%d").to_string()],
            Period::Hour(d, h) => vec![d.format("%Y-%m-%d").to_string(), h.to_string()],
            Period::Month(y, m) => vec![format!("{y:04}-{m:02}")],
            Period::HourOfDay(h) => vec![h.to_string()],
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Period::Day(d) | Period::Week(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Period::Hour(d, h) => write!(f, "{} {:02}:00", d.format("%Y-%m-%d"), h),
            Period::Month(y, m) => write!(f, "{y:04}-{m:02}"),
            Period::HourOfDay(h) => write!(f, "{h:02}"),
        }
    }
}

/// One aggregated bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateRow {
    pub period: Period,
    /// Reduced value of the bucket.
    pub value: f64,
    /// Number of points that fell into the bucket.
    pub count: usize,
}

// ── Statistics ────────────────────────────────────────────────────────────────

/// Summary of a series' value column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1); `0.0` for a single point.
    pub stddev: Option<f64>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub days_covered: usize,
    /// Mean of the per-day values under the extractor's reduction.
    pub daily_average: Option<f64>,
}

impl Statistics {
    /// Compute everything except `daily_average` from `series`.
    pub fn from_series(series: &Series) -> Self {
        let values: Vec<f64> = series.values().collect();
        let mut days: Vec<NaiveDate> = series.points().iter().map(|p| p.timestamp.date()).collect();
        days.dedup();

        Self {
            count: values.len(),
            min: Reduction::Min.apply(&values),
            max: Reduction::Max.apply(&values),
            mean: mean(&values),
            stddev: sample_stddev(&values),
            start: series.start(),
            end: series.end(),
            days_covered: days.len(),
            daily_average: None,
        }
    }

    /// Attach the mean of the given daily rows.
    pub fn with_daily_average(mut self, daily: &[AggregateRow]) -> Self {
        let values: Vec<f64> = daily.iter().map(|r| r.value).collect();
        self.daily_average = mean(&values);
        self
    }
}

// ── ExtractionReport ──────────────────────────────────────────────────────────

/// Counters describing one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionReport {
    /// Files whose name matched the metric pattern.
    pub files_matched: usize,
    /// Files that parsed and had a recognised layout.
    pub files_parsed: usize,
    /// Files skipped because they could not be read, parsed or recognised.
    pub files_skipped: usize,
    /// Individual entries skipped because they lacked a valid timestamp or value.
    pub records_skipped: usize,
    /// Points dropped or merged by the duplicate policy.
    pub duplicates_removed: usize,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
