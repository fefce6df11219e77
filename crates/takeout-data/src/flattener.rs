//! Record flattening for Fitbit export files.
//!
//! A file's JSON is classified once into a [`RecordShape`]; the shape then
//! yields one `Result<TimePoint, SkipReason>` per entry. Bad entries become
//! `Err` items for the caller to count, they never abort the file.

use std::path::Path;

use serde_json::Value;
use takeout_core::data_processors::{TimestampProcessor, ValueExtractor};
use takeout_core::models::{Metric, TimePoint};
use takeout_core::{Result, TakeoutError};
use tracing::debug;

/// Field names that may carry the date-time of a flat-list record, in
/// priority order.
pub const DATETIME_FIELDS: &[&str] = &["dateTime", "datetime", "timestamp", "startTime", "date"];

/// Why a single entry was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A top-level key that should have been a date was not.
    InvalidDate(String),
    /// A nested key that should have been a time of day was not.
    InvalidTime(String),
    /// A flat-list record had no parseable date-time field.
    InvalidTimestamp,
    /// The metric value was missing or not numeric.
    InvalidValue,
    /// An entry that must be a JSON object was something else.
    NotAnObject,
}

/// Layout tag without the borrowed data, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    NestedByDate,
    FlatList,
}

/// The recognised layouts of a metric file.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordShape<'a> {
    /// `(date key, time-of-day object)` pairs, e.g.
    /// `{"2024-01-01": {"00:00:00": {"bpm": 60, "confidence": 2}}}`.
    NestedByDate(Vec<(&'a str, &'a Value)>),
    /// Records such as `{"dateTime": "01/01/24 00:00:00", "value": "1.2"}`.
    FlatList(&'a [Value]),
}

type PointIter<'a> = Box<dyn Iterator<Item = std::result::Result<TimePoint, SkipReason>> + 'a>;

impl<'a> RecordShape<'a> {
    /// Classify a parsed file. `None` means the layout is not recognised.
    ///
    /// * An object with at least one date key is nested-by-date.
    /// * An array whose records carry a date-time field is a flat list.
    /// * An array of date-keyed objects is nested-by-date.
    /// * Any other object is searched for its first non-empty array value;
    ///   one whose array values are all empty is a flat list of no records.
    pub fn sniff(value: &'a Value) -> Option<Self> {
        match value {
            Value::Object(map) if map.is_empty() => Some(RecordShape::NestedByDate(Vec::new())),
            Value::Object(map) => {
                if map.keys().any(|k| TimestampProcessor::parse_date(k).is_some()) {
                    return Some(RecordShape::NestedByDate(
                        map.iter().map(|(k, v)| (k.as_str(), v)).collect(),
                    ));
                }
                let mut lists = map.values().filter(|v| v.is_array()).peekable();
                if lists.peek().is_none() {
                    return None;
                }
                // A wrapper whose lists are all empty holds zero records.
                lists
                    .find_map(|v| match v {
                        Value::Array(items) if !items.is_empty() => Some(Self::sniff(v)),
                        _ => None,
                    })
                    .unwrap_or(Some(RecordShape::FlatList(&[])))
            }
            Value::Array(items) if items.is_empty() => Some(RecordShape::FlatList(items)),
            Value::Array(items) => {
                if items.iter().any(is_flat_record) {
                    return Some(RecordShape::FlatList(items));
                }
                if items.iter().any(is_date_keyed_object) {
                    // Non-object items get an empty date key so they are
                    // counted as skipped rather than silently dropped.
                    let entries = items
                        .iter()
                        .flat_map(|item| match item.as_object() {
                            Some(map) => map.iter().map(|(k, v)| (k.as_str(), v)).collect::<Vec<_>>(),
                            None => vec![("", item)],
                        })
                        .collect();
                    return Some(RecordShape::NestedByDate(entries));
                }
                None
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            RecordShape::NestedByDate(_) => ShapeKind::NestedByDate,
            RecordShape::FlatList(_) => ShapeKind::FlatList,
        }
    }

    /// Lazily flatten every entry for `metric`.
    pub fn points(&self, metric: Metric) -> PointIter<'_> {
        match self {
            RecordShape::NestedByDate(days) => Box::new(
                days.iter()
                    .flat_map(move |&(date_key, times)| day_points(date_key, times, metric)),
            ),
            RecordShape::FlatList(items) => {
                Box::new(items.iter().map(move |item| flat_point(item, metric)))
            }
        }
    }
}

/// Points and skip count for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub shape: ShapeKind,
    pub points: Vec<TimePoint>,
    pub skipped: usize,
}

/// Flatten an already-parsed document. `None` for an unrecognised layout.
pub fn flatten_value(value: &Value, metric: Metric) -> Option<FileOutcome> {
    let shape = RecordShape::sniff(value)?;
    let mut points = Vec::new();
    let mut skipped = 0usize;

    for item in shape.points(metric) {
        match item {
            Ok(point) => points.push(point),
            Err(reason) => {
                if skipped == 0 {
                    debug!("Flattener: first skipped entry: {:?}", reason);
                }
                skipped += 1;
            }
        }
    }

    Some(FileOutcome {
        shape: shape.kind(),
        points,
        skipped,
    })
}

/// Read, parse and flatten one file.
///
/// Errors cover the whole file (unreadable, invalid JSON, unrecognised
/// layout); per-entry problems are only counted in [`FileOutcome::skipped`].
pub fn flatten_file(path: &Path, metric: Metric) -> Result<FileOutcome> {
    let content = std::fs::read_to_string(path).map_err(|source| TakeoutError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content)?;
    flatten_value(&value, metric).ok_or_else(|| TakeoutError::UnrecognizedShape(path.to_path_buf()))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn is_flat_record(item: &Value) -> bool {
    item.as_object()
        .map(|map| DATETIME_FIELDS.iter().any(|f| map.contains_key(*f)))
        .unwrap_or(false)
}

fn is_date_keyed_object(item: &Value) -> bool {
    item.as_object()
        .map(|map| map.keys().any(|k| TimestampProcessor::parse_date(k).is_some()))
        .unwrap_or(false)
}

fn day_points<'a>(date_key: &'a str, times: &'a Value, metric: Metric) -> PointIter<'a> {
    let Some(date) = TimestampProcessor::parse_date(date_key) else {
        return Box::new(std::iter::once(Err(SkipReason::InvalidDate(date_key.to_string()))));
    };
    let Value::Object(times) = times else {
        return Box::new(std::iter::once(Err(SkipReason::NotAnObject)));
    };

    Box::new(times.iter().map(move |(time_key, leaf)| -> std::result::Result<TimePoint, SkipReason> {
        let time = TimestampProcessor::parse_time_of_day(time_key)
            .ok_or_else(|| SkipReason::InvalidTime(time_key.clone()))?;
        let value = ValueExtractor::extract(metric, leaf).ok_or(SkipReason::InvalidValue)?;
        Ok(TimePoint::new(date.and_time(time), value))
    }))
}

fn flat_point(item: &Value, metric: Metric) -> std::result::Result<TimePoint, SkipReason> {
    let record = item.as_object().ok_or(SkipReason::NotAnObject)?;

    let timestamp = DATETIME_FIELDS
        .iter()
        .find_map(|field| record.get(*field))
        .and_then(TimestampProcessor::parse)
        .ok_or(SkipReason::InvalidTimestamp)?;

    // `{"dateTime": .., "bpm": 60}` has no `value` wrapper.
    let value = match record.get("value") {
        Some(v) => ValueExtractor::extract(metric, v),
        None => ValueExtractor::extract(metric, item),
    }
    .ok_or(SkipReason::InvalidValue)?;

    Ok(TimePoint::new(timestamp, value))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use serde_json::json;
    use tempfile::TempDir;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    // ── sniff ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_sniff_nested_object() {
        let doc = json!({"2024-01-01": {"00:00:00": 1.0}});
        let shape = RecordShape::sniff(&doc).unwrap();
        assert_eq!(shape.kind(), ShapeKind::NestedByDate);
    }

    #[test]
    fn test_sniff_nested_list() {
        let doc = json!([{"2024-01-01": {"00:00:00": 1.0}}, {"2024-01-02": {"00:00:00": 2.0}}]);
        match RecordShape::sniff(&doc).unwrap() {
            RecordShape::NestedByDate(days) => assert_eq!(days.len(), 2),
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn test_sniff_flat_list() {
        let doc = json!([{"dateTime": "01/01/24 00:00:00", "value": "1.2"}]);
        assert_eq!(RecordShape::sniff(&doc).unwrap().kind(), ShapeKind::FlatList);
    }

    #[test]
    fn test_sniff_wrapped_flat_list() {
        let doc = json!({"meta": {"v": 1}, "records": [{"dateTime": "2024-01-01T00:00:00", "value": 3}]});
        assert_eq!(RecordShape::sniff(&doc).unwrap().kind(), ShapeKind::FlatList);
    }

    #[test]
    fn test_sniff_empty_documents_have_no_points() {
        let empty_list = json!([]);
        let empty_object = json!({});
        assert_eq!(RecordShape::sniff(&empty_list).unwrap().points(Metric::Calories).count(), 0);
        assert_eq!(RecordShape::sniff(&empty_object).unwrap().points(Metric::Calories).count(), 0);
    }

    #[test]
    fn test_sniff_wrapper_with_only_empty_lists() {
        let doc = json!({"activities-calories": [], "meta": {"v": 1}});
        let shape = RecordShape::sniff(&doc).unwrap();
        assert_eq!(shape, RecordShape::FlatList(&[]));
        assert_eq!(shape.points(Metric::Calories).count(), 0);
    }

    #[test]
    fn test_sniff_unrecognised() {
        assert!(RecordShape::sniff(&json!(42)).is_none());
        assert!(RecordShape::sniff(&json!({"name": "x"})).is_none());
        assert!(RecordShape::sniff(&json!([1, 2, 3])).is_none());
    }

    // ── nested-by-date flattening ─────────────────────────────────────────────

    #[test]
    fn test_nested_one_point_per_leaf() {
        let doc = json!({
            "2024-01-01": {
                "00:00:00": {"bpm": 60, "confidence": 2},
                "00:01:00": {"bpm": 62, "confidence": 1}
            },
            "2024-01-02": {
                "12:30:15": {"bpm": 71, "confidence": 3}
            }
        });
        let outcome = flatten_value(&doc, Metric::HeartRate).unwrap();
        assert_eq!(outcome.skipped, 0);
        assert_eq!(
            outcome.points,
            vec![
                TimePoint::new(ts("2024-01-01 00:00:00"), 60.0),
                TimePoint::new(ts("2024-01-01 00:01:00"), 62.0),
                TimePoint::new(ts("2024-01-02 12:30:15"), 71.0),
            ]
        );
    }

    #[test]
    fn test_nested_preserves_values_exactly() {
        let doc = json!({"2024-01-01": {"08:00:00": 1.234_567_891_234}});
        let outcome = flatten_value(&doc, Metric::Calories).unwrap();
        assert_eq!(outcome.points[0].value, 1.234_567_891_234);
    }

    #[test]
    fn test_nested_skips_bad_entries() {
        let doc = json!({
            "2024-01-01": {
                "00:00:00": {"bpm": 60},
                "not-a-time": {"bpm": 61},
                "00:02:00": {"confidence": 1},
                "00:03:00": {"bpm": 63}
            },
            "garbage": {"00:00:00": {"bpm": 1}},
            "2024-01-02": "not an object"
        });
        let outcome = flatten_value(&doc, Metric::HeartRate).unwrap();
        assert_eq!(outcome.points.len(), 2);
        assert_eq!(outcome.skipped, 4);
    }

    #[test]
    fn test_points_reports_skip_reasons() {
        let doc = json!({"2024-01-01": {"99:00:00": 1.0, "00:00:00": "x"}});
        let shape = RecordShape::sniff(&doc).unwrap();
        let reasons: Vec<SkipReason> = shape
            .points(Metric::Calories)
            .filter_map(|r| r.err())
            .collect();
        assert!(reasons.contains(&SkipReason::InvalidTime("99:00:00".to_string())));
        assert!(reasons.contains(&SkipReason::InvalidValue));
    }

    // ── flat-list flattening ──────────────────────────────────────────────────

    #[test]
    fn test_flat_list_calories() {
        let doc = json!([
            {"dateTime": "01/01/24 00:00:00", "value": "1.5"},
            {"dateTime": "01/01/24 00:01:00", "value": 2.25},
            {"dateTime": "bad", "value": "1.0"},
            {"dateTime": "01/01/24 00:03:00"},
            "stray"
        ]);
        let outcome = flatten_value(&doc, Metric::Calories).unwrap();
        assert_eq!(outcome.shape, ShapeKind::FlatList);
        assert_eq!(
            outcome.points,
            vec![
                TimePoint::new(ts("2024-01-01 00:00:00"), 1.5),
                TimePoint::new(ts("2024-01-01 00:01:00"), 2.25),
            ]
        );
        assert_eq!(outcome.skipped, 3);
    }

    #[test]
    fn test_flat_list_heart_rate_variants() {
        let doc = json!([
            {"dateTime": "01/01/24 07:00:05", "value": {"bpm": 58, "confidence": 3}},
            {"timestamp": "2024-01-01T07:00:10", "bpm": 59},
            {"datetime": "2024-01-01 07:00:15", "value": 60}
        ]);
        let outcome = flatten_value(&doc, Metric::HeartRate).unwrap();
        let values: Vec<f64> = outcome.points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![58.0, 59.0, 60.0]);
        assert_eq!(outcome.skipped, 0);
    }

    // ── flatten_file ──────────────────────────────────────────────────────────

    #[test]
    fn test_flatten_file_reads_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("heart_rate-2024-01-01.json");
        std::fs::write(&path, r#"{"2024-01-01": {"00:00:00": {"bpm": 60, "confidence": 2}}}"#).unwrap();

        let outcome = flatten_file(&path, Metric::HeartRate).unwrap();
        assert_eq!(outcome.points, vec![TimePoint::new(ts("2024-01-01 00:00:00"), 60.0)]);
    }

    #[test]
    fn test_flatten_file_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calories-bad.json");
        std::fs::write(&path, "{not valid json{{").unwrap();

        let err = flatten_file(&path, Metric::Calories).unwrap_err();
        assert!(matches!(err, TakeoutError::JsonParse(_)));
    }

    #[test]
    fn test_flatten_file_wrapper_with_empty_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calories-2024-01-01.json");
        std::fs::write(&path, r#"{"activities-calories": []}"#).unwrap();

        let outcome = flatten_file(&path, Metric::Calories).unwrap();
        assert_eq!(outcome.shape, ShapeKind::FlatList);
        assert!(outcome.points.is_empty());
        assert_eq!(outcome.skipped, 0);
    }

    #[test]
    fn test_flatten_file_unrecognised_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calories-odd.json");
        std::fs::write(&path, r#"{"name": "not a metric file"}"#).unwrap();

        let err = flatten_file(&path, Metric::Calories).unwrap_err();
        assert!(matches!(err, TakeoutError::UnrecognizedShape(p) if p == path));
    }

    #[test]
    fn test_flatten_file_missing() {
        let err = flatten_file(Path::new("/tmp/no-such-takeout-file.json"), Metric::Calories)
            .unwrap_err();
        assert!(matches!(err, TakeoutError::FileRead { .. }));
    }
}
