use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use tracing::debug;

use crate::models::Metric;

// ── TimestampProcessor ────────────────────────────────────────────────────────

/// Parses the date and time representations found in Fitbit export files.
///
/// All results are naive wall-clock values. A string that carries a UTC
/// offset keeps its own local time; nothing is converted between zones.
pub struct TimestampProcessor;

impl TimestampProcessor {
    /// Attempt to parse a [`serde_json::Value`] into a [`NaiveDateTime`].
    ///
    /// Handles:
    /// * `null`       → `None`
    /// * JSON string  → ISO 8601 / RFC 3339 or the US-style
    ///   `MM/DD/YY HH:MM:SS` used by Fitbit's global export.
    /// * JSON number  → Unix timestamp in seconds.
    pub fn parse(value: &Value) -> Option<NaiveDateTime> {
        match value {
            Value::Null => None,
            Value::String(s) => Self::parse_str(s.trim()),
            Value::Number(n) => {
                if let Some(secs) = n.as_i64() {
                    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
                } else if let Some(f) = n.as_f64() {
                    let secs = f.trunc() as i64;
                    let nanos = (f.fract() * 1_000_000_000.0).round() as u32;
                    DateTime::from_timestamp(secs, nanos).map(|dt| dt.naive_utc())
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Parse a date-time string. Date-only strings resolve to midnight.
    pub fn parse_str(s: &str) -> Option<NaiveDateTime> {
        if s.is_empty() {
            return None;
        }

        let normalised = if let Some(stripped) = s.strip_suffix('Z') {
            format!("{}+00:00", stripped)
        } else {
            s.to_string()
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(dt.naive_local());
        }

        // `%y` must precede `%Y`: `%Y` happily reads "23" as year 23.
        const DATETIME_FORMATS: &[&str] = &[
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M",
            "%m/%d/%y %H:%M:%S",
            "%m/%d/%Y %H:%M:%S",
        ];
        for fmt in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(naive);
            }
        }

        if let Some(date) = Self::parse_date(s) {
            return date.and_hms_opt(0, 0, 0);
        }

        debug!("TimestampProcessor: could not parse timestamp string \"{}\"", s);
        None
    }

    /// Parse a calendar date key such as `2024-01-01` or `01/01/24`.
    pub fn parse_date(s: &str) -> Option<NaiveDate> {
        const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y"];
        let s = s.trim();
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    }

    /// Parse a time-of-day key such as `00:01:00`, `00:01:00.500` or `00:01`.
    pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
        const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];
        let s = s.trim();
        TIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
    }
}

// ── ValueExtractor ────────────────────────────────────────────────────────────

/// Pulls the numeric metric value out of a raw JSON leaf.
pub struct ValueExtractor;

impl ValueExtractor {
    /// Extract the value for `metric`, or `None` when it is missing or not
    /// numeric.
    ///
    /// * Heart rate: `{"bpm": 64, "confidence": 2}`, a bare number, or a
    ///   numeric string.
    /// * Calories: a number, a numeric string, or `{"value": 1.2}`.
    pub fn extract(metric: Metric, value: &Value) -> Option<f64> {
        let raw = match (metric, value) {
            (Metric::HeartRate, Value::Object(map)) => map.get("bpm")?,
            (Metric::Calories, Value::Object(map)) => map.get("value")?,
            _ => value,
        };
        Self::as_number(raw)
    }

    /// Coerce a JSON number or numeric string to a finite `f64`.
    pub fn as_number(value: &Value) -> Option<f64> {
        let n = match value {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        n.is_finite().then_some(n)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
