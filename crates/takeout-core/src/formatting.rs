//! Console rendering of statistics.

use chrono::NaiveDateTime;

const MISSING: &str = "n/a";

/// Render `value` with `decimals` fraction digits and comma-grouped thousands.
///
/// ```
/// use takeout_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let fixed = format!("{:.*}", decimals as usize, value.abs());
    let (whole, fraction) = match fixed.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + fixed.len() / 3 + 1);
    // "-0.00" reads as noise; only signed when a non-zero digit survives.
    if value < 0.0 && fixed.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        out.push('-');
    }
    out.push_str(&group_thousands(whole));
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// [`format_number`] for optional statistics; `None` renders as `n/a`.
///
/// ```
/// use takeout_core::formatting::format_optional;
///
/// assert_eq!(format_optional(Some(61.0), 1), "61.0");
/// assert_eq!(format_optional(None, 1), "n/a");
/// ```
pub fn format_optional(value: Option<f64>, decimals: u32) -> String {
    match value {
        Some(v) => format_number(v, decimals),
        None => MISSING.to_string(),
    }
}

/// `YYYY-MM-DD HH:MM:SS`, or `n/a`.
pub fn format_timestamp(value: Option<NaiveDateTime>) -> String {
    match value {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => MISSING.to_string(),
    }
}

/// Share of `part` in `whole` as a percentage rounded to `decimal_places`;
/// `0.0` when `whole` is zero.
///
/// ```
/// use takeout_core::formatting::percentage;
///
/// assert_eq!(percentage(2.0, 3.0, 1), 66.7);
/// assert_eq!(percentage(5.0, 0.0, 2), 0.0);
/// ```
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let scale = 10_f64.powi(decimal_places as i32);
    (part * 100.0 / whole * scale).round() / scale
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    digits
        .chars()
        .enumerate()
        .fold(String::with_capacity(len + len / 3), |mut acc, (i, c)| {
            if i > 0 && (len - i) % 3 == 0 {
                acc.push(',');
            }
            acc.push(c);
            acc
        })
}
