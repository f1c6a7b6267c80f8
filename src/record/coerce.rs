//! Lenient scalar coercion for inbound JSON values
//!
//! Inbound batches come from spreadsheets, CSV exports and pandas dumps, so the
//! same logical integer may arrive as `1`, `1.0`, `"1"` or `true`. Null-like
//! values (`null`, `""`, `"nan"`) all map to `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

type Coerced<T> = std::result::Result<Option<T>, String>;

fn is_null_text(s: &str) -> bool {
    let s = s.trim();
    s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("null") || s.eq_ignore_ascii_case("none")
}

/// Coerce to a float
pub fn float(value: &Value) -> Coerced<f64> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("number {} is not representable", n)),
        Value::String(s) if is_null_text(s) => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("expected a number, got {:?}", s)),
        other => Err(format!("expected a number, got {}", other)),
    }
}

/// Coerce to an integer; integral floats are accepted, fractional ones are not
pub fn int(value: &Value) -> Coerced<i64> {
    if let Value::Number(n) = value {
        if let Some(i) = n.as_i64() {
            return Ok(Some(i));
        }
    }

    match float(value)? {
        None => Ok(None),
        Some(f) if f.is_nan() => Ok(None),
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Some(f as i64)),
        Some(f) => Err(format!("expected an integer, got {}", f)),
    }
}

/// Coerce a 0/1-style flag
pub fn flag(value: &Value) -> Coerced<bool> {
    match value {
        Value::Bool(b) => Ok(Some(*b)),
        Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Ok(Some(true)),
        Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Ok(Some(false)),
        _ => match int(value)? {
            None => Ok(None),
            Some(0) => Ok(Some(false)),
            Some(1) => Ok(Some(true)),
            Some(other) => Err(format!("expected 0 or 1, got {}", other)),
        },
    }
}

/// Coerce to text; numbers are rendered as written
pub fn text(value: &Value) -> Coerced<String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if is_null_text(s) => Ok(None),
        Value::String(s) => Ok(Some(s.trim().to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(format!("expected text, got {}", other)),
    }
}

/// Coerce to a calendar date.
///
/// Strings may be a bare date, a naive date-time (space or `T` separated,
/// optional fraction) or RFC 3339. Integers are Unix epoch milliseconds.
pub fn date(value: &Value) -> Coerced<NaiveDate> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if is_null_text(s) => Ok(None),
        Value::String(s) => parse_date(s.trim())
            .map(Some)
            .ok_or_else(|| format!("unparsable date {:?}", s)),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| Some(dt.date_naive()))
            .ok_or_else(|| format!("unparsable epoch timestamp {}", n)),
        other => Err(format!("expected a date, got {}", other)),
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_int_coercion() {
        assert_eq!(int(&json!(9)), Ok(Some(9)));
        assert_eq!(int(&json!(9.0)), Ok(Some(9)));
        assert_eq!(int(&json!("2008")), Ok(Some(2008)));
        assert_eq!(int(&json!(null)), Ok(None));
        assert_eq!(int(&json!("NaN")), Ok(None));
        assert!(int(&json!(9.5)).is_err());
        assert!(int(&json!("nine")).is_err());
    }

    #[test]
    fn test_flag_coercion() {
        assert_eq!(flag(&json!(1)), Ok(Some(true)));
        assert_eq!(flag(&json!(0.0)), Ok(Some(false)));
        assert_eq!(flag(&json!("1")), Ok(Some(true)));
        assert_eq!(flag(&json!(false)), Ok(Some(false)));
        assert_eq!(flag(&json!(null)), Ok(None));
        assert!(flag(&json!(2)).is_err());
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2015, 7, 31);
        assert_eq!(date(&json!("2015-07-31")), Ok(expected));
        assert_eq!(date(&json!("2015-07-31 00:00:00")), Ok(expected));
        assert_eq!(date(&json!("2015-07-31T00:00:00.000")), Ok(expected));
        assert_eq!(date(&json!("2015-07-31T00:00:00Z")), Ok(expected));
        assert_eq!(date(&json!(1438300800000_i64)), Ok(expected));
        assert!(date(&json!("31/07/2015")).is_err());
    }

    #[test]
    fn test_text_coercion() {
        assert_eq!(text(&json!("a")), Ok(Some("a".to_string())));
        assert_eq!(text(&json!(3)), Ok(Some("3".to_string())));
        assert_eq!(text(&json!("")), Ok(None));
    }
}
