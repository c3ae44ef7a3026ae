//! Value normalization
//!
//! Both sides of a comparison are brought to a common representation chosen by
//! the column type, so `300` and `300.0` match in a numeric column while the
//! same texts stay distinct in a character column.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use crate::models::{ColumnType, DataValue};

/// Value in its comparable form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// SQL NULL
    Null,
    /// Text compared verbatim, including the empty string
    Text(String),
    /// Canonical decimal text: no sign on zero, no leading or trailing zeros
    Number(String),
    /// Bit pattern of a binary floating point value, `-0.0` folded into `0.0`
    Float(u64),
    /// Boolean
    Bool(bool),
    /// Calendar date
    Date(NaiveDate),
    /// Time of day
    Time(NaiveTime),
    /// Date and time, offsets converted to UTC
    Timestamp(NaiveDateTime),
    /// UUID
    Uuid(Uuid),
    /// Raw bytes
    Bytes(Vec<u8>),
}

/// Normalize a value for a column of the given type.
///
/// A typed value that does not parse is compared as verbatim text.
pub fn normalize(value: &DataValue, column_type: ColumnType) -> Normalized {
    let text = match value {
        DataValue::Null => return Normalized::Null,
        DataValue::Binary(bytes) => return Normalized::Bytes(bytes.clone()),
        DataValue::Text(text) => text,
    };
    if text.is_empty() {
        return Normalized::Text(String::new());
    }

    let typed = match column_type {
        ColumnType::Integer | ColumnType::Decimal => canonical_number(text).map(Normalized::Number),
        ColumnType::Float => parse_float(text).map(Normalized::Float),
        ColumnType::Boolean => parse_bool(text).map(Normalized::Bool),
        ColumnType::Date => parse_date(text).map(Normalized::Date),
        ColumnType::Time => parse_time(text).map(Normalized::Time),
        ColumnType::Timestamp => parse_timestamp(text).map(Normalized::Timestamp),
        ColumnType::Uuid => Uuid::parse_str(text.trim()).ok().map(Normalized::Uuid),
        ColumnType::Binary => Some(Normalized::Bytes(text.as_bytes().to_vec())),
        ColumnType::Text | ColumnType::Unknown => None,
    };
    typed.unwrap_or_else(|| Normalized::Text(text.clone()))
}

/// Whether two values are equal for a column of the given type
pub fn values_match(expected: &DataValue, actual: &DataValue, column_type: ColumnType) -> bool {
    normalize(expected, column_type) == normalize(actual, column_type)
}

/// Canonical text of a decimal number, e.g. `0300.50` becomes `300.5`
pub fn canonical_number(text: &str) -> Option<String> {
    let text = text.trim();
    if text.contains(['e', 'E']) {
        let value: f64 = text.parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        return canonical_plain(&value.to_string());
    }
    canonical_plain(text)
}

fn canonical_plain(text: &str) -> Option<String> {
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let (integer, fraction) = match digits.split_once('.') {
        Some((integer, fraction)) => (integer, fraction),
        None => (digits, ""),
    };
    if integer.is_empty() && fraction.is_empty() {
        return None;
    }
    if !integer.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let integer = integer.trim_start_matches('0');
    let fraction = fraction.trim_end_matches('0');
    let integer = if integer.is_empty() { "0" } else { integer };

    let mut canonical = String::with_capacity(text.len());
    if negative && (integer != "0" || !fraction.is_empty()) {
        canonical.push('-');
    }
    canonical.push_str(integer);
    if !fraction.is_empty() {
        canonical.push('.');
        canonical.push_str(fraction);
    }
    Some(canonical)
}

/// Floating point columns hold an `f64`, so digits beyond its precision are
/// lost on the way through the database
fn parse_float(text: &str) -> Option<u64> {
    let value: f64 = text.trim().parse().ok()?;
    if value.is_nan() {
        return None;
    }
    Some(if value == 0.0 { 0.0f64.to_bits() } else { value.to_bits() })
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(text).map(|ts| ts.date()))
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    ["%H:%M:%S%.f", "%H:%M"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.naive_utc());
    }
    if let Ok(ts) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(ts.naive_utc());
    }
    let naive = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ]
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok());
    naive.or_else(|| {
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    })
}
