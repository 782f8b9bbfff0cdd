use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::SemanticType;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Text(String),
    Int32(i32),
    Int64(i64),
    Decimal(Decimal),
    Double(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    Guid(Uuid),
}

impl Value {
    /// Whether this value is a legal cell for a column of type `ty`.
    pub fn conforms_to(&self, ty: &SemanticType) -> bool {
        matches!(
            (self, ty),
            (Value::Text(_), SemanticType::Text | SemanticType::Other(_))
                | (Value::Int32(_), SemanticType::Int32)
                | (Value::Int64(_), SemanticType::Int64)
                | (Value::Decimal(_), SemanticType::Decimal)
                | (Value::Double(_), SemanticType::Double)
                | (Value::Boolean(_), SemanticType::Boolean)
                | (Value::DateTime(_), SemanticType::DateTime)
                | (Value::Date(_), SemanticType::Date)
                | (Value::Time(_), SemanticType::Time)
                | (Value::Guid(_), SemanticType::Guid)
        )
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Int32(i) => i.to_string(),
            Value::Int64(i) => i.to_string(),
            Value::Decimal(d) => d.normalize().to_string(),
            Value::Double(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{f:.0}")
                } else {
                    f.to_string()
                }
            }
            Value::Boolean(b) => b.to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Time(t) => t.format("%H:%M:%S%.f").to_string(),
            Value::Guid(g) => g.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%d-%m-%Y",
];

const TIME_FORMATS: &[&str] = &[
    "%H:%M:%S%.f",
    "%H:%M",
    "%I:%M:%S %p",
    "%I:%M %p",
];

/// Generic date-time parse covering ISO-8601, RFC 3339 and common spreadsheet layouts.
pub fn parse_naive_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }
    if let Some(stripped) = value.strip_suffix('Z')
        && let Some(parsed) = parse_with_formats(stripped, DATETIME_FORMATS)
    {
        return Some(parsed);
    }
    parse_with_formats(value, DATETIME_FORMATS)
}

fn parse_with_formats(value: &str, formats: &[&str]) -> Option<NaiveDateTime> {
    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

pub fn parse_naive_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

pub fn parse_naive_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(value, fmt).ok())
}

/// Splits at the first space or `T`; the time part keeps everything after it,
/// so trailing `AM`/`PM` markers survive.
fn split_date_time(value: &str) -> (Option<&str>, Option<&str>) {
    let value = value.trim();
    if value.is_empty() {
        return (None, None);
    }
    match value.find([' ', 'T']) {
        Some(idx) => {
            let rest = value[idx + 1..].trim_start();
            (Some(&value[..idx]), (!rest.is_empty()).then_some(rest))
        }
        None => (Some(value), None),
    }
}

/// Date-only coercion: full date-time, then date literal, then the first token.
pub fn coerce_date(value: &str) -> Option<NaiveDate> {
    if let Some(dt) = parse_naive_datetime(value) {
        return Some(dt.date());
    }
    if let Some(date) = parse_naive_date(value) {
        return Some(date);
    }
    split_date_time(value).0.and_then(parse_naive_date)
}

/// Time-only coercion: full date-time, then time literal, then whatever follows
/// the date token.
pub fn coerce_time(value: &str) -> Option<NaiveTime> {
    if let Some(dt) = parse_naive_datetime(value) {
        return Some(dt.time());
    }
    if let Some(time) = parse_naive_time(value) {
        return Some(time);
    }
    split_date_time(value).1.and_then(parse_naive_time)
}

pub fn parse_boolean(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_decimal_literal(value: &str) -> Option<Decimal> {
    let value = value.trim();
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .ok()
}

pub fn parse_guid(value: &str) -> Option<Uuid> {
    let trimmed = value.trim().trim_matches(|c| matches!(c, '{' | '}'));
    Uuid::parse_str(trimmed).ok()
}

/// Coerces non-empty raw text into `ty`; `None` means the text is not a valid literal.
pub fn parse_typed_value(value: &str, ty: &SemanticType) -> Option<Value> {
    let parsed = match ty {
        SemanticType::Text => Value::Text(value.to_string()),
        SemanticType::Int32 => Value::Int32(value.trim().parse().ok()?),
        SemanticType::Int64 => Value::Int64(value.trim().parse().ok()?),
        SemanticType::Decimal => Value::Decimal(parse_decimal_literal(value)?),
        SemanticType::Double => {
            let parsed: f64 = value.trim().parse().ok()?;
            if !parsed.is_finite() {
                return None;
            }
            Value::Double(parsed)
        }
        SemanticType::Boolean => Value::Boolean(parse_boolean(value)?),
        SemanticType::DateTime => Value::DateTime(parse_naive_datetime(value)?),
        SemanticType::Date => Value::Date(coerce_date(value)?),
        SemanticType::Time => Value::Time(coerce_time(value)?),
        SemanticType::Guid => Value::Guid(parse_guid(value)?),
        SemanticType::Other(_) => Value::Text(value.trim().to_string()),
    };
    Some(parsed)
}
