//! Cell value normalization
//!
//! Turns raw cell values into [`Canonical`] values according to a column's
//! declared type and [`ColumnPolicy`]. Normalization only coerces and folds;
//! numeric tolerance is applied later by the cell comparator.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::config::{CoercionFallback, ColumnPolicy, NullHandling, TemporalPrecision};
use crate::error::NormalizationError;
use crate::model::{Canonical, ColumnType, Value};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%b-%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥'];

/// Largest magnitude at which an integral float is folded into an integer
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Normalizer bound to one column's type and policy
#[derive(Debug, Clone)]
pub struct Normalizer {
    column_type: ColumnType,
    policy: ColumnPolicy,
}

impl Normalizer {
    /// Create a normalizer for a column
    pub fn new(column_type: ColumnType, policy: ColumnPolicy) -> Self {
        Self {
            column_type,
            policy,
        }
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn policy(&self) -> &ColumnPolicy {
        &self.policy
    }

    /// Normalize a cell; `None` means the row has no cell for the column
    pub fn normalize(&self, value: Option<&Value>) -> Result<Canonical, NormalizationError> {
        normalize(value, self.column_type, &self.policy)
    }
}

/// Normalize a raw value for a column of the given type
pub fn normalize(
    value: Option<&Value>,
    column_type: ColumnType,
    policy: &ColumnPolicy,
) -> Result<Canonical, NormalizationError> {
    let value = match value {
        None | Some(Value::Null) => return Ok(Canonical::Absent),
        Some(v) => v,
    };

    if policy.null_handling == NullHandling::Unified && is_null_like(value, policy) {
        return Ok(Canonical::Absent);
    }

    let coerced = match column_type {
        ColumnType::Int | ColumnType::Float => coerce_number(value, policy),
        ColumnType::Bool => coerce_bool(value),
        ColumnType::String => Ok(Canonical::Text(fold_text(&value.display(), policy))),
        ColumnType::Date => coerce_temporal(value, false, policy.temporal_precision),
        ColumnType::DateTime => coerce_temporal(value, true, policy.temporal_precision),
        ColumnType::Null | ColumnType::Mixed => Ok(normalize_dynamic(value, policy)),
    };

    match coerced {
        Ok(canonical) => Ok(canonical),
        Err(_) if policy.on_coercion_failure == CoercionFallback::CompareRaw => {
            Ok(Canonical::Text(fold_text(&value.display(), policy)))
        }
        Err(reason) => Err(NormalizationError::new(
            column_type,
            value.display(),
            reason,
        )),
    }
}

fn is_null_like(value: &Value, policy: &ColumnPolicy) -> bool {
    match value {
        Value::Null => true,
        Value::Float(f) => f.is_nan(),
        Value::String(s) => {
            let trimmed = s.trim();
            if s.is_empty() || (policy.ignore_whitespace && trimmed.is_empty()) {
                return true;
            }
            policy
                .null_markers
                .iter()
                .any(|marker| marker.eq_ignore_ascii_case(trimmed))
        }
        _ => false,
    }
}

/// Values of untyped or mixed columns keep their own variant
fn normalize_dynamic(value: &Value, policy: &ColumnPolicy) -> Canonical {
    match value {
        Value::Null => Canonical::Absent,
        Value::Bool(b) => Canonical::Bool(*b),
        Value::Int(i) => Canonical::Int(*i),
        Value::Float(f) => canonical_float(*f, policy.decimal_places),
        Value::String(s) => Canonical::Text(fold_text(s, policy)),
        Value::Date(d) => Canonical::Date(*d),
        Value::DateTime(dt) => Canonical::DateTime(truncate(*dt, policy.temporal_precision)),
    }
}

/// Apply whitespace and case folding
fn fold_text(s: &str, policy: &ColumnPolicy) -> String {
    let mut text = if policy.collapse_whitespace {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    } else if policy.ignore_whitespace {
        s.trim().to_string()
    } else {
        s.to_string()
    };

    if policy.ignore_case {
        text = text.to_lowercase();
    }
    text
}

fn coerce_number(value: &Value, policy: &ColumnPolicy) -> Result<Canonical, String> {
    match value {
        Value::Int(i) => Ok(Canonical::Int(*i)),
        Value::Float(f) => Ok(canonical_float(*f, policy.decimal_places)),
        Value::String(s) => parse_number(s)
            .map(|n| match n {
                Number::Int(i) => Canonical::Int(i),
                Number::Float(f) => canonical_float(f, policy.decimal_places),
            })
            .ok_or_else(|| "not a number".to_string()),
        Value::Bool(_) => Err("boolean is not a number".to_string()),
        Value::Date(_) | Value::DateTime(_) => Err("date is not a number".to_string()),
        Value::Null => Ok(Canonical::Absent),
    }
}

enum Number {
    Int(i64),
    Float(f64),
}

/// Parse numeric text, accepting thousands separators and currency symbols
fn parse_number(s: &str) -> Option<Number> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| *c != ',' && !CURRENCY_SYMBOLS.contains(c))
        .collect();
    let cleaned = cleaned.trim();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(cleaned);

    if cleaned.is_empty() {
        return None;
    }
    if let Ok(i) = cleaned.parse::<i64>() {
        return Some(Number::Int(i));
    }
    cleaned.parse::<f64>().ok().map(Number::Float)
}

/// Round if requested and fold integral floats into integers
fn canonical_float(f: f64, decimal_places: Option<u32>) -> Canonical {
    let f = match decimal_places {
        Some(places) if f.is_finite() => {
            let factor = 10f64.powi(i32::try_from(places).unwrap_or(i32::MAX));
            let scaled = f * factor;
            // Too many places for this magnitude: the value is already exact enough
            if scaled.is_finite() {
                scaled.round() / factor
            } else {
                f
            }
        }
        _ => f,
    };

    if f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_EXACT_INT {
        Canonical::Int(f as i64)
    } else {
        Canonical::Float(f)
    }
}

fn coerce_bool(value: &Value) -> Result<Canonical, String> {
    match value {
        Value::Bool(b) => Ok(Canonical::Bool(*b)),
        Value::Int(0) => Ok(Canonical::Bool(false)),
        Value::Int(1) => Ok(Canonical::Bool(true)),
        Value::Float(f) if *f == 0.0 => Ok(Canonical::Bool(false)),
        Value::Float(f) if *f == 1.0 => Ok(Canonical::Bool(true)),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" => Ok(Canonical::Bool(true)),
            "false" | "f" | "no" | "n" | "0" => Ok(Canonical::Bool(false)),
            _ => Err("not a boolean".to_string()),
        },
        _ => Err("not a boolean".to_string()),
    }
}

enum Temporal {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

fn coerce_temporal(
    value: &Value,
    as_datetime: bool,
    precision: TemporalPrecision,
) -> Result<Canonical, String> {
    let temporal = match value {
        Value::Date(d) => Temporal::Date(*d),
        Value::DateTime(dt) => Temporal::DateTime(*dt),
        Value::String(s) => parse_temporal(s.trim()).ok_or_else(|| "not a date".to_string())?,
        _ => return Err("not a date".to_string()),
    };

    if !as_datetime {
        return Ok(Canonical::Date(match temporal {
            Temporal::Date(d) => d,
            Temporal::DateTime(dt) => dt.date(),
        }));
    }

    let dt = match temporal {
        Temporal::Date(d) => d.and_time(NaiveTime::MIN),
        Temporal::DateTime(dt) => dt,
    };
    Ok(match precision {
        TemporalPrecision::Day => Canonical::Date(dt.date()),
        _ => Canonical::DateTime(truncate(dt, precision)),
    })
}

fn truncate(dt: NaiveDateTime, precision: TemporalPrecision) -> NaiveDateTime {
    match precision {
        TemporalPrecision::Day => dt.date().and_time(NaiveTime::MIN),
        TemporalPrecision::Minute => dt
            .with_second(0)
            .and_then(|d| d.with_nanosecond(0))
            .unwrap_or(dt),
        TemporalPrecision::Second => dt.with_nanosecond(0).unwrap_or(dt),
        TemporalPrecision::Full => dt,
    }
}

fn parse_temporal(s: &str) -> Option<Temporal> {
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, format) {
            return Some(Temporal::Date(d));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(Temporal::DateTime(dt.naive_utc()));
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Temporal::DateTime(dt));
        }
    }
    None
}
