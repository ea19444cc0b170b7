//! Value and `DataType` definitions for nestql.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::error::{NestqlError, Result};

/// Day number of 1970-01-01 counted from 0001-01-01 (CE).
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const MICROS_PER_DAY: i64 = 86_400_000_000;

/// Supported element and parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    String,
    /// Date (stored as days since epoch).
    Date,
    /// Timestamp (stored as microseconds since epoch).
    Timestamp,
}

impl DataType {
    /// Returns the canonical name of the data type.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int64 => "INT64",
            DataType::Float64 => "FLOAT64",
            DataType::Bool => "BOOL",
            DataType::String => "STRING",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMP",
        }
    }

    /// Returns whether some value of this type can be coerced to `target`.
    ///
    /// This is the static check used when a catalog is built; a `true`
    /// result does not guarantee that every value coerces (`"abc"` will
    /// never become an `INT64`).
    #[must_use]
    pub fn can_coerce_to(&self, target: DataType) -> bool {
        match (self, target) {
            (a, b) if *a == b => true,
            (_, DataType::String) | (DataType::String, _) => true,
            (DataType::Int64, DataType::Float64 | DataType::Timestamp)
            | (DataType::Float64 | DataType::Timestamp, DataType::Int64)
            | (DataType::Date, DataType::Timestamp) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime value container for row data and query parameters.
///
/// Floats compare and hash by bit pattern, so `NaN == NaN` and `0.0 != -0.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// 64-bit signed integer value.
    Int64(i64),
    /// 64-bit floating point value.
    Float64(f64),
    /// Boolean value.
    Bool(bool),
    /// String value.
    String(String),
    /// Date value (days since Unix epoch).
    Date(i32),
    /// Timestamp value (microseconds since Unix epoch).
    Timestamp(i64),
    /// Null value.
    Null,
}

// Manual Hash implementation because f64 doesn't implement Hash
impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Int64(v) | Value::Timestamp(v) => v.hash(state),
            Value::Float64(v) => v.to_bits().hash(state),
            Value::Bool(v) => v.hash(state),
            Value::String(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
            Value::Null => {}
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int64(a), Value::Int64(b)) | (Value::Timestamp(a), Value::Timestamp(b)) => {
                a == b
            }
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

// Manual Eq implementation because f64 doesn't implement Eq
impl Eq for Value {}

impl Value {
    /// Returns true if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the data type of this value, or None for Null.
    #[must_use]
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float64(_) => Some(DataType::Float64),
            Value::Bool(_) => Some(DataType::Bool),
            Value::String(_) => Some(DataType::String),
            Value::Date(_) => Some(DataType::Date),
            Value::Timestamp(_) => Some(DataType::Timestamp),
            Value::Null => None,
        }
    }

    /// Returns the type name used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.data_type().map_or("NULL", |t| t.name())
    }

    /// Coerces this value to `target`.
    ///
    /// `Null` coerces to every type. Lossy numeric conversions are rejected.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` when the value cannot be represented as `target`.
    #[allow(clippy::cast_precision_loss, clippy::float_cmp)]
    pub fn coerce_to(&self, target: DataType) -> Result<Value> {
        if self.data_type() == Some(target) || self.is_null() {
            return Ok(self.clone());
        }

        let coerced = match (self, target) {
            (_, DataType::String) => Some(Value::String(self.to_string())),
            (Value::Int64(n), DataType::Float64) => Some(Value::Float64(*n as f64)),
            (Value::Int64(n), DataType::Timestamp) => Some(Value::Timestamp(*n)),
            (Value::Timestamp(t), DataType::Int64) => Some(Value::Int64(*t)),
            (Value::Float64(f), DataType::Int64) => {
                let in_range = *f >= i64::MIN as f64 && *f < i64::MAX as f64;
                (f.fract() == 0.0 && in_range).then(|| Value::Int64(*f as i64))
            }
            (Value::Date(d), DataType::Timestamp) => i64::from(*d)
                .checked_mul(MICROS_PER_DAY)
                .map(Value::Timestamp),
            (Value::String(s), _) => parse_string(s.trim(), target),
            _ => None,
        };

        coerced.ok_or_else(|| NestqlError::TypeMismatch {
            expected: target.name().to_string(),
            actual: self.type_name().to_string(),
            detail: format!("cannot coerce {self}"),
        })
    }
}

fn parse_string(s: &str, target: DataType) -> Option<Value> {
    match target {
        DataType::Int64 => s.parse().ok().map(Value::Int64),
        DataType::Float64 => s.parse().ok().map(Value::Float64),
        DataType::Bool => match s.to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        DataType::Date => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .map(|d| Value::Date(d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)),
        DataType::Timestamp => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| Value::Timestamp(t.timestamp_micros())),
        DataType::String => Some(Value::String(s.to_string())),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int64(n) => write!(f, "{n}"),
            Value::Float64(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::String(s) => f.write_str(s),
            Value::Date(days) => match days
                .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
                .and_then(NaiveDate::from_num_days_from_ce_opt)
            {
                Some(date) => write!(f, "{}", date.format("%Y-%m-%d")),
                None => write!(f, "{days}"),
            },
            Value::Timestamp(us) => match DateTime::from_timestamp_micros(*us) {
                Some(ts) => f.write_str(&ts.to_rfc3339_opts(SecondsFormat::Micros, true)),
                None => write!(f, "{us}"),
            },
            Value::Null => f.write_str("NULL"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int64(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
