//! Typed scalar values attached to graph query results.

#![allow(clippy::match_same_arms)]

use std::cmp::Ordering;
use std::fmt::{self, Display};

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::{GroupByError, Result};

/// Type tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Reference to another entity.
    Uid,
    Int,
    Float,
    Bool,
    Text,
    DateTime,
    Bytes,
}

impl DataType {
    /// Returns the lowercase name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Uid => "uid",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Bool => "bool",
            DataType::Text => "text",
            DataType::DateTime => "datetime",
            DataType::Bytes => "bytes",
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed scalar value.
///
/// Appears as a grouping key, as an aggregate input and as an aggregate
/// result.
///
/// Note: `Float` uses total ordering (NaN sorts after +Inf) and bitwise
/// equality so that values can be used as sort keys.
#[derive(Debug, Clone)]
pub enum Value {
    /// Entity identifier.
    Uid(u64),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// Boolean value.
    Bool(bool),
    /// UTF-8 text.
    Text(String),
    /// Point in time, UTC.
    DateTime(DateTime<Utc>),
    /// Raw bytes (base64 encoded in JSON).
    Bytes(Bytes),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Uid(a), Value::Uid(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Value {
    /// Returns the type tag of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Uid(_) => DataType::Uid,
            Value::Int(_) => DataType::Int,
            Value::Float(_) => DataType::Float,
            Value::Bool(_) => DataType::Bool,
            Value::Text(_) => DataType::Text,
            Value::DateTime(_) => DataType::DateTime,
            Value::Bytes(_) => DataType::Bytes,
        }
    }

    /// Returns the identifier, if this is a `Uid`.
    pub fn as_uid(&self) -> Option<u64> {
        match self {
            Value::Uid(u) => Some(*u),
            _ => None,
        }
    }

    /// Returns the value as an i64, if it is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as an f64, if it is a `Float`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a string slice, if it is `Text`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Compares two values for ordering.
    ///
    /// Values of different types return None (incomparable), as do
    /// `Bytes` values, which have no defined order.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Uid(a), Value::Uid(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => Some(a.total_cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Returns the canonical string form of this value.
    ///
    /// Two values of the same type are equivalent for grouping iff their
    /// canonical forms are equal.
    pub fn marshal(&self) -> Result<String> {
        match self {
            Value::Uid(u) => Ok(format!("{u:#x}")),
            Value::Int(v) => Ok(v.to_string()),
            Value::Float(v) => Ok(v.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Text(s) => Ok(s.clone()),
            Value::DateTime(dt) => Ok(dt.to_rfc3339()),
            Value::Bytes(b) => {
                std::str::from_utf8(b)
                    .map(str::to_string)
                    .map_err(|e| GroupByError::Marshal {
                        type_name: "bytes",
                        reason: e.to_string(),
                    })
            }
        }
    }

    /// Converts this value to `target` on a best-effort basis.
    ///
    /// Returns `TypeMismatch` when no sensible conversion exists or the
    /// value does not fit the target type.
    pub fn convert_to(&self, target: DataType) -> Result<Value> {
        if self.data_type() == target {
            return Ok(self.clone());
        }

        let mismatch = || GroupByError::TypeMismatch {
            expected: target.name().to_string(),
            actual: self.to_string(),
        };

        match (self, target) {
            (_, DataType::Text) => self.marshal().map(Value::Text),

            (Value::Int(v), DataType::Float) => Ok(Value::Float(*v as f64)),
            (Value::Int(v), DataType::Bool) => Ok(Value::Bool(*v != 0)),
            (Value::Int(v), DataType::Uid) => u64::try_from(*v).map(Value::Uid).map_err(|_| mismatch()),
            (Value::Int(v), DataType::DateTime) => DateTime::from_timestamp(*v, 0)
                .map(Value::DateTime)
                .ok_or_else(mismatch),

            (Value::Float(v), DataType::Int) => {
                if v.is_finite() && *v >= i64::MIN as f64 && *v < i64::MAX as f64 {
                    Ok(Value::Int(v.trunc() as i64))
                } else {
                    Err(mismatch())
                }
            }
            (Value::Float(v), DataType::Bool) => Ok(Value::Bool(*v != 0.0)),

            (Value::Bool(b), DataType::Int) => Ok(Value::Int(i64::from(*b))),
            (Value::Bool(b), DataType::Float) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),

            (Value::Uid(u), DataType::Int) => i64::try_from(*u).map(Value::Int).map_err(|_| mismatch()),

            (Value::DateTime(dt), DataType::Int) => Ok(Value::Int(dt.timestamp())),

            (Value::Text(s), DataType::Int) => {
                s.trim().parse().map(Value::Int).map_err(|_| mismatch())
            }
            (Value::Text(s), DataType::Float) => {
                s.trim().parse().map(Value::Float).map_err(|_| mismatch())
            }
            (Value::Text(s), DataType::Bool) => {
                s.trim().parse().map(Value::Bool).map_err(|_| mismatch())
            }
            (Value::Text(s), DataType::DateTime) => DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| Value::DateTime(dt.with_timezone(&Utc)))
                .map_err(|_| mismatch()),
            (Value::Text(s), DataType::Bytes) => Ok(Value::Bytes(Bytes::from(s.clone()))),

            _ => Err(mismatch()),
        }
    }

    /// Converts this value to JSON.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Uid(u) => serde_json::Value::String(format!("{u:#x}")),
            Value::Int(v) => serde_json::Value::Number((*v).into()),
            Value::Float(v) => {
                serde_json::Number::from_f64(*v)
                    .map_or(serde_json::Value::Null, serde_json::Value::Number) // NaN/Inf become null
            }
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::DateTime(dt) => serde_json::Value::String(dt.to_rfc3339()),
            Value::Bytes(b) => {
                use base64::Engine;
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
            }
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Uid(u) => write!(f, "{u:#x}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Text(s) => write!(f, "'{s}'"),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}
