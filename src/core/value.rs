// Copyright 2025 Oriel Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Value type for Oriel - runtime values with type information
//!
//! This module provides a unified Value enum that represents SQL values
//! with full type information, total sort ordering, and the numeric /
//! temporal arithmetic needed for RANGE-frame distance computation.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Duration, Months, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use super::error::{Error, Result};
use super::types::DataType;

/// A runtime value with type information
///
/// Each variant carries its data directly. Text uses `Arc<str>` for cheap
/// cloning during row operations; rows are cloned whenever a partition
/// buffer hands results back to an output batch.
#[derive(Debug, Clone)]
pub enum Value {
    /// NULL value with optional type hint
    Null(DataType),

    /// 64-bit signed integer
    Integer(i64),

    /// 64-bit floating point
    Float(f64),

    /// Fixed-point decimal
    Decimal(Decimal),

    /// UTF-8 text string (Arc for cheap cloning)
    Text(Arc<str>),

    /// Boolean value
    Boolean(bool),

    /// Timestamp (UTC)
    Timestamp(DateTime<Utc>),
}

impl Value {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a NULL value with a type hint
    pub fn null(data_type: DataType) -> Self {
        Value::Null(data_type)
    }

    /// Create a NULL value with unknown type
    pub fn null_unknown() -> Self {
        Value::Null(DataType::Null)
    }

    /// Create an integer value
    pub fn integer(value: i64) -> Self {
        Value::Integer(value)
    }

    /// Create a float value
    pub fn float(value: f64) -> Self {
        Value::Float(value)
    }

    /// Create a decimal value
    pub fn decimal(value: Decimal) -> Self {
        Value::Decimal(value)
    }

    /// Create a text value
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(Arc::from(value.into().as_str()))
    }

    /// Create a boolean value
    pub fn boolean(value: bool) -> Self {
        Value::Boolean(value)
    }

    /// Create a timestamp value
    pub fn timestamp(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }

    // =========================================================================
    // Type accessors
    // =========================================================================

    /// Returns the data type of this value
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null(dt) => *dt,
            Value::Integer(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::Decimal(_) => DataType::Decimal,
            Value::Text(_) => DataType::Text,
            Value::Boolean(_) => DataType::Boolean,
            Value::Timestamp(_) => DataType::Timestamp,
        }
    }

    /// Returns true if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    // =========================================================================
    // Value extractors
    // =========================================================================

    /// Extract as i64, with numeric coercion
    ///
    /// Returns None if the value is NULL or not convertible.
    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Float(v) => Some(*v as i64),
            Value::Decimal(d) => d.to_i64(),
            Value::Boolean(b) => Some(if *b { 1 } else { 0 }),
            _ => None,
        }
    }

    /// Extract as f64, with numeric coercion
    pub fn as_float64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Extract as decimal, with numeric coercion
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Integer(v) => Some(Decimal::from(*v)),
            Value::Float(v) => Decimal::from_f64(*v),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Extract as timestamp
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    // =========================================================================
    // Comparison
    // =========================================================================

    /// Compare two non-NULL values for sorting
    ///
    /// Numeric variants compare across types (Integer vs Float vs Decimal).
    /// Values of genuinely different kinds fall back to a stable type-tag
    /// order so the result is total. NULL placement is the caller's concern;
    /// a NULL compared here sorts before everything as a last resort.
    pub fn compare_sort(&self, other: &Value) -> Ordering {
        use Value::*;
        match (self, other) {
            (Null(_), Null(_)) => Ordering::Equal,
            (Null(_), _) => Ordering::Less,
            (_, Null(_)) => Ordering::Greater,
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Decimal(a), Decimal(b)) => a.cmp(b),
            (Integer(a), Float(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal),
            (Float(a), Integer(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
            (Integer(a), Decimal(b)) => rust_decimal::Decimal::from(*a).cmp(b),
            (Decimal(a), Integer(b)) => a.cmp(&rust_decimal::Decimal::from(*b)),
            (Float(a), Decimal(b)) => a
                .partial_cmp(&b.to_f64().unwrap_or(f64::NAN))
                .unwrap_or(Ordering::Equal),
            (Decimal(a), Float(b)) => a
                .to_f64()
                .unwrap_or(f64::NAN)
                .partial_cmp(b)
                .unwrap_or(Ordering::Equal),
            (Text(a), Text(b)) => a.cmp(b),
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Timestamp(a), Timestamp(b)) => a.cmp(b),
            (a, b) => type_rank(a).cmp(&type_rank(b)),
        }
    }

    /// Whether two values are sort-equal (NULLs are equal to each other)
    pub fn sort_eq(&self, other: &Value) -> bool {
        match (self.is_null(), other.is_null()) {
            (true, true) => true,
            (true, false) | (false, true) => false,
            (false, false) => self.compare_sort(other) == Ordering::Equal,
        }
    }

    // =========================================================================
    // Arithmetic (RANGE-frame distances)
    // =========================================================================

    /// `self + offset` for numeric values
    pub fn add_numeric(&self, offset: &Value) -> Result<Value> {
        numeric_binop(self, offset, i64::checked_add, |a, b| a + b, |a, b| {
            a.checked_add(b)
        })
    }

    /// `self - offset` for numeric values
    pub fn sub_numeric(&self, offset: &Value) -> Result<Value> {
        numeric_binop(self, offset, i64::checked_sub, |a, b| a - b, |a, b| {
            a.checked_sub(b)
        })
    }
}

/// Stable ordering rank for heterogeneous comparisons
fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null(_) => 0,
        Value::Boolean(_) => 1,
        Value::Integer(_) | Value::Float(_) | Value::Decimal(_) => 2,
        Value::Text(_) => 3,
        Value::Timestamp(_) => 4,
    }
}

fn numeric_binop(
    lhs: &Value,
    rhs: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
    dec_op: fn(Decimal, Decimal) -> Option<Decimal>,
) -> Result<Value> {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => int_op(*a, *b)
            .map(Value::Integer)
            .ok_or_else(|| Error::ArithmeticOverflow("frame bound".to_string())),
        (Value::Decimal(_), _) | (_, Value::Decimal(_)) => {
            let a = lhs
                .as_decimal()
                .ok_or_else(|| Error::type_conversion(lhs.data_type().to_string(), "DECIMAL"))?;
            let b = rhs
                .as_decimal()
                .ok_or_else(|| Error::type_conversion(rhs.data_type().to_string(), "DECIMAL"))?;
            dec_op(a, b)
                .map(Value::Decimal)
                .ok_or_else(|| Error::ArithmeticOverflow("frame bound".to_string()))
        }
        _ => {
            let a = lhs
                .as_float64()
                .ok_or_else(|| Error::type_conversion(lhs.data_type().to_string(), "FLOAT"))?;
            let b = rhs
                .as_float64()
                .ok_or_else(|| Error::type_conversion(rhs.data_type().to_string(), "FLOAT"))?;
            Ok(Value::Float(float_op(a, b)))
        }
    }
}

/// A calendar interval for temporal RANGE-frame offsets
///
/// Month arithmetic is calendar-aware (Jan 31 + 1 month = Feb 28/29); the
/// day and sub-day parts are fixed durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interval {
    /// Calendar months
    pub months: i32,
    /// Days
    pub days: i32,
    /// Sub-day component in nanoseconds
    pub nanos: i64,
}

impl Interval {
    /// An interval of whole days
    pub fn days(days: i32) -> Self {
        Interval {
            months: 0,
            days,
            nanos: 0,
        }
    }

    /// An interval of calendar months
    pub fn months(months: i32) -> Self {
        Interval {
            months,
            days: 0,
            nanos: 0,
        }
    }

    /// An interval of whole seconds
    pub fn seconds(seconds: i64) -> Self {
        Interval {
            months: 0,
            days: 0,
            nanos: seconds * 1_000_000_000,
        }
    }

    /// Apply this interval to a timestamp; `sign` is +1 (following) or -1
    /// (preceding).
    pub fn apply_to(&self, ts: DateTime<Utc>, sign: i32) -> Result<DateTime<Utc>> {
        let overflow = || Error::ArithmeticOverflow("interval frame bound".to_string());
        let months = self.months.checked_mul(sign).ok_or_else(overflow)?;
        let shifted = if months >= 0 {
            ts.checked_add_months(Months::new(months as u32))
        } else {
            ts.checked_sub_months(Months::new(months.unsigned_abs()))
        }
        .ok_or_else(overflow)?;
        let fixed = Duration::days(self.days as i64 * sign as i64)
            + Duration::nanoseconds(self.nanos * sign as i64);
        shifted.checked_add_signed(fixed).ok_or_else(overflow)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null(_) => f.write_str("NULL"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.sort_eq(other)
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null(_) => 0u8.hash(state),
            // Integer-valued floats must hash like the integer so that mixed
            // numeric partition keys route consistently.
            Value::Integer(v) => {
                1u8.hash(state);
                v.hash(state);
            }
            Value::Float(v) => {
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v <= i64::MAX as f64 {
                    1u8.hash(state);
                    (*v as i64).hash(state);
                } else {
                    2u8.hash(state);
                    v.to_bits().hash(state);
                }
            }
            Value::Decimal(v) => {
                if let Some(i) = v.to_i64().filter(|_| v.fract().is_zero()) {
                    1u8.hash(state);
                    i.hash(state);
                } else {
                    3u8.hash(state);
                    v.hash(state);
                }
            }
            Value::Text(v) => {
                4u8.hash(state);
                v.hash(state);
            }
            Value::Boolean(v) => {
                5u8.hash(state);
                v.hash(state);
            }
            Value::Timestamp(v) => {
                6u8.hash(state);
                v.timestamp_nanos_opt().unwrap_or(0).hash(state);
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

/// Helper for tests and adapters: day-precision UTC timestamp
pub fn date(year: i32, month: u32, day: u32) -> Value {
    use chrono::TimeZone;
    Value::Timestamp(Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap())
}
