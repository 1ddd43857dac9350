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

//! Invertible frame aggregators: SUM, COUNT, AVG, BIT_XOR / BIT_AND / BIT_OR
//!
//! Every accumulator here supports O(1) `add` and `remove`, which is what
//! lets the sliding evaluator advance frame bounds without rescanning.
//! BIT_AND / BIT_OR are made removable with per-bit population counters.
//! All aggregators skip NULL inputs.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::core::{Error, Result, Value};

use super::super::PrecisionMode;

/// Numeric lane of a running sum
///
/// The first non-NULL input picks the lane; later inputs coerce into it
/// (or promote Int to the float/decimal lane). Integer sums ride an i128 so
/// a sliding window can never overflow mid-frame.
#[derive(Debug, Clone, PartialEq)]
enum SumLane {
    Empty,
    Int(i128),
    Float(f64),
    Dec { sum: Decimal, emit_float: bool },
}

/// Running SUM accumulator
#[derive(Debug, Clone)]
pub struct SumState {
    precision: PrecisionMode,
    lane: SumLane,
    count: u64,
}

impl SumState {
    pub fn new(precision: PrecisionMode) -> Self {
        SumState {
            precision,
            lane: SumLane::Empty,
            count: 0,
        }
    }

    /// Count of non-NULL values currently in the frame
    pub fn count(&self) -> u64 {
        self.count
    }

    fn apply(&mut self, v: &Value, sign: i64) -> Result<()> {
        if v.is_null() {
            return Ok(());
        }
        if sign > 0 {
            self.count += 1;
        } else {
            self.count = self.count.checked_sub(1).ok_or_else(|| {
                Error::internal("sliding sum removed more values than it added")
            })?;
        }

        // Pick or promote the lane for this input type.
        self.lane = match (std::mem::replace(&mut self.lane, SumLane::Empty), v) {
            (SumLane::Empty, Value::Integer(_)) => SumLane::Int(0),
            (SumLane::Empty, Value::Float(_)) => match self.precision {
                PrecisionMode::Fast => SumLane::Float(0.0),
                PrecisionMode::HighPrecision => SumLane::Dec {
                    sum: Decimal::ZERO,
                    emit_float: true,
                },
            },
            (SumLane::Empty, Value::Decimal(_)) => SumLane::Dec {
                sum: Decimal::ZERO,
                emit_float: false,
            },
            (SumLane::Int(s), Value::Float(_)) => match self.precision {
                PrecisionMode::Fast => SumLane::Float(s as f64),
                PrecisionMode::HighPrecision => SumLane::Dec {
                    sum: decimal_from_i128(s)?,
                    emit_float: true,
                },
            },
            (SumLane::Int(s), Value::Decimal(_)) => SumLane::Dec {
                sum: decimal_from_i128(s)?,
                emit_float: false,
            },
            (lane, _) => lane,
        };

        match &mut self.lane {
            SumLane::Empty => {
                return Err(Error::type_conversion(v.data_type().to_string(), "numeric"))
            }
            SumLane::Int(s) => {
                let add = v
                    .as_int64()
                    .ok_or_else(|| Error::type_conversion(v.data_type().to_string(), "INTEGER"))?;
                *s += add as i128 * sign as i128;
            }
            SumLane::Float(s) => {
                let add = v
                    .as_float64()
                    .ok_or_else(|| Error::type_conversion(v.data_type().to_string(), "FLOAT"))?;
                *s += add * sign as f64;
            }
            SumLane::Dec { sum, .. } => {
                let add = v
                    .as_decimal()
                    .ok_or_else(|| Error::type_conversion(v.data_type().to_string(), "DECIMAL"))?;
                *sum = sum
                    .checked_add(add * Decimal::from(sign))
                    .ok_or_else(|| Error::ArithmeticOverflow("sum".to_string()))?;
            }
        }
        Ok(())
    }

    pub fn add(&mut self, v: &Value) -> Result<()> {
        self.apply(v, 1)
    }

    pub fn remove(&mut self, v: &Value) -> Result<()> {
        self.apply(v, -1)
    }

    pub fn value(&self) -> Result<Value> {
        if self.count == 0 {
            return Ok(Value::null_unknown());
        }
        Ok(match &self.lane {
            SumLane::Empty => Value::null_unknown(),
            SumLane::Int(s) => {
                if let Ok(v) = i64::try_from(*s) {
                    Value::Integer(v)
                } else {
                    Value::Decimal(decimal_from_i128(*s)?)
                }
            }
            SumLane::Float(s) => Value::Float(*s),
            SumLane::Dec { sum, emit_float } => {
                if *emit_float {
                    Value::Float(sum.to_f64().unwrap_or(f64::NAN))
                } else {
                    Value::Decimal(*sum)
                }
            }
        })
    }

    /// Sum as f64 for AVG computation
    fn float_sum(&self) -> Result<Option<f64>> {
        if self.count == 0 {
            return Ok(None);
        }
        Ok(match &self.lane {
            SumLane::Empty => None,
            SumLane::Int(s) => Some(*s as f64),
            SumLane::Float(s) => Some(*s),
            SumLane::Dec { sum, .. } => Some(sum.to_f64().unwrap_or(f64::NAN)),
        })
    }

    fn decimal_sum(&self) -> Option<Decimal> {
        match &self.lane {
            SumLane::Dec {
                sum,
                emit_float: false,
            } if self.count > 0 => Some(*sum),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.lane = SumLane::Empty;
        self.count = 0;
    }
}

fn decimal_from_i128(v: i128) -> Result<Decimal> {
    Decimal::from_i128(v).ok_or_else(|| Error::ArithmeticOverflow("sum".to_string()))
}

/// Running COUNT accumulator - counts non-NULL inputs, never NULL-valued
#[derive(Debug, Clone, Default)]
pub struct CountState {
    count: i64,
}

impl CountState {
    pub fn new() -> Self {
        CountState::default()
    }

    pub fn add(&mut self, v: &Value) -> Result<()> {
        if !v.is_null() {
            self.count += 1;
        }
        Ok(())
    }

    pub fn remove(&mut self, v: &Value) -> Result<()> {
        if !v.is_null() {
            self.count -= 1;
            if self.count < 0 {
                return Err(Error::internal(
                    "sliding count removed more values than it added",
                ));
            }
        }
        Ok(())
    }

    pub fn value(&self) -> Result<Value> {
        Ok(Value::Integer(self.count))
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

/// Running AVG: a SUM and a COUNT folded together at `value()` time, never
/// tracked as an independent accumulator
#[derive(Debug, Clone)]
pub struct AvgState {
    sum: SumState,
}

impl AvgState {
    pub fn new(precision: PrecisionMode) -> Self {
        AvgState {
            sum: SumState::new(precision),
        }
    }

    pub fn add(&mut self, v: &Value) -> Result<()> {
        self.sum.add(v)
    }

    pub fn remove(&mut self, v: &Value) -> Result<()> {
        self.sum.remove(v)
    }

    pub fn value(&self) -> Result<Value> {
        let count = self.sum.count();
        if count == 0 {
            return Ok(Value::null_unknown());
        }
        if let Some(dec) = self.sum.decimal_sum() {
            let avg = dec
                .checked_div(Decimal::from(count))
                .ok_or_else(|| Error::ArithmeticOverflow("avg".to_string()))?;
            return Ok(Value::Decimal(avg));
        }
        match self.sum.float_sum()? {
            Some(sum) => Ok(Value::Float(sum / count as f64)),
            None => Ok(Value::null_unknown()),
        }
    }

    pub fn reset(&mut self) {
        self.sum.reset();
    }
}

/// Bitwise fold operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
    Xor,
    And,
    Or,
}

/// Running BIT_XOR / BIT_AND / BIT_OR accumulator
///
/// XOR is its own inverse. AND and OR are not, so they track a population
/// count per bit: AND's bit is set while every frame value has it, OR's
/// while any does. Empty-frame identities: XOR 0, OR 0, AND all-ones.
#[derive(Debug, Clone)]
pub struct BitState {
    op: BitOp,
    xor: u64,
    ones: [u32; 64],
    count: u64,
}

impl BitState {
    pub fn new(op: BitOp) -> Self {
        BitState {
            op,
            xor: 0,
            ones: [0; 64],
            count: 0,
        }
    }

    fn bits_of(v: &Value) -> Result<u64> {
        v.as_int64()
            .map(|n| n as u64)
            .ok_or_else(|| Error::type_conversion(v.data_type().to_string(), "INTEGER"))
    }

    pub fn add(&mut self, v: &Value) -> Result<()> {
        if v.is_null() {
            return Ok(());
        }
        let bits = Self::bits_of(v)?;
        self.count += 1;
        match self.op {
            BitOp::Xor => self.xor ^= bits,
            BitOp::And | BitOp::Or => {
                for (i, slot) in self.ones.iter_mut().enumerate() {
                    *slot += ((bits >> i) & 1) as u32;
                }
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, v: &Value) -> Result<()> {
        if v.is_null() {
            return Ok(());
        }
        let bits = Self::bits_of(v)?;
        self.count = self
            .count
            .checked_sub(1)
            .ok_or_else(|| Error::internal("sliding bit aggregate underflow"))?;
        match self.op {
            BitOp::Xor => self.xor ^= bits,
            BitOp::And | BitOp::Or => {
                for (i, slot) in self.ones.iter_mut().enumerate() {
                    *slot = slot.checked_sub(((bits >> i) & 1) as u32).ok_or_else(|| {
                        Error::internal("sliding bit aggregate underflow")
                    })?;
                }
            }
        }
        Ok(())
    }

    pub fn value(&self) -> Result<Value> {
        let bits = match self.op {
            BitOp::Xor => self.xor,
            BitOp::And => {
                if self.count == 0 {
                    u64::MAX
                } else {
                    let mut acc = 0u64;
                    for (i, slot) in self.ones.iter().enumerate() {
                        if *slot as u64 == self.count {
                            acc |= 1 << i;
                        }
                    }
                    acc
                }
            }
            BitOp::Or => {
                let mut acc = 0u64;
                for (i, slot) in self.ones.iter().enumerate() {
                    if *slot > 0 {
                        acc |= 1 << i;
                    }
                }
                acc
            }
        };
        Ok(Value::Integer(bits as i64))
    }

    /// Value of this operator over an empty frame
    pub fn identity(&self) -> Value {
        match self.op {
            BitOp::Xor | BitOp::Or => Value::Integer(0),
            BitOp::And => Value::Integer(u64::MAX as i64),
        }
    }

    pub fn reset(&mut self) {
        self.xor = 0;
        self.ones = [0; 64];
        self.count = 0;
    }
}
