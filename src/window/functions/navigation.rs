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

//! Navigation functions: LEAD, LAG, FIRST_VALUE, LAST_VALUE, NTH_VALUE
//!
//! LEAD and LAG address the whole partition by row offset and never consult
//! the frame. FIRST_VALUE, LAST_VALUE and NTH_VALUE read from the row's
//! resolved frame and return NULL when it is empty or too short.

use std::ops::Range;

use crate::core::{Error, Result, Row, Value};

use super::super::spec::ArgSource;

/// Resolve an offset argument for LEAD / LAG / NTH_VALUE
///
/// A NULL offset is legal for NTH_VALUE (the result is NULL); callers decide
/// by inspecting the `Option`. Negative offsets were rejected at validation
/// for constants, but a parameter can still smuggle one in.
fn eval_offset(arg: &ArgSource, row: &Row) -> Result<Option<i64>> {
    let v = arg.eval(row)?;
    if v.is_null() {
        return Ok(None);
    }
    match v.as_int64() {
        Some(n) if n >= 0 => Ok(Some(n)),
        _ => Err(Error::invalid_argument(format!(
            "offset must be a non-negative integer, got {}",
            v
        ))),
    }
}

/// LEAD(expr [, offset [, default]]) over the partition rows
///
/// `offset` defaults to 1 and an offset of 0 yields the current row's own
/// value. Past the partition edge the per-row `default` applies, NULL when
/// absent.
pub fn eval_lead(args: &[ArgSource], rows: &[Row], i: usize) -> Result<Value> {
    eval_shift(args, rows, i, 1)
}

/// LAG(expr [, offset [, default]]) over the partition rows
pub fn eval_lag(args: &[ArgSource], rows: &[Row], i: usize) -> Result<Value> {
    eval_shift(args, rows, i, -1)
}

fn eval_shift(args: &[ArgSource], rows: &[Row], i: usize, sign: i64) -> Result<Value> {
    let offset = match args.get(1) {
        Some(arg) => match eval_offset(arg, &rows[i])? {
            Some(n) => n,
            None => return default_of(args, rows, i),
        },
        None => 1,
    };
    let target = i as i64 + sign * offset;
    if target < 0 || target >= rows.len() as i64 {
        return default_of(args, rows, i);
    }
    args[0].eval(&rows[target as usize])
}

fn default_of(args: &[ArgSource], rows: &[Row], i: usize) -> Result<Value> {
    match args.get(2) {
        Some(arg) => arg.eval(&rows[i]),
        None => Ok(Value::null_unknown()),
    }
}

/// FIRST_VALUE(expr) from the row's resolved frame
pub fn eval_first_value(args: &[ArgSource], rows: &[Row], frame: Range<usize>) -> Result<Value> {
    match frame.clone().next() {
        Some(idx) => args[0].eval(&rows[idx]),
        None => Ok(Value::null_unknown()),
    }
}

/// LAST_VALUE(expr) from the row's resolved frame
pub fn eval_last_value(args: &[ArgSource], rows: &[Row], frame: Range<usize>) -> Result<Value> {
    match frame.clone().next_back() {
        Some(idx) => args[0].eval(&rows[idx]),
        None => Ok(Value::null_unknown()),
    }
}

/// NTH_VALUE(expr, n) from the row's resolved frame, 1-based
///
/// NULL n yields NULL. A frame shorter than n yields NULL.
pub fn eval_nth_value(
    args: &[ArgSource],
    rows: &[Row],
    i: usize,
    frame: Range<usize>,
) -> Result<Value> {
    let n = match eval_offset(&args[1], &rows[i])? {
        Some(n) => n,
        None => return Ok(Value::null_unknown()),
    };
    if n == 0 {
        return Err(Error::invalid_argument(
            "NTH_VALUE position must be at least 1",
        ));
    }
    match frame.clone().nth(n as usize - 1) {
        Some(idx) => args[0].eval(&rows[idx]),
        None => Ok(Value::null_unknown()),
    }
}
