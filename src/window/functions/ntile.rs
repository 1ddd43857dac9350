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

//! NTILE(n): split the partition into n buckets as evenly as possible
//!
//! With len = q*n + r, the first r buckets hold q+1 rows and the rest hold
//! q. A NULL bucket count yields NULL for the whole partition.

use crate::core::{Error, Result, Value};

pub fn eval_ntile(n: &Value, partition_len: usize) -> Result<Vec<Value>> {
    if n.is_null() {
        return Ok(vec![Value::null_unknown(); partition_len]);
    }
    let n = match n.as_int64() {
        Some(n) if n > 0 => n as usize,
        _ => {
            return Err(Error::invalid_argument(format!(
                "NTILE bucket count must be a positive integer, got {}",
                n
            )))
        }
    };

    let mut out = Vec::with_capacity(partition_len);
    let q = partition_len / n;
    let r = partition_len % n;
    for bucket in 0..n {
        let size = if bucket < r { q + 1 } else { q };
        for _ in 0..size {
            out.push(Value::Integer(bucket as i64 + 1));
        }
        if out.len() >= partition_len {
            break;
        }
    }
    // more buckets than rows: each row got its own bucket above
    debug_assert_eq!(out.len(), partition_len);
    Ok(out)
}
