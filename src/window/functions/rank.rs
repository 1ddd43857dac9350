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

//! Rank-family functions: ROW_NUMBER, RANK, DENSE_RANK, PERCENT_RANK, CUME_DIST
//!
//! All five are computed in one forward pass over the partition's peer
//! groups. They ignore the frame clause entirely.

use crate::core::{Result, Value};

use super::super::frame::PartitionOrder;
use super::super::spec::WindowFuncKind;

/// Evaluate a rank-family function for every row of the partition
///
/// Without an ORDER BY every row is a peer of every other: RANK and
/// DENSE_RANK are 1, PERCENT_RANK is 0 and CUME_DIST is 1 for all rows.
/// ROW_NUMBER still numbers rows by partition position.
pub fn eval_rank(kind: WindowFuncKind, ord: &PartitionOrder) -> Result<Vec<Value>> {
    let n = ord.len();
    let mut out = Vec::with_capacity(n);
    let mut rank = 0i64;
    let mut dense = 0i64;

    let mut i = 0;
    while i < n {
        let peers = ord.peers(i);
        rank = i as i64 + 1;
        dense += 1;
        for pos in peers.clone() {
            let v = match kind {
                WindowFuncKind::RowNumber => Value::Integer(pos as i64 + 1),
                WindowFuncKind::Rank => Value::Integer(rank),
                WindowFuncKind::DenseRank => Value::Integer(dense),
                WindowFuncKind::PercentRank => {
                    if n <= 1 {
                        Value::Float(0.0)
                    } else {
                        Value::Float((rank - 1) as f64 / (n - 1) as f64)
                    }
                }
                WindowFuncKind::CumeDist => Value::Float(peers.end as f64 / n as f64),
                other => {
                    return Err(crate::core::Error::internal(format!(
                        "{} is not a rank-family function",
                        other.name()
                    )))
                }
            };
            out.push(v);
        }
        i = peers.end;
    }
    Ok(out)
}
