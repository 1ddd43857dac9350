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

//! MIN / MAX over a sliding frame via a monotonic deque
//!
//! Entries carry their partition row index. Appending a value pops every
//! dominated tail entry; advancing the frame start pops head entries that
//! fell out of range. Both ends amortize to O(1) per row.

use std::cmp::Ordering;
use std::collections::VecDeque;

use crate::core::{Result, Value};

/// Which extreme the deque tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Min,
    Max,
}

#[derive(Debug, Clone)]
pub struct MinMaxDeque {
    extreme: Extreme,
    entries: VecDeque<(usize, Value)>,
}

impl MinMaxDeque {
    pub fn new(extreme: Extreme) -> Self {
        MinMaxDeque {
            extreme,
            entries: VecDeque::new(),
        }
    }

    /// True when `candidate` makes `held` redundant as a frame extreme
    fn dominates(&self, candidate: &Value, held: &Value) -> bool {
        let ord = candidate.compare_sort(held);
        match self.extreme {
            // a later >= value will always win over an earlier one
            Extreme::Max => ord != Ordering::Less,
            Extreme::Min => ord != Ordering::Greater,
        }
    }

    /// Append the value at partition index `idx` entering the frame
    pub fn push(&mut self, idx: usize, v: &Value) -> Result<()> {
        if v.is_null() {
            return Ok(());
        }
        while let Some((_, back)) = self.entries.back() {
            if self.dominates(v, back) {
                self.entries.pop_back();
            } else {
                break;
            }
        }
        self.entries.push_back((idx, v.clone()));
        Ok(())
    }

    /// Drop head entries whose index precedes the new frame start `lo`
    pub fn advance_start(&mut self, lo: usize) {
        while let Some((idx, _)) = self.entries.front() {
            if *idx < lo {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Current extreme, NULL when no non-NULL value is in range
    pub fn value(&self) -> Result<Value> {
        Ok(match self.entries.front() {
            Some((_, v)) => v.clone(),
            None => Value::null_unknown(),
        })
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_pops_dominated_tail() {
        let mut dq = MinMaxDeque::new(Extreme::Max);
        for (i, v) in [3, 1, 4, 1, 5].into_iter().enumerate() {
            dq.push(i, &Value::Integer(v)).unwrap();
        }
        assert_eq!(dq.value().unwrap(), Value::Integer(5));
        // only the running maxima survive
        assert_eq!(dq.entries.len(), 1);
    }

    #[test]
    fn test_min_tracks_frame_start() {
        let mut dq = MinMaxDeque::new(Extreme::Min);
        for (i, v) in [2, 5, 3, 7].into_iter().enumerate() {
            dq.push(i, &Value::Integer(v)).unwrap();
        }
        assert_eq!(dq.value().unwrap(), Value::Integer(2));
        dq.advance_start(1);
        assert_eq!(dq.value().unwrap(), Value::Integer(3));
        dq.advance_start(3);
        assert_eq!(dq.value().unwrap(), Value::Integer(7));
    }

    #[test]
    fn test_ties_keep_latest_entry() {
        // equal values dominate so the newer index stays, letting the frame
        // start move past the old one without losing the extreme
        let mut dq = MinMaxDeque::new(Extreme::Max);
        dq.push(0, &Value::Integer(4)).unwrap();
        dq.push(1, &Value::Integer(4)).unwrap();
        dq.advance_start(1);
        assert_eq!(dq.value().unwrap(), Value::Integer(4));
    }

    #[test]
    fn test_nulls_skipped_and_empty_is_null() {
        let mut dq = MinMaxDeque::new(Extreme::Min);
        dq.push(0, &Value::null_unknown()).unwrap();
        assert_eq!(dq.value().unwrap(), Value::null_unknown());
        dq.push(1, &Value::Integer(9)).unwrap();
        dq.advance_start(2);
        assert_eq!(dq.value().unwrap(), Value::null_unknown());
    }
}
