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

//! Frame bound resolution
//!
//! [`FrameModel`] turns a frame clause plus resolved parameters into a pure
//! `row index -> [lo, hi)` mapping over one ordered partition. ROWS frames
//! are literal offsets; RANGE frames compare order-key distances, with the
//! comparison direction flipped under DESC ordering and calendar-interval
//! arithmetic for temporal keys.
//!
//! NULL order keys: a row whose order key is NULL gets the singleton frame
//! `[i, i+1)` whenever an offset bound is involved, and NULL rows are never
//! members of a non-NULL row's offset-bound scan. UNBOUNDED and CURRENT ROW
//! bounds use plain positions and peer groups, where the NULL block is one
//! peer group like any other.

use std::cmp::Ordering;
use std::ops::Range;

use crate::core::{Error, Result, Row, Value};

use super::spec::{
    FrameBound, FrameSpec, FrameUnit, NullOrder, OrderKey, ResolvedOffset, SortDirection,
};

/// Precomputed ordering facts about one partition
///
/// Built once per partition and shared by every function over it: peer-group
/// bounds for the rank family and RANGE CURRENT ROW, and the single
/// order-key column (with its non-NULL extent) for RANGE offset bounds.
#[derive(Debug)]
pub struct PartitionOrder {
    len: usize,
    /// Peer-group start index per row (inclusive)
    pub peer_start: Vec<usize>,
    /// Peer-group end index per row (exclusive)
    pub peer_end: Vec<usize>,
    /// The RANGE distance axis, present when there is exactly one order key
    range_key: Option<RangeKey>,
}

#[derive(Debug)]
struct RangeKey {
    values: Vec<Value>,
    direction: SortDirection,
    /// Contiguous run of non-NULL keys
    non_null: Range<usize>,
}

impl PartitionOrder {
    /// Compute ordering facts for a partition's rows
    pub fn build(rows: &[Row], order_by: &[OrderKey]) -> Result<Self> {
        let len = rows.len();
        let mut peer_start = vec![0usize; len];
        let mut peer_end = vec![len; len];

        if !order_by.is_empty() {
            let mut group_begin = 0;
            for i in 1..=len {
                let boundary = i == len || !peers(rows, order_by, i - 1, i)?;
                if boundary {
                    for slot in group_begin..i {
                        peer_start[slot] = group_begin;
                        peer_end[slot] = i;
                    }
                    group_begin = i;
                }
            }
        }

        let range_key = if order_by.len() == 1 {
            let key = order_by[0];
            let values: Vec<Value> = rows
                .iter()
                .map(|row| {
                    row.get(key.column)
                        .cloned()
                        .ok_or(Error::ColumnIndexOutOfBounds { index: key.column })
                })
                .collect::<Result<_>>()?;
            // Upstream ordering puts all NULL keys in one contiguous block at
            // whichever end NullOrder dictates.
            let null_count = values.iter().filter(|v| v.is_null()).count();
            let non_null = match key.null_order {
                NullOrder::NullsFirst => null_count..len,
                NullOrder::NullsLast => 0..len - null_count,
            };
            Some(RangeKey {
                values,
                direction: key.direction,
                non_null,
            })
        } else {
            None
        };

        Ok(PartitionOrder {
            len,
            peer_start,
            peer_end,
            range_key,
        })
    }

    /// Number of rows in the partition
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the partition is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Peer-group range of a row
    pub fn peers(&self, i: usize) -> Range<usize> {
        self.peer_start[i]..self.peer_end[i]
    }

    fn key(&self) -> Result<&RangeKey> {
        self.range_key
            .as_ref()
            .ok_or_else(|| Error::internal("RANGE frame without a bound order key"))
    }
}

/// Whether rows `a` and `b` are tied on every order-key column
fn peers(rows: &[Row], order_by: &[OrderKey], a: usize, b: usize) -> Result<bool> {
    for key in order_by {
        let va = rows[a]
            .get(key.column)
            .ok_or(Error::ColumnIndexOutOfBounds { index: key.column })?;
        let vb = rows[b]
            .get(key.column)
            .ok_or(Error::ColumnIndexOutOfBounds { index: key.column })?;
        if !va.sort_eq(vb) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// A frame bound with its offset resolved for this execution
#[derive(Debug, Clone, PartialEq)]
enum ResolvedBound {
    UnboundedPreceding,
    Preceding(ResolvedOffset),
    CurrentRow,
    Following(ResolvedOffset),
    UnboundedFollowing,
}

impl ResolvedBound {
    fn has_offset(&self) -> bool {
        matches!(
            self,
            ResolvedBound::Preceding(_) | ResolvedBound::Following(_)
        )
    }
}

/// Resolved, validated frame for one execution of a window spec
///
/// Pure: holds no per-partition state. `resolve` maps a row index to its
/// half-open frame range within the partition, given the partition's
/// [`PartitionOrder`].
#[derive(Debug)]
pub struct FrameModel {
    unit: FrameUnit,
    start: ResolvedBound,
    end: ResolvedBound,
}

impl FrameModel {
    /// Bind a frame clause, resolving parameter offsets once per execution
    ///
    /// With no explicit clause the default applies: `RANGE UNBOUNDED
    /// PRECEDING AND CURRENT ROW` when the window has an order key, the whole
    /// partition otherwise.
    pub fn bind(
        frame: Option<&FrameSpec>,
        order_by: &[OrderKey],
        params: &[Value],
    ) -> Result<FrameModel> {
        let spec = match frame {
            Some(spec) => spec.clone(),
            None => {
                if order_by.is_empty() {
                    FrameSpec::rows(FrameBound::UnboundedPreceding, FrameBound::UnboundedFollowing)
                } else {
                    FrameSpec::range(FrameBound::UnboundedPreceding, FrameBound::CurrentRow)
                }
            }
        };
        spec.validate(order_by)?;

        let resolve_bound = |bound: &FrameBound| -> Result<ResolvedBound> {
            Ok(match bound {
                FrameBound::UnboundedPreceding => ResolvedBound::UnboundedPreceding,
                FrameBound::CurrentRow => ResolvedBound::CurrentRow,
                FrameBound::UnboundedFollowing => ResolvedBound::UnboundedFollowing,
                FrameBound::Preceding(off) => {
                    ResolvedBound::Preceding(check_offset(off.resolve(params)?, spec.unit)?)
                }
                FrameBound::Following(off) => {
                    ResolvedBound::Following(check_offset(off.resolve(params)?, spec.unit)?)
                }
            })
        };

        Ok(FrameModel {
            unit: spec.unit,
            start: resolve_bound(&spec.start)?,
            end: resolve_bound(&spec.end)?,
        })
    }

    /// How many rows past row `i` must be buffered before `i`'s frame end is
    /// known, or `None` when only partition close determines it
    ///
    /// This is the streaming-readiness contract: a row is emittable once
    /// `i + 1 + lookahead` rows of its partition have been buffered.
    pub fn stream_lookahead(&self) -> Option<usize> {
        if self.unit != FrameUnit::Rows {
            // RANGE ends depend on order-key values not yet seen
            return None;
        }
        match &self.end {
            ResolvedBound::UnboundedFollowing => None,
            ResolvedBound::CurrentRow => Some(0),
            ResolvedBound::Preceding(_) => Some(0),
            ResolvedBound::Following(off) => match off {
                ResolvedOffset::Numeric(v) => v.as_int64().map(|n| n as usize),
                ResolvedOffset::Interval(_) => None,
            },
            ResolvedBound::UnboundedPreceding => None, // rejected by validate
        }
    }

    /// Resolve row `i`'s frame within its partition
    ///
    /// An empty frame comes back as a zero-length range, never an error;
    /// `start > end` collapses to empty per the frame contract.
    pub fn resolve(&self, ord: &PartitionOrder, i: usize) -> Result<Range<usize>> {
        let len = ord.len();
        debug_assert!(i < len);

        let (lo, hi) = match self.unit {
            FrameUnit::Rows => (self.rows_lo(i, len)?, self.rows_hi(i, len)?),
            FrameUnit::Range => {
                let offset_bound = self.start.has_offset() || self.end.has_offset();
                if offset_bound {
                    let key = ord.key()?;
                    if key.values[i].is_null() {
                        // NULL order key: singleton frame
                        return Ok(i..i + 1);
                    }
                }
                (self.range_lo(ord, i)?, self.range_hi(ord, i)?)
            }
        };

        if hi <= lo {
            Ok(lo..lo)
        } else {
            Ok(lo..hi)
        }
    }

    /// Resolve row `i`'s frame against a partition prefix of `len` rows
    ///
    /// Valid only for ROWS frames, and only once `i + 1 + stream_lookahead()`
    /// rows are buffered (or the partition has closed at `len`); any bound
    /// clamp then lands at the same place full resolution would.
    pub fn resolve_prefix(&self, len: usize, i: usize) -> Result<Range<usize>> {
        debug_assert_eq!(self.unit, FrameUnit::Rows);
        debug_assert!(i < len);
        let lo = self.rows_lo(i, len)?;
        let hi = self.rows_hi(i, len)?;
        if hi <= lo {
            Ok(lo..lo)
        } else {
            Ok(lo..hi)
        }
    }

    fn rows_lo(&self, i: usize, len: usize) -> Result<usize> {
        Ok(match &self.start {
            ResolvedBound::UnboundedPreceding => 0,
            ResolvedBound::CurrentRow => i,
            ResolvedBound::Preceding(off) => i.saturating_sub(rows_offset(off)?),
            ResolvedBound::Following(off) => (i + rows_offset(off)?).min(len),
            ResolvedBound::UnboundedFollowing => len,
        })
    }

    fn rows_hi(&self, i: usize, len: usize) -> Result<usize> {
        Ok(match &self.end {
            ResolvedBound::UnboundedFollowing => len,
            ResolvedBound::CurrentRow => i + 1,
            ResolvedBound::Following(off) => (i + rows_offset(off)? + 1).min(len),
            ResolvedBound::Preceding(off) => {
                let n = rows_offset(off)?;
                if i >= n {
                    i - n + 1
                } else {
                    0
                }
            }
            ResolvedBound::UnboundedPreceding => 0,
        })
    }

    fn range_lo(&self, ord: &PartitionOrder, i: usize) -> Result<usize> {
        match &self.start {
            ResolvedBound::UnboundedPreceding => Ok(0),
            ResolvedBound::CurrentRow => Ok(ord.peer_start[i]),
            ResolvedBound::UnboundedFollowing => Ok(ord.len()),
            ResolvedBound::Preceding(off) => range_search(ord.key()?, i, off, Edge::Lo, -1),
            ResolvedBound::Following(off) => range_search(ord.key()?, i, off, Edge::Lo, 1),
        }
    }

    fn range_hi(&self, ord: &PartitionOrder, i: usize) -> Result<usize> {
        match &self.end {
            ResolvedBound::UnboundedFollowing => Ok(ord.len()),
            ResolvedBound::CurrentRow => Ok(ord.peer_end[i]),
            ResolvedBound::UnboundedPreceding => Ok(0),
            ResolvedBound::Following(off) => range_search(ord.key()?, i, off, Edge::Hi, 1),
            ResolvedBound::Preceding(off) => range_search(ord.key()?, i, off, Edge::Hi, -1),
        }
    }
}

fn check_offset(off: ResolvedOffset, unit: FrameUnit) -> Result<ResolvedOffset> {
    match &off {
        ResolvedOffset::Numeric(v) => {
            let negative = match v {
                Value::Integer(n) => *n < 0,
                Value::Float(f) => *f < 0.0,
                Value::Decimal(d) => d.is_sign_negative() && !d.is_zero(),
                _ => true,
            };
            if negative {
                return Err(Error::invalid_frame_bound(format!(
                    "offset resolved to negative value {}",
                    v
                )));
            }
            // as_int64 truncates, so fractional offsets need an explicit check
            let integral = match v {
                Value::Integer(_) => true,
                Value::Float(f) => f.fract() == 0.0,
                Value::Decimal(d) => d.fract().is_zero(),
                _ => false,
            };
            if unit == FrameUnit::Rows && !integral {
                return Err(Error::invalid_frame_bound(format!(
                    "ROWS offset must be an integer, got {}",
                    v
                )));
            }
        }
        ResolvedOffset::Interval(_) => {
            if unit == FrameUnit::Rows {
                return Err(Error::invalid_frame_bound(
                    "ROWS offset cannot be an interval",
                ));
            }
        }
    }
    Ok(off)
}

fn rows_offset(off: &ResolvedOffset) -> Result<usize> {
    match off {
        ResolvedOffset::Numeric(v) => v
            .as_int64()
            .filter(|n| *n >= 0)
            .map(|n| n as usize)
            .ok_or_else(|| Error::invalid_frame_bound(format!("bad ROWS offset {}", v))),
        ResolvedOffset::Interval(_) => {
            Err(Error::invalid_frame_bound("ROWS offset cannot be an interval"))
        }
    }
}

enum Edge {
    Lo,
    Hi,
}

/// Direction-aware comparison: keys are non-decreasing under `cmp_dir`
fn cmp_dir(a: &Value, b: &Value, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => a.compare_sort(b),
        SortDirection::Desc => b.compare_sort(a),
    }
}

/// Find one edge of a RANGE offset bound by binary search over the non-NULL
/// segment of the order key
///
/// `sign` is -1 for PRECEDING and +1 for FOLLOWING in *logical* order; the
/// arithmetic direction flips under DESC so that "preceding" always means
/// "earlier in partition order".
fn range_search(
    key: &RangeKey,
    i: usize,
    off: &ResolvedOffset,
    edge: Edge,
    sign: i32,
) -> Result<usize> {
    let current = &key.values[i];
    debug_assert!(!current.is_null());

    let arith_sign = match key.direction {
        SortDirection::Asc => sign,
        SortDirection::Desc => -sign,
    };
    let target = match off {
        ResolvedOffset::Numeric(n) => {
            if arith_sign >= 0 {
                current.add_numeric(n)?
            } else {
                current.sub_numeric(n)?
            }
        }
        ResolvedOffset::Interval(iv) => {
            let ts = current.as_timestamp().ok_or_else(|| {
                Error::invalid_frame_bound(format!(
                    "interval offset requires a temporal order key, got {}",
                    current.data_type()
                ))
            })?;
            Value::Timestamp(iv.apply_to(ts, arith_sign)?)
        }
    };

    let seg = &key.values[key.non_null.clone()];
    let base = key.non_null.start;
    let pos = match edge {
        // first index with key >= target (in direction order)
        Edge::Lo => partition_point(seg, |v| cmp_dir(v, &target, key.direction) == Ordering::Less),
        // one past the last index with key <= target
        Edge::Hi => partition_point(seg, |v| cmp_dir(v, &target, key.direction) != Ordering::Greater),
    };
    Ok(base + pos)
}

fn partition_point(values: &[Value], pred: impl Fn(&Value) -> bool) -> usize {
    let mut lo = 0;
    let mut hi = values.len();
    while lo < hi {
        let mid = (lo + hi) / 2;
        if pred(&values[mid]) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}
