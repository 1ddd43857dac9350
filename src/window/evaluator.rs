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

//! Per-function evaluation over one partition
//!
//! A [`FunctionEval`] binds one window function to its frame model and walks
//! the partition's rows, either incrementally while the partition is still
//! open (ROWS frames with a bounded end) or wholesale at partition close.
//! The naive and sliding strategies produce identical columns; naive is the
//! rebuild-per-row oracle the sliding path is checked against.

use std::ops::Range;

use crate::core::{Result, Row, Value};

use super::frame::{FrameModel, PartitionOrder};
use super::functions::{
    eval_first_value, eval_lag, eval_last_value, eval_lead, eval_nth_value, eval_ntile, eval_rank,
    AvgState, BitOp, BitState, CountState, Extreme, MinMaxDeque, SumState,
};
use super::spec::{ArgSource, FuncFamily, WindowFuncDesc, WindowFuncKind};
use super::{EvaluatorStrategy, PrecisionMode};

/// Closed set of frame accumulators, selected at bind time
#[derive(Debug)]
enum FrameAgg {
    Sum(SumState),
    Count(CountState),
    Avg(AvgState),
    Bit(BitState),
    MinMax(MinMaxDeque),
}

impl FrameAgg {
    fn for_kind(kind: WindowFuncKind, precision: PrecisionMode) -> Option<FrameAgg> {
        Some(match kind {
            WindowFuncKind::Sum => FrameAgg::Sum(SumState::new(precision)),
            WindowFuncKind::Count => FrameAgg::Count(CountState::new()),
            WindowFuncKind::Avg => FrameAgg::Avg(AvgState::new(precision)),
            WindowFuncKind::BitXor => FrameAgg::Bit(BitState::new(BitOp::Xor)),
            WindowFuncKind::BitAnd => FrameAgg::Bit(BitState::new(BitOp::And)),
            WindowFuncKind::BitOr => FrameAgg::Bit(BitState::new(BitOp::Or)),
            WindowFuncKind::Min => FrameAgg::MinMax(MinMaxDeque::new(Extreme::Min)),
            WindowFuncKind::Max => FrameAgg::MinMax(MinMaxDeque::new(Extreme::Max)),
            _ => return None,
        })
    }

    fn add(&mut self, idx: usize, v: &Value) -> Result<()> {
        match self {
            FrameAgg::Sum(s) => s.add(v),
            FrameAgg::Count(s) => s.add(v),
            FrameAgg::Avg(s) => s.add(v),
            FrameAgg::Bit(s) => s.add(v),
            FrameAgg::MinMax(s) => s.push(idx, v),
        }
    }

    /// Remove a value leaving at the frame head; MinMax evicts positionally
    fn remove(&mut self, v: &Value) -> Result<()> {
        match self {
            FrameAgg::Sum(s) => s.remove(v),
            FrameAgg::Count(s) => s.remove(v),
            FrameAgg::Avg(s) => s.remove(v),
            FrameAgg::Bit(s) => s.remove(v),
            FrameAgg::MinMax(_) => Ok(()),
        }
    }

    fn value(&self) -> Result<Value> {
        match self {
            FrameAgg::Sum(s) => s.value(),
            FrameAgg::Count(s) => s.value(),
            FrameAgg::Avg(s) => s.value(),
            FrameAgg::Bit(s) => s.value(),
            FrameAgg::MinMax(s) => s.value(),
        }
    }

    /// Result over an empty frame, independent of accumulated state
    fn empty_value(&self) -> Value {
        match self {
            FrameAgg::Count(_) => Value::Integer(0),
            FrameAgg::Bit(s) => s.identity(),
            _ => Value::null_unknown(),
        }
    }

    fn reset(&mut self) {
        match self {
            FrameAgg::Sum(s) => s.reset(),
            FrameAgg::Count(s) => s.reset(),
            FrameAgg::Avg(s) => s.reset(),
            FrameAgg::Bit(s) => s.reset(),
            FrameAgg::MinMax(s) => s.reset(),
        }
    }
}

/// Aggregator cursor over one partition's frames
///
/// Frame bounds normally advance monotonically in the row index: ROWS frames
/// by construction, RANGE frames because the order keys are sorted. The one
/// exception is a NULL-key singleton frame followed by a non-NULL row whose
/// frame starts earlier; a backward start rebuilds the accumulator. Empty
/// frames answer the empty identity without disturbing the accumulated
/// window.
#[derive(Debug)]
struct AggWindow {
    agg: FrameAgg,
    strategy: EvaluatorStrategy,
    lo: usize,
    hi: usize,
}

impl AggWindow {
    fn new(agg: FrameAgg, strategy: EvaluatorStrategy) -> Self {
        AggWindow {
            agg,
            strategy,
            lo: 0,
            hi: 0,
        }
    }

    fn eval_at(&mut self, frame: Range<usize>, rows: &[Row], arg: &ArgSource) -> Result<Value> {
        if frame.start >= frame.end {
            return Ok(self.agg.empty_value());
        }
        match self.strategy {
            EvaluatorStrategy::Naive => {
                self.agg.reset();
                for j in frame {
                    let v = arg.eval(&rows[j])?;
                    self.agg.add(j, &v)?;
                }
            }
            EvaluatorStrategy::Sliding => {
                let (s, e) = (frame.start, frame.end);
                if s < self.lo {
                    // NULL-key singleton frames let a later frame start
                    // before the cursor; removed rows cannot be recovered,
                    // so rebuild from scratch
                    self.agg.reset();
                    self.lo = s;
                    self.hi = s;
                }
                match &mut self.agg {
                    FrameAgg::MinMax(dq) => dq.advance_start(s),
                    inv => {
                        for j in self.lo..s.min(self.hi) {
                            let v = arg.eval(&rows[j])?;
                            inv.remove(&v)?;
                        }
                    }
                }
                self.lo = s;
                if self.hi < s {
                    self.hi = s;
                }
                for j in self.hi..e {
                    let v = arg.eval(&rows[j])?;
                    self.agg.add(j, &v)?;
                }
                if e > self.hi {
                    self.hi = e;
                }
            }
        }
        self.agg.value()
    }
}

/// One window function bound for execution over successive partitions
///
/// `reset` returns it to the Idle state for the next partition; `eval_prefix`
/// accumulates while the partition is open; `finish` drains the remaining
/// rows once the partition has closed.
pub struct FunctionEval {
    desc: WindowFuncDesc,
    model: FrameModel,
    window: Option<AggWindow>,
    next_row: usize,
}

impl FunctionEval {
    pub fn bind(
        desc: WindowFuncDesc,
        order_by: &[super::spec::OrderKey],
        params: &[Value],
        strategy: EvaluatorStrategy,
        precision: PrecisionMode,
    ) -> Result<FunctionEval> {
        desc.validate()?;
        let frame = if desc.kind.ignores_frame() {
            None
        } else {
            desc.frame.as_ref()
        };
        let model = FrameModel::bind(frame, order_by, params)?;
        let window = FrameAgg::for_kind(desc.kind, precision)
            .map(|agg| AggWindow::new(agg, strategy));
        Ok(FunctionEval {
            desc,
            model,
            window,
            next_row: 0,
        })
    }

    pub fn kind(&self) -> WindowFuncKind {
        self.desc.kind
    }

    /// Rows that must be buffered beyond a row before its result is final,
    /// `None` when only partition close makes it final
    pub fn stream_lookahead(&self) -> Option<usize> {
        match self.desc.kind.family() {
            FuncFamily::AggregateInvertible | FuncFamily::AggregateExtremal => self.model.stream_lookahead(),
            FuncFamily::NavigationFamily => match self.desc.kind {
                WindowFuncKind::Lead | WindowFuncKind::Lag => None,
                _ => self.model.stream_lookahead(),
            },
            FuncFamily::RankFamily | FuncFamily::DistributionFamily => None,
        }
    }

    /// Evaluate rows `[next_row, upto)` against the open partition prefix
    ///
    /// Callers must respect `stream_lookahead`: every evaluated row needs its
    /// full frame inside `rows`. Only ROWS-framed functions stream, so the
    /// prefix resolver applies.
    pub fn eval_prefix(&mut self, rows: &[Row], upto: usize) -> Result<Vec<Value>> {
        debug_assert!(self.stream_lookahead().is_some());
        let mut out = Vec::with_capacity(upto.saturating_sub(self.next_row));
        for i in self.next_row..upto {
            let frame = self.model.resolve_prefix(rows.len(), i)?;
            let v = match self.desc.kind.family() {
                FuncFamily::AggregateInvertible | FuncFamily::AggregateExtremal => {
                    let window = self.window.as_mut().ok_or_else(|| {
                        crate::core::Error::internal("aggregate without a window")
                    })?;
                    window.eval_at(frame, rows, &self.desc.args[0])?
                }
                FuncFamily::NavigationFamily => match self.desc.kind {
                    WindowFuncKind::FirstValue => eval_first_value(&self.desc.args, rows, frame)?,
                    WindowFuncKind::LastValue => eval_last_value(&self.desc.args, rows, frame)?,
                    WindowFuncKind::NthValue => eval_nth_value(&self.desc.args, rows, i, frame)?,
                    _ => unreachable!("LEAD/LAG never stream"),
                },
                _ => unreachable!("rank and distribution families never stream"),
            };
            out.push(v);
        }
        self.next_row = upto;
        Ok(out)
    }

    /// Evaluate every remaining row of the closed partition
    pub fn finish(&mut self, rows: &[Row], ord: &PartitionOrder) -> Result<Vec<Value>> {
        let len = rows.len();
        let from = self.next_row;
        let mut out = Vec::with_capacity(len - from);
        match self.desc.kind.family() {
            FuncFamily::AggregateInvertible | FuncFamily::AggregateExtremal => {
                let window = self
                    .window
                    .as_mut()
                    .ok_or_else(|| crate::core::Error::internal("aggregate without a window"))?;
                for i in from..len {
                    let frame = self.model.resolve(ord, i)?;
                    out.push(window.eval_at(frame, rows, &self.desc.args[0])?);
                }
            }
            FuncFamily::RankFamily => {
                debug_assert_eq!(from, 0);
                out = eval_rank(self.desc.kind, ord)?;
            }
            FuncFamily::DistributionFamily => {
                debug_assert_eq!(from, 0);
                let n = match self.desc.args[0].as_const() {
                    Some(v) => v.clone(),
                    None => self.desc.args[0].eval(&rows[0])?,
                };
                out = eval_ntile(&n, len)?;
            }
            FuncFamily::NavigationFamily => {
                for i in from..len {
                    let v = match self.desc.kind {
                        WindowFuncKind::Lead => eval_lead(&self.desc.args, rows, i)?,
                        WindowFuncKind::Lag => eval_lag(&self.desc.args, rows, i)?,
                        WindowFuncKind::FirstValue => {
                            eval_first_value(&self.desc.args, rows, self.model.resolve(ord, i)?)?
                        }
                        WindowFuncKind::LastValue => {
                            eval_last_value(&self.desc.args, rows, self.model.resolve(ord, i)?)?
                        }
                        WindowFuncKind::NthValue => {
                            eval_nth_value(&self.desc.args, rows, i, self.model.resolve(ord, i)?)?
                        }
                        _ => unreachable!(),
                    };
                    out.push(v);
                }
            }
        }
        self.next_row = len;
        Ok(out)
    }

    /// Return to the Idle state for the next partition
    pub fn reset(&mut self) {
        self.next_row = 0;
        if let Some(w) = &mut self.window {
            w.agg.reset();
            w.lo = 0;
            w.hi = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::spec::{
        FrameBound, FrameSpec, NullOrder, OffsetSource, OrderKey, SortDirection,
    };

    fn rows(vals: &[i64]) -> Vec<Row> {
        vals.iter()
            .map(|v| Row::from_values(vec![Value::Integer(*v)]))
            .collect()
    }

    fn int_offset(n: i64) -> OffsetSource {
        OffsetSource::Const(Value::Integer(n))
    }

    fn eval_whole(
        desc: WindowFuncDesc,
        order_by: &[OrderKey],
        rows: &[Row],
        strategy: EvaluatorStrategy,
    ) -> Vec<Value> {
        let mut f = FunctionEval::bind(
            desc,
            order_by,
            &[],
            strategy,
            PrecisionMode::HighPrecision,
        )
        .unwrap();
        let ord = PartitionOrder::build(rows, order_by).unwrap();
        f.finish(rows, &ord).unwrap()
    }

    #[test]
    fn test_running_sum_default_frame() {
        let rows = rows(&[1, 2, 2, 3]);
        let order = [OrderKey::asc(0)];
        let desc = WindowFuncDesc::new(WindowFuncKind::Sum, vec![ArgSource::Column(0)]);
        for strategy in [EvaluatorStrategy::Naive, EvaluatorStrategy::Sliding] {
            // peer rows share the running total
            assert_eq!(
                eval_whole(desc.clone(), &order, &rows, strategy),
                vec![
                    Value::Integer(1),
                    Value::Integer(5),
                    Value::Integer(5),
                    Value::Integer(8),
                ]
            );
        }
    }

    #[test]
    fn test_sliding_matches_naive_on_rows_frame() {
        let rows = rows(&[5, 1, 4, 2, 8, 3]);
        let order = [OrderKey::asc(0)];
        let frame = FrameSpec::rows(
            FrameBound::Preceding(int_offset(1)),
            FrameBound::Following(int_offset(1)),
        );
        for kind in [
            WindowFuncKind::Sum,
            WindowFuncKind::Count,
            WindowFuncKind::Avg,
            WindowFuncKind::Min,
            WindowFuncKind::Max,
            WindowFuncKind::BitXor,
            WindowFuncKind::BitAnd,
            WindowFuncKind::BitOr,
        ] {
            let desc = WindowFuncDesc::new(kind, vec![ArgSource::Column(0)])
                .with_frame(frame.clone());
            let naive = eval_whole(desc.clone(), &order, &rows, EvaluatorStrategy::Naive);
            let sliding = eval_whole(desc, &order, &rows, EvaluatorStrategy::Sliding);
            assert_eq!(naive, sliding, "{:?} diverged", kind);
        }
    }

    #[test]
    fn test_reversed_bounds_give_empty_frames() {
        let rows = rows(&[1, 2, 3]);
        let order = [OrderKey::asc(0)];
        let frame = FrameSpec::rows(
            FrameBound::Following(int_offset(3)),
            FrameBound::Following(int_offset(1)),
        );
        let count = WindowFuncDesc::new(WindowFuncKind::Count, vec![ArgSource::Column(0)])
            .with_frame(frame.clone());
        let sum = WindowFuncDesc::new(WindowFuncKind::Sum, vec![ArgSource::Column(0)])
            .with_frame(frame);
        for strategy in [EvaluatorStrategy::Naive, EvaluatorStrategy::Sliding] {
            assert_eq!(
                eval_whole(count.clone(), &order, &rows, strategy),
                vec![Value::Integer(0); 3]
            );
            assert_eq!(
                eval_whole(sum.clone(), &order, &rows, strategy),
                vec![Value::null_unknown(); 3]
            );
        }
    }

    #[test]
    fn test_streamed_prefix_then_finish() {
        let all = rows(&[1, 4, 2, 5, 3]);
        let order = [OrderKey::asc(0)];
        let frame = FrameSpec::rows(
            FrameBound::Preceding(int_offset(1)),
            FrameBound::Following(int_offset(1)),
        );
        let desc = WindowFuncDesc::new(WindowFuncKind::Sum, vec![ArgSource::Column(0)])
            .with_frame(frame);

        let mut f = FunctionEval::bind(
            desc.clone(),
            &order,
            &[],
            EvaluatorStrategy::Sliding,
            PrecisionMode::HighPrecision,
        )
        .unwrap();
        assert_eq!(f.stream_lookahead(), Some(1));

        // stream the first three rows while only four are buffered
        let mut got = f.eval_prefix(&all[..4], 3).unwrap();
        let ord = PartitionOrder::build(&all, &order).unwrap();
        got.extend(f.finish(&all, &ord).unwrap());

        let whole = eval_whole(desc, &order, &all, EvaluatorStrategy::Naive);
        assert_eq!(got, whole);
    }

    #[test]
    fn test_sliding_rebuilds_after_null_key_singletons() {
        // NULL order keys take singleton frames, so the first non-NULL row's
        // UNBOUNDED PRECEDING frame starts before the sliding cursor; the
        // values dropped for the singletons must be seen again
        let rows: Vec<Row> = [(None, 100), (None, 50), (Some(1), 1)]
            .iter()
            .map(|(k, v)| {
                Row::from_values(vec![
                    k.map(Value::Integer).unwrap_or_else(Value::null_unknown),
                    Value::Integer(*v),
                ])
            })
            .collect();
        let frame = FrameSpec::range(
            FrameBound::UnboundedPreceding,
            FrameBound::Following(int_offset(0)),
        );
        let orders = [
            OrderKey::asc(0),
            OrderKey {
                column: 0,
                direction: SortDirection::Desc,
                null_order: NullOrder::NullsFirst,
            },
        ];
        for order in orders {
            for kind in [WindowFuncKind::Sum, WindowFuncKind::Max] {
                let desc = WindowFuncDesc::new(kind, vec![ArgSource::Column(1)])
                    .with_frame(frame.clone());
                let naive = eval_whole(desc.clone(), &[order], &rows, EvaluatorStrategy::Naive);
                let sliding =
                    eval_whole(desc, &[order], &rows, EvaluatorStrategy::Sliding);
                assert_eq!(naive, sliding, "{:?} under {:?} order", kind, order.direction);
            }
        }
        let sum = WindowFuncDesc::new(WindowFuncKind::Sum, vec![ArgSource::Column(1)])
            .with_frame(frame.clone());
        assert_eq!(
            eval_whole(sum, &[OrderKey::asc(0)], &rows, EvaluatorStrategy::Sliding),
            vec![Value::Integer(100), Value::Integer(50), Value::Integer(151)]
        );
        let max = WindowFuncDesc::new(WindowFuncKind::Max, vec![ArgSource::Column(1)])
            .with_frame(frame);
        assert_eq!(
            eval_whole(max, &[OrderKey::asc(0)], &rows, EvaluatorStrategy::Sliding),
            vec![Value::Integer(100), Value::Integer(50), Value::Integer(100)]
        );
    }

    #[test]
    fn test_value_functions_stream_over_prefix() {
        let all = rows(&[1, 4, 2, 5]);
        let frame = FrameSpec::rows(
            FrameBound::Preceding(int_offset(1)),
            FrameBound::Following(int_offset(1)),
        );
        let descs = [
            WindowFuncDesc::new(WindowFuncKind::FirstValue, vec![ArgSource::Column(0)])
                .with_frame(frame.clone()),
            WindowFuncDesc::new(WindowFuncKind::LastValue, vec![ArgSource::Column(0)])
                .with_frame(frame.clone()),
            WindowFuncDesc::new(
                WindowFuncKind::NthValue,
                vec![ArgSource::Column(0), ArgSource::Const(Value::Integer(2))],
            )
            .with_frame(frame),
        ];
        for desc in descs {
            let mut f = FunctionEval::bind(
                desc.clone(),
                &[],
                &[],
                EvaluatorStrategy::Sliding,
                PrecisionMode::HighPrecision,
            )
            .unwrap();
            assert_eq!(f.stream_lookahead(), Some(1));
            // stream the first two rows from a three-row prefix
            let mut got = f.eval_prefix(&all[..3], 2).unwrap();
            let ord = PartitionOrder::build(&all, &[]).unwrap();
            got.extend(f.finish(&all, &ord).unwrap());
            let whole = eval_whole(desc.clone(), &[], &all, EvaluatorStrategy::Naive);
            assert_eq!(got, whole, "{:?} streamed prefix diverged", desc.kind);
        }
    }

    #[test]
    fn test_rank_and_lead_never_stream() {
        let order = [OrderKey::asc(0)];
        let rank = FunctionEval::bind(
            WindowFuncDesc::new(WindowFuncKind::Rank, vec![]),
            &order,
            &[],
            EvaluatorStrategy::Sliding,
            PrecisionMode::Fast,
        )
        .unwrap();
        assert_eq!(rank.stream_lookahead(), None);
        let lead = FunctionEval::bind(
            WindowFuncDesc::new(WindowFuncKind::Lead, vec![ArgSource::Column(0)]),
            &order,
            &[],
            EvaluatorStrategy::Sliding,
            PrecisionMode::Fast,
        )
        .unwrap();
        assert_eq!(lead.stream_lookahead(), None);
    }

    #[test]
    fn test_reset_clears_partition_state() {
        let first = rows(&[10, 20]);
        let second = rows(&[1]);
        let order = [OrderKey::asc(0)];
        let desc = WindowFuncDesc::new(WindowFuncKind::Sum, vec![ArgSource::Column(0)]);
        let mut f = FunctionEval::bind(
            desc,
            &order,
            &[],
            EvaluatorStrategy::Sliding,
            PrecisionMode::Fast,
        )
        .unwrap();
        let ord = PartitionOrder::build(&first, &order).unwrap();
        f.finish(&first, &ord).unwrap();
        f.reset();
        let ord = PartitionOrder::build(&second, &order).unwrap();
        assert_eq!(f.finish(&second, &ord).unwrap(), vec![Value::Integer(1)]);
    }
}
