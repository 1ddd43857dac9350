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

//! Bound window specifications
//!
//! Everything here arrives already bound by the planner: expressions are
//! column indices into the input row, constants are [`Value`]s, and run-time
//! parameters are slots into a parameter slice resolved once per execution.

use smallvec::SmallVec;

use crate::core::{Error, Interval, Result, Value};

/// Partition key tuple - stack-allocated for the common case (up to 4 columns)
pub type PartitionKey = SmallVec<[Value; 4]>;

/// Sort direction of an order-key column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// NULL placement of an order-key column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrder {
    NullsFirst,
    NullsLast,
}

/// One ORDER BY item of a window definition
///
/// The same order-key tuple backs every function sharing the window
/// definition, and doubles as the distance axis for RANGE frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKey {
    /// Column index of the materialized order expression
    pub column: usize,
    pub direction: SortDirection,
    pub null_order: NullOrder,
}

impl OrderKey {
    /// Ascending order with NULLs first (the default placement)
    pub fn asc(column: usize) -> Self {
        OrderKey {
            column,
            direction: SortDirection::Asc,
            null_order: NullOrder::NullsFirst,
        }
    }

    /// Descending order with NULLs last
    pub fn desc(column: usize) -> Self {
        OrderKey {
            column,
            direction: SortDirection::Desc,
            null_order: NullOrder::NullsLast,
        }
    }
}

/// Frame unit: physical row offsets or logical order-key distances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameUnit {
    Rows,
    Range,
}

/// Source of a frame bound offset
///
/// `Param` slots are resolved once per execution, not per row; a negative
/// resolved offset fails with [`Error::InvalidFrameBound`] at that point.
#[derive(Debug, Clone, PartialEq)]
pub enum OffsetSource {
    /// Literal numeric offset
    Const(Value),
    /// Run-time parameter slot
    Param(usize),
    /// Calendar interval (RANGE over temporal order keys)
    Interval(Interval),
}

/// A frame bound offset after parameter resolution
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedOffset {
    Numeric(Value),
    Interval(Interval),
}

impl OffsetSource {
    /// Resolve the offset against the execution's parameter slice
    pub fn resolve(&self, params: &[Value]) -> Result<ResolvedOffset> {
        let value = match self {
            OffsetSource::Const(v) => v.clone(),
            OffsetSource::Param(slot) => params
                .get(*slot)
                .cloned()
                .ok_or(Error::ParameterNotBound(*slot))?,
            OffsetSource::Interval(iv) => return Ok(ResolvedOffset::Interval(*iv)),
        };
        if value.is_null() {
            return Err(Error::invalid_frame_bound("offset resolved to NULL"));
        }
        if !value.data_type().is_numeric() {
            return Err(Error::invalid_frame_bound(format!(
                "offset must be numeric, got {}",
                value.data_type()
            )));
        }
        Ok(ResolvedOffset::Numeric(value))
    }
}

/// One endpoint of a window frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(OffsetSource),
    CurrentRow,
    Following(OffsetSource),
    UnboundedFollowing,
}

/// A window frame clause
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSpec {
    pub unit: FrameUnit,
    pub start: FrameBound,
    pub end: FrameBound,
}

impl FrameSpec {
    /// `ROWS BETWEEN start AND end`
    pub fn rows(start: FrameBound, end: FrameBound) -> Self {
        FrameSpec {
            unit: FrameUnit::Rows,
            start,
            end,
        }
    }

    /// `RANGE BETWEEN start AND end`
    pub fn range(start: FrameBound, end: FrameBound) -> Self {
        FrameSpec {
            unit: FrameUnit::Range,
            start,
            end,
        }
    }

    /// Whether both bounds are CURRENT ROW (needs no order-key arithmetic)
    pub fn is_trivial(&self) -> bool {
        matches!(
            (&self.start, &self.end),
            (
                FrameBound::CurrentRow | FrameBound::UnboundedPreceding,
                FrameBound::CurrentRow | FrameBound::UnboundedFollowing
            )
        )
    }

    /// Structural validation performed at bind time
    ///
    /// Offset values are checked later, at parameter resolution; this only
    /// rejects shapes that can never be valid.
    pub fn validate(&self, order_by: &[OrderKey]) -> Result<()> {
        if matches!(self.start, FrameBound::UnboundedFollowing) {
            return Err(Error::invalid_frame_spec(
                "frame start cannot be UNBOUNDED FOLLOWING",
            ));
        }
        if matches!(self.end, FrameBound::UnboundedPreceding) {
            return Err(Error::invalid_frame_spec(
                "frame end cannot be UNBOUNDED PRECEDING",
            ));
        }
        if self.unit == FrameUnit::Range && !self.is_trivial() && order_by.len() != 1 {
            return Err(Error::invalid_frame_spec(format!(
                "RANGE frame with an offset bound requires exactly one ORDER BY column, got {}",
                order_by.len()
            )));
        }
        Ok(())
    }
}

/// Source of a window function argument
#[derive(Debug, Clone, PartialEq)]
pub enum ArgSource {
    /// Column index into the input row
    Column(usize),
    /// Bound constant
    Const(Value),
}

impl ArgSource {
    /// Evaluate against a row
    pub fn eval(&self, row: &crate::core::Row) -> Result<Value> {
        match self {
            ArgSource::Column(idx) => row
                .get(*idx)
                .cloned()
                .ok_or(Error::ColumnIndexOutOfBounds { index: *idx }),
            ArgSource::Const(v) => Ok(v.clone()),
        }
    }

    /// Constant value, if this argument is one
    pub fn as_const(&self) -> Option<&Value> {
        match self {
            ArgSource::Const(v) => Some(v),
            ArgSource::Column(_) => None,
        }
    }
}

/// Evaluation family of a window function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuncFamily {
    /// SUM / COUNT / AVG / BIT_XOR / BIT_AND / BIT_OR - O(1) add and remove
    AggregateInvertible,
    /// MIN / MAX - monotonic deque
    AggregateExtremal,
    /// ROW_NUMBER / RANK / DENSE_RANK / PERCENT_RANK / CUME_DIST
    RankFamily,
    /// LEAD / LAG / FIRST_VALUE / LAST_VALUE / NTH_VALUE
    NavigationFamily,
    /// NTILE
    DistributionFamily,
}

/// Supported window functions - a closed set selected at bind time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowFuncKind {
    Sum,
    Count,
    Avg,
    BitXor,
    BitAnd,
    BitOr,
    Min,
    Max,
    RowNumber,
    Rank,
    DenseRank,
    PercentRank,
    CumeDist,
    Lead,
    Lag,
    FirstValue,
    LastValue,
    NthValue,
    Ntile,
}

impl WindowFuncKind {
    /// Lower-case SQL name, used in notices and error messages
    pub fn name(&self) -> &'static str {
        match self {
            WindowFuncKind::Sum => "sum",
            WindowFuncKind::Count => "count",
            WindowFuncKind::Avg => "avg",
            WindowFuncKind::BitXor => "bit_xor",
            WindowFuncKind::BitAnd => "bit_and",
            WindowFuncKind::BitOr => "bit_or",
            WindowFuncKind::Min => "min",
            WindowFuncKind::Max => "max",
            WindowFuncKind::RowNumber => "row_number",
            WindowFuncKind::Rank => "rank",
            WindowFuncKind::DenseRank => "dense_rank",
            WindowFuncKind::PercentRank => "percent_rank",
            WindowFuncKind::CumeDist => "cume_dist",
            WindowFuncKind::Lead => "lead",
            WindowFuncKind::Lag => "lag",
            WindowFuncKind::FirstValue => "first_value",
            WindowFuncKind::LastValue => "last_value",
            WindowFuncKind::NthValue => "nth_value",
            WindowFuncKind::Ntile => "ntile",
        }
    }

    /// Evaluation family
    pub fn family(&self) -> FuncFamily {
        use WindowFuncKind::*;
        match self {
            Sum | Count | Avg | BitXor | BitAnd | BitOr => FuncFamily::AggregateInvertible,
            Min | Max => FuncFamily::AggregateExtremal,
            RowNumber | Rank | DenseRank | PercentRank | CumeDist => FuncFamily::RankFamily,
            Lead | Lag | FirstValue | LastValue | NthValue => FuncFamily::NavigationFamily,
            Ntile => FuncFamily::DistributionFamily,
        }
    }

    /// Whether the function evaluates over the whole partition, ignoring any
    /// explicit frame clause
    ///
    /// FIRST_VALUE / LAST_VALUE / NTH_VALUE are the navigation members that
    /// do honor the frame.
    pub fn ignores_frame(&self) -> bool {
        use WindowFuncKind::*;
        match self.family() {
            FuncFamily::RankFamily | FuncFamily::DistributionFamily => true,
            FuncFamily::NavigationFamily => matches!(self, Lead | Lag),
            _ => false,
        }
    }
}

/// A bound window function occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct WindowFuncDesc {
    pub kind: WindowFuncKind,
    /// Function arguments; meaning depends on the kind:
    /// - aggregates / FIRST_VALUE / LAST_VALUE: `[source]`
    /// - LEAD / LAG: `[source, offset?, default?]`
    /// - NTH_VALUE: `[source, n]`
    /// - NTILE: `[n]`
    /// - ROW_NUMBER / RANK / DENSE_RANK / PERCENT_RANK / CUME_DIST: `[]`
    pub args: Vec<ArgSource>,
    /// Explicit frame clause, if any
    pub frame: Option<FrameSpec>,
    /// Name of the window definition, for notices (`<unnamed window>` if none)
    pub window_name: Option<String>,
}

impl WindowFuncDesc {
    /// Create a descriptor with no explicit frame
    pub fn new(kind: WindowFuncKind, args: Vec<ArgSource>) -> Self {
        WindowFuncDesc {
            kind,
            args,
            frame: None,
            window_name: None,
        }
    }

    /// Attach an explicit frame clause
    pub fn with_frame(mut self, frame: FrameSpec) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Attach the defining window's name
    pub fn with_window_name(mut self, name: impl Into<String>) -> Self {
        self.window_name = Some(name.into());
        self
    }

    /// Bind-time argument validation
    ///
    /// Degenerate-but-valid NULL arguments (NTILE(NULL), NTH_VALUE(x, NULL))
    /// pass; malformed constants fail here, before any row is read.
    pub fn validate(&self) -> Result<()> {
        use WindowFuncKind::*;
        let argc = self.args.len();
        let (min, max) = match self.kind {
            RowNumber | Rank | DenseRank | PercentRank | CumeDist => (0, 0),
            Sum | Count | Avg | BitXor | BitAnd | BitOr | Min | Max | FirstValue | LastValue => {
                (1, 1)
            }
            Lead | Lag => (1, 3),
            NthValue => (2, 2),
            Ntile => (1, 1),
        };
        if argc < min || argc > max {
            return Err(Error::invalid_argument(format!(
                "{} expects {}..={} arguments, got {}",
                self.kind.name(),
                min,
                max,
                argc
            )));
        }
        match self.kind {
            Ntile => {
                if let Some(n) = self.args[0].as_const() {
                    if !n.is_null() && n.as_int64().map_or(true, |n| n <= 0) {
                        return Err(Error::invalid_argument(format!(
                            "ntile requires a positive bucket count, got {}",
                            n
                        )));
                    }
                }
            }
            NthValue => {
                if let Some(n) = self.args[1].as_const() {
                    if !n.is_null() && n.as_int64().map_or(true, |n| n <= 0) {
                        return Err(Error::invalid_argument(format!(
                            "nth_value requires a positive 1-based index, got {}",
                            n
                        )));
                    }
                }
            }
            Lead | Lag => {
                if let Some(off) = self.args.get(1).and_then(|a| a.as_const()) {
                    if !off.is_null() && off.as_int64().map_or(true, |o| o < 0) {
                        return Err(Error::invalid_argument(format!(
                            "{} offset must be non-negative, got {}",
                            self.kind.name(),
                            off
                        )));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Static output nullability, exposed to the planner
    ///
    /// `column_non_null` reports whether an input column is declared NOT NULL.
    pub fn output_nullable(&self, column_non_null: impl Fn(usize) -> bool) -> bool {
        use WindowFuncKind::*;
        let arg_non_null = |arg: &ArgSource| match arg {
            ArgSource::Const(v) => !v.is_null(),
            ArgSource::Column(idx) => column_non_null(*idx),
        };
        match self.kind {
            Count | RowNumber | Rank | DenseRank | PercentRank | CumeDist => false,
            // Nullable whenever an empty or degenerate frame is possible,
            // which the planner cannot rule out in general.
            Sum | Avg | BitXor | BitAnd | BitOr | Min | Max | FirstValue | LastValue
            | NthValue | Ntile => true,
            Lead | Lag => {
                let source_ok = self.args.first().map(arg_non_null).unwrap_or(false);
                let default_ok = self.args.get(2).map(arg_non_null).unwrap_or(false);
                !(source_ok && default_ok)
            }
        }
    }
}

/// A full window specification: one shared partition/order definition and the
/// functions evaluated over it
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    /// Column indices of the materialized partition-key expressions
    pub partition_by: Vec<usize>,
    /// Order-key columns (already sorted by the upstream operator)
    pub order_by: Vec<OrderKey>,
    /// Functions sharing this definition; each appends one output column
    pub functions: Vec<WindowFuncDesc>,
}

impl WindowSpec {
    /// Validate the whole specification at bind time
    pub fn validate(&self) -> Result<()> {
        if self.functions.is_empty() {
            return Err(Error::invalid_argument(
                "window specification has no functions",
            ));
        }
        for func in &self.functions {
            func.validate()?;
            if let Some(frame) = &func.frame {
                frame.validate(&self.order_by)?;
            }
        }
        Ok(())
    }

    /// Extract the partition key tuple of a row
    pub fn partition_key(&self, row: &crate::core::Row) -> Result<PartitionKey> {
        self.partition_by
            .iter()
            .map(|&idx| {
                row.get(idx)
                    .cloned()
                    .ok_or(Error::ColumnIndexOutOfBounds { index: idx })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Row;

    #[test]
    fn test_family_classification() {
        assert_eq!(
            WindowFuncKind::Sum.family(),
            FuncFamily::AggregateInvertible
        );
        assert_eq!(WindowFuncKind::Max.family(), FuncFamily::AggregateExtremal);
        assert_eq!(WindowFuncKind::Rank.family(), FuncFamily::RankFamily);
        assert_eq!(WindowFuncKind::Lead.family(), FuncFamily::NavigationFamily);
        assert_eq!(
            WindowFuncKind::Ntile.family(),
            FuncFamily::DistributionFamily
        );
    }

    #[test]
    fn test_ignores_frame() {
        assert!(WindowFuncKind::RowNumber.ignores_frame());
        assert!(WindowFuncKind::Lead.ignores_frame());
        assert!(WindowFuncKind::Ntile.ignores_frame());
        assert!(!WindowFuncKind::FirstValue.ignores_frame());
        assert!(!WindowFuncKind::Sum.ignores_frame());
    }

    #[test]
    fn test_frame_spec_validation() {
        let ok = FrameSpec::rows(FrameBound::UnboundedPreceding, FrameBound::CurrentRow);
        assert!(ok.validate(&[]).is_ok());

        let bad = FrameSpec::rows(FrameBound::UnboundedFollowing, FrameBound::CurrentRow);
        assert!(bad.validate(&[]).is_err());

        // RANGE with an offset bound needs exactly one order key
        let range = FrameSpec::range(
            FrameBound::Preceding(OffsetSource::Const(Value::Integer(1))),
            FrameBound::CurrentRow,
        );
        assert!(range.validate(&[]).is_err());
        assert!(range.validate(&[OrderKey::asc(0)]).is_ok());
    }

    #[test]
    fn test_offset_resolution() {
        let params = vec![Value::Integer(2)];
        let off = OffsetSource::Param(0).resolve(&params).unwrap();
        assert_eq!(off, ResolvedOffset::Numeric(Value::Integer(2)));

        assert!(matches!(
            OffsetSource::Param(1).resolve(&params),
            Err(Error::ParameterNotBound(1))
        ));
        assert!(OffsetSource::Const(Value::text("x"))
            .resolve(&params)
            .is_err());
    }

    #[test]
    fn test_bind_time_argument_errors() {
        let bad_ntile = WindowFuncDesc::new(
            WindowFuncKind::Ntile,
            vec![ArgSource::Const(Value::Integer(0))],
        );
        assert!(bad_ntile.validate().is_err());

        let null_ntile = WindowFuncDesc::new(
            WindowFuncKind::Ntile,
            vec![ArgSource::Const(Value::null_unknown())],
        );
        assert!(null_ntile.validate().is_ok());

        let bad_nth = WindowFuncDesc::new(
            WindowFuncKind::NthValue,
            vec![ArgSource::Column(0), ArgSource::Const(Value::Integer(-1))],
        );
        assert!(bad_nth.validate().is_err());

        let bad_lag = WindowFuncDesc::new(
            WindowFuncKind::Lag,
            vec![ArgSource::Column(0), ArgSource::Const(Value::Integer(-2))],
        );
        assert!(bad_lag.validate().is_err());
    }

    #[test]
    fn test_output_nullability() {
        let non_null = |_: usize| true;
        let nullable_col = |_: usize| false;

        let count = WindowFuncDesc::new(WindowFuncKind::Count, vec![ArgSource::Column(0)]);
        assert!(!count.output_nullable(nullable_col));

        let sum = WindowFuncDesc::new(WindowFuncKind::Sum, vec![ArgSource::Column(0)]);
        assert!(sum.output_nullable(non_null));

        // lead(v, 1, 1) with v NOT NULL is non-nullable
        let lead = WindowFuncDesc::new(
            WindowFuncKind::Lead,
            vec![
                ArgSource::Column(0),
                ArgSource::Const(Value::Integer(1)),
                ArgSource::Const(Value::Integer(1)),
            ],
        );
        assert!(!lead.output_nullable(non_null));
        // lead(v) without a default is nullable regardless
        let lead_no_default = WindowFuncDesc::new(WindowFuncKind::Lead, vec![ArgSource::Column(0)]);
        assert!(lead_no_default.output_nullable(non_null));
        // lead(v, 1, null) is nullable
        let lead_null_default = WindowFuncDesc::new(
            WindowFuncKind::Lead,
            vec![
                ArgSource::Column(0),
                ArgSource::Const(Value::Integer(1)),
                ArgSource::Const(Value::null_unknown()),
            ],
        );
        assert!(lead_null_default.output_nullable(non_null));
    }

    #[test]
    fn test_partition_key_extraction() {
        let spec = WindowSpec {
            partition_by: vec![1],
            order_by: vec![],
            functions: vec![WindowFuncDesc::new(WindowFuncKind::RowNumber, vec![])],
        };
        let row = Row::from_values(vec![Value::Integer(1), Value::text("M")]);
        let key = spec.partition_key(&row).unwrap();
        assert_eq!(key.as_slice(), &[Value::text("M")]);
    }
}
