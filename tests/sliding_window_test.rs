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

//! Frame aggregation goldens run under every strategy and precision mode.
//! The naive evaluator is the oracle; the sliding evaluator must agree with
//! it bit for bit on the same inputs.

use oriel::core::{BatchSource, Row, Value, VecBatchSource};
use oriel::window::{
    ArgSource, EvaluatorStrategy, FrameBound, FrameSpec, FrameUnit, OffsetSource, OrderKey,
    PrecisionMode, WindowConfig, WindowFuncDesc, WindowFuncKind, WindowOperator, WindowSpec,
};

/// The partition every golden below runs over, ordered by id:
/// id = 1, 2, 3, 4, 5, 10, 11
const IDS: [i64; 7] = [1, 2, 3, 4, 5, 10, 11];

fn id_rows(ids: &[i64]) -> Vec<Row> {
    ids.iter()
        .map(|id| Row::from_values(vec![Value::Integer(*id)]))
        .collect()
}

fn const_offset(n: i64) -> OffsetSource {
    OffsetSource::Const(Value::Integer(n))
}

fn frame(unit: FrameUnit, start: FrameBound, end: FrameBound) -> FrameSpec {
    match unit {
        FrameUnit::Rows => FrameSpec::rows(start, end),
        FrameUnit::Range => FrameSpec::range(start, end),
    }
}

fn preceding(n: i64) -> FrameBound {
    FrameBound::Preceding(const_offset(n))
}

fn following(n: i64) -> FrameBound {
    FrameBound::Following(const_offset(n))
}

struct Case {
    kind: WindowFuncKind,
    unit: FrameUnit,
    start: FrameBound,
    end: FrameBound,
    descending: bool,
    expected: &'static [&'static str],
}

impl Case {
    fn new(
        kind: WindowFuncKind,
        unit: FrameUnit,
        start: FrameBound,
        end: FrameBound,
        expected: &'static [&'static str],
    ) -> Self {
        Case {
            kind,
            unit,
            start,
            end,
            descending: false,
            expected,
        }
    }

    fn desc(mut self) -> Self {
        self.descending = true;
        self
    }

    fn run(&self, params: &[Value], config: &WindowConfig) -> Vec<String> {
        let mut ids = IDS.to_vec();
        let order = if self.descending {
            ids.reverse();
            OrderKey::desc(0)
        } else {
            OrderKey::asc(0)
        };
        let spec = WindowSpec {
            partition_by: vec![],
            order_by: vec![order],
            functions: vec![
                WindowFuncDesc::new(self.kind, vec![ArgSource::Column(0)]).with_frame(frame(
                    self.unit,
                    self.start.clone(),
                    self.end.clone(),
                )),
            ],
        };
        let source = VecBatchSource::from_rows(id_rows(&ids), 3);
        let mut op = WindowOperator::new(source, spec, params, config).unwrap();
        let mut out = Vec::new();
        while let Some(batch) = op.next_batch().unwrap() {
            for row in batch.into_rows() {
                out.push(row[1].to_string());
            }
        }
        out
    }
}

fn check_all_modes(cases: &[Case]) {
    for strategy in [EvaluatorStrategy::Naive, EvaluatorStrategy::Sliding] {
        for precision in [PrecisionMode::HighPrecision, PrecisionMode::Fast] {
            let config = WindowConfig {
                strategy,
                precision,
                ..WindowConfig::default()
            };
            for case in cases {
                let got = case.run(&[], &config);
                assert_eq!(
                    got, case.expected,
                    "{:?} {:?} {:?}..{:?} desc={} under {:?}/{:?}",
                    case.kind, case.unit, case.start, case.end, case.descending,
                    strategy, precision
                );
            }
        }
    }
}

#[test]
fn test_count_frames() {
    use FrameUnit::{Range, Rows};
    check_all_modes(&[
        Case::new(
            WindowFuncKind::Count,
            Rows,
            following(1),
            following(2),
            &["2", "2", "2", "2", "2", "1", "0"],
        ),
        // reversed bounds collapse to an empty frame on every row
        Case::new(
            WindowFuncKind::Count,
            Rows,
            following(3),
            following(1),
            &["0", "0", "0", "0", "0", "0", "0"],
        ),
        Case::new(
            WindowFuncKind::Count,
            Rows,
            preceding(2),
            preceding(1),
            &["0", "1", "2", "2", "2", "2", "2"],
        ),
        Case::new(
            WindowFuncKind::Count,
            Rows,
            preceding(1),
            preceding(3),
            &["0", "0", "0", "0", "0", "0", "0"],
        ),
        Case::new(
            WindowFuncKind::Count,
            Range,
            following(1),
            following(2),
            &["2", "2", "2", "1", "0", "1", "0"],
        ),
        Case::new(
            WindowFuncKind::Count,
            Range,
            preceding(2),
            preceding(1),
            &["0", "1", "2", "2", "2", "0", "1"],
        ),
    ]);
}

#[test]
fn test_sum_frames() {
    use FrameUnit::{Range, Rows};
    check_all_modes(&[
        Case::new(
            WindowFuncKind::Sum,
            Rows,
            following(1),
            following(2),
            &["5", "7", "9", "15", "21", "11", "NULL"],
        ),
        Case::new(
            WindowFuncKind::Sum,
            Rows,
            preceding(2),
            preceding(1),
            &["NULL", "1", "3", "5", "7", "9", "15"],
        ),
        Case::new(
            WindowFuncKind::Sum,
            Rows,
            FrameBound::UnboundedPreceding,
            following(1),
            &["3", "6", "10", "15", "25", "36", "36"],
        ),
        Case::new(
            WindowFuncKind::Sum,
            Range,
            following(1),
            following(2),
            &["5", "7", "9", "5", "NULL", "11", "NULL"],
        ),
        Case::new(
            WindowFuncKind::Sum,
            Range,
            preceding(2),
            preceding(1),
            &["NULL", "1", "3", "5", "7", "NULL", "10"],
        ),
        Case::new(
            WindowFuncKind::Sum,
            Range,
            preceding(1),
            following(2),
            &["6", "10", "14", "12", "9", "21", "21"],
        ),
        Case::new(
            WindowFuncKind::Sum,
            Range,
            preceding(1),
            following(2),
            &["21", "21", "12", "14", "10", "6", "3"],
        )
        .desc(),
    ]);
}

#[test]
fn test_avg_frames() {
    use FrameUnit::{Range, Rows};
    check_all_modes(&[
        Case::new(
            WindowFuncKind::Avg,
            Rows,
            following(1),
            following(2),
            &["2.5", "3.5", "4.5", "7.5", "10.5", "11", "NULL"],
        ),
        Case::new(
            WindowFuncKind::Avg,
            Rows,
            preceding(2),
            preceding(1),
            &["NULL", "1", "1.5", "2.5", "3.5", "4.5", "7.5"],
        ),
        Case::new(
            WindowFuncKind::Avg,
            Rows,
            FrameBound::UnboundedPreceding,
            following(1),
            &[
                "1.5",
                "2",
                "2.5",
                "3",
                "4.166666666666667",
                "5.142857142857143",
                "5.142857142857143",
            ],
        ),
        Case::new(
            WindowFuncKind::Avg,
            Range,
            following(1),
            following(2),
            &["2.5", "3.5", "4.5", "5", "NULL", "11", "NULL"],
        ),
        Case::new(
            WindowFuncKind::Avg,
            Range,
            preceding(1),
            following(2),
            &["2", "2.5", "3.5", "4", "4.5", "10.5", "10.5"],
        ),
        Case::new(
            WindowFuncKind::Avg,
            Range,
            preceding(1),
            following(2),
            &["10.5", "10.5", "4", "3.5", "2.5", "2", "1.5"],
        )
        .desc(),
    ]);
}

#[test]
fn test_bit_xor_frames() {
    use FrameUnit::{Range, Rows};
    check_all_modes(&[
        Case::new(
            WindowFuncKind::BitXor,
            Rows,
            following(1),
            following(2),
            &["1", "7", "1", "15", "1", "11", "0"],
        ),
        Case::new(
            WindowFuncKind::BitXor,
            Rows,
            preceding(2),
            preceding(1),
            &["0", "1", "3", "1", "7", "1", "15"],
        ),
        Case::new(
            WindowFuncKind::BitXor,
            Rows,
            FrameBound::UnboundedPreceding,
            following(1),
            &["3", "0", "4", "1", "11", "0", "0"],
        ),
        Case::new(
            WindowFuncKind::BitXor,
            Range,
            following(1),
            following(2),
            &["1", "7", "1", "5", "0", "11", "0"],
        ),
        Case::new(
            WindowFuncKind::BitXor,
            Range,
            preceding(2),
            preceding(1),
            &["0", "1", "3", "1", "7", "0", "10"],
        ),
        Case::new(
            WindowFuncKind::BitXor,
            Range,
            preceding(1),
            following(2),
            &["0", "4", "0", "2", "1", "1", "1"],
        ),
        Case::new(
            WindowFuncKind::BitXor,
            Range,
            preceding(1),
            following(2),
            &["1", "1", "2", "0", "4", "0", "3"],
        )
        .desc(),
    ]);
}

#[test]
fn test_min_frames() {
    use FrameUnit::{Range, Rows};
    check_all_modes(&[
        Case::new(
            WindowFuncKind::Min,
            Rows,
            following(1),
            following(2),
            &["2", "3", "4", "5", "10", "11", "NULL"],
        ),
        Case::new(
            WindowFuncKind::Min,
            Rows,
            preceding(2),
            preceding(1),
            &["NULL", "1", "1", "2", "3", "4", "5"],
        ),
        Case::new(
            WindowFuncKind::Min,
            Rows,
            FrameBound::UnboundedPreceding,
            following(1),
            &["1", "1", "1", "1", "1", "1", "1"],
        ),
        Case::new(
            WindowFuncKind::Min,
            Range,
            following(1),
            following(2),
            &["2", "3", "4", "5", "NULL", "11", "NULL"],
        ),
        Case::new(
            WindowFuncKind::Min,
            Range,
            preceding(2),
            preceding(1),
            &["NULL", "1", "1", "2", "3", "NULL", "10"],
        ),
        Case::new(
            WindowFuncKind::Min,
            Range,
            preceding(1),
            following(2),
            &["1", "1", "2", "3", "4", "10", "10"],
        ),
        Case::new(
            WindowFuncKind::Min,
            Range,
            preceding(1),
            following(2),
            &["10", "10", "3", "2", "1", "1", "1"],
        )
        .desc(),
    ]);
}

#[test]
fn test_max_frames() {
    use FrameUnit::{Range, Rows};
    check_all_modes(&[
        Case::new(
            WindowFuncKind::Max,
            Rows,
            following(1),
            following(2),
            &["3", "4", "5", "10", "11", "11", "NULL"],
        ),
        Case::new(
            WindowFuncKind::Max,
            Rows,
            preceding(2),
            preceding(1),
            &["NULL", "1", "2", "3", "4", "5", "10"],
        ),
        Case::new(
            WindowFuncKind::Max,
            Rows,
            FrameBound::UnboundedPreceding,
            following(1),
            &["2", "3", "4", "5", "10", "11", "11"],
        ),
        Case::new(
            WindowFuncKind::Max,
            Range,
            following(1),
            following(2),
            &["3", "4", "5", "5", "NULL", "11", "NULL"],
        ),
        Case::new(
            WindowFuncKind::Max,
            Range,
            preceding(2),
            preceding(1),
            &["NULL", "1", "2", "3", "4", "NULL", "10"],
        ),
    ]);
}

#[test]
fn test_parameterized_frame_bounds() {
    let case = |start: FrameBound, end: FrameBound| Case {
        kind: WindowFuncKind::Count,
        unit: FrameUnit::Rows,
        start,
        end,
        descending: false,
        expected: &[],
    };
    let config = WindowConfig::default();

    // BETWEEN ? PRECEDING AND ? PRECEDING
    let c = case(
        FrameBound::Preceding(OffsetSource::Param(0)),
        FrameBound::Preceding(OffsetSource::Param(1)),
    );
    assert_eq!(
        c.run(&[Value::Integer(1), Value::Integer(2)], &config),
        vec!["0"; 7]
    );
    assert_eq!(
        c.run(&[Value::Integer(2), Value::Integer(1)], &config),
        vec!["0", "1", "2", "2", "2", "2", "2"]
    );

    // BETWEEN ? FOLLOWING AND ? FOLLOWING
    let c = case(
        FrameBound::Following(OffsetSource::Param(0)),
        FrameBound::Following(OffsetSource::Param(1)),
    );
    assert_eq!(
        c.run(&[Value::Integer(2), Value::Integer(1)], &config),
        vec!["0"; 7]
    );
    assert_eq!(
        c.run(&[Value::Integer(1), Value::Integer(2)], &config),
        vec!["2", "2", "2", "2", "2", "1", "0"]
    );
}

#[test]
fn test_float_sum_precision_modes() {
    // 0.1 repeated: high precision accumulates through decimals and lands on
    // exact tenths even after the sliding evaluator removes head values
    let rows: Vec<Row> = (0..6)
        .map(|_| Row::from_values(vec![Value::Float(0.1)]))
        .collect();
    let spec = || WindowSpec {
        partition_by: vec![],
        order_by: vec![],
        functions: vec![
            WindowFuncDesc::new(WindowFuncKind::Sum, vec![ArgSource::Column(0)]).with_frame(
                FrameSpec::rows(preceding(2), FrameBound::CurrentRow),
            ),
        ],
    };
    let run = |config: &WindowConfig| -> Vec<Value> {
        let source = VecBatchSource::from_rows(rows.clone(), 1024);
        let mut op = WindowOperator::new(source, spec(), &[], config).unwrap();
        let mut out = Vec::new();
        while let Some(batch) = op.next_batch().unwrap() {
            for row in batch.into_rows() {
                out.push(row[1].clone());
            }
        }
        out
    };

    let config = WindowConfig {
        strategy: EvaluatorStrategy::Sliding,
        precision: PrecisionMode::HighPrecision,
        ..WindowConfig::default()
    };
    assert_eq!(
        run(&config),
        vec![
            Value::Float(0.1),
            Value::Float(0.2),
            Value::Float(0.3),
            Value::Float(0.3),
            Value::Float(0.3),
            Value::Float(0.3),
        ]
    );

    // fast mode accumulates in plain f64; sliding removal may drift in the
    // last bits, so only closeness is guaranteed
    let fast = WindowConfig {
        strategy: EvaluatorStrategy::Sliding,
        precision: PrecisionMode::Fast,
        ..WindowConfig::default()
    };
    let expected = [0.1, 0.2, 0.3, 0.3, 0.3, 0.3];
    for (got, want) in run(&fast).iter().zip(expected) {
        match got {
            Value::Float(f) => assert!((f - want).abs() < 1e-12, "{} vs {}", f, want),
            other => panic!("expected Float, got {:?}", other),
        }
    }
}
