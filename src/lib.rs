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

//! # Oriel - Window function evaluation for relational executors
//!
//! Oriel is the window operator of a batch query executor: it takes a stream
//! of rows that is already grouped by partition key and sorted by the order
//! keys, evaluates a set of SQL window functions over each partition, and
//! appends one result column per function.
//!
//! ## Key Features
//!
//! - **Full frame model** - ROWS and RANGE frames, all five bound kinds,
//!   DESC orderings and calendar-interval RANGE offsets
//! - **19 window functions** - aggregates (SUM, COUNT, AVG, MIN, MAX,
//!   BIT_XOR, BIT_AND, BIT_OR), the rank family, LEAD/LAG, FIRST_VALUE /
//!   LAST_VALUE / NTH_VALUE and NTILE
//! - **Sliding evaluation** - O(1) frame advancement with a naive
//!   rebuild-per-row oracle producing identical output
//! - **Streaming emission** - ROWS-framed results leave before the partition
//!   closes, as soon as their lookahead is buffered
//! - **Parallel execution** - hash-sharded worker pipelines whose merged
//!   output is byte-identical to serial execution
//!
//! ## Quick Start
//!
//! ```rust
//! use oriel::core::{BatchSource, Row, Value, VecBatchSource};
//! use oriel::window::{
//!     ArgSource, OrderKey, WindowConfig, WindowFuncDesc, WindowFuncKind,
//!     WindowOperator, WindowSpec,
//! };
//!
//! // rows arrive pre-sorted: (partition, value)
//! let rows = vec![
//!     Row::from_values(vec![Value::Integer(1), Value::Integer(10)]),
//!     Row::from_values(vec![Value::Integer(1), Value::Integer(20)]),
//!     Row::from_values(vec![Value::Integer(2), Value::Integer(5)]),
//! ];
//! let spec = WindowSpec {
//!     partition_by: vec![0],
//!     order_by: vec![OrderKey::asc(1)],
//!     functions: vec![WindowFuncDesc::new(
//!         WindowFuncKind::Sum,
//!         vec![ArgSource::Column(1)],
//!     )],
//! };
//! let source = VecBatchSource::from_rows(rows, 1024);
//! let mut op = WindowOperator::new(source, spec, &[], &WindowConfig::default()).unwrap();
//! while let Some(batch) = op.next_batch().unwrap() {
//!     for row in batch.rows() {
//!         println!("{}", row); // running SUM appended as the last column
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`] - Core types ([`Value`], [`Row`], [`RowBatch`], [`Error`])
//! - [`window`] - The window specification, frame model, evaluators and
//!   operators

pub mod core;
pub mod window;

pub use crate::core::{BatchSource, DataType, Error, Result, Row, RowBatch, Value};
pub use crate::window::{
    ParallelWindowOperator, WindowConfig, WindowFuncDesc, WindowFuncKind, WindowOperator,
    WindowSpec,
};
