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

//! Window function evaluation over pre-sorted row streams
//!
//! Input arrives already grouped by partition key and ordered by the order
//! keys; the operator buffers one partition at a time, evaluates every bound
//! window function against it, and appends one result column per function.

pub mod evaluator;
pub mod frame;
pub mod functions;
pub mod operator;
pub mod parallel;
pub mod partition;
pub mod spec;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use evaluator::FunctionEval;
pub use frame::{FrameModel, PartitionOrder};
pub use operator::WindowOperator;
pub use parallel::ParallelWindowOperator;
pub use partition::PartitionBuffer;
pub use spec::{
    ArgSource, FrameBound, FrameSpec, FrameUnit, FuncFamily, NullOrder, OffsetSource, OrderKey,
    PartitionKey, SortDirection, WindowFuncDesc, WindowFuncKind, WindowSpec,
};

/// How frames are turned into aggregate values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvaluatorStrategy {
    /// Rebuild the accumulator for every row's frame; the correctness oracle
    Naive,
    /// Advance both frame ends monotonically with O(1) add and remove
    #[default]
    Sliding,
}

/// Numeric accumulation mode for Float sums
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrecisionMode {
    /// Accumulate Float inputs through fixed-point decimals
    #[default]
    HighPrecision,
    /// Plain f64 add and subtract
    Fast,
}

/// Execution knobs for the window operator
#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// Worker pipelines; 1 runs single-threaded in the caller
    pub concurrency: usize,
    pub strategy: EvaluatorStrategy,
    pub precision: PrecisionMode,
    /// Output batch capacity in rows
    pub batch_capacity: usize,
    /// Cap on rows buffered for one partition, `None` for unlimited
    pub max_buffered_rows: Option<usize>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            concurrency: 1,
            strategy: EvaluatorStrategy::default(),
            precision: PrecisionMode::default(),
            batch_capacity: crate::core::DEFAULT_BATCH_CAPACITY,
            max_buffered_rows: None,
        }
    }
}

/// Advisory diagnostic raised during binding, never fatal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Shared cancellation flag, cloneable across threads
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
