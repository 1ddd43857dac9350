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

//! Error types for Oriel
//!
//! This module defines all error types used throughout the window engine.

use thiserror::Error;

/// Result type alias for Oriel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for window evaluation
///
/// This enum covers all error cases including both sentinel errors
/// and structured errors with context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // =========================================================================
    // Argument errors
    // =========================================================================
    /// Invalid argument for a window function (non-positive NTILE n,
    /// negative LEAD/LAG offset, malformed NTH_VALUE index, ...)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A frame bound offset resolved to an invalid value at evaluation time
    #[error("invalid frame bound: {0}")]
    InvalidFrameBound(String),

    /// Malformed frame specification rejected at bind time
    #[error("invalid frame specification: {0}")]
    InvalidFrameSpec(String),

    /// Run-time parameter slot out of range
    #[error("parameter ${0} not bound")]
    ParameterNotBound(usize),

    // =========================================================================
    // Value errors
    // =========================================================================
    /// Type conversion error
    #[error("type conversion error: cannot convert {from} to {to}")]
    TypeConversion { from: String, to: String },

    /// Cannot compare incompatible types
    #[error("cannot compare incompatible types")]
    IncomparableTypes,

    /// Arithmetic overflow while accumulating
    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(String),

    /// Column index out of bounds for the input row
    #[error("column index {index} out of bounds")]
    ColumnIndexOutOfBounds { index: usize },

    // =========================================================================
    // Execution errors
    // =========================================================================
    /// Partition buffer exceeded its configured row cap
    #[error("partition too large: {rows} rows buffered, limit is {limit}")]
    ResourceExhausted { rows: usize, limit: usize },

    /// Query cancelled
    #[error("query cancelled")]
    QueryCancelled,

    /// A parallel worker pipeline failed and shut the operator down
    #[error("worker {worker} failed: {source}")]
    WorkerFailed {
        worker: usize,
        #[source]
        source: Box<Error>,
    },

    /// Internal error for unexpected conditions
    #[error("{message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Create a new InvalidFrameBound error
    pub fn invalid_frame_bound(message: impl Into<String>) -> Self {
        Error::InvalidFrameBound(message.into())
    }

    /// Create a new InvalidFrameSpec error
    pub fn invalid_frame_spec(message: impl Into<String>) -> Self {
        Error::InvalidFrameSpec(message.into())
    }

    /// Create a new TypeConversion error
    pub fn type_conversion(from: impl Into<String>, to: impl Into<String>) -> Self {
        Error::TypeConversion {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Create a new Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Wrap an error that escaped from a parallel worker
    pub fn worker_failed(worker: usize, source: Error) -> Self {
        Error::WorkerFailed {
            worker,
            source: Box::new(source),
        }
    }

    /// Check if this error is a caller mistake (bad arguments or bounds)
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Error::InvalidArgument(_)
                | Error::InvalidFrameBound(_)
                | Error::InvalidFrameSpec(_)
                | Error::ParameterNotBound(_)
        )
    }

    /// Check if this error terminated execution without producing a result
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ResourceExhausted { .. } | Error::QueryCancelled | Error::WorkerFailed { .. }
        )
    }
}
