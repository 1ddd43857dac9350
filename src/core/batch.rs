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

//! Bounded-size row batches and the pull interface between operators
//!
//! Rows travel between operators in [`RowBatch`]es of bounded capacity.
//! [`BatchSource`] is the pull contract: an upstream sort/partition operator
//! implements it, and the window operator both consumes and implements it.

use super::error::Result;
use super::row::Row;

/// Default maximum rows per batch
pub const DEFAULT_BATCH_CAPACITY: usize = 1024;

/// A bounded-capacity batch of rows
#[derive(Debug, Clone, Default)]
pub struct RowBatch {
    rows: Vec<Row>,
    max_rows: usize,
}

impl RowBatch {
    /// Create an empty batch with the given row capacity
    pub fn with_capacity(max_rows: usize) -> Self {
        let max_rows = max_rows.max(1);
        Self {
            rows: Vec::with_capacity(max_rows),
            max_rows,
        }
    }

    /// Create a batch directly from rows; capacity clamps to the row count
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let max_rows = rows.len().max(1);
        Self { rows, max_rows }
    }

    /// Maximum number of rows this batch holds
    #[inline]
    pub fn capacity(&self) -> usize {
        self.max_rows
    }

    /// Number of rows currently in the batch
    #[inline]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch has no rows
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the batch is at capacity
    #[inline]
    pub fn is_full(&self) -> bool {
        self.rows.len() >= self.max_rows
    }

    /// Append a row; panics if the batch is already full
    #[inline]
    pub fn push(&mut self, row: Row) {
        debug_assert!(!self.is_full(), "push into full RowBatch");
        self.rows.push(row);
    }

    /// Borrow the rows
    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Consume into rows
    #[inline]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

/// Pull-based producer of row batches
///
/// `next_batch` returns `Ok(None)` at end of input. Implementations are
/// `Send` so a parallel dispatcher can own the upstream on its own thread.
pub trait BatchSource: Send {
    /// Produce the next batch, or `None` at end of input
    fn next_batch(&mut self) -> Result<Option<RowBatch>>;
}

impl BatchSource for Box<dyn BatchSource> {
    fn next_batch(&mut self) -> Result<Option<RowBatch>> {
        (**self).next_batch()
    }
}

/// A [`BatchSource`] over pre-built batches, used by tests and adapters
pub struct VecBatchSource {
    batches: std::vec::IntoIter<RowBatch>,
}

impl VecBatchSource {
    /// Wrap a set of batches
    pub fn new(batches: Vec<RowBatch>) -> Self {
        Self {
            batches: batches.into_iter(),
        }
    }

    /// Split rows into batches of `batch_size` and wrap them
    pub fn from_rows(rows: Vec<Row>, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        let mut batches = Vec::new();
        let mut current = RowBatch::with_capacity(batch_size);
        for row in rows {
            if current.is_full() {
                batches.push(std::mem::replace(
                    &mut current,
                    RowBatch::with_capacity(batch_size),
                ));
            }
            current.push(row);
        }
        if !current.is_empty() {
            batches.push(current);
        }
        Self::new(batches)
    }
}

impl BatchSource for VecBatchSource {
    fn next_batch(&mut self) -> Result<Option<RowBatch>> {
        Ok(self.batches.next())
    }
}
