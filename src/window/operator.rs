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

//! Single-threaded window operator
//!
//! Pulls pre-sorted batches from upstream, splits them at partition key
//! boundaries, evaluates every window function of the spec per partition and
//! appends one result column per function to each row. Output batches are
//! re-packed to the configured capacity regardless of input batch shape.
//!
//! ROWS frames with a bounded end stream: their rows are emitted as soon as
//! enough lookahead is buffered, while the partition is still open. All
//! other shapes emit at partition close.

use std::collections::VecDeque;

use crate::core::{BatchSource, Error, Result, Row, RowBatch, Value};

use super::evaluator::FunctionEval;
use super::frame::PartitionOrder;
use super::partition::PartitionBuffer;
use super::spec::WindowSpec;
use super::{CancelToken, Notice, WindowConfig};

pub struct WindowOperator<S: BatchSource> {
    source: S,
    spec: WindowSpec,
    funcs: Vec<FunctionEval>,
    batch_capacity: usize,
    max_buffered_rows: Option<usize>,
    /// Worst-case lookahead over all functions; `None` disables streaming
    stream_lookahead: Option<usize>,
    open: Option<PartitionBuffer>,
    /// Rows of the open partition already pushed to `pending`
    emitted: usize,
    pending: VecDeque<Row>,
    input_done: bool,
    cancel: CancelToken,
    notices: Vec<Notice>,
}

impl<S: BatchSource> WindowOperator<S> {
    pub fn new(
        source: S,
        spec: WindowSpec,
        params: &[Value],
        config: &WindowConfig,
    ) -> Result<Self> {
        Self::bind(source, spec, params, config, false)
    }

    /// Bind without raising notices; used by parallel workers whose shared
    /// dispatcher has already raised them once
    pub(crate) fn new_quiet(
        source: S,
        spec: WindowSpec,
        params: &[Value],
        config: &WindowConfig,
    ) -> Result<Self> {
        Self::bind(source, spec, params, config, true)
    }

    fn bind(
        source: S,
        spec: WindowSpec,
        params: &[Value],
        config: &WindowConfig,
        quiet: bool,
    ) -> Result<Self> {
        spec.validate()?;

        let notices = if quiet {
            Vec::new()
        } else {
            frame_clause_notices(&spec)
        };
        let mut funcs = Vec::with_capacity(spec.functions.len());
        for desc in &spec.functions {
            funcs.push(FunctionEval::bind(
                desc.clone(),
                &spec.order_by,
                params,
                config.strategy,
                config.precision,
            )?);
        }

        // Streaming needs every function's frame end known within bounded
        // lookahead; one close-only function pins the whole partition.
        let stream_lookahead = funcs
            .iter()
            .map(|f| f.stream_lookahead())
            .fold(Some(0usize), |acc, la| match (acc, la) {
                (Some(a), Some(b)) => Some(a.max(b)),
                _ => None,
            });

        Ok(WindowOperator {
            source,
            spec,
            funcs,
            batch_capacity: config.batch_capacity.max(1),
            max_buffered_rows: config.max_buffered_rows,
            stream_lookahead,
            open: None,
            emitted: 0,
            pending: VecDeque::new(),
            input_done: false,
            cancel: CancelToken::new(),
            notices,
        })
    }

    /// Advisory notices raised while binding the spec
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Handle for cancelling this operator from another thread
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    fn absorb(&mut self, batch: RowBatch) -> Result<()> {
        let max_rows = self.max_buffered_rows;
        for row in batch.into_rows() {
            let key = self.spec.partition_key(&row)?;
            let boundary = !matches!(&self.open, Some(buf) if *buf.key() == key);
            if boundary {
                self.close_open()?;
            }
            let buf = self
                .open
                .get_or_insert_with(|| PartitionBuffer::new(key, max_rows));
            buf.push(row)?;
        }
        self.stream_ready()
    }

    /// Emit rows of the open partition whose frames are fully buffered
    fn stream_ready(&mut self) -> Result<()> {
        let Some(lookahead) = self.stream_lookahead else {
            return Ok(());
        };
        let Some(buf) = &self.open else {
            return Ok(());
        };
        let upto = buf.len().saturating_sub(lookahead);
        if upto <= self.emitted {
            return Ok(());
        }
        let rows = buf.rows();
        let mut cols = Vec::with_capacity(self.funcs.len());
        for f in &mut self.funcs {
            cols.push(f.eval_prefix(rows, upto)?);
        }
        append_output(&mut self.pending, rows, &cols, self.emitted, upto);
        self.emitted = upto;
        Ok(())
    }

    /// Evaluate and emit everything still owed by the open partition
    fn close_open(&mut self) -> Result<()> {
        let Some(buf) = self.open.take() else {
            return Ok(());
        };
        let (_key, rows) = buf.close();
        let ord = PartitionOrder::build(&rows, &self.spec.order_by)?;
        let mut cols = Vec::with_capacity(self.funcs.len());
        for f in &mut self.funcs {
            cols.push(f.finish(&rows, &ord)?);
        }
        append_output(&mut self.pending, &rows, &cols, self.emitted, rows.len());
        for f in &mut self.funcs {
            f.reset();
        }
        self.emitted = 0;
        Ok(())
    }

    fn drain_batch(&mut self) -> RowBatch {
        let take = self.pending.len().min(self.batch_capacity);
        let mut batch = RowBatch::with_capacity(self.batch_capacity);
        for row in self.pending.drain(..take) {
            batch.push(row);
        }
        batch
    }
}

/// Advisory notices for explicit frame clauses on frame-ignoring functions,
/// logged and raised once per function occurrence
pub(crate) fn frame_clause_notices(spec: &WindowSpec) -> Vec<Notice> {
    let mut notices = Vec::new();
    for desc in &spec.functions {
        if desc.kind.ignores_frame() && desc.frame.is_some() {
            let window = desc.window_name.as_deref().unwrap_or("<unnamed window>");
            let message = format!(
                "Window function '{}' ignores the frame clause of window '{}' \
                 and aggregates over the whole partition",
                desc.kind.name(),
                window
            );
            log::warn!("{}", message);
            notices.push(Notice { message });
        }
    }
    notices
}

/// Clone partition rows `[from, upto)` into the output queue, appending the
/// per-function result columns (indexed from `from`)
fn append_output(
    pending: &mut VecDeque<Row>,
    rows: &[Row],
    cols: &[Vec<Value>],
    from: usize,
    upto: usize,
) {
    for (off, idx) in (from..upto).enumerate() {
        let mut out = rows[idx].clone();
        for col in cols {
            out.push(col[off].clone());
        }
        pending.push_back(out);
    }
}

impl<S: BatchSource> BatchSource for WindowOperator<S> {
    fn next_batch(&mut self) -> Result<Option<RowBatch>> {
        loop {
            if self.cancel.is_cancelled() {
                self.open = None;
                self.pending.clear();
                return Err(Error::QueryCancelled);
            }
            if self.pending.len() >= self.batch_capacity {
                return Ok(Some(self.drain_batch()));
            }
            if self.input_done {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.drain_batch()));
            }
            match self.source.next_batch()? {
                Some(batch) => self.absorb(batch)?,
                None => {
                    self.input_done = true;
                    self.close_open()?;
                }
            }
        }
    }
}
