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

//! Parallel window evaluation across hash-sharded partitions
//!
//! A dispatcher thread pulls the sorted input, stamps every row with a global
//! sequence number and routes it by partition-key hash to one of N worker
//! pipelines. Each worker runs a private single-threaded [`WindowOperator`]
//! over the rows it receives; a partition's rows always hash to the same
//! worker, so each worker sees whole partitions in input order. The merge
//! stage restores global order by consuming sequence numbers in turn, which
//! makes the parallel operator's output byte-identical to the serial one.
//!
//! Worker input channels are bounded for backpressure against the
//! dispatcher; worker output channels are unbounded so the merge stage can
//! never deadlock a worker that still needs input.

use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{bounded, unbounded, Receiver, Select, Sender};
use parking_lot::Mutex;
use rustc_hash::FxHasher;

use crate::core::{BatchSource, Error, Result, Row, RowBatch, Value};

use super::operator::{frame_clause_notices, WindowOperator};
use super::spec::{PartitionKey, WindowSpec};
use super::{CancelToken, Notice, WindowConfig};

/// Rows queued per worker input channel before the dispatcher blocks
const WORKER_INPUT_DEPTH: usize = 4;

type SeqRow = (u64, Row);

fn shard_of(key: &PartitionKey, workers: usize) -> usize {
    let mut h = FxHasher::default();
    key.hash(&mut h);
    (h.finish() as usize) % workers
}

/// Rows for one worker, fed by the dispatcher
///
/// Sequence numbers are parked in a side queue the worker drains as results
/// come out; the inner operator emits exactly one row per input row in input
/// order, so the queues stay aligned.
struct ShardSource {
    rx: Receiver<Vec<SeqRow>>,
    seqs: Arc<Mutex<VecDeque<u64>>>,
    batch_capacity: usize,
}

impl BatchSource for ShardSource {
    fn next_batch(&mut self) -> Result<Option<RowBatch>> {
        match self.rx.recv() {
            Ok(chunk) => {
                let mut batch = RowBatch::with_capacity(self.batch_capacity.max(chunk.len()));
                let mut seqs = self.seqs.lock();
                for (seq, row) in chunk {
                    seqs.push_back(seq);
                    batch.push(row);
                }
                Ok(Some(batch))
            }
            // dispatcher hung up: this shard's input is complete
            Err(_) => Ok(None),
        }
    }
}

struct WorkerEnd {
    rx: Receiver<SeqRow>,
    peek: Option<SeqRow>,
    done: bool,
}

pub struct ParallelWindowOperator {
    workers: Vec<WorkerEnd>,
    handles: Vec<JoinHandle<()>>,
    batch_capacity: usize,
    next_seq: u64,
    cancel: CancelToken,
    /// First error raised by any stage
    failure: Arc<Mutex<Option<Error>>>,
    notices: Vec<Notice>,
    finished: bool,
}

impl ParallelWindowOperator {
    pub fn new(
        mut source: Box<dyn BatchSource>,
        spec: WindowSpec,
        params: &[Value],
        config: &WindowConfig,
    ) -> Result<Self> {
        spec.validate()?;
        let concurrency = config.concurrency.max(2);
        let cancel = CancelToken::new();
        let failure: Arc<Mutex<Option<Error>>> = Arc::new(Mutex::new(None));
        let notices = frame_clause_notices(&spec);

        let mut handles = Vec::with_capacity(concurrency + 1);
        let mut input_txs = Vec::with_capacity(concurrency);
        let mut workers = Vec::with_capacity(concurrency);

        for worker_idx in 0..concurrency {
            let (in_tx, in_rx) = bounded::<Vec<SeqRow>>(WORKER_INPUT_DEPTH);
            let (out_tx, out_rx) = unbounded::<SeqRow>();
            input_txs.push(in_tx);
            workers.push(WorkerEnd {
                rx: out_rx,
                peek: None,
                done: false,
            });

            let seqs: Arc<Mutex<VecDeque<u64>>> = Arc::new(Mutex::new(VecDeque::new()));
            let shard = ShardSource {
                rx: in_rx,
                seqs: Arc::clone(&seqs),
                batch_capacity: config.batch_capacity,
            };
            let spec = spec.clone();
            let params = params.to_vec();
            let worker_config = WindowConfig {
                concurrency: 1,
                ..config.clone()
            };
            let cancel = cancel.clone();
            let failure = Arc::clone(&failure);

            handles.push(std::thread::spawn(move || {
                let result = run_worker(shard, spec, &params, &worker_config, seqs, out_tx, &cancel);
                if let Err(err) = result {
                    log::error!("window worker {} failed: {}", worker_idx, err);
                    let mut slot = failure.lock();
                    if slot.is_none() {
                        *slot = Some(Error::worker_failed(worker_idx, err));
                    }
                    cancel.cancel();
                }
            }));
        }

        // Dispatch stage: route whole rows by partition-key hash, preserving
        // a global sequence number for the merge.
        {
            let spec = spec.clone();
            let cancel = cancel.clone();
            let failure = Arc::clone(&failure);
            handles.push(std::thread::spawn(move || {
                let result = run_dispatcher(source.as_mut(), &spec, concurrency, input_txs, &cancel);
                if let Err(err) = result {
                    log::error!("window dispatcher failed: {}", err);
                    let mut slot = failure.lock();
                    if slot.is_none() {
                        *slot = Some(err);
                    }
                    cancel.cancel();
                }
            }));
        }

        Ok(ParallelWindowOperator {
            workers,
            handles,
            batch_capacity: config.batch_capacity.max(1),
            next_seq: 0,
            cancel,
            failure,
            notices,
            finished: false,
        })
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    fn take_failure(&self) -> Option<Error> {
        self.failure.lock().take()
    }

    /// Pull the row carrying `next_seq`, blocking until its owner surfaces it
    fn next_row(&mut self) -> Result<Option<Row>> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(self.take_failure().unwrap_or(Error::QueryCancelled));
            }
            if let Some(end) = self
                .workers
                .iter_mut()
                .find(|end| matches!(&end.peek, Some((seq, _)) if *seq == self.next_seq))
            {
                let (_, row) = end
                    .peek
                    .take()
                    .ok_or_else(|| Error::internal("merge peek vanished"))?;
                self.next_seq += 1;
                return Ok(Some(row));
            }
            if self.workers.iter().all(|end| end.done && end.peek.is_none()) {
                if let Some(err) = self.take_failure() {
                    return Err(err);
                }
                return Ok(None);
            }
            // the owner of next_seq has not surfaced yet; wait on whichever
            // lagging worker delivers first rather than polling them in
            // index order
            let (idx, received) = {
                let mut sel = Select::new();
                let mut lagging = Vec::new();
                for (idx, end) in self.workers.iter().enumerate() {
                    if end.peek.is_none() && !end.done {
                        sel.recv(&end.rx);
                        lagging.push(idx);
                    }
                }
                if lagging.is_empty() {
                    // a worker died owing next_seq; wait for its failure to
                    // land
                    std::thread::yield_now();
                    continue;
                }
                let op = sel.select();
                let idx = lagging[op.index()];
                (idx, op.recv(&self.workers[idx].rx))
            };
            let end = &mut self.workers[idx];
            match received {
                Ok(pair) => end.peek = Some(pair),
                Err(_) => end.done = true,
            }
        }
    }

    fn join_stages(&mut self) {
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl BatchSource for ParallelWindowOperator {
    fn next_batch(&mut self) -> Result<Option<RowBatch>> {
        if self.finished {
            return Ok(None);
        }
        let mut batch = RowBatch::with_capacity(self.batch_capacity);
        while !batch.is_full() {
            match self.next_row() {
                Ok(Some(row)) => batch.push(row),
                Ok(None) => {
                    self.finished = true;
                    self.join_stages();
                    break;
                }
                Err(err) => {
                    self.finished = true;
                    self.cancel.cancel();
                    self.join_stages();
                    return Err(err);
                }
            }
        }
        if batch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }
}

impl Drop for ParallelWindowOperator {
    fn drop(&mut self) {
        self.cancel.cancel();
        // unblock workers by dropping our channel ends before joining
        self.workers.clear();
        self.join_stages();
    }
}

fn run_dispatcher(
    source: &mut dyn BatchSource,
    spec: &WindowSpec,
    concurrency: usize,
    input_txs: Vec<Sender<Vec<SeqRow>>>,
    cancel: &CancelToken,
) -> Result<()> {
    let mut seq = 0u64;
    while let Some(batch) = source.next_batch()? {
        if cancel.is_cancelled() {
            return Ok(());
        }
        let mut chunks: Vec<Vec<SeqRow>> = vec![Vec::new(); concurrency];
        for row in batch.into_rows() {
            let key = spec.partition_key(&row)?;
            chunks[shard_of(&key, concurrency)].push((seq, row));
            seq += 1;
        }
        for (chunk, tx) in chunks.into_iter().zip(&input_txs) {
            if !chunk.is_empty() && tx.send(chunk).is_err() {
                // worker gone; its failure slot explains why
                return Ok(());
            }
        }
    }
    Ok(())
}

fn run_worker(
    shard: ShardSource,
    spec: WindowSpec,
    params: &[Value],
    config: &WindowConfig,
    seqs: Arc<Mutex<VecDeque<u64>>>,
    out_tx: Sender<SeqRow>,
    cancel: &CancelToken,
) -> Result<()> {
    let mut op = WindowOperator::new_quiet(shard, spec, params, config)?;
    while let Some(batch) = op.next_batch()? {
        if cancel.is_cancelled() {
            return Ok(());
        }
        for row in batch.into_rows() {
            let seq = seqs
                .lock()
                .pop_front()
                .ok_or_else(|| Error::internal("worker emitted more rows than it received"))?;
            if out_tx.send((seq, row)).is_err() {
                // merge side dropped; treat as cancellation
                return Ok(());
            }
        }
    }
    Ok(())
}
