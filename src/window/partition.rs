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

//! Buffer for the currently open partition
//!
//! Rows accumulate across input batch boundaries until the partition key
//! changes or the input ends. A configurable row cap turns a runaway
//! partition into an error instead of unbounded memory growth.

use crate::core::{Error, Result, Row};

use super::spec::PartitionKey;

#[derive(Debug)]
pub struct PartitionBuffer {
    key: PartitionKey,
    rows: Vec<Row>,
    max_rows: Option<usize>,
}

impl PartitionBuffer {
    pub fn new(key: PartitionKey, max_rows: Option<usize>) -> Self {
        PartitionBuffer {
            key,
            rows: Vec::new(),
            max_rows,
        }
    }

    /// Key tuple every buffered row shares
    pub fn key(&self) -> &PartitionKey {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn push(&mut self, row: Row) -> Result<()> {
        if let Some(limit) = self.max_rows {
            if self.rows.len() >= limit {
                return Err(Error::ResourceExhausted {
                    rows: self.rows.len() + 1,
                    limit,
                });
            }
        }
        self.rows.push(row);
        Ok(())
    }

    /// Hand the completed partition to evaluation
    pub fn close(self) -> (PartitionKey, Vec<Row>) {
        (self.key, self.rows)
    }
}
