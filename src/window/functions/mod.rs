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

//! Per-function evaluation kernels grouped by family

pub mod aggregate;
pub mod extremal;
pub mod navigation;
pub mod ntile;
pub mod rank;

pub use aggregate::{AvgState, BitOp, BitState, CountState, SumState};
pub use extremal::{Extreme, MinMaxDeque};
pub use navigation::{eval_first_value, eval_lag, eval_last_value, eval_lead, eval_nth_value};
pub use ntile::eval_ntile;
pub use rank::eval_rank;
