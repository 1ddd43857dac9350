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

//! Data type tags for runtime values

use std::fmt;

/// Data type of a runtime [`Value`](super::Value)
///
/// NULL values carry a `DataType` hint so that a column that produced only
/// NULLs still reports a stable type to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Unknown / untyped NULL
    Null,
    /// 64-bit signed integer
    Integer,
    /// 64-bit floating point
    Float,
    /// Fixed-point decimal
    Decimal,
    /// UTF-8 text
    Text,
    /// Boolean
    Boolean,
    /// Timestamp (UTC)
    Timestamp,
}

impl DataType {
    /// Whether values of this type support numeric RANGE-frame arithmetic
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Float | DataType::Decimal)
    }

    /// Whether values of this type support interval RANGE-frame arithmetic
    pub fn is_temporal(&self) -> bool {
        matches!(self, DataType::Timestamp)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Null => "NULL",
            DataType::Integer => "INTEGER",
            DataType::Float => "FLOAT",
            DataType::Decimal => "DECIMAL",
            DataType::Text => "TEXT",
            DataType::Boolean => "BOOLEAN",
            DataType::Timestamp => "TIMESTAMP",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_classification() {
        assert!(DataType::Integer.is_numeric());
        assert!(DataType::Float.is_numeric());
        assert!(DataType::Decimal.is_numeric());
        assert!(!DataType::Text.is_numeric());
        assert!(!DataType::Timestamp.is_numeric());
        assert!(DataType::Timestamp.is_temporal());
    }

    #[test]
    fn test_display() {
        assert_eq!(DataType::Integer.to_string(), "INTEGER");
        assert_eq!(DataType::Timestamp.to_string(), "TIMESTAMP");
    }
}
