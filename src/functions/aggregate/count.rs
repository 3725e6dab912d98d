// Copyright 2025 Stoolap Contributors
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

//! count() aggregate function

use crate::core::Static;
use crate::functions::{AggregateFunction, FunctionInfo};

/// count() aggregate function
///
/// Returns the number of spans in the spanset.
#[derive(Default)]
pub struct CountFunction {
    count: i64,
}

impl AggregateFunction for CountFunction {
    fn name(&self) -> &str {
        "count"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new("count", "Returns the number of spans in the spanset", false)
    }

    fn accumulate(&mut self, _value: &Static) {
        self.count += 1;
    }

    fn result(&self) -> Static {
        Static::Int(self.count)
    }

    fn reset(&mut self) {
        self.count = 0;
    }

    fn clone_box(&self) -> Box<dyn AggregateFunction> {
        Box::new(CountFunction::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_counts_every_span() {
        let mut count = CountFunction::default();
        count.accumulate(&Static::Nil);
        count.accumulate(&Static::Int(7));
        count.accumulate(&Static::from("x"));
        assert_eq!(count.result(), Static::Int(3));
    }

    #[test]
    fn test_count_empty_and_reset() {
        let mut count = CountFunction::default();
        assert_eq!(count.result(), Static::Int(0));
        count.accumulate(&Static::Nil);
        count.reset();
        assert_eq!(count.result(), Static::Int(0));
    }
}
