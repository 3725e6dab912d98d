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

//! sum() aggregate function

use crate::core::Static;
use crate::functions::{AggregateFunction, FunctionInfo};

/// sum() aggregate function
///
/// Integers sum to an integer (widening to float on overflow), durations
/// to a duration; mixed inputs follow the usual arithmetic rules. A sum
/// that overflows even as a float stays nil.
#[derive(Default)]
pub struct SumFunction {
    sum: Static,
    overflowed: bool,
}

impl AggregateFunction for SumFunction {
    fn name(&self) -> &str {
        "sum"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new("sum", "Returns the sum of the field over the spanset", true)
    }

    fn accumulate(&mut self, value: &Static) {
        if value.is_numeric() && !self.overflowed {
            self.overflowed = !self.sum.sum_into(value);
        }
    }

    fn result(&self) -> Static {
        if self.overflowed {
            return Static::Nil;
        }
        self.sum.clone()
    }

    fn reset(&mut self) {
        self.sum = Static::Nil;
        self.overflowed = false;
    }

    fn clone_box(&self) -> Box<dyn AggregateFunction> {
        Box::new(SumFunction::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_integers() {
        let mut sum = SumFunction::default();
        sum.accumulate(&Static::Int(1));
        sum.accumulate(&Static::Int(2));
        sum.accumulate(&Static::Nil);
        assert_eq!(sum.result(), Static::Int(3));
    }

    #[test]
    fn test_sum_overflow_widens() {
        let mut sum = SumFunction::default();
        sum.accumulate(&Static::Int(i64::MAX));
        sum.accumulate(&Static::Int(1));
        assert!(matches!(sum.result(), Static::Float(_)));
    }

    #[test]
    fn test_sum_float_overflow_stays_nil() {
        let mut sum = SumFunction::default();
        sum.accumulate(&Static::Float(f64::MAX));
        sum.accumulate(&Static::Float(f64::MAX));
        sum.accumulate(&Static::Float(1.0));
        assert!(sum.result().is_nil());
        sum.reset();
        sum.accumulate(&Static::Float(1.0));
        assert_eq!(sum.result(), Static::Float(1.0));
    }

    #[test]
    fn test_sum_empty_is_nil() {
        assert!(SumFunction::default().result().is_nil());
    }
}
