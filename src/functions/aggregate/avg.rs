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

//! avg() aggregate function

use crate::core::{Operator, Static};
use crate::functions::{AggregateFunction, FunctionInfo};

/// avg() aggregate function
///
/// Returns the mean of the numeric values. Durations average to a
/// duration; any other numeric input averages to a float.
#[derive(Default)]
pub struct AvgFunction {
    sum: Static,
    count: i64,
    overflowed: bool,
}

impl AggregateFunction for AvgFunction {
    fn name(&self) -> &str {
        "avg"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new("avg", "Returns the average of the field over the spanset", true)
    }

    fn accumulate(&mut self, value: &Static) {
        if !value.is_numeric() || self.overflowed {
            return;
        }
        self.overflowed = !self.sum.sum_into(value);
        self.count += 1;
    }

    fn result(&self) -> Static {
        if self.count == 0 || self.overflowed {
            return Static::Nil;
        }
        match self.sum {
            Static::Duration(_) => {
                Static::binary(Operator::Div, &self.sum, &Static::Int(self.count))
            }
            _ => match self.sum.as_f64() {
                Some(sum) => Static::Float(sum / self.count as f64),
                None => Static::Nil,
            },
        }
    }

    fn reset(&mut self) {
        self.sum = Static::Nil;
        self.count = 0;
        self.overflowed = false;
    }

    fn clone_box(&self) -> Box<dyn AggregateFunction> {
        Box::new(AvgFunction::default())
    }
}
