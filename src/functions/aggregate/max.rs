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

//! max() aggregate function

use std::cmp::Ordering;

use crate::core::Static;
use crate::functions::{AggregateFunction, FunctionInfo};

use super::keep_extreme;

/// max() aggregate function
///
/// Returns the largest numeric value, keeping its type.
#[derive(Default)]
pub struct MaxFunction {
    maximum: Static,
}

impl AggregateFunction for MaxFunction {
    fn name(&self) -> &str {
        "max"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new("max", "Returns the maximum of the field over the spanset", true)
    }

    fn accumulate(&mut self, value: &Static) {
        keep_extreme(&mut self.maximum, value, Ordering::Greater);
    }

    fn result(&self) -> Static {
        self.maximum.clone()
    }

    fn reset(&mut self) {
        self.maximum = Static::Nil;
    }

    fn clone_box(&self) -> Box<dyn AggregateFunction> {
        Box::new(MaxFunction::default())
    }
}
