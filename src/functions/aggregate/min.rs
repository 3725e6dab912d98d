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

//! min() aggregate function

use std::cmp::Ordering;

use crate::core::Static;
use crate::functions::{AggregateFunction, FunctionInfo};

use super::keep_extreme;

/// min() aggregate function
///
/// Returns the smallest numeric value, keeping its type.
#[derive(Default)]
pub struct MinFunction {
    minimum: Static,
}

impl AggregateFunction for MinFunction {
    fn name(&self) -> &str {
        "min"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new("min", "Returns the minimum of the field over the spanset", true)
    }

    fn accumulate(&mut self, value: &Static) {
        keep_extreme(&mut self.minimum, value, Ordering::Less);
    }

    fn result(&self) -> Static {
        self.minimum.clone()
    }

    fn reset(&mut self) {
        self.minimum = Static::Nil;
    }

    fn clone_box(&self) -> Box<dyn AggregateFunction> {
        Box::new(MinFunction::default())
    }
}
