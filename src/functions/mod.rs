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

//! Functions
//!
//! Aggregate functions reduce a spanset to one value for scalar filters
//! such as `avg(duration) > 1s`. Each aggregate implements
//! [`AggregateFunction`] and is created through the [`FunctionRegistry`].

pub mod aggregate;
pub mod registry;

pub use aggregate::{AvgFunction, CountFunction, MaxFunction, MinFunction, SumFunction};
pub use registry::{global_registry, FunctionRegistry};

use crate::core::Static;

/// Metadata about an aggregate function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    /// Function name as written in queries
    pub name: &'static str,
    /// Description
    pub description: &'static str,
    /// Whether the function takes a field argument
    pub takes_field: bool,
}

impl FunctionInfo {
    pub const fn new(name: &'static str, description: &'static str, takes_field: bool) -> Self {
        Self {
            name,
            description,
            takes_field,
        }
    }
}

/// Trait for aggregate functions
///
/// The evaluator calls `accumulate` once per span of a spanset with the
/// span's field value (nil for `count()`), then reads `result`.
pub trait AggregateFunction: Send + Sync {
    /// Get the function name
    fn name(&self) -> &str;

    /// Get function information
    fn info(&self) -> FunctionInfo;

    /// Accumulate one span's value
    fn accumulate(&mut self, value: &Static);

    /// Get the final result; nil when nothing numeric was accumulated
    fn result(&self) -> Static;

    /// Reset the aggregate state
    fn reset(&mut self);

    /// Create a fresh instance of the same function
    fn clone_box(&self) -> Box<dyn AggregateFunction>;
}
