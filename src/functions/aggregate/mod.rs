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

//! Aggregate Functions
//!
//! - [`CountFunction`] - count()
//! - [`AvgFunction`] - avg(field)
//! - [`MinFunction`] - min(field)
//! - [`MaxFunction`] - max(field)
//! - [`SumFunction`] - sum(field)
//!
//! Field aggregates skip spans whose value is absent or not numeric.

mod avg;
mod count;
mod max;
mod min;
mod sum;

pub use avg::AvgFunction;
pub use count::CountFunction;
pub use max::MaxFunction;
pub use min::MinFunction;
pub use sum::SumFunction;

use std::cmp::Ordering;

use crate::core::Static;

/// Keep the more extreme of `current` and `value`
///
/// `wanted` is the ordering `value` must have against `current` to replace it.
fn keep_extreme(current: &mut Static, value: &Static, wanted: Ordering) {
    if !value.is_numeric() {
        return;
    }
    if current.is_nil() || value.query_cmp(current) == Some(wanted) {
        *current = value.clone();
    }
}
