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

//! Query Executor
//!
//! This module evaluates compiled queries against traces.
//!
//! # Architecture
//!
//! Each candidate trace flows through the same steps:
//!
//! ```text
//! CandidateSource.scan()
//!   ↓
//! IndexedTrace (parent links, nested sets, corrupt spans)
//!   ↓
//! Evaluator (pipeline stages over span bitmaps)
//!   ↓
//! TraceResult (span limit, materialized fields)
//!   ↓
//! ResultAssembler (limit, most-recent ordering)
//! ```
//!
//! # Components
//!
//! - [`CompiledQuery`] - Parsed query with its pushdown conditions
//! - [`Evaluator`] - Per-trace pipeline evaluation
//! - [`FetchConditions`] - Conditions a storage layer can use for pruning
//! - [`ResultAssembler`] - Thread-safe result collection
//! - [`ExecutionContext`] - Cancellation, deadline and scan budget

pub mod context;
pub mod evaluator;
pub mod parallel;
pub mod pattern_cache;
pub mod pushdown;
pub mod query;
pub mod query_cache;
pub mod result;
pub mod search;
pub mod structural;

pub use context::{CancellationHandle, ExecutionContext, ExecutionStats};
pub use evaluator::{Cursor, Evaluator, Spanset};
pub use parallel::{ParallelConfig, WorkerPool};
pub use pattern_cache::{LiteralPatterns, RegexCache};
pub use pushdown::{
    global_pushdown_registry, Condition, FetchConditions, PushdownContext, PushdownRegistry,
    PushdownResult, PushdownRule, Requirement,
};
pub use query::CompiledQuery;
pub use query_cache::QueryCache;
pub use result::{
    ResultAssembler, SpanResult, SpansetResult, TraceResult, ROOT_SPAN_NOT_YET_RECEIVED,
};
pub use search::TraceSearch;
