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

//! # traceql - Query engine for distributed-tracing data
//!
//! traceql evaluates TraceQL-style queries against traces: trees of spans
//! sharing one trace identifier. A query selects spans with attribute
//! conditions, relates them through the span tree, filters groups of spans
//! with aggregates, and returns the matching traces.
//!
//! ## Key Features
//!
//! - **Pratt Parser** - Positions and expected/found tokens on every syntax error
//! - **Condition Pushdown** - Extracted conditions let storage prune candidates
//! - **Structural Operators** - Descendant, child, sibling and their negated and union forms
//! - **Pipelines** - Aggregate filters, `by()` grouping, `coalesce()` and `select()`
//! - **Parallel Evaluation** - Traces are evaluated on a Rayon worker pool
//! - **Most-Recent Search** - Newest-first scanning over time windows
//!
//! ## Quick Start
//!
//! ```rust
//! use traceql::{Engine, MemoryStorage, SearchRequest, Span, Trace};
//!
//! let storage = MemoryStorage::new("example");
//! storage.insert(Trace::new(1, vec![
//!     Span::new(1, "GET /").with_times(0, 100),
//!     Span::new(2, "SELECT").with_parent(1).with_times(10, 60).with_attribute("db.system", "postgres"),
//! ]));
//!
//! let engine = Engine::sequential();
//! let response = engine
//!     .evaluate(r#"{ name = "GET /" } > { .db.system = "postgres" }"#, &SearchRequest::new(), &[&storage])
//!     .unwrap();
//! assert_eq!(response.traces.len(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`api`] - Public engine interface ([`api::Engine`])
//! - [`core`] - Core types ([`Static`], [`Operator`], [`EngineConfig`], [`Error`])
//! - [`model`] - Traces, spans and the indexed trace view
//! - [`parser`] - Query lexer and parser
//! - [`functions`] - Aggregate functions
//! - [`executor`] - Condition compiler, evaluator and result assembler
//! - [`storage`] - Candidate sources, indexes and OTLP/JSON loading
//! - [`common`] - Version information

// Use mimalloc as global allocator when feature is enabled
#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod api;
pub mod common;
pub mod core;
pub mod executor;
pub mod functions;
pub mod model;
pub mod parser;
pub mod storage;

// Re-export main types for convenience
pub use core::{
    AttributeScope, EngineConfig, Error, ExhaustedReason, Intrinsic, Kind, Operator, Result,
    Static, Status, StructuralOperator,
};

// Re-export model types
pub use model::{
    AttributeValue, Attributes, IndexedTrace, InstrumentationScope, Resource, Span, SpanEvent,
    SpanId, SpanLink, Trace, TraceId,
};

// Re-export parser entry points
pub use parser::{parse, parse_identifier, parse_query, tokenize, RootExpr};

// Re-export function types
pub use functions::{global_registry, AggregateFunction, FunctionInfo, FunctionRegistry};

// Re-export executor types
pub use executor::{
    CancellationHandle, CompiledQuery, ExecutionContext, ExecutionStats, FetchConditions,
    RegexCache, ResultAssembler, SpanResult, SpansetResult, TraceResult,
};

// Re-export storage types
pub use storage::{CandidateSource, MemoryStorage, StorageIndex, TimeRange, TraceStream};

// Re-export API types
pub use api::{Engine, SearchMetrics, SearchRequest, SearchResponse};

// Re-export version info
pub use common::{version, version_info};
