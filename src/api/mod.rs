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

//! Top-level Engine API
//!
//! This module provides the high-level search interface.
//!
//! # Quick Start
//!
//! ```ignore
//! use traceql::{Engine, EngineConfig, MemoryStorage, SearchRequest};
//!
//! let engine = Engine::new(EngineConfig::default())?;
//! let storage = MemoryStorage::open("traces.json")?;
//!
//! // Search with the default limits
//! let response = engine.evaluate("{ span.http.status_code >= 500 }", &SearchRequest::new(), &[&storage])?;
//!
//! // Newest traces first, at most 5
//! let request = SearchRequest::new().with_limit(5).with_most_recent(true);
//! let response = engine.evaluate("{ } | count() > 10", &request, &[&storage])?;
//!
//! // Strict callers treat truncation as an error
//! let response = response.ensure_complete()?;
//! ```

mod engine;
mod request;

pub use engine::Engine;
pub use request::{SearchMetrics, SearchRequest, SearchResponse};
