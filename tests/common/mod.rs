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

//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use traceql::{
    Engine, Kind, MemoryStorage, Resource, SearchRequest, SearchResponse, Span, Status, Trace,
};

pub const SECOND: u64 = 1_000_000_000;
pub const MILLI: u64 = 1_000_000;

/// Root `A` -> `B` -> `C` in service "frontend"
pub fn chain_trace(id: u128) -> Trace {
    let resource = Arc::new(Resource::service("frontend"));
    let base = id as u64 * SECOND;
    Trace::new(
        id,
        vec![
            Span::new(1, "A")
                .with_times(base, base + 100 * MILLI)
                .with_kind(Kind::Server)
                .with_resource(resource.clone()),
            Span::new(2, "B")
                .with_parent(1)
                .with_times(base + 10 * MILLI, base + 60 * MILLI)
                .with_resource(resource.clone()),
            Span::new(3, "C")
                .with_parent(2)
                .with_times(base + 20 * MILLI, base + 30 * MILLI)
                .with_attribute("foo", "embedded-bar-text")
                .with_resource(resource),
        ],
    )
}

/// An HTTP server span calling `calls` downstream spans
///
/// Every third call fails with status 500 and takes a second.
pub fn http_trace(id: u128, service: &str, calls: u64) -> Trace {
    let frontend = Arc::new(Resource::service(service));
    let backend = Arc::new(Resource::service("backend"));
    let base = id as u64 * SECOND;
    let mut spans = vec![Span::new(1, "GET /api")
        .with_kind(Kind::Server)
        .with_times(base, base + 2 * SECOND)
        .with_attribute("http.method", "GET")
        .with_attribute("http.status_code", 200i64)
        .with_resource(frontend)];
    for i in 0..calls {
        let failed = i % 3 == 2;
        let start = base + i * 10 * MILLI;
        let end = if failed { start + SECOND } else { start + 5 * MILLI };
        let mut span = Span::new(10 + i, format!("call-{}", i))
            .with_parent(1)
            .with_kind(Kind::Client)
            .with_times(start, end)
            .with_attribute("http.status_code", if failed { 500i64 } else { 200i64 })
            .with_attribute("retries", i as i64)
            .with_resource(backend.clone());
        if failed {
            span = span.with_status(Status::Error, "upstream failed");
        }
        spans.push(span);
    }
    Trace::new(id, spans)
}

pub fn storage_of(traces: impl IntoIterator<Item = Trace>) -> MemoryStorage {
    let storage = MemoryStorage::new("fixture");
    for trace in traces {
        storage.insert(trace);
    }
    storage
}

pub fn search(storage: &MemoryStorage, query: &str) -> SearchResponse {
    search_with(storage, query, SearchRequest::new())
}

pub fn search_with(storage: &MemoryStorage, query: &str, request: SearchRequest) -> SearchResponse {
    Engine::sequential()
        .evaluate(query, &request, &[storage])
        .unwrap_or_else(|e| panic!("query {:?} failed: {}", query, e))
}

/// Trace ids of a response, sorted
pub fn matched_ids(response: &SearchResponse) -> Vec<u128> {
    let mut ids: Vec<u128> = response.traces.iter().map(|t| t.trace_id.0).collect();
    ids.sort_unstable();
    ids
}

/// Does `query` match the single trace
pub fn matches(trace: Trace, query: &str) -> bool {
    let engine = Engine::sequential();
    let compiled = engine
        .compile(query)
        .unwrap_or_else(|e| panic!("query {:?} failed: {}", query, e));
    engine
        .evaluate_trace(&compiled, Arc::new(trace), 0)
        .is_some()
}
