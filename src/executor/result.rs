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

//! Search results and the result assembler
//!
//! Workers turn each matching trace into a [`TraceResult`] and hand it to a
//! shared [`ResultAssembler`], which enforces the trace limit. In the
//! default mode the assembler is done once `limit` distinct traces arrived.
//! In most-recent mode it keeps the `limit` traces with the latest start
//! times seen so far.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::core::Static;
use crate::model::{SpanId, TraceId};
use crate::parser::Attribute;

use super::evaluator::{Cursor, Evaluator, Spanset};

/// Root service name reported for traces whose root span is missing
pub const ROOT_SPAN_NOT_YET_RECEIVED: &str = "<root span not yet received>";

const NANOS_PER_MILLI: i64 = 1_000_000;

/// One span of a result spanset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanResult {
    pub span_id: SpanId,
    pub name: String,
    pub start_time_unix_nano: u64,
    pub duration_nanos: i64,
    /// Selected fields and fields read by filters, absent ones omitted
    #[serde(serialize_with = "serialize_pairs")]
    pub attributes: Vec<(String, Static)>,
}

/// A surviving spanset, truncated to the span limit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpansetResult {
    pub spans: Vec<SpanResult>,
    /// Number of spans before truncation
    pub matched: usize,
    #[serde(serialize_with = "serialize_pairs")]
    pub attributes: Vec<(String, Static)>,
}

/// One matching trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceResult {
    pub trace_id: TraceId,
    pub root_service_name: String,
    pub root_trace_name: String,
    pub start_time_unix_nano: u64,
    pub duration_ms: u64,
    pub spansets: Vec<SpansetResult>,
}

impl TraceResult {
    /// Build the result for one evaluated trace
    pub fn build(
        evaluator: &Evaluator<'_>,
        spansets: &[Spanset],
        span_limit: usize,
        fields: &[Attribute],
    ) -> Self {
        let trace = evaluator.trace();
        let root = trace.root();
        let duration_ms = u64::try_from(trace.duration() / NANOS_PER_MILLI).unwrap_or(0);

        let spansets = spansets
            .iter()
            .map(|ss| SpansetResult {
                spans: ss
                    .spans
                    .iter()
                    .take(span_limit)
                    .map(|span| span_result(evaluator, span, fields))
                    .collect(),
                matched: ss.len(),
                attributes: ss.attributes.clone(),
            })
            .collect();

        Self {
            trace_id: trace.trace().trace_id,
            root_service_name: root
                .map(|span| span.resource.service_name().unwrap_or_default().to_string())
                .unwrap_or_else(|| ROOT_SPAN_NOT_YET_RECEIVED.to_string()),
            root_trace_name: root.map(|span| span.name.clone()).unwrap_or_default(),
            start_time_unix_nano: trace.start_time(),
            duration_ms,
            spansets,
        }
    }

    /// Total spans across spansets before truncation
    pub fn matched(&self) -> usize {
        self.spansets.iter().map(|ss| ss.matched).sum()
    }

    /// Fold a partial result for the same trace into this one
    pub fn merge(&mut self, other: TraceResult) {
        if self.root_service_name == ROOT_SPAN_NOT_YET_RECEIVED
            && other.root_service_name != ROOT_SPAN_NOT_YET_RECEIVED
        {
            self.root_service_name = other.root_service_name;
        }
        if self.root_trace_name.is_empty() {
            self.root_trace_name = other.root_trace_name;
        }
        self.start_time_unix_nano = self.start_time_unix_nano.min(other.start_time_unix_nano);
        self.duration_ms = self.duration_ms.max(other.duration_ms);
        self.spansets.extend(other.spansets);
    }
}

fn span_result(evaluator: &Evaluator<'_>, span: u32, fields: &[Attribute]) -> SpanResult {
    let data = evaluator.trace().span(span);
    let attributes = fields
        .iter()
        .filter_map(|attr| {
            let value = evaluator.resolve(attr, span, Cursor::default());
            (!value.is_nil()).then(|| (attr.to_string(), value))
        })
        .collect();
    SpanResult {
        span_id: data.span_id,
        name: data.name.clone(),
        start_time_unix_nano: data.start_time,
        duration_nanos: data.duration_nanos(),
        attributes,
    }
}

fn serialize_pairs<S: Serializer>(
    pairs: &[(String, Static)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(pairs.len()))?;
    for (name, value) in pairs {
        map.serialize_entry(name, value)?;
    }
    map.end()
}

/// Collects per-trace results under a lock
pub struct ResultAssembler {
    limit: usize,
    most_recent: bool,
    state: Mutex<AssemblerState>,
}

#[derive(Default)]
struct AssemblerState {
    traces: FxHashMap<TraceId, TraceResult>,
    /// Arrival order of the traces currently kept
    order: Vec<TraceId>,
}

impl AssemblerState {
    fn oldest(&self) -> Option<(TraceId, u64)> {
        self.traces
            .values()
            .map(|t| (t.trace_id, t.start_time_unix_nano))
            .min_by_key(|&(_, start)| start)
    }

    fn evict(&mut self, id: TraceId) {
        self.traces.remove(&id);
        self.order.retain(|kept| *kept != id);
    }
}

impl ResultAssembler {
    pub fn new(limit: usize, most_recent: bool) -> Self {
        Self {
            limit: limit.max(1),
            most_recent,
            state: Mutex::new(AssemblerState::default()),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn most_recent(&self) -> bool {
        self.most_recent
    }

    /// Offer a result; returns true once no further result can change
    /// the outcome in the default mode
    pub fn add(&self, result: TraceResult) -> bool {
        let mut state = self.state.lock();

        if let Some(existing) = state.traces.get_mut(&result.trace_id) {
            existing.merge(result);
        } else if state.order.len() < self.limit {
            state.order.push(result.trace_id);
            state.traces.insert(result.trace_id, result);
        } else if self.most_recent {
            if let Some((oldest, start)) = state.oldest() {
                if result.start_time_unix_nano > start {
                    state.evict(oldest);
                    state.order.push(result.trace_id);
                    state.traces.insert(result.trace_id, result);
                }
            }
        }

        !self.most_recent && state.order.len() >= self.limit
    }

    pub fn len(&self) -> usize {
        self.state.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.limit
    }

    /// Slots still open in the default mode; None in most-recent mode,
    /// where any later trace may evict a kept one
    pub fn remaining(&self) -> Option<usize> {
        if self.most_recent {
            return None;
        }
        Some(self.limit.saturating_sub(self.len()))
    }

    /// For each id, whether a result for that trace is already kept
    pub fn known(&self, ids: impl IntoIterator<Item = TraceId>) -> Vec<bool> {
        let state = self.state.lock();
        ids.into_iter()
            .map(|id| state.traces.contains_key(&id))
            .collect()
    }

    /// Whether scanning a window ending at `window_end` can still change
    /// the outcome
    ///
    /// In most-recent mode a full buffer whose oldest trace starts at or
    /// after the window end cannot admit anything from that window.
    pub fn is_complete_for(&self, window_end: u64) -> bool {
        let state = self.state.lock();
        if state.order.len() < self.limit {
            return false;
        }
        if !self.most_recent {
            return true;
        }
        state
            .oldest()
            .is_some_and(|(_, start)| start >= window_end)
    }

    /// Results in arrival order, or newest first in most-recent mode
    pub fn finish(self) -> Vec<TraceResult> {
        let mut state = self.state.into_inner();
        let mut out: Vec<TraceResult> = state
            .order
            .iter()
            .filter_map(|id| state.traces.remove(id))
            .collect();
        if self.most_recent {
            out.sort_by(|a, b| b.start_time_unix_nano.cmp(&a.start_time_unix_nano));
        }
        out
    }
}

impl std::fmt::Debug for ResultAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultAssembler")
            .field("limit", &self.limit)
            .field("most_recent", &self.most_recent)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AttributeScope;
    use crate::executor::pattern_cache::RegexCache;
    use crate::model::{IndexedTrace, Resource, Span, Trace};
    use roaring::RoaringBitmap;
    use std::sync::Arc;

    fn result(id: u128, start: u64) -> TraceResult {
        TraceResult {
            trace_id: TraceId(id),
            root_service_name: "svc".to_string(),
            root_trace_name: "root".to_string(),
            start_time_unix_nano: start,
            duration_ms: 1,
            spansets: vec![SpansetResult {
                spans: Vec::new(),
                matched: 1,
                attributes: Vec::new(),
            }],
        }
    }

    #[test]
    fn test_default_mode_stops_at_limit() {
        let assembler = ResultAssembler::new(2, false);
        assert!(!assembler.add(result(1, 10)));
        assert!(assembler.add(result(2, 20)));
        assert!(assembler.add(result(3, 30)));
        let out = assembler.finish();
        let ids: Vec<u128> = out.iter().map(|t| t.trace_id.0).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_remaining_and_known() {
        let assembler = ResultAssembler::new(3, false);
        assembler.add(result(1, 10));
        assert_eq!(assembler.remaining(), Some(2));
        assert_eq!(
            assembler.known([TraceId(1), TraceId(2)]),
            vec![true, false]
        );
        assert_eq!(ResultAssembler::new(3, true).remaining(), None);
    }

    #[test]
    fn test_duplicate_traces_merge() {
        let assembler = ResultAssembler::new(5, false);
        assembler.add(result(1, 50));
        let mut partial = result(1, 10);
        partial.duration_ms = 9;
        assembler.add(partial);
        let out = assembler.finish();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].start_time_unix_nano, 10);
        assert_eq!(out[0].duration_ms, 9);
        assert_eq!(out[0].spansets.len(), 2);
        assert_eq!(out[0].matched(), 2);
    }

    #[test]
    fn test_merge_fills_missing_root() {
        let mut partial = result(1, 10);
        partial.root_service_name = ROOT_SPAN_NOT_YET_RECEIVED.to_string();
        partial.root_trace_name.clear();
        partial.merge(result(1, 20));
        assert_eq!(partial.root_service_name, "svc");
        assert_eq!(partial.root_trace_name, "root");
    }

    #[test]
    fn test_most_recent_keeps_newest() {
        let assembler = ResultAssembler::new(2, true);
        assert!(!assembler.add(result(1, 10)));
        assert!(!assembler.add(result(2, 30)));
        assert!(!assembler.add(result(3, 20)));
        assert!(!assembler.add(result(4, 5)));
        assert!(assembler.is_complete_for(20));
        assert!(!assembler.is_complete_for(25));
        let out = assembler.finish();
        let ids: Vec<u128> = out.iter().map(|t| t.trace_id.0).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_is_complete_requires_full_buffer() {
        let assembler = ResultAssembler::new(3, true);
        assembler.add(result(1, 100));
        assert!(!assembler.is_complete_for(0));
        let assembler = ResultAssembler::new(1, false);
        assert!(!assembler.is_complete_for(0));
        assembler.add(result(1, 100));
        assert!(assembler.is_complete_for(u64::MAX));
    }

    #[test]
    fn test_build_truncates_spansets() {
        let trace = IndexedTrace::new(Arc::new(Trace::new(
            0xff,
            vec![
                Span::new(1, "root")
                    .with_times(1_000, 5_001_000)
                    .with_resource(Arc::new(Resource::service("api")))
                    .with_attribute("http.method", "GET"),
                Span::new(2, "a").with_parent(1).with_times(2_000, 3_000),
                Span::new(3, "b").with_parent(1).with_times(3_000, 4_000),
            ],
        )));
        let cache = RegexCache::new(4);
        let evaluator = Evaluator::new(&trace, &cache, true);
        let spans: RoaringBitmap = [0u32, 1, 2].into_iter().collect();
        let mut ss = Spanset::new(spans);
        ss.attributes.push(("count()".to_string(), Static::Int(3)));
        let fields = vec![Attribute::new(AttributeScope::Span, "http.method")];

        let out = TraceResult::build(&evaluator, &[ss], 2, &fields);
        assert_eq!(out.trace_id, TraceId(0xff));
        assert_eq!(out.root_service_name, "api");
        assert_eq!(out.root_trace_name, "root");
        assert_eq!(out.start_time_unix_nano, 1_000);
        assert_eq!(out.duration_ms, 5);
        assert_eq!(out.spansets[0].matched, 3);
        assert_eq!(out.spansets[0].spans.len(), 2);
        assert_eq!(
            out.spansets[0].spans[0].attributes,
            vec![("span.http.method".to_string(), Static::from("GET"))]
        );
        assert!(out.spansets[0].spans[1].attributes.is_empty());

        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["trace_id"], "000000000000000000000000000000ff");
        assert_eq!(json["spansets"][0]["attributes"]["count()"], 3);
    }

    #[test]
    fn test_build_without_root() {
        let trace = IndexedTrace::new(Arc::new(Trace::new(
            1,
            vec![Span::new(2, "late").with_parent(1)],
        )));
        let cache = RegexCache::new(4);
        let evaluator = Evaluator::new(&trace, &cache, true);
        let out = TraceResult::build(&evaluator, &[], 3, &[]);
        assert_eq!(out.root_service_name, ROOT_SPAN_NOT_YET_RECEIVED);
        assert_eq!(out.root_trace_name, "");
    }
}
