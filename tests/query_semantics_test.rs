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

//! End-to-end query semantics over in-memory traces

mod common;

use common::*;
use traceql::{SearchRequest, Static};

#[test]
fn test_empty_filter_returns_every_trace() {
    let storage = storage_of((1..=4).map(chain_trace));
    let response = search(&storage, "{ }");
    assert_eq!(matched_ids(&response), vec![1, 2, 3, 4]);
    for trace in &response.traces {
        assert_eq!(trace.root_service_name, "frontend");
        assert_eq!(trace.root_trace_name, "A");
        assert_eq!(trace.duration_ms, 100);
        assert_eq!(trace.spansets.len(), 1);
        assert_eq!(trace.spansets[0].matched, 3);
    }
}

#[test]
fn test_child_and_descendant() {
    assert!(matches(chain_trace(1), r#"{ name = "A" } > { name = "B" }"#));
    assert!(!matches(chain_trace(1), r#"{ name = "A" } > { name = "C" }"#));
    assert!(matches(chain_trace(1), r#"{ name = "A" } >> { name = "C" }"#));
    assert!(matches(chain_trace(1), r#"{ name = "C" } << { name = "A" }"#));
    assert!(matches(chain_trace(1), r#"{ name = "C" } < { name = "B" }"#));
    assert!(!matches(chain_trace(1), r#"{ name = "B" } ~ { }"#));
}

#[test]
fn test_structural_join_returns_right_side() {
    let storage = storage_of([chain_trace(1)]);
    let response = search(&storage, r#"{ name = "A" } >> { }"#);
    let names: Vec<&str> = response.traces[0].spansets[0]
        .spans
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(names, vec!["B", "C"]);

    let response = search(&storage, r#"{ name = "A" } &>> { name = "C" }"#);
    assert_eq!(response.traces[0].spansets[0].matched, 2);
}

#[test]
fn test_negated_structural_over_matches() {
    // A is the parent of B, C has no children
    let response = search(&storage_of([chain_trace(1)]), r#"{ } !< { name != "B" }"#);
    let names: Vec<&str> = response.traces[0].spansets[0]
        .spans
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(names, vec!["C"]);

    // No left candidates at all still returns the right side
    assert!(matches(chain_trace(1), r#"{ name = "nope" } !>> { name = "C" }"#));
}

#[test]
fn test_regex_is_anchored_by_default() {
    assert!(!matches(chain_trace(1), r#"{ span.foo =~ "bar" }"#));
    assert!(matches(chain_trace(1), r#"{ span.foo =~ ".*bar.*" }"#));
    assert!(matches(
        chain_trace(1),
        r#"{ span.foo =~ "bar" } with(anchored_regex=false)"#
    ));
    assert!(matches(chain_trace(1), r#"{ span.foo !~ "bar" }"#));
}

#[test]
fn test_caller_hint_overrides_query_hint() {
    let storage = storage_of([chain_trace(1)]);
    let request = SearchRequest::new().with_anchored_regex(true);
    let response = search_with(
        &storage,
        r#"{ span.foo =~ "bar" } with(anchored_regex=false)"#,
        request,
    );
    assert!(response.traces.is_empty());
}

#[test]
fn test_existence_checks() {
    assert!(!matches(chain_trace(1), "{ span.x != nil }"));
    assert!(matches(chain_trace(1), "{ span.foo != nil }"));
    assert!(matches(chain_trace(1), r#"{ span.foo = "embedded-bar-text" }"#));
    assert!(!matches(chain_trace(1), r#"{ span.x = "y" }"#));
}

#[test]
fn test_count_threshold() {
    // Root plus calls 0 and 1 carry status code 200
    let trace = || http_trace(1, "web", 3);
    assert!(matches(trace(), "{ span.http.status_code = 200 } | count() > 2"));
    assert!(!matches(trace(), "{ span.http.status_code = 200 } | count() > 3"));
    assert!(matches(trace(), "{ span.http.status_code = 200 } | count() = 3"));
}

#[test]
fn test_aggregate_value_is_reported() {
    let storage = storage_of([http_trace(1, "web", 6)]);
    let response = search(&storage, "{ kind = client } | max(span.retries) >= 5");
    let spanset = &response.traces[0].spansets[0];
    assert_eq!(
        spanset.attributes,
        vec![("max(span.retries)".to_string(), Static::Int(5))]
    );
    assert!(search(&storage, "{ kind = client } | sum(span.retries) > 15")
        .traces
        .is_empty());
    assert_eq!(
        search(&storage, "{ kind = client } | avg(duration) > 100ms")
            .traces
            .len(),
        1
    );
}

#[test]
fn test_grouping_partitions_spans() {
    let storage = storage_of([http_trace(1, "web", 4)]);
    let response = search(&storage, "{ } | by(resource.service.name)");
    let groups = &response.traces[0].spansets;
    assert_eq!(groups.len(), 2);
    let mut keys: Vec<Static> = groups.iter().map(|g| g.attributes[0].1.clone()).collect();
    keys.sort_by_key(|k| k.to_string());
    assert_eq!(keys, vec![Static::from("backend"), Static::from("web")]);

    let response = search(&storage, "{ } | by(resource.service.name) | count() > 1");
    assert_eq!(response.traces[0].spansets.len(), 1);
    assert_eq!(response.traces[0].spansets[0].matched, 4);
}

#[test]
fn test_select_materializes_fields() {
    let storage = storage_of([http_trace(1, "web", 3)]);
    let response = search(&storage, "{ status = error } | select(span.retries)");
    let span = &response.traces[0].spansets[0].spans[0];
    assert_eq!(span.name, "call-2");
    assert!(span
        .attributes
        .contains(&("span.retries".to_string(), Static::Int(2))));
}

#[test]
fn test_separate_spans_vs_same_span() {
    let trace = || http_trace(1, "web", 3);
    assert!(!matches(trace(), r#"{ kind = server && status = error }"#));
    assert!(matches(trace(), r#"{ kind = server } && { status = error }"#));
    assert!(matches(trace(), r#"{ kind = consumer } || { status = error }"#));
    assert!(!matches(trace(), r#"{ kind = consumer } && { status = error }"#));
}

#[test]
fn test_trace_level_intrinsics() {
    let trace = || http_trace(1, "web", 3);
    assert!(matches(trace(), r#"{ rootServiceName = "web" }"#));
    assert!(matches(trace(), r#"{ trace:rootName = "GET /api" }"#));
    assert!(matches(trace(), "{ traceDuration >= 2s }"));
    assert!(!matches(trace(), "{ traceDuration > 2s }"));
}

#[test]
fn test_type_mismatches_never_match() {
    let trace = || chain_trace(1);
    assert!(!matches(trace(), "{ name > 1s }"));
    assert!(!matches(trace(), "{ span.foo = 3 }"));
    assert!(!matches(trace(), "{ duration = \"fast\" }"));
}

#[test]
fn test_span_limit_keeps_matched_count() {
    let storage = storage_of([http_trace(1, "web", 9)]);
    let response = search_with(&storage, "{ kind = client }", SearchRequest::new().with_span_limit(2));
    let spanset = &response.traces[0].spansets[0];
    assert_eq!(spanset.spans.len(), 2);
    assert_eq!(spanset.matched, 9);
}
