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

//! Search requests and responses

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::core::{Error, ExhaustedReason, Result, Static};
use crate::executor::{ExecutionStats, TraceResult};
use crate::parser::ast::{HINT_ANCHORED_REGEX, HINT_MOST_RECENT};
use crate::parser::Hints;
use crate::storage::TimeRange;

/// Parameters of one search
///
/// # Examples
///
/// ```ignore
/// let request = SearchRequest::new()
///     .with_range(TimeRange::new(start, end))
///     .with_limit(50)
///     .with_most_recent(true)
///     .with_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    /// Traces overlapping this window are candidates
    pub range: TimeRange,
    /// Maximum traces returned (0 = configured default)
    pub limit: usize,
    /// Maximum spans per spanset (0 = configured default)
    pub span_limit: usize,
    /// Caller hints, applied over the query's own `with(...)` hints
    pub hints: Hints,
    /// Absolute deadline for the search
    pub deadline: Option<Instant>,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, range: TimeRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_span_limit(mut self, span_limit: usize) -> Self {
        self.span_limit = span_limit;
        self
    }

    pub fn with_hint(mut self, name: impl Into<String>, value: Static) -> Self {
        self.hints.set(name, value);
        self
    }

    pub fn with_most_recent(self, most_recent: bool) -> Self {
        self.with_hint(HINT_MOST_RECENT, Static::Bool(most_recent))
    }

    pub fn with_anchored_regex(self, anchored: bool) -> Self {
        self.with_hint(HINT_ANCHORED_REGEX, Static::Bool(anchored))
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline relative to now
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }
}

/// Counters reported with every response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchMetrics {
    pub inspected_traces: usize,
    pub inspected_spans: usize,
    /// Spans excluded from evaluation as corrupt
    pub corrupt_spans: usize,
    /// Candidates skipped because they could not be decoded
    pub decode_errors: usize,
    /// Candidate ids returned by the storage index, when it was consulted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pruned_candidates: Option<usize>,
    /// Sources that could not be opened
    pub failed_sources: usize,
    pub elapsed_ms: u64,
}

impl SearchMetrics {
    pub(crate) fn from_stats(stats: ExecutionStats) -> Self {
        Self {
            inspected_traces: stats.traces_inspected,
            inspected_spans: stats.spans_inspected,
            corrupt_spans: stats.corrupt_spans,
            decode_errors: stats.decode_errors,
            ..Self::default()
        }
    }
}

/// Outcome of a search
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub traces: Vec<TraceResult>,
    pub metrics: SearchMetrics,
    /// Set when the search stopped before inspecting every candidate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated: Option<ExhaustedReason>,
}

impl SearchResponse {
    pub fn is_truncated(&self) -> bool {
        self.truncated.is_some()
    }

    /// Turn a truncated response into `Error::ResourceExhausted`
    pub fn ensure_complete(self) -> Result<Self> {
        match self.truncated {
            Some(reason) => Err(Error::ResourceExhausted { reason }),
            None => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let request = SearchRequest::new()
            .with_limit(5)
            .with_span_limit(2)
            .with_most_recent(true)
            .with_anchored_regex(false)
            .with_timeout(Duration::from_secs(1));
        assert_eq!(request.limit, 5);
        assert_eq!(request.span_limit, 2);
        assert!(request.hints.most_recent());
        assert!(!request.hints.anchored_regex());
        assert!(request.deadline.is_some());
        assert!(request.range.is_unbounded());
    }

    #[test]
    fn test_ensure_complete() {
        let response = SearchResponse {
            traces: Vec::new(),
            metrics: SearchMetrics::default(),
            truncated: Some(ExhaustedReason::ScanBudget),
        };
        let err = response.ensure_complete().unwrap_err();
        assert!(err.is_resource_exhausted());

        let response = SearchResponse {
            traces: Vec::new(),
            metrics: SearchMetrics::default(),
            truncated: None,
        };
        assert!(response.ensure_complete().is_ok());
    }

    #[test]
    fn test_response_json() {
        let response = SearchResponse {
            traces: Vec::new(),
            metrics: SearchMetrics::default(),
            truncated: Some(ExhaustedReason::Deadline),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["truncated"], "deadline");
        assert!(json["metrics"].get("pruned_candidates").is_none());
    }
}
