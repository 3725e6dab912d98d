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

//! Per-trace search step
//!
//! [`TraceSearch`] bundles everything a worker needs to turn one candidate
//! trace into an optional result: the compiled query, the shared regex
//! cache, the execution context and the assembler. Batches are evaluated
//! on the worker pool and offered to the assembler in batch order so the
//! outcome does not depend on thread scheduling.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::model::{IndexedTrace, Trace};

use super::context::ExecutionContext;
use super::parallel::WorkerPool;
use super::pattern_cache::RegexCache;
use super::query::CompiledQuery;
use super::result::{ResultAssembler, TraceResult};

/// Shared state for evaluating candidate traces of one search
pub struct TraceSearch<'a> {
    pub query: &'a CompiledQuery,
    pub regex: &'a RegexCache,
    pub ctx: &'a ExecutionContext,
    pub assembler: &'a ResultAssembler,
    pub anchored_regex: bool,
    pub span_limit: usize,
}

impl TraceSearch<'_> {
    /// Evaluate one trace
    pub fn inspect(&self, trace: Arc<Trace>) -> Option<TraceResult> {
        if self.ctx.should_abandon() {
            return None;
        }

        let indexed = IndexedTrace::new(trace);
        self.ctx.record_spans(indexed.len());
        let corrupt = indexed.corrupt_count();
        if corrupt > 0 {
            tracing::debug!(
                trace_id = %indexed.trace().trace_id,
                corrupt,
                "excluding corrupt spans"
            );
            self.ctx.record_corrupt(corrupt);
        }

        self.query
            .search_trace(&indexed, self.regex, self.anchored_regex, self.span_limit)
    }

    /// Evaluate a batch and feed its results to the assembler
    ///
    /// In the default mode, traces past the point where the batch already
    /// holds enough new matches to fill the limit are skipped. Returns the
    /// number of traces that matched.
    pub fn run_batch(&self, pool: &WorkerPool, batch: Vec<Arc<Trace>>) -> usize {
        if batch.is_empty() {
            return 0;
        }
        let cutoff = self
            .assembler
            .remaining()
            .filter(|&need| need > 0)
            .map(|need| {
                BatchCutoff::new(
                    self.assembler.known(batch.iter().map(|t| t.trace_id)),
                    need,
                )
            });

        let items: Vec<(usize, Arc<Trace>)> = batch.into_iter().enumerate().collect();
        let results = pool.filter_map(items, |(i, trace)| {
            if cutoff.as_ref().is_some_and(|c| c.skips(i)) {
                return None;
            }
            let result = self.inspect(trace)?;
            if let Some(c) = &cutoff {
                c.record_match(i);
            }
            Some(result)
        });

        let matched = results.len();
        for result in results {
            if self.assembler.add(result) {
                self.ctx.finish();
            }
        }
        matched
    }
}

/// Tracks which positions of a batch can still contribute a new result
///
/// Results are offered in batch order, so once positions `0..=cut` hold
/// `need` new matches nothing after `cut` can be kept. Traces already in
/// the assembler are never skipped since they merge instead of filling a
/// slot.
struct BatchCutoff {
    known: Vec<bool>,
    matched: Vec<AtomicBool>,
    need: usize,
    cut: AtomicUsize,
}

impl BatchCutoff {
    fn new(known: Vec<bool>, need: usize) -> Self {
        let matched = known.iter().map(|_| AtomicBool::new(false)).collect();
        Self {
            known,
            matched,
            need,
            cut: AtomicUsize::new(usize::MAX),
        }
    }

    fn skips(&self, i: usize) -> bool {
        !self.known[i] && i > self.cut.load(Ordering::Acquire)
    }

    fn record_match(&self, i: usize) {
        if self.known[i] {
            return;
        }
        self.matched[i].store(true, Ordering::Release);
        let mut count = 0;
        for (j, flag) in self.matched.iter().enumerate() {
            if flag.load(Ordering::Acquire) {
                count += 1;
                if count >= self.need {
                    self.cut.fetch_min(j, Ordering::AcqRel);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EngineConfig;
    use crate::model::Span;

    fn trace(id: u128, start: u64, value: i64) -> Arc<Trace> {
        Arc::new(Trace::new(
            id,
            vec![Span::new(1, "root")
                .with_times(start, start + 10)
                .with_attribute("v", value)],
        ))
    }

    #[test]
    fn test_run_batch_stops_when_full() {
        let query = CompiledQuery::compile("{ .v = 1 }").unwrap();
        let regex = RegexCache::new(4);
        let ctx = ExecutionContext::new();
        let assembler = ResultAssembler::new(2, false);
        let search = TraceSearch {
            query: &query,
            regex: &regex,
            ctx: &ctx,
            assembler: &assembler,
            anchored_regex: true,
            span_limit: 3,
        };
        let pool = WorkerPool::new(&EngineConfig::sequential()).unwrap();

        let matched = search.run_batch(
            &pool,
            vec![trace(1, 0, 1), trace(2, 10, 2), trace(3, 20, 1), trace(4, 30, 1)],
        );
        // Trace 4 comes after the second match and is never evaluated
        assert_eq!(matched, 2);
        assert_eq!(ctx.stats().spans_inspected, 3);
        assert!(ctx.is_finished());
        let ids: Vec<String> = assembler
            .finish()
            .iter()
            .map(|t| t.trace_id.to_string())
            .collect();
        assert_eq!(
            ids,
            vec![
                "00000000000000000000000000000001",
                "00000000000000000000000000000003"
            ]
        );
    }

    #[test]
    fn test_known_traces_still_merge_past_cutoff() {
        let query = CompiledQuery::compile("{ .v = 1 }").unwrap();
        let regex = RegexCache::new(4);
        let ctx = ExecutionContext::new();
        let assembler = ResultAssembler::new(2, false);
        let search = TraceSearch {
            query: &query,
            regex: &regex,
            ctx: &ctx,
            assembler: &assembler,
            anchored_regex: true,
            span_limit: 3,
        };
        let pool = WorkerPool::new(&EngineConfig::sequential()).unwrap();

        assert_eq!(search.run_batch(&pool, vec![trace(1, 0, 1)]), 1);
        let matched = search.run_batch(
            &pool,
            vec![trace(2, 10, 1), trace(3, 20, 1), trace(1, 5, 1)],
        );
        assert_eq!(matched, 2);

        let out = assembler.finish();
        let ids: Vec<u128> = out.iter().map(|t| t.trace_id.0).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(out[0].spansets.len(), 2);
    }

    #[test]
    fn test_inspect_skips_after_budget_only_when_abandoned() {
        let query = CompiledQuery::compile("{ }").unwrap();
        let regex = RegexCache::new(4);
        let ctx = ExecutionContext::new().with_scan_budget(1);
        assert!(ctx.admit_trace());
        assert!(!ctx.admit_trace());
        let assembler = ResultAssembler::new(5, false);
        let search = TraceSearch {
            query: &query,
            regex: &regex,
            ctx: &ctx,
            assembler: &assembler,
            anchored_regex: true,
            span_limit: 3,
        };
        // Admitted before the budget ran out, so still evaluated
        assert!(search.inspect(trace(1, 0, 1)).is_some());
    }

    #[test]
    fn test_inspect_counts_corrupt_spans() {
        let query = CompiledQuery::compile("{ }").unwrap();
        let regex = RegexCache::new(4);
        let ctx = ExecutionContext::new();
        let assembler = ResultAssembler::new(5, false);
        let search = TraceSearch {
            query: &query,
            regex: &regex,
            ctx: &ctx,
            assembler: &assembler,
            anchored_regex: true,
            span_limit: 3,
        };
        let t = Arc::new(Trace::new(
            9,
            vec![Span::new(1, "root"), Span::new(1, "dup")],
        ));
        let result = search.inspect(t).unwrap();
        assert_eq!(result.spansets[0].matched, 1);
        let stats = ctx.stats();
        assert_eq!(stats.spans_inspected, 2);
        assert_eq!(stats.corrupt_spans, 1);
    }

    #[test]
    fn test_inspect_after_cancel() {
        let query = CompiledQuery::compile("{ }").unwrap();
        let regex = RegexCache::new(4);
        let ctx = ExecutionContext::new();
        ctx.cancel();
        let assembler = ResultAssembler::new(5, false);
        let search = TraceSearch {
            query: &query,
            regex: &regex,
            ctx: &ctx,
            assembler: &assembler,
            anchored_regex: true,
            span_limit: 3,
        };
        assert!(search.inspect(trace(1, 0, 1)).is_none());
    }
}
