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

//! Query engine entry point
//!
//! [`Engine`] owns the shared, query-independent state: configuration,
//! the regex cache, the compiled-query cache and the worker pool. One
//! engine serves any number of concurrent searches.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use rustc_hash::FxHashSet;

use crate::core::{EngineConfig, Error, ExhaustedReason, Result};
use crate::executor::{
    CompiledQuery, ExecutionContext, QueryCache, RegexCache, ResultAssembler, TraceResult,
    TraceSearch, WorkerPool,
};
use crate::model::{IndexedTrace, Trace, TraceId};
use crate::storage::{CandidateSource, StorageIndex, TimeRange};

use super::request::{SearchMetrics, SearchRequest, SearchResponse};

/// Batches per worker thread pulled from a stream at once
const BATCHES_PER_THREAD: usize = 4;

/// Query engine
///
/// # Examples
///
/// ```ignore
/// use traceql::{Engine, EngineConfig, MemoryStorage, SearchRequest};
///
/// let engine = Engine::new(EngineConfig::default())?;
/// let storage = MemoryStorage::open("traces.json")?;
///
/// let response = engine.evaluate(
///     r#"{ resource.service.name = "api" && status = error }"#,
///     &SearchRequest::new().with_limit(10),
///     &[&storage],
/// )?;
/// for trace in &response.traces {
///     println!("{} {}", trace.trace_id, trace.root_trace_name);
/// }
/// ```
pub struct Engine {
    config: EngineConfig,
    regex: RegexCache,
    queries: QueryCache,
    pool: WorkerPool,
}

impl Engine {
    /// Create an engine
    ///
    /// Fails when the configuration is invalid or the worker pool cannot
    /// be started.
    pub fn new(config: EngineConfig) -> Result<Self> {
        if config.most_recent_shards == 0 {
            return Err(Error::invalid_config("most_recent_shards must be at least 1"));
        }
        let pool = WorkerPool::new(&config)?;
        Ok(Self {
            regex: RegexCache::new(config.regex_cache_size),
            queries: QueryCache::default(),
            pool,
            config,
        })
    }

    /// Create an engine that evaluates on the calling thread
    pub fn sequential() -> Self {
        let config = EngineConfig::sequential();
        Self {
            regex: RegexCache::new(config.regex_cache_size),
            queries: QueryCache::default(),
            pool: WorkerPool::sequential(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse a query and extract its fetch conditions
    ///
    /// Compiled queries are cached by text, so compiling the same query
    /// twice is cheap.
    pub fn compile(&self, query: &str) -> Result<Arc<CompiledQuery>> {
        self.queries.get_or_compile(query)
    }

    /// Describe how a query will be evaluated
    pub fn explain(&self, query: &str) -> Result<String> {
        Ok(self.compile(query)?.explain())
    }

    /// Search the given sources
    ///
    /// Query errors are returned before any source is touched. The
    /// search fails on collaborator errors only when every source fails
    /// to open.
    pub fn evaluate(
        &self,
        query: &str,
        request: &SearchRequest,
        sources: &[&dyn CandidateSource],
    ) -> Result<SearchResponse> {
        self.evaluate_with_index(query, request, sources, None)
    }

    /// Search the given sources, pruning candidates with an index
    pub fn evaluate_with_index(
        &self,
        query: &str,
        request: &SearchRequest,
        sources: &[&dyn CandidateSource],
        index: Option<&dyn StorageIndex>,
    ) -> Result<SearchResponse> {
        let compiled = self.compile(query)?;
        self.search(&compiled, request, sources, index, &ExecutionContext::new())
    }

    /// Search with a compiled query and a caller-owned execution context
    ///
    /// Cancelling the context (or a handle obtained from it) stops the
    /// search at the next trace boundary; the response is then truncated.
    pub fn search(
        &self,
        query: &CompiledQuery,
        request: &SearchRequest,
        sources: &[&dyn CandidateSource],
        index: Option<&dyn StorageIndex>,
        ctx: &ExecutionContext,
    ) -> Result<SearchResponse> {
        let started = Instant::now();
        let ctx = ctx
            .clone()
            .with_deadline(request.deadline.or(ctx.deadline()))
            .with_scan_budget(self.config.max_traces_scanned);

        let hints = query.hints().merged(&request.hints);
        let most_recent = hints.most_recent();
        let limit = non_zero_or(request.limit, self.config.default_limit);
        let span_limit = non_zero_or(request.span_limit, self.config.default_span_limit);
        let range = self.effective_range(request.range, sources);

        tracing::debug!(
            query = query.text(),
            limit,
            span_limit,
            most_recent,
            range = %range,
            "search started"
        );

        let candidates = self.prune(query, range, index, hints.anchored_regex());

        let assembler = ResultAssembler::new(limit, most_recent);
        let search = TraceSearch {
            query,
            regex: &self.regex,
            ctx: &ctx,
            assembler: &assembler,
            anchored_regex: hints.anchored_regex(),
            span_limit,
        };

        let windows = if most_recent {
            range.split_newest_first(self.config.most_recent_shards)
        } else if range.is_empty() {
            Vec::new()
        } else {
            vec![range]
        };

        let scan = Scan {
            engine: self,
            search: &search,
            sources,
            candidates: candidates.as_deref(),
            batch_size: self.batch_size(),
        };
        let outcome = scan.run(&windows)?;

        let truncated = outcome.stopped;
        let traces = assembler.finish();
        let metrics = SearchMetrics {
            pruned_candidates: candidates.as_ref().map(Vec::len),
            failed_sources: outcome.failed_sources,
            elapsed_ms: started.elapsed().as_millis() as u64,
            ..SearchMetrics::from_stats(ctx.stats())
        };

        tracing::debug!(
            traces = traces.len(),
            inspected = metrics.inspected_traces,
            corrupt_spans = metrics.corrupt_spans,
            decode_errors = metrics.decode_errors,
            truncated = ?truncated,
            elapsed_ms = metrics.elapsed_ms,
            "search finished"
        );

        Ok(SearchResponse {
            traces,
            metrics,
            truncated,
        })
    }

    /// Evaluate a compiled query against a single trace
    ///
    /// A span limit of 0 uses the configured default.
    pub fn evaluate_trace(
        &self,
        query: &CompiledQuery,
        trace: Arc<Trace>,
        span_limit: usize,
    ) -> Option<TraceResult> {
        let span_limit = non_zero_or(span_limit, self.config.default_span_limit);
        let indexed = IndexedTrace::new(trace);
        query.search_trace(
            &indexed,
            &self.regex,
            query.hints().anchored_regex(),
            span_limit,
        )
    }

    /// An unbounded range is narrowed to what the sources actually hold
    fn effective_range(&self, range: TimeRange, sources: &[&dyn CandidateSource]) -> TimeRange {
        if !range.is_unbounded() {
            return range;
        }
        let mut bounds: Option<TimeRange> = None;
        for source in sources {
            match source.time_bounds() {
                Some(b) => bounds = Some(bounds.map_or(b, |acc| acc.union(&b))),
                None => return range,
            }
        }
        bounds.map_or(range, |b| range.clamp(&b))
    }

    /// Ask the index for candidates; the regex anchoring is the one the
    /// evaluator will use, caller hints included
    fn prune(
        &self,
        query: &CompiledQuery,
        range: TimeRange,
        index: Option<&dyn StorageIndex>,
        anchored_regex: bool,
    ) -> Option<Vec<TraceId>> {
        let index = index?;
        let mut conditions = Cow::Borrowed(query.conditions());
        if !conditions.pruning_enabled() {
            return None;
        }
        if conditions.anchored_regex != anchored_regex {
            conditions.to_mut().anchored_regex = anchored_regex;
        }
        match index.candidates(&conditions, range) {
            Ok(ids) => Some(ids),
            Err(err) => {
                // Pruning is an optimization; scan everything instead
                tracing::warn!(error = %err, "storage index failed, scanning without pruning");
                None
            }
        }
    }

    fn batch_size(&self) -> usize {
        match self.pool.num_threads() {
            0 | 1 => 1,
            n => n * BATCHES_PER_THREAD,
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .finish()
    }
}

fn non_zero_or(value: usize, default: usize) -> usize {
    if value == 0 {
        default
    } else {
        value
    }
}

/// Pulls candidates from every source, window by window
struct Scan<'a> {
    engine: &'a Engine,
    search: &'a TraceSearch<'a>,
    sources: &'a [&'a dyn CandidateSource],
    candidates: Option<&'a [TraceId]>,
    batch_size: usize,
}

struct ScanOutcome {
    stopped: Option<ExhaustedReason>,
    failed_sources: usize,
}

impl Scan<'_> {
    fn run(&self, windows: &[TimeRange]) -> Result<ScanOutcome> {
        let ctx = self.search.ctx;
        let assembler = self.search.assembler;
        let mut opened = vec![false; self.sources.len()];
        let mut first_error: Option<Error> = None;
        let mut failed: FxHashSet<usize> = FxHashSet::default();
        // A trace overlapping two windows is streamed twice by one source
        let mut seen: FxHashSet<(usize, TraceId)> = FxHashSet::default();
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut stopped = None;

        'windows: for (w, window) in windows.iter().enumerate() {
            if w > 0 && assembler.most_recent() && assembler.is_complete_for(window.end) {
                break;
            }

            for (s, source) in self.sources.iter().enumerate() {
                if let Some(reason) = self.stop_reason() {
                    stopped = reason;
                    break 'windows;
                }

                let stream = match source.scan(*window, self.candidates) {
                    Ok(stream) => {
                        opened[s] = true;
                        stream
                    }
                    Err(err) => {
                        tracing::warn!(source = source.name(), error = %err, "source failed to open");
                        failed.insert(s);
                        first_error.get_or_insert(err);
                        continue;
                    }
                };

                for item in stream {
                    let trace = match item {
                        Ok(trace) => trace,
                        Err(err) => {
                            tracing::debug!(source = source.name(), error = %err, "skipping undecodable trace");
                            ctx.record_decode_error();
                            continue;
                        }
                    };
                    if !seen.insert((s, trace.trace_id)) {
                        continue;
                    }
                    if !ctx.admit_trace() {
                        break;
                    }
                    batch.push(trace);
                    if batch.len() >= self.batch_size {
                        self.search
                            .run_batch(&self.engine.pool, std::mem::take(&mut batch));
                        if ctx.should_stop() {
                            break;
                        }
                    }
                }
                self.search
                    .run_batch(&self.engine.pool, std::mem::take(&mut batch));

                if let Some(reason) = self.stop_reason() {
                    stopped = reason;
                    break 'windows;
                }
            }
        }

        if !self.sources.is_empty() && !opened.iter().any(|o| *o) {
            if let Some(err) = first_error {
                return Err(err);
            }
        }

        Ok(ScanOutcome {
            stopped,
            failed_sources: failed.len(),
        })
    }

    /// `Some(reason)` when scanning must stop; the inner value is the
    /// truncation reason, None when the assembler is simply satisfied
    ///
    /// A spent scan budget only truncates when the limit was not reached.
    fn stop_reason(&self) -> Option<Option<ExhaustedReason>> {
        let ctx = self.search.ctx;
        if ctx.is_finished() {
            return Some(None);
        }
        match ctx.exhausted() {
            Some(ExhaustedReason::ScanBudget) if self.search.assembler.is_full() => Some(None),
            Some(reason) => Some(Some(reason)),
            None => None,
        }
    }
}
