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

//! Execution Context
//!
//! Per-search state shared by every worker: cancellation, deadline, scan
//! budget and the counters reported with the response. All of it is
//! atomic so workers never take a lock.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::core::ExhaustedReason;

/// Execution context for one search
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Cancellation flag, shared with [`CancellationHandle`]s
    cancelled: Arc<AtomicBool>,
    /// Set once the result assembler needs no more traces
    satisfied: Arc<AtomicBool>,
    /// Absolute deadline, if the caller set one
    deadline: Option<Instant>,
    /// Maximum traces inspected (0 = unbounded)
    scan_budget: usize,
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    traces_inspected: AtomicUsize,
    spans_inspected: AtomicUsize,
    corrupt_spans: AtomicUsize,
    decode_errors: AtomicUsize,
    exhausted: AtomicUsize,
}

/// Snapshot of the counters of a search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionStats {
    pub traces_inspected: usize,
    pub spans_inspected: usize,
    pub corrupt_spans: usize,
    pub decode_errors: usize,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    /// Create a context with no deadline and no scan budget
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            satisfied: Arc::new(AtomicBool::new(false)),
            deadline: None,
            scan_budget: 0,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_scan_budget(mut self, budget: usize) -> Self {
        self.scan_budget = budget;
        self
    }

    /// Check if the search has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Cancel the search
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Get a cancellation handle that can be used from another thread
    pub fn cancellation_handle(&self) -> CancellationHandle {
        CancellationHandle {
            cancelled: self.cancelled.clone(),
        }
    }

    /// Mark the search as satisfied; workers stop at the next trace
    pub fn finish(&self) {
        self.satisfied.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.satisfied.load(Ordering::Relaxed)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn deadline_exceeded(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Why the search must stop, if it must
    pub fn exhausted(&self) -> Option<ExhaustedReason> {
        if self.is_cancelled() {
            return Some(ExhaustedReason::Cancelled);
        }
        if self.deadline_exceeded() {
            return Some(ExhaustedReason::Deadline);
        }
        if self.counters.exhausted.load(Ordering::Relaxed) > 0 {
            return Some(ExhaustedReason::ScanBudget);
        }
        None
    }

    /// True when no further trace should be pulled from a source
    pub fn should_stop(&self) -> bool {
        self.is_finished() || self.exhausted().is_some()
    }

    /// True when an already admitted trace should be skipped
    ///
    /// The scan budget only limits admission, so a spent budget does not
    /// abandon traces that were admitted before it ran out.
    pub fn should_abandon(&self) -> bool {
        self.is_finished() || self.is_cancelled() || self.deadline_exceeded()
    }

    /// Claim one unit of the scan budget
    ///
    /// Returns false, and records budget exhaustion, once the budget is
    /// spent. Claims are counted as inspected traces.
    pub fn admit_trace(&self) -> bool {
        let seen = self.counters.traces_inspected.fetch_add(1, Ordering::Relaxed);
        if self.scan_budget > 0 && seen >= self.scan_budget {
            self.counters.traces_inspected.fetch_sub(1, Ordering::Relaxed);
            self.counters.exhausted.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    pub fn record_spans(&self, spans: usize) {
        self.counters
            .spans_inspected
            .fetch_add(spans, Ordering::Relaxed);
    }

    pub fn record_corrupt(&self, spans: usize) {
        self.counters
            .corrupt_spans
            .fetch_add(spans, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.counters.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> ExecutionStats {
        ExecutionStats {
            traces_inspected: self.counters.traces_inspected.load(Ordering::Relaxed),
            spans_inspected: self.counters.spans_inspected.load(Ordering::Relaxed),
            corrupt_spans: self.counters.corrupt_spans.load(Ordering::Relaxed),
            decode_errors: self.counters.decode_errors.load(Ordering::Relaxed),
        }
    }
}

/// Handle for cancelling a running search from another thread
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancellationHandle {
    /// Create a handle that is not yet attached to a search
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancel the associated search
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Build a context that observes this handle
    pub fn context(&self) -> ExecutionContext {
        ExecutionContext {
            cancelled: self.cancelled.clone(),
            ..ExecutionContext::new()
        }
    }
}

impl Default for CancellationHandle {
    fn default() -> Self {
        Self::new()
    }
}
