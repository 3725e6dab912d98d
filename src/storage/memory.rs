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

//! In-memory trace store
//!
//! Holds decoded traces behind a read-write lock and serves them as a
//! [`CandidateSource`]. It also implements [`StorageIndex`] by checking
//! each trace against the fetch conditions, which is how a block's
//! attribute dictionary would prune candidates.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::{Error, Result};
use crate::executor::{FetchConditions, RegexCache};
use crate::model::{IndexedTrace, Trace, TraceId};

use super::otlp::decode_traces;
use super::traits::{CandidateSource, StorageIndex, TimeRange, TraceStream};

/// Decoded traces kept in memory
pub struct MemoryStorage {
    name: String,
    inner: RwLock<Inner>,
    regex: RegexCache,
}

#[derive(Default)]
struct Inner {
    /// Insertion order
    traces: Vec<Arc<Trace>>,
    by_id: FxHashMap<TraceId, usize>,
    /// Traces that failed to decode, reported on every scan
    broken: Vec<(TraceId, Error)>,
}

impl MemoryStorage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::new(Inner::default()),
            regex: RegexCache::default(),
        }
    }

    /// Create a store from an OTLP/JSON document
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self> {
        let storage = Self::new(name);
        storage.load_json(json)?;
        Ok(storage)
    }

    /// Create a store from an OTLP/JSON file, named after the file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::Io {
            message: format!("{}: {}", path.display(), e),
        })?;
        let storage = Self::new(path.display().to_string());
        let loaded = storage.load_json(&json)?;
        tracing::info!(path = %path.display(), traces = loaded, "loaded traces");
        Ok(storage)
    }

    /// Add every trace of an OTLP/JSON document; returns how many decoded
    pub fn load_json(&self, json: &str) -> Result<usize> {
        let decoded = decode_traces(json)?;
        let loaded = decoded.traces.len();
        for trace in decoded.traces {
            self.insert(trace);
        }
        if !decoded.failures.is_empty() {
            tracing::warn!(
                source = %self.name,
                failed = decoded.failures.len(),
                "some traces could not be decoded"
            );
            self.inner.write().broken.extend(decoded.failures);
        }
        Ok(loaded)
    }

    /// Add a trace; spans of an already stored trace id are appended
    pub fn insert(&self, trace: Trace) {
        let mut inner = self.inner.write();
        if let Some(&slot) = inner.by_id.get(&trace.trace_id) {
            Arc::make_mut(&mut inner.traces[slot])
                .spans
                .extend(trace.spans);
        } else {
            let slot = inner.traces.len();
            inner.by_id.insert(trace.trace_id, slot);
            inner.traces.push(Arc::new(trace));
        }
    }

    pub fn get(&self, id: TraceId) -> Option<Arc<Trace>> {
        let inner = self.inner.read();
        inner.by_id.get(&id).map(|&slot| inner.traces[slot].clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of traces that failed to decode
    pub fn broken_count(&self) -> usize {
        self.inner.read().broken.len()
    }
}

impl CandidateSource for MemoryStorage {
    fn name(&self) -> &str {
        &self.name
    }

    fn scan(&self, range: TimeRange, ids: Option<&[TraceId]>) -> Result<TraceStream<'_>> {
        let wanted: Option<FxHashSet<TraceId>> = ids.map(|ids| ids.iter().copied().collect());
        let keep = |id: &TraceId| wanted.as_ref().map_or(true, |w| w.contains(id));

        // Snapshot under the lock; the stream itself holds no lock
        let inner = self.inner.read();
        let mut items: Vec<Result<Arc<Trace>>> = inner
            .broken
            .iter()
            .filter(|(id, _)| keep(id))
            .map(|(_, err)| Err(err.clone()))
            .collect();
        items.extend(
            inner
                .traces
                .iter()
                .filter(|t| keep(&t.trace_id) && range.overlaps(t.start_time(), t.end_time()))
                .map(|t| Ok(t.clone())),
        );
        drop(inner);

        Ok(Box::new(items.into_iter()))
    }

    fn time_bounds(&self) -> Option<TimeRange> {
        let inner = self.inner.read();
        inner
            .traces
            .iter()
            .filter(|t| !t.spans.is_empty())
            .map(|t| TimeRange::new(t.start_time(), t.end_time().saturating_add(1)))
            .reduce(|a, b| a.union(&b))
    }
}

impl StorageIndex for MemoryStorage {
    fn candidates(&self, conditions: &FetchConditions, range: TimeRange) -> Result<Vec<TraceId>> {
        let traces: Vec<Arc<Trace>> = {
            let inner = self.inner.read();
            inner
                .traces
                .iter()
                .filter(|t| range.overlaps(t.start_time(), t.end_time()))
                .cloned()
                .collect()
        };
        let mut out = Vec::new();
        for trace in traces {
            let id = trace.trace_id;
            let indexed = IndexedTrace::new(trace);
            if conditions.may_match(&indexed, &self.regex) {
                out.push(id);
            }
        }
        tracing::debug!(
            source = %self.name,
            conditions = %conditions,
            candidates = out.len(),
            "pruned candidates"
        );
        Ok(out)
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("name", &self.name)
            .field("traces", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::CompiledQuery;
    use crate::model::Span;
    use std::io::Write;

    fn store() -> MemoryStorage {
        let storage = MemoryStorage::new("test");
        storage.insert(Trace::new(
            1,
            vec![Span::new(1, "a")
                .with_times(100, 200)
                .with_attribute("env", "prod")],
        ));
        storage.insert(Trace::new(
            2,
            vec![Span::new(1, "b")
                .with_times(300, 400)
                .with_attribute("env", "dev")],
        ));
        storage
    }

    fn ids(stream: TraceStream<'_>) -> Vec<u128> {
        stream.map(|t| t.unwrap().trace_id.0).collect()
    }

    #[test]
    fn test_scan_range_and_ids() {
        let storage = store();
        assert_eq!(ids(storage.scan(TimeRange::all(), None).unwrap()), vec![1, 2]);
        assert_eq!(ids(storage.scan(TimeRange::new(250, 350), None).unwrap()), vec![2]);
        assert_eq!(
            ids(storage.scan(TimeRange::all(), Some(&[TraceId(2)])).unwrap()),
            vec![2]
        );
        assert_eq!(storage.time_bounds(), Some(TimeRange::new(100, 401)));
    }

    #[test]
    fn test_insert_merges_partial_traces() {
        let storage = store();
        storage.insert(Trace::new(1, vec![Span::new(2, "late").with_parent(1)]));
        assert_eq!(storage.len(), 2);
        assert_eq!(storage.get(TraceId(1)).unwrap().spans.len(), 2);
    }

    #[test]
    fn test_candidates_prune() {
        let storage = store();
        let query = CompiledQuery::compile(r#"{ .env = "prod" }"#).unwrap();
        let found = storage
            .candidates(query.conditions(), TimeRange::all())
            .unwrap();
        assert_eq!(found, vec![TraceId(1)]);

        let query = CompiledQuery::compile(r#"{ .env = "prod" || .env = "dev" }"#).unwrap();
        let found = storage
            .candidates(query.conditions(), TimeRange::all())
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_open_file_with_broken_trace() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "resourceSpans": [{{ "scopeSpans": [{{ "spans": [
                {{ "traceId": "0a", "spanId": "01", "name": "ok" }},
                {{ "traceId": "0b", "spanId": "", "name": "broken" }}
            ]}}]}}]}}"#
        )
        .unwrap();

        let storage = MemoryStorage::open(file.path()).unwrap();
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.broken_count(), 1);

        let items: Vec<_> = storage.scan(TimeRange::all(), None).unwrap().collect();
        assert_eq!(items.len(), 2);
        assert!(items.iter().any(|item| item.is_err()));
    }

    #[test]
    fn test_open_missing_file() {
        let err = MemoryStorage::open("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
