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

//! Query Cache for compiled queries
//!
//! Dashboards re-issue the same query text many times; the cache keeps
//! the compiled form so repeated searches skip parsing and condition
//! extraction.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::core::Result;

use super::query::CompiledQuery;

/// Default number of cached queries
pub const DEFAULT_CACHE_SIZE: usize = 128;

/// LRU cache from query text to its compiled form
pub struct QueryCache {
    entries: Mutex<LruCache<String, Arc<CompiledQuery>>>,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Get a cached query
    pub fn get(&self, text: &str) -> Option<Arc<CompiledQuery>> {
        self.entries.lock().get(text).cloned()
    }

    /// Get a cached query or compile and cache it
    ///
    /// Queries that fail to compile are not cached.
    pub fn get_or_compile(&self, text: &str) -> Result<Arc<CompiledQuery>> {
        if let Some(query) = self.get(text) {
            return Ok(query);
        }
        let query = Arc::new(CompiledQuery::compile(text)?);
        self.entries.lock().put(text.to_string(), query.clone());
        Ok(query)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}
