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

//! Compiled regular expressions
//!
//! Patterns written in a query are compiled once with the query into
//! [`LiteralPatterns`], which workers read without locking. Patterns that
//! only exist at evaluation time (`"text" =~ .attr` takes its pattern from
//! span data) go through the bounded, shared [`RegexCache`]. Cache entries
//! are keyed by pattern text and anchoring; a pattern that fails to compile
//! is cached as `None` and never matches.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;
use rustc_hash::FxHashMap;

/// Capacity used when the configured size is zero
const FALLBACK_CAPACITY: usize = 16;

type CacheKey = (Arc<str>, bool);

/// Thread-safe LRU cache of compiled regular expressions
pub struct RegexCache {
    cache: Mutex<LruCache<CacheKey, Option<Arc<Regex>>>>,
}

impl RegexCache {
    /// Create a cache holding at most `capacity` patterns
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(FALLBACK_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Get or compile a pattern
    ///
    /// Anchored patterns must match the whole text.
    pub fn get_or_compile(&self, pattern: &str, anchored: bool) -> Option<Arc<Regex>> {
        let key: CacheKey = (Arc::from(pattern), anchored);
        if let Some(entry) = self.cache.lock().get(&key) {
            return entry.clone();
        }

        // Compile outside the lock; a racing thread at worst compiles twice
        let compiled = compile(pattern, anchored).map(Arc::new);
        self.cache.lock().put(key, compiled.clone());
        compiled
    }

    /// Match `text` against `pattern`; invalid patterns never match
    pub fn is_match(&self, pattern: &str, text: &str, anchored: bool) -> bool {
        self.get_or_compile(pattern, anchored)
            .is_some_and(|re| re.is_match(text))
    }

    /// Number of cached patterns
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for RegexCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegexCache")
            .field("len", &self.len())
            .finish()
    }
}

/// Query literal patterns, compiled for both anchorings
#[derive(Debug, Clone, Default)]
pub struct LiteralPatterns {
    anchored: FxHashMap<Box<str>, Regex>,
    unanchored: FxHashMap<Box<str>, Regex>,
}

impl LiteralPatterns {
    /// Compile every pattern; invalid ones are left to the cache
    pub fn new<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Self {
        let mut out = Self::default();
        for pattern in patterns {
            if out.anchored.contains_key(pattern) {
                continue;
            }
            if let Some(re) = compile(pattern, true) {
                out.anchored.insert(pattern.into(), re);
            }
            if let Some(re) = compile(pattern, false) {
                out.unanchored.insert(pattern.into(), re);
            }
        }
        out
    }

    pub fn get(&self, pattern: &str, anchored: bool) -> Option<&Regex> {
        if anchored {
            self.anchored.get(pattern)
        } else {
            self.unanchored.get(pattern)
        }
    }

    pub fn len(&self) -> usize {
        self.anchored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchored.is_empty()
    }
}

fn compile(pattern: &str, anchored: bool) -> Option<Regex> {
    if anchored {
        Regex::new(&format!("^(?:{})$", pattern)).ok()
    } else {
        Regex::new(pattern).ok()
    }
}
