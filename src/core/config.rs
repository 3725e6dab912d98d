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

//! Engine configuration
//!

use super::error::{Error, Result};

/// Configuration options for query execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of traces returned when a request does not set a limit
    /// Default: 20
    pub default_limit: usize,

    /// Spans kept per spanset when a request does not set a span limit
    /// Default: 3
    pub default_span_limit: usize,

    /// Number of time windows scanned newest-first in most-recent mode
    /// Default: 200
    pub most_recent_shards: usize,

    /// Maximum number of candidate traces inspected per search (0 = unbounded)
    /// Default: 0
    pub max_traces_scanned: usize,

    /// Worker threads used to evaluate traces (0 = one per core)
    /// Default: 0
    pub workers: usize,

    /// Minimum traces in a batch before the batch is evaluated in parallel
    /// Default: 2
    pub parallel_threshold: usize,

    /// Compiled regular expressions kept per engine
    /// Default: 256
    pub regex_cache_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            default_span_limit: 3,
            most_recent_shards: 200,
            max_traces_scanned: 0,
            workers: 0,
            parallel_threshold: 2,
            regex_cache_size: 256,
        }
    }
}

impl EngineConfig {
    /// Creates a new EngineConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that evaluates on the calling thread only
    pub fn sequential() -> Self {
        Self {
            workers: 1,
            parallel_threshold: usize::MAX,
            ..Self::default()
        }
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn with_default_span_limit(mut self, limit: usize) -> Self {
        self.default_span_limit = limit;
        self
    }

    pub fn with_most_recent_shards(mut self, shards: usize) -> Self {
        self.most_recent_shards = shards;
        self
    }

    pub fn with_max_traces_scanned(mut self, max: usize) -> Self {
        self.max_traces_scanned = max;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_regex_cache_size(mut self, size: usize) -> Self {
        self.regex_cache_size = size;
        self
    }

    /// Parse options from a `key=value&key=value` string
    ///
    /// Unknown keys and malformed values are rejected.
    pub fn from_params(params: &str) -> Result<Self> {
        let mut config = Self::default();

        for param in params.split('&').filter(|p| !p.trim().is_empty()) {
            let mut parts = param.splitn(2, '=');
            let key = parts.next().unwrap_or("").trim();
            let value = parts.next().unwrap_or("").trim();

            let target = match key {
                // Result limit: limit=20
                "limit" | "default_limit" => &mut config.default_limit,
                // Spans per spanset: span_limit=3
                "span_limit" | "spss" | "default_span_limit" => &mut config.default_span_limit,
                // Most-recent windows: most_recent_shards=200
                "most_recent_shards" | "shards" => &mut config.most_recent_shards,
                // Scan budget: max_traces_scanned=100000
                "max_traces_scanned" | "scan_budget" => &mut config.max_traces_scanned,
                // Worker threads: workers=8
                "workers" => &mut config.workers,
                // Parallel threshold: parallel_threshold=2
                "parallel_threshold" => &mut config.parallel_threshold,
                // Regex cache: regex_cache_size=256
                "regex_cache_size" => &mut config.regex_cache_size,
                _ => {
                    return Err(Error::invalid_config(format!("unknown option '{}'", key)));
                }
            };

            *target = value.parse::<usize>().map_err(|_| {
                Error::invalid_config(format!("invalid value '{}' for option '{}'", value, key))
            })?;
        }

        if config.most_recent_shards == 0 {
            return Err(Error::invalid_config("most_recent_shards must be at least 1"));
        }

        Ok(config)
    }
}
