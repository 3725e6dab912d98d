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

//! Parallel Trace Evaluation
//!
//! Traces are independent, so a batch of candidates is evaluated with
//! Rayon's work-stealing scheduler. Results come back in batch order
//! regardless of which worker finished first.
//!
//! # Thresholds
//!
//! Small batches run on the calling thread: spawning tasks for one or two
//! traces costs more than it saves. Without the `parallel` feature every
//! batch runs sequentially.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::core::{EngineConfig, Error, Result};

/// Default minimum batch size for parallel evaluation
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 2;

/// Configuration for parallel execution
#[derive(Clone, Debug)]
pub struct ParallelConfig {
    /// Whether parallel execution is enabled
    pub enabled: bool,
    /// Minimum traces in a batch to evaluate it in parallel
    pub min_traces_for_parallel: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: cfg!(feature = "parallel"),
            min_traces_for_parallel: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl ParallelConfig {
    /// Create a config with parallel execution disabled
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Derive the parallel settings of an engine configuration
    pub fn from_engine(config: &EngineConfig) -> Self {
        Self {
            enabled: cfg!(feature = "parallel") && config.workers != 1,
            min_traces_for_parallel: config.parallel_threshold.max(1),
        }
    }

    /// Check if a batch of this size should be evaluated in parallel
    #[inline]
    pub fn should_parallelize(&self, batch_len: usize) -> bool {
        self.enabled && batch_len >= self.min_traces_for_parallel
    }
}

/// Worker threads owned by one engine
///
/// With `workers = 0` the global Rayon pool is used; any other count gets
/// a dedicated pool so engines do not compete for threads.
pub struct WorkerPool {
    config: ParallelConfig,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl WorkerPool {
    /// Build the pool described by an engine configuration
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let parallel = ParallelConfig::from_engine(config);

        #[cfg(feature = "parallel")]
        let pool = if parallel.enabled && config.workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.workers)
                .thread_name(|i| format!("traceql-worker-{}", i))
                .build()
                .map_err(|e| {
                    Error::invalid_config(format!("cannot start worker pool: {}", e))
                })?;
            Some(pool)
        } else {
            None
        };

        #[cfg(not(feature = "parallel"))]
        if config.workers > 1 {
            tracing::debug!(
                workers = config.workers,
                "built without the parallel feature, evaluating sequentially"
            );
        }

        Ok(Self {
            config: parallel,
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    /// A pool that evaluates on the calling thread
    pub fn sequential() -> Self {
        Self {
            config: ParallelConfig::disabled(),
            #[cfg(feature = "parallel")]
            pool: None,
        }
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Number of threads a parallel batch can use
    pub fn num_threads(&self) -> usize {
        if !self.config.enabled {
            return 1;
        }
        #[cfg(feature = "parallel")]
        {
            match &self.pool {
                Some(pool) => pool.current_num_threads(),
                None => rayon::current_num_threads(),
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            1
        }
    }

    /// Apply `f` to every item and keep the `Some` results, in input order
    pub fn filter_map<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> Option<R> + Sync + Send,
    {
        if !self.config.should_parallelize(items.len()) {
            return items.into_iter().filter_map(f).collect();
        }

        #[cfg(feature = "parallel")]
        {
            let run = move || items.into_par_iter().filter_map(&f).collect();
            match &self.pool {
                Some(pool) => pool.install(run),
                None => run(),
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            items.into_iter().filter_map(f).collect()
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .field("threads", &self.num_threads())
            .finish()
    }
}
