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

//! Function registry
//!
//! Maps aggregate names to constructors. A single registry is shared by
//! every query through [`global_registry`].

use std::sync::OnceLock;

use rustc_hash::FxHashMap;

use crate::parser::AggregateKind;

use super::aggregate::{AvgFunction, CountFunction, MaxFunction, MinFunction, SumFunction};
use super::{AggregateFunction, FunctionInfo};

/// Global function registry
static GLOBAL_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// Get the global function registry
pub fn global_registry() -> &'static FunctionRegistry {
    GLOBAL_REGISTRY.get_or_init(FunctionRegistry::new)
}

type AggregateFactory = fn() -> Box<dyn AggregateFunction>;

fn create<F: AggregateFunction + Default + 'static>() -> Box<dyn AggregateFunction> {
    Box::new(F::default())
}

/// Registry of aggregate functions
pub struct FunctionRegistry {
    aggregates: FxHashMap<&'static str, (FunctionInfo, AggregateFactory)>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Create a registry holding the built-in aggregates
    pub fn new() -> Self {
        let mut registry = Self {
            aggregates: FxHashMap::default(),
        };
        registry.register_aggregate::<CountFunction>();
        registry.register_aggregate::<AvgFunction>();
        registry.register_aggregate::<MinFunction>();
        registry.register_aggregate::<MaxFunction>();
        registry.register_aggregate::<SumFunction>();
        registry
    }

    /// Register an aggregate function
    pub fn register_aggregate<F: AggregateFunction + Default + 'static>(&mut self) {
        let info = F::default().info();
        let factory: AggregateFactory = create::<F>;
        self.aggregates.insert(info.name, (info, factory));
    }

    /// Create a new instance of an aggregate by name
    pub fn get_aggregate(&self, name: &str) -> Option<Box<dyn AggregateFunction>> {
        self.aggregates.get(name).map(|(_, factory)| factory())
    }

    /// Create a new instance of the aggregate a query names
    pub fn aggregate(&self, kind: AggregateKind) -> Option<Box<dyn AggregateFunction>> {
        self.get_aggregate(kind.name())
    }

    /// Check if an aggregate exists
    pub fn is_aggregate(&self, name: &str) -> bool {
        self.aggregates.contains_key(name)
    }

    /// Get function information
    pub fn get_info(&self, name: &str) -> Option<FunctionInfo> {
        self.aggregates.get(name).map(|(info, _)| info.clone())
    }

    /// List aggregate names, sorted
    pub fn list_aggregates(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.aggregates.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
