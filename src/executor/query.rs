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

//! Compiled queries
//!
//! A [`CompiledQuery`] is parsed once and shared read-only by every worker
//! of a search. It carries the AST, the pushdown conditions and the list of
//! fields materialized in results.

use std::fmt::Write as _;
use std::sync::Arc;

use crate::core::Result;
use crate::model::IndexedTrace;
use crate::parser::{parse, Attribute, AttributeTarget, Hints, RootExpr};

use super::evaluator::{Evaluator, Spanset};
use super::pattern_cache::{LiteralPatterns, RegexCache};
use super::pushdown::FetchConditions;
use super::result::TraceResult;

/// A parsed query ready for evaluation
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    text: String,
    root: Arc<RootExpr>,
    conditions: FetchConditions,
    fields: Vec<Attribute>,
    patterns: LiteralPatterns,
}

impl CompiledQuery {
    /// Parse and compile query text
    pub fn compile(text: &str) -> Result<Self> {
        let root = parse(text)?;
        Ok(Self::from_root(text, root))
    }

    /// Compile an already parsed query
    pub fn from_root(text: impl Into<String>, root: RootExpr) -> Self {
        let conditions = FetchConditions::from_query(&root);

        // Event and link fields have no single value per span
        let mut fields = root.selected_attributes();
        for attr in root.filter_attributes() {
            if !fields.contains(&attr) {
                fields.push(attr);
            }
        }
        fields.retain(|attr| {
            !matches!(
                attr.target(),
                AttributeTarget::Event | AttributeTarget::Link
            )
        });

        let literals = root.regex_literals();
        let patterns = LiteralPatterns::new(literals.iter().map(String::as_str));

        Self {
            text: text.into(),
            root: Arc::new(root),
            conditions,
            fields,
            patterns,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> &Arc<RootExpr> {
        &self.root
    }

    pub fn hints(&self) -> &Hints {
        &self.root.hints
    }

    pub fn conditions(&self) -> &FetchConditions {
        &self.conditions
    }

    /// Fields materialized on result spans
    pub fn fields(&self) -> &[Attribute] {
        &self.fields
    }

    /// Regex literals of the query, precompiled
    pub fn patterns(&self) -> &LiteralPatterns {
        &self.patterns
    }

    /// Run the pipeline against one trace
    pub fn evaluate(&self, trace: &IndexedTrace, regex: &RegexCache, anchored: bool) -> Vec<Spanset> {
        Evaluator::new(trace, regex, anchored)
            .with_literals(&self.patterns)
            .run(&self.root.pipeline)
    }

    /// Run the pipeline and build the trace's result, None when nothing survives
    pub fn search_trace(
        &self,
        trace: &IndexedTrace,
        regex: &RegexCache,
        anchored: bool,
        span_limit: usize,
    ) -> Option<TraceResult> {
        let evaluator = Evaluator::new(trace, regex, anchored).with_literals(&self.patterns);
        let spansets = evaluator.run(&self.root.pipeline);
        if spansets.is_empty() {
            return None;
        }
        Some(TraceResult::build(
            &evaluator,
            &spansets,
            span_limit,
            &self.fields,
        ))
    }

    /// Human-readable plan: the normalized query and its conditions
    pub fn explain(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "query:      {}", self.root);
        for (i, stage) in self.root.pipeline.stages.iter().enumerate() {
            let _ = writeln!(out, "  stage {}:  {}", i + 1, stage);
        }
        if !self.root.hints.is_empty() {
            let _ = writeln!(out, "hints:      {}", self.root.hints);
        }
        if self.conditions.conditions.is_empty() {
            let _ = writeln!(out, "conditions: none");
        } else {
            let _ = writeln!(out, "conditions: {}", self.conditions);
        }
        let _ = writeln!(
            out,
            "pruning:    {}",
            if self.conditions.pruning_enabled() {
                "enabled"
            } else {
                "disabled"
            }
        );
        if !self.fields.is_empty() {
            let names: Vec<String> = self.fields.iter().map(ToString::to_string).collect();
            let _ = writeln!(out, "fields:     {}", names.join(", "));
        }
        out
    }
}
