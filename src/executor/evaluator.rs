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

//! Per-trace evaluator
//!
//! Applies a parsed pipeline to one [`IndexedTrace`]. Every stage maps a
//! list of spansets to a new list; evaluation stops as soon as a stage
//! leaves nothing. Evaluation never fails: absent fields are nil and
//! mistyped comparisons are false.

use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;

use crate::core::{AttributeScope, Intrinsic, LogicalOperator, Operator, Static};
use crate::functions::global_registry;
use crate::model::{IndexedTrace, SpanEvent, SpanLink};
use crate::parser::{
    Aggregate, Attribute, FieldExpression, Pipeline, ScalarExpression, ScalarFilter,
    SpansetExpression, SpansetFilter, Stage,
};

use super::pattern_cache::{LiteralPatterns, RegexCache};
use super::structural;

/// Spans of one trace plus the values that produced the spanset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spanset {
    /// Indices into the evaluated trace
    pub spans: RoaringBitmap,
    /// Group keys and aggregate values, e.g. `by(.a)` or `count()`
    pub attributes: Vec<(String, Static)>,
}

impl Spanset {
    pub fn new(spans: RoaringBitmap) -> Self {
        Self {
            spans,
            attributes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.spans.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    fn derive(&self, spans: RoaringBitmap) -> Self {
        Self {
            spans,
            attributes: self.attributes.clone(),
        }
    }

    fn set_attribute(&mut self, name: String, value: Static) {
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }
}

/// The event and link a field is read against, if any
#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor<'t> {
    pub event: Option<&'t SpanEvent>,
    pub link: Option<&'t SpanLink>,
}

/// Trace-wide intrinsics, computed once per trace
#[derive(Debug, Clone)]
struct TraceValues {
    id: Static,
    duration: Static,
    root_name: Static,
    root_service: Static,
}

/// Evaluates expressions against the spans of one trace
pub struct Evaluator<'t> {
    trace: &'t IndexedTrace,
    regex: &'t RegexCache,
    literals: Option<&'t LiteralPatterns>,
    anchored: bool,
    values: TraceValues,
}

impl<'t> Evaluator<'t> {
    pub fn new(trace: &'t IndexedTrace, regex: &'t RegexCache, anchored: bool) -> Self {
        let root = trace.root();
        let values = TraceValues {
            id: Static::from(trace.trace().trace_id.to_string()),
            duration: Static::Duration(trace.duration()),
            root_name: root
                .map(|span| Static::from(span.name.as_str()))
                .unwrap_or_default(),
            root_service: root
                .and_then(|span| span.resource.service_name())
                .map(Static::from)
                .unwrap_or_default(),
        };
        Self {
            trace,
            regex,
            literals: None,
            anchored,
            values,
        }
    }

    /// Match query literal patterns without touching the shared cache
    pub fn with_literals(mut self, literals: &'t LiteralPatterns) -> Self {
        self.literals = Some(literals);
        self
    }

    pub fn trace(&self) -> &'t IndexedTrace {
        self.trace
    }

    // =========================================================================
    // Pipelines
    // =========================================================================

    /// Run a pipeline over every valid span of the trace
    pub fn run(&self, pipeline: &Pipeline) -> Vec<Spanset> {
        let all = self.trace.valid().clone();
        if all.is_empty() {
            return Vec::new();
        }
        self.eval_pipeline(pipeline, vec![Spanset::new(all)])
    }

    fn eval_pipeline(&self, pipeline: &Pipeline, mut input: Vec<Spanset>) -> Vec<Spanset> {
        for stage in &pipeline.stages {
            input = self.eval_stage(stage, input);
            if input.is_empty() {
                break;
            }
        }
        input
    }

    fn eval_stage(&self, stage: &Stage, input: Vec<Spanset>) -> Vec<Spanset> {
        match stage {
            Stage::Spanset(expr) => input
                .iter()
                .flat_map(|ss| self.eval_spanset(expr, ss))
                .collect(),
            Stage::Aggregation(filter) => input
                .into_iter()
                .filter_map(|ss| self.eval_scalar_filter(filter, ss))
                .collect(),
            Stage::Grouping(fields) => input
                .iter()
                .flat_map(|ss| self.group(fields, ss))
                .collect(),
            Stage::Coalesce => {
                let mut merged = RoaringBitmap::new();
                for ss in &input {
                    merged |= &ss.spans;
                }
                vec![Spanset::new(merged)]
            }
            Stage::FieldSelection(_) => input,
        }
    }

    /// Evaluate a spanset expression against one input spanset
    fn eval_spanset(&self, expr: &SpansetExpression, input: &Spanset) -> Vec<Spanset> {
        let spans = match expr {
            SpansetExpression::Filter(filter) => self.select(filter, &input.spans),
            SpansetExpression::StructuralJoin { op, lhs, rhs } => {
                let lhs = merge(self.eval_spanset(lhs, input));
                let rhs = merge(self.eval_spanset(rhs, input));
                structural::join(self.trace, *op, &lhs, &rhs)
            }
            SpansetExpression::Logical { op, lhs, rhs } => {
                let lhs = merge(self.eval_spanset(lhs, input));
                match op {
                    LogicalOperator::And if lhs.is_empty() => RoaringBitmap::new(),
                    LogicalOperator::And => {
                        let rhs = merge(self.eval_spanset(rhs, input));
                        if rhs.is_empty() {
                            RoaringBitmap::new()
                        } else {
                            lhs | rhs
                        }
                    }
                    LogicalOperator::Or => lhs | merge(self.eval_spanset(rhs, input)),
                }
            }
            SpansetExpression::Subpipeline(pipeline) => {
                return self.eval_pipeline(pipeline, vec![input.clone()]);
            }
        };

        if spans.is_empty() {
            Vec::new()
        } else {
            vec![input.derive(spans)]
        }
    }

    /// Spans of `input` for which the filter holds
    pub fn select(&self, filter: &SpansetFilter, input: &RoaringBitmap) -> RoaringBitmap {
        if let FieldExpression::Static(value) = &filter.expr {
            return if value.is_true() {
                input.clone()
            } else {
                RoaringBitmap::new()
            };
        }
        input
            .iter()
            .filter(|&span| self.matches(filter, span))
            .collect()
    }

    /// Whether one span passes a filter
    ///
    /// Filters reading event or link fields are tried once per event and
    /// link of the span; any combination that holds is enough.
    pub fn matches(&self, filter: &SpansetFilter, span: u32) -> bool {
        let data = self.trace.span(span);
        let events: &[SpanEvent] = if filter.references_events {
            &data.events
        } else {
            &[]
        };
        let links: &[SpanLink] = if filter.references_links {
            &data.links
        } else {
            &[]
        };

        each_or_none(events).any(|event| {
            each_or_none(links).any(|link| {
                self.eval_field(&filter.expr, span, Cursor { event, link })
                    .is_true()
            })
        })
    }

    // =========================================================================
    // Field expressions
    // =========================================================================

    /// Evaluate a field expression for one span
    pub fn eval_field(&self, expr: &FieldExpression, span: u32, cursor: Cursor<'_>) -> Static {
        match expr {
            FieldExpression::Static(value) => value.clone(),
            FieldExpression::Attribute(attr) => self.resolve(attr, span, cursor),
            FieldExpression::Binary { op, lhs, rhs } => match op {
                Operator::And => {
                    if !self.eval_field(lhs, span, cursor).is_true() {
                        return Static::Bool(false);
                    }
                    Static::Bool(self.eval_field(rhs, span, cursor).is_true())
                }
                Operator::Or => {
                    if self.eval_field(lhs, span, cursor).is_true() {
                        return Static::Bool(true);
                    }
                    Static::Bool(self.eval_field(rhs, span, cursor).is_true())
                }
                op if op.is_comparison() => {
                    let lhs = self.eval_field(lhs, span, cursor);
                    let rhs = self.eval_field(rhs, span, cursor);
                    Static::Bool(self.compare(*op, &lhs, &rhs))
                }
                op => {
                    let lhs = self.eval_field(lhs, span, cursor);
                    let rhs = self.eval_field(rhs, span, cursor);
                    Static::binary(*op, &lhs, &rhs)
                }
            },
            FieldExpression::Unary { op, expr } => {
                let value = self.eval_field(expr, span, cursor);
                match op {
                    Operator::Not => Static::Bool(!value.is_true()),
                    op => Static::unary(*op, &value),
                }
            }
        }
    }

    /// Apply a comparison operator with this trace's regex settings
    pub fn compare(&self, op: Operator, lhs: &Static, rhs: &Static) -> bool {
        Static::compare(op, lhs, rhs, &mut |pattern: &str, text: &str| {
            match self.literals.and_then(|l| l.get(pattern, self.anchored)) {
                Some(re) => re.is_match(text),
                None => self.regex.is_match(pattern, text, self.anchored),
            }
        })
    }

    /// Resolve an attribute reference for one span
    pub fn resolve(&self, attr: &Attribute, span: u32, cursor: Cursor<'_>) -> Static {
        if let Some(intrinsic) = attr.intrinsic {
            return self.intrinsic(intrinsic, span, cursor);
        }

        let span = if attr.parent {
            match self.trace.parent(span) {
                Some(parent) => parent,
                None => return Static::Nil,
            }
        } else {
            span
        };
        let data = self.trace.span(span);
        let name = attr.name.as_str();

        match attr.scope {
            AttributeScope::None => match data.attributes.get(name) {
                Some(value) => value.to_static(),
                None => data.resource.attributes.value(name),
            },
            AttributeScope::Span => data.attributes.value(name),
            AttributeScope::Resource => data.resource.attributes.value(name),
            AttributeScope::Event => cursor
                .event
                .map(|event| event.attributes.value(name))
                .unwrap_or_default(),
            AttributeScope::Link => cursor
                .link
                .map(|link| link.attributes.value(name))
                .unwrap_or_default(),
            AttributeScope::Instrumentation => data.scope.attributes.value(name),
        }
    }

    fn intrinsic(&self, intrinsic: Intrinsic, span: u32, cursor: Cursor<'_>) -> Static {
        let trace = self.trace;
        let data = trace.span(span);
        match intrinsic {
            Intrinsic::Duration => Static::Duration(data.duration_nanos()),
            Intrinsic::Name => Static::from(data.name.as_str()),
            Intrinsic::Status => Static::Status(data.status),
            Intrinsic::StatusMessage => Static::from(data.status_message.as_str()),
            Intrinsic::Kind => Static::Kind(data.kind),
            Intrinsic::Parent => trace
                .parent(span)
                .map(|p| Static::from(trace.span(p).span_id.to_string()))
                .unwrap_or_default(),
            Intrinsic::SpanId => Static::from(data.span_id.to_string()),
            Intrinsic::ParentId => data
                .parent_span_id
                .map(|id| Static::from(id.to_string()))
                .unwrap_or_default(),
            Intrinsic::ChildCount => Static::Int(trace.children(span).len() as i64),
            Intrinsic::NestedSetLeft => Static::Int(i64::from(trace.nested_left(span))),
            Intrinsic::NestedSetRight => Static::Int(i64::from(trace.nested_right(span))),
            Intrinsic::NestedSetParent => match trace.parent(span) {
                Some(p) => Static::Int(i64::from(trace.nested_left(p))),
                None => Static::Int(-1),
            },
            Intrinsic::TraceDuration => self.values.duration.clone(),
            Intrinsic::TraceRootSpan => self.values.root_name.clone(),
            Intrinsic::TraceRootService => self.values.root_service.clone(),
            Intrinsic::TraceId => self.values.id.clone(),
            Intrinsic::EventName => cursor
                .event
                .map(|event| Static::from(event.name.as_str()))
                .unwrap_or_default(),
            Intrinsic::EventTimeSinceStart => cursor
                .event
                .map(|event| {
                    Static::Duration(i64::try_from(event.time_since_start).unwrap_or(i64::MAX))
                })
                .unwrap_or_default(),
            Intrinsic::LinkTraceId => cursor
                .link
                .map(|link| Static::from(link.trace_id.to_string()))
                .unwrap_or_default(),
            Intrinsic::LinkSpanId => cursor
                .link
                .map(|link| Static::from(link.span_id.to_string()))
                .unwrap_or_default(),
            Intrinsic::InstrumentationName => non_empty(&data.scope.name),
            Intrinsic::InstrumentationVersion => non_empty(&data.scope.version),
        }
    }

    // =========================================================================
    // Aggregation and grouping
    // =========================================================================

    fn eval_scalar_filter(&self, filter: &ScalarFilter, mut ss: Spanset) -> Option<Spanset> {
        let lhs = self.eval_scalar(&filter.lhs, &mut ss);
        let rhs = self.eval_scalar(&filter.rhs, &mut ss);
        self.compare(filter.op, &lhs, &rhs).then_some(ss)
    }

    fn eval_scalar(&self, expr: &ScalarExpression, ss: &mut Spanset) -> Static {
        match expr {
            ScalarExpression::Static(value) => value.clone(),
            ScalarExpression::Aggregate(agg) => {
                let value = self.aggregate(agg, &ss.spans);
                ss.set_attribute(agg.to_string(), value.clone());
                value
            }
            ScalarExpression::Binary { op, lhs, rhs } => {
                let lhs = self.eval_scalar(lhs, ss);
                let rhs = self.eval_scalar(rhs, ss);
                Static::binary(*op, &lhs, &rhs)
            }
        }
    }

    /// Reduce a spanset with an aggregate function
    pub fn aggregate(&self, agg: &Aggregate, spans: &RoaringBitmap) -> Static {
        let Some(mut function) = global_registry().aggregate(agg.kind) else {
            return Static::Nil;
        };
        for span in spans {
            match &agg.field {
                Some(field) => {
                    function.accumulate(&self.eval_field(field, span, Cursor::default()))
                }
                None => function.accumulate(&Static::Nil),
            }
        }
        function.result()
    }

    /// Partition a spanset by the values of the grouping fields
    fn group(&self, fields: &[FieldExpression], ss: &Spanset) -> Vec<Spanset> {
        let mut slots: FxHashMap<Vec<Static>, usize> = FxHashMap::default();
        let mut groups: Vec<(Vec<Static>, RoaringBitmap)> = Vec::new();

        for span in &ss.spans {
            let key: Vec<Static> = fields
                .iter()
                .map(|field| self.eval_field(field, span, Cursor::default()))
                .collect();
            match slots.get(&key) {
                Some(&slot) => {
                    groups[slot].1.insert(span);
                }
                None => {
                    slots.insert(key.clone(), groups.len());
                    let mut spans = RoaringBitmap::new();
                    spans.insert(span);
                    groups.push((key, spans));
                }
            }
        }

        groups
            .into_iter()
            .map(|(key, spans)| {
                let mut group = ss.derive(spans);
                for (field, value) in fields.iter().zip(key) {
                    group.set_attribute(format!("by({})", field), value);
                }
                group
            })
            .collect()
    }
}

/// Every item as `Some`, or a single `None` for an empty slice
fn each_or_none<T>(items: &[T]) -> impl Iterator<Item = Option<&T>> + '_ {
    let none = items.is_empty().then_some(None);
    none.into_iter().chain(items.iter().map(Some))
}

fn merge(spansets: Vec<Spanset>) -> RoaringBitmap {
    let mut iter = spansets.into_iter();
    let Some(first) = iter.next() else {
        return RoaringBitmap::new();
    };
    iter.fold(first.spans, |acc, ss| acc | ss.spans)
}

fn non_empty(s: &str) -> Static {
    if s.is_empty() {
        Static::Nil
    } else {
        Static::from(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Kind, Status};
    use crate::model::{Resource, Span, Trace};
    use crate::parser::parse;
    use std::sync::Arc;

    fn names(trace: &IndexedTrace, ss: &Spanset) -> Vec<String> {
        ss.spans
            .iter()
            .map(|i| trace.span(i).name.clone())
            .collect()
    }

    fn run(trace: &IndexedTrace, query: &str) -> Vec<Spanset> {
        let cache = RegexCache::new(16);
        let root = parse(query).unwrap();
        let evaluator = Evaluator::new(trace, &cache, root.hints.anchored_regex());
        evaluator.run(&root.pipeline)
    }

    fn matched(trace: &IndexedTrace, query: &str) -> Vec<String> {
        let mut out: Vec<String> = run(trace, query)
            .iter()
            .flat_map(|ss| names(trace, ss))
            .collect();
        out.sort();
        out.dedup();
        out
    }

    // A -> B -> C, A -> D; D has an event and a link
    fn sample() -> IndexedTrace {
        let shop = Arc::new(Resource::service("shop"));
        IndexedTrace::new(Arc::new(Trace::new(
            0xabc,
            vec![
                Span::new(1, "A")
                    .with_times(0, 1_000_000_000)
                    .with_kind(Kind::Server)
                    .with_resource(shop.clone())
                    .with_attribute("http.status_code", 200i64),
                Span::new(2, "B")
                    .with_parent(1)
                    .with_times(100, 600_000_000)
                    .with_resource(shop.clone())
                    .with_attribute("http.status_code", 200i64)
                    .with_attribute("foo", "embedded-bar-text"),
                Span::new(3, "C")
                    .with_parent(2)
                    .with_times(200, 300)
                    .with_status(Status::Error, "boom")
                    .with_resource(shop.clone())
                    .with_attribute("http.status_code", 500i64),
                Span::new(4, "D")
                    .with_parent(1)
                    .with_times(400, 2_000)
                    .with_resource(Arc::new(Resource::service("db")))
                    .with_attribute("http.status_code", 200i64)
                    .with_event(SpanEvent {
                        name: "exception".into(),
                        time_since_start: 50,
                        attributes: [("message", "oops")].into_iter().collect(),
                    })
                    .with_link(SpanLink {
                        trace_id: crate::model::TraceId(9),
                        span_id: crate::model::SpanId(8),
                        attributes: [("kind", "follows")].into_iter().collect(),
                    }),
            ],
        )))
    }

    #[test]
    fn test_match_all() {
        let t = sample();
        let out = run(&t, "{ }");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 4);
    }

    #[test]
    fn test_structural_operators() {
        let t = sample();
        assert_eq!(matched(&t, r#"{ name = "A" } > { name = "B" }"#), vec!["B"]);
        assert!(matched(&t, r#"{ name = "A" } > { name = "C" }"#).is_empty());
        assert_eq!(matched(&t, r#"{ name = "A" } >> { name = "C" }"#), vec!["C"]);
        assert_eq!(matched(&t, r#"{ name = "C" } << { }"#), vec!["A", "B"]);
        assert_eq!(matched(&t, r#"{ name = "B" } ~ { }"#), vec!["D"]);
        assert_eq!(matched(&t, r#"{ name = "B" } !> { }"#), vec!["A", "B", "D"]);
        assert_eq!(
            matched(&t, r#"{ name = "A" } &> { name = "B" }"#),
            vec!["A", "B"]
        );
    }

    #[test]
    fn test_regex_is_anchored() {
        let t = sample();
        assert!(matched(&t, r#"{ span.foo =~ "bar" }"#).is_empty());
        assert_eq!(matched(&t, r#"{ span.foo =~ ".*bar.*" }"#), vec!["B"]);
        assert_eq!(
            matched(&t, r#"{ span.foo =~ "bar" } with(anchored_regex=false)"#),
            vec!["B"]
        );
    }

    #[test]
    fn test_existence() {
        let t = sample();
        assert_eq!(matched(&t, "{ span.foo != nil }"), vec!["B"]);
        assert_eq!(matched(&t, "{ span.foo = nil }"), vec!["A", "C", "D"]);
        assert!(matched(&t, "{ span.x != nil }").is_empty());
    }

    #[test]
    fn test_unscoped_falls_back_to_resource() {
        let t = sample();
        assert_eq!(matched(&t, r#"{ .service.name = "db" }"#), vec!["D"]);
        assert!(matched(&t, r#"{ span.service.name = "db" }"#).is_empty());
        assert_eq!(
            matched(&t, r#"{ resource.service.name = "shop" }"#),
            vec!["A", "B", "C"]
        );
    }

    #[test]
    fn test_same_span_vs_separate_spans() {
        let t = sample();
        assert!(matched(&t, r#"{ name = "A" && name = "B" }"#).is_empty());
        assert_eq!(
            matched(&t, r#"{ name = "A" } && { name = "B" }"#),
            vec!["A", "B"]
        );
        assert!(matched(&t, r#"{ name = "A" } && { name = "Z" }"#).is_empty());
        assert_eq!(matched(&t, r#"{ name = "A" } || { name = "Z" }"#), vec!["A"]);
    }

    #[test]
    fn test_count_threshold() {
        let t = sample();
        assert_eq!(run(&t, "{ span.http.status_code = 200 } | count() > 2").len(), 1);
        assert!(run(&t, "{ span.http.status_code = 200 } | count() > 3").is_empty());
        let out = run(&t, "{ span.http.status_code = 200 } | count() = 3");
        assert_eq!(
            out[0].attributes,
            vec![("count()".to_string(), Static::Int(3))]
        );
    }

    #[test]
    fn test_aggregates_skip_missing_values() {
        let t = sample();
        assert_eq!(run(&t, "{ } | max(span.http.status_code) = 500").len(), 1);
        assert!(run(&t, "{ } | min(span.missing) > 0").is_empty());
        assert!(run(&t, "{ } | min(span.missing) < 0").is_empty());
        assert_eq!(run(&t, "{ } | avg(duration) > 100ms").len(), 1);
    }

    #[test]
    fn test_grouping() {
        let t = sample();
        let out = run(&t, "{ } | by(resource.service.name)");
        assert_eq!(out.len(), 2);
        assert_eq!(names(&t, &out[0]), vec!["A", "B", "C"]);
        assert_eq!(
            out[0].attributes,
            vec![(
                "by(resource.service.name)".to_string(),
                Static::from("shop")
            )]
        );
        assert_eq!(names(&t, &out[1]), vec!["D"]);

        let out = run(&t, "{ } | by(resource.service.name) | count() > 1");
        assert_eq!(out.len(), 1);
        let out = run(&t, "{ } | by(resource.service.name) | coalesce()");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 4);
    }

    #[test]
    fn test_intrinsics() {
        let t = sample();
        assert_eq!(matched(&t, "{ status = error }"), vec!["C"]);
        assert_eq!(matched(&t, "{ kind = server }"), vec!["A"]);
        assert_eq!(matched(&t, "{ duration > 500ms }"), vec!["A", "B"]);
        assert_eq!(matched(&t, "{ span:childCount = 2 }"), vec!["A"]);
        assert_eq!(matched(&t, "{ nestedSetParent = -1 }"), vec!["A"]);
        assert_eq!(matched(&t, r#"{ rootServiceName = "shop" }"#).len(), 4);
        assert_eq!(matched(&t, r#"{ trace:rootName = "A" }"#).len(), 4);
        assert_eq!(matched(&t, "{ traceDuration = 1s }").len(), 4);
        assert_eq!(
            matched(&t, r#"{ span:id = "0000000000000003" }"#),
            vec!["C"]
        );
        assert_eq!(
            matched(&t, r#"{ parent = "0000000000000002" }"#),
            vec!["C"]
        );
        assert_eq!(matched(&t, r#"{ statusMessage = "boom" }"#), vec!["C"]);
    }

    #[test]
    fn test_parent_scope() {
        let t = sample();
        assert_eq!(
            matched(&t, "{ parent.http.status_code = 200 }"),
            vec!["B", "C", "D"]
        );
        assert!(matched(&t, r#"{ parent.foo = "embedded-bar-text" && name = "D" }"#).is_empty());
    }

    #[test]
    fn test_events_and_links() {
        let t = sample();
        assert_eq!(matched(&t, r#"{ event:name = "exception" }"#), vec!["D"]);
        assert_eq!(
            matched(&t, r#"{ event.message = "oops" && event:timeSinceStart = 50ns }"#),
            vec!["D"]
        );
        assert_eq!(matched(&t, r#"{ link.kind = "follows" }"#), vec!["D"]);
        assert_eq!(
            matched(&t, r#"{ link:spanID = "0000000000000008" }"#),
            vec!["D"]
        );
        assert!(matched(&t, r#"{ event:name = "exception" && name = "A" }"#).is_empty());
    }

    #[test]
    fn test_type_mismatch_is_false() {
        let t = sample();
        assert!(matched(&t, r#"{ name > 3 && name = 3 }"#).is_empty());
        assert!(matched(&t, "{ span.foo > 1s }").is_empty());
        assert_eq!(matched(&t, "{ !(span.foo = 1) }").len(), 4);
    }

    #[test]
    fn test_corrupt_spans_are_skipped() {
        let t = IndexedTrace::new(Arc::new(Trace::new(
            1,
            vec![Span::new(1, "root"), Span::new(1, "dup"), Span::new(2, "lost").with_parent(7)],
        )));
        assert_eq!(matched(&t, "{ }"), vec!["root"]);
    }

    #[test]
    fn test_subpipeline() {
        let t = sample();
        assert_eq!(
            matched(&t, r#"({ span.http.status_code = 200 } | count() > 2) && { status = error }"#),
            vec!["A", "B", "C", "D"]
        );
        assert!(matched(
            &t,
            r#"({ span.http.status_code = 200 } | count() > 5) && { status = error }"#
        )
        .is_empty());
    }
}
