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

//! Abstract Syntax Tree for queries
//!
//! A query is a [`RootExpr`]: a [`Pipeline`] of stages plus optional
//! `with(...)` hints. The tree is immutable once parsed and is shared
//! read-only by every per-trace evaluation.
//!
//! Every node implements `Display` so that printing a tree and parsing the
//! output yields an equal tree.

use std::fmt;

use crate::core::{
    AttributeScope, Intrinsic, IntrinsicScope, LogicalOperator, Operator, Static,
    StructuralOperator,
};

use super::token::is_attribute_terminator;

// ============================================================================
// Root and hints
// ============================================================================

/// Hint enabling newest-first result collection
pub const HINT_MOST_RECENT: &str = "most_recent";
/// Hint controlling whether `=~` must match the whole value (default true)
pub const HINT_ANCHORED_REGEX: &str = "anchored_regex";

/// A parsed query
#[derive(Debug, Clone, PartialEq)]
pub struct RootExpr {
    pub pipeline: Pipeline,
    pub hints: Hints,
}

impl RootExpr {
    pub fn new(pipeline: Pipeline, hints: Hints) -> Self {
        Self { pipeline, hints }
    }

    /// Attributes read by filter conditions anywhere in the query
    pub fn filter_attributes(&self) -> Vec<Attribute> {
        let mut out = Vec::new();
        self.pipeline.walk_filters(&mut |filter| {
            filter.expr.walk_attributes(&mut |attr| {
                if !out.contains(attr) {
                    out.push(attr.clone());
                }
            })
        });
        out
    }

    /// Regex patterns written as literals in filters and `by(...)` fields
    pub fn regex_literals(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut add = |p: &str| {
            if !out.iter().any(|seen| seen == p) {
                out.push(p.to_string());
            }
        };
        self.pipeline
            .walk_filters(&mut |filter| filter.expr.walk_regex_literals(&mut add));
        self.pipeline.walk_stages(&mut |stage| {
            if let Stage::Grouping(fields) = stage {
                for field in fields {
                    field.walk_regex_literals(&mut add);
                }
            }
        });
        out
    }

    /// Attributes named by `select(...)` stages
    pub fn selected_attributes(&self) -> Vec<Attribute> {
        let mut out: Vec<Attribute> = Vec::new();
        self.pipeline.walk_stages(&mut |stage| {
            if let Stage::FieldSelection(attrs) = stage {
                for attr in attrs {
                    if !out.contains(attr) {
                        out.push(attr.clone());
                    }
                }
            }
        });
        out
    }
}

impl fmt::Display for RootExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pipeline)?;
        if !self.hints.is_empty() {
            write!(f, " {}", self.hints)?;
        }
        Ok(())
    }
}

/// One `key=value` pair of a `with(...)` clause
#[derive(Debug, Clone, PartialEq)]
pub struct Hint {
    pub name: String,
    pub value: Static,
}

/// Query-level hints, in source order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hints {
    pub entries: Vec<Hint>,
}

impl Hints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Set a hint, replacing an earlier value with the same name
    pub fn set(&mut self, name: impl Into<String>, value: Static) {
        let name = name.into();
        match self.entries.iter_mut().find(|h| h.name == name) {
            Some(hint) => hint.value = value,
            None => self.entries.push(Hint { name, value }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Static> {
        self.entries
            .iter()
            .rev()
            .find(|h| h.name == name)
            .map(|h| &h.value)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Static::as_bool)
    }

    /// Overlay `other` on top of these hints; `other` wins on conflicts
    pub fn merged(&self, other: &Hints) -> Hints {
        let mut out = self.clone();
        for hint in &other.entries {
            out.set(hint.name.clone(), hint.value.clone());
        }
        out
    }

    pub fn most_recent(&self) -> bool {
        self.get_bool(HINT_MOST_RECENT).unwrap_or(false)
    }

    pub fn anchored_regex(&self) -> bool {
        self.get_bool(HINT_ANCHORED_REGEX).unwrap_or(true)
    }
}

impl fmt::Display for Hints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "with(")?;
        for (i, hint) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", hint.name, hint.value)?;
        }
        write!(f, ")")
    }
}

// ============================================================================
// Pipeline and stages
// ============================================================================

/// Ordered chain of stages separated by `|`
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Visit every stage, including stages of nested sub-pipelines
    pub fn walk_stages(&self, f: &mut dyn FnMut(&Stage)) {
        for stage in &self.stages {
            f(stage);
            if let Stage::Spanset(expr) = stage {
                expr.walk_pipelines(&mut |p| p.walk_stages(f));
            }
        }
    }

    /// Visit every spanset filter
    pub fn walk_filters(&self, f: &mut dyn FnMut(&SpansetFilter)) {
        for stage in &self.stages {
            if let Stage::Spanset(expr) = stage {
                expr.walk_filters(f);
            }
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", stage)?;
        }
        Ok(())
    }
}

/// A pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Selection, structural join, logical combination or sub-pipeline
    Spanset(SpansetExpression),
    /// `count() > 2`: keeps spansets whose aggregate comparison holds
    Aggregation(ScalarFilter),
    /// `by(.a, .b)`: partitions spansets by field values
    Grouping(Vec<FieldExpression>),
    /// `coalesce()`: merges all spansets into one
    Coalesce,
    /// `select(.a, .b)`: fields to materialize in results
    FieldSelection(Vec<Attribute>),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Spanset(expr) => write!(f, "{}", expr),
            Stage::Aggregation(filter) => write!(f, "{}", filter),
            Stage::Grouping(fields) => {
                write!(f, "by(")?;
                write_list(f, fields)?;
                write!(f, ")")
            }
            Stage::Coalesce => write!(f, "coalesce()"),
            Stage::FieldSelection(attrs) => {
                write!(f, "select(")?;
                write_list(f, attrs)?;
                write!(f, ")")
            }
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

// ============================================================================
// Spanset expressions
// ============================================================================

/// An expression producing spansets
#[derive(Debug, Clone, PartialEq)]
pub enum SpansetExpression {
    /// `{ predicate }`
    Filter(SpansetFilter),
    /// `lhs >> rhs` and the other structural operators
    StructuralJoin {
        op: StructuralOperator,
        lhs: Box<SpansetExpression>,
        rhs: Box<SpansetExpression>,
    },
    /// `lhs && rhs`, `lhs || rhs`
    Logical {
        op: LogicalOperator,
        lhs: Box<SpansetExpression>,
        rhs: Box<SpansetExpression>,
    },
    /// `( stage | stage )`
    Subpipeline(Box<Pipeline>),
}

impl SpansetExpression {
    pub fn structural(op: StructuralOperator, lhs: Self, rhs: Self) -> Self {
        SpansetExpression::StructuralJoin {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn logical(op: LogicalOperator, lhs: Self, rhs: Self) -> Self {
        SpansetExpression::Logical {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    fn is_operation(&self) -> bool {
        matches!(
            self,
            SpansetExpression::StructuralJoin { .. } | SpansetExpression::Logical { .. }
        )
    }

    /// Visit every filter in this expression and its sub-pipelines
    pub fn walk_filters(&self, f: &mut dyn FnMut(&SpansetFilter)) {
        match self {
            SpansetExpression::Filter(filter) => f(filter),
            SpansetExpression::StructuralJoin { lhs, rhs, .. }
            | SpansetExpression::Logical { lhs, rhs, .. } => {
                lhs.walk_filters(f);
                rhs.walk_filters(f);
            }
            SpansetExpression::Subpipeline(pipeline) => pipeline.walk_filters(f),
        }
    }

    fn walk_pipelines(&self, f: &mut dyn FnMut(&Pipeline)) {
        match self {
            SpansetExpression::Filter(_) => {}
            SpansetExpression::StructuralJoin { lhs, rhs, .. }
            | SpansetExpression::Logical { lhs, rhs, .. } => {
                lhs.walk_pipelines(f);
                rhs.walk_pipelines(f);
            }
            SpansetExpression::Subpipeline(pipeline) => f(pipeline),
        }
    }
}

struct Operand<'a>(&'a SpansetExpression);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_operation() {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Display for SpansetExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpansetExpression::Filter(filter) => write!(f, "{}", filter),
            SpansetExpression::StructuralJoin { op, lhs, rhs } => {
                write!(f, "{} {} {}", Operand(lhs), op, Operand(rhs))
            }
            SpansetExpression::Logical { op, lhs, rhs } => {
                write!(f, "{} {} {}", Operand(lhs), op, Operand(rhs))
            }
            SpansetExpression::Subpipeline(pipeline) => write!(f, "({})", pipeline),
        }
    }
}

/// `{ predicate }` evaluated against each span
#[derive(Debug, Clone, PartialEq)]
pub struct SpansetFilter {
    pub expr: FieldExpression,
    /// The predicate reads event fields and is tried once per event
    pub references_events: bool,
    /// The predicate reads link fields and is tried once per link
    pub references_links: bool,
}

impl SpansetFilter {
    pub fn new(expr: FieldExpression) -> Self {
        let mut references_events = false;
        let mut references_links = false;
        expr.walk_attributes(&mut |attr| match attr.target() {
            AttributeTarget::Event => references_events = true,
            AttributeTarget::Link => references_links = true,
            _ => {}
        });
        Self {
            expr,
            references_events,
            references_links,
        }
    }

    /// `{ }`, which matches every span
    pub fn match_all() -> Self {
        Self::new(FieldExpression::Static(Static::Bool(true)))
    }
}

impl fmt::Display for SpansetFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ {} }}", self.expr)
    }
}

// ============================================================================
// Field expressions
// ============================================================================

/// Expression evaluated against one span
#[derive(Debug, Clone, PartialEq)]
pub enum FieldExpression {
    Static(Static),
    Attribute(Attribute),
    Binary {
        op: Operator,
        lhs: Box<FieldExpression>,
        rhs: Box<FieldExpression>,
    },
    /// `!x`, `-x`, and the rewritten `x != nil` / `x = nil`
    Unary {
        op: Operator,
        expr: Box<FieldExpression>,
    },
}

impl FieldExpression {
    /// Build a binary operation, rewriting nil comparisons and folding literals
    pub fn binary(op: Operator, lhs: FieldExpression, rhs: FieldExpression) -> FieldExpression {
        let is_nil = |e: &FieldExpression| matches!(e, FieldExpression::Static(Static::Nil));
        match op {
            Operator::NotEqual if is_nil(&rhs) => return Self::unary(Operator::Exists, lhs),
            Operator::NotEqual if is_nil(&lhs) => return Self::unary(Operator::Exists, rhs),
            Operator::Equal if is_nil(&rhs) => return Self::unary(Operator::NotExists, lhs),
            Operator::Equal if is_nil(&lhs) => return Self::unary(Operator::NotExists, rhs),
            _ => {}
        }

        if let (FieldExpression::Static(l), FieldExpression::Static(r)) = (&lhs, &rhs) {
            if op.is_comparison() && !op.is_regex() {
                let matched = Static::compare(op, l, r, &mut |_: &str, _: &str| false);
                return FieldExpression::Static(Static::Bool(matched));
            }
            if !op.is_regex() {
                return FieldExpression::Static(Static::binary(op, l, r));
            }
        }

        FieldExpression::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Build a unary operation, folding literals
    pub fn unary(op: Operator, expr: FieldExpression) -> FieldExpression {
        match expr {
            FieldExpression::Static(value) => FieldExpression::Static(Static::unary(op, &value)),
            expr => FieldExpression::Unary {
                op,
                expr: Box::new(expr),
            },
        }
    }

    /// Visit every attribute reference
    pub fn walk_attributes(&self, f: &mut dyn FnMut(&Attribute)) {
        match self {
            FieldExpression::Static(_) => {}
            FieldExpression::Attribute(attr) => f(attr),
            FieldExpression::Binary { lhs, rhs, .. } => {
                lhs.walk_attributes(f);
                rhs.walk_attributes(f);
            }
            FieldExpression::Unary { expr, .. } => expr.walk_attributes(f),
        }
    }

    /// Visit every literal pattern on the right of `=~` or `!~`
    pub fn walk_regex_literals(&self, f: &mut dyn FnMut(&str)) {
        match self {
            FieldExpression::Binary { op, lhs, rhs } => {
                if op.is_regex() {
                    if let FieldExpression::Static(value) = rhs.as_ref() {
                        if let Some(pattern) = value.as_str() {
                            f(pattern);
                        }
                    }
                }
                lhs.walk_regex_literals(f);
                rhs.walk_regex_literals(f);
            }
            FieldExpression::Unary { expr, .. } => expr.walk_regex_literals(f),
            FieldExpression::Static(_) | FieldExpression::Attribute(_) => {}
        }
    }

    /// Whether the expression can only produce a non-boolean value
    pub fn is_non_boolean(&self) -> bool {
        match self {
            FieldExpression::Static(value) => !matches!(value, Static::Bool(_)),
            FieldExpression::Attribute(_) => false,
            FieldExpression::Binary { op, .. } => op.is_arithmetic(),
            FieldExpression::Unary { op, .. } => *op == Operator::Sub,
        }
    }

    fn needs_parens(&self) -> bool {
        match self {
            FieldExpression::Binary { .. } => true,
            FieldExpression::Unary { op, .. } => {
                matches!(op, Operator::Exists | Operator::NotExists)
            }
            _ => false,
        }
    }
}

struct Nested<'a>(&'a FieldExpression);

impl fmt::Display for Nested<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.needs_parens() {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Display for FieldExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldExpression::Static(value) => write!(f, "{}", value),
            FieldExpression::Attribute(attr) => write!(f, "{}", attr),
            FieldExpression::Binary { op, lhs, rhs } => {
                write!(f, "{} {} {}", Nested(lhs), op, Nested(rhs))
            }
            FieldExpression::Unary { op, expr } => match op {
                Operator::Exists => write!(f, "{} != nil", Nested(expr)),
                Operator::NotExists => write!(f, "{} = nil", Nested(expr)),
                _ => write!(f, "{}{}", op, Nested(expr)),
            },
        }
    }
}

/// What an attribute reference reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeTarget {
    Span,
    Trace,
    Event,
    Link,
    Instrumentation,
}

/// Reference to a custom attribute or an intrinsic
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub scope: AttributeScope,
    /// `parent.`: read from the parent span
    pub parent: bool,
    /// Attribute name; empty for intrinsics
    pub name: String,
    pub intrinsic: Option<Intrinsic>,
}

impl Attribute {
    /// Custom attribute such as `.foo` or `resource.foo`
    pub fn new(scope: AttributeScope, name: impl Into<String>) -> Self {
        Self {
            scope,
            parent: false,
            name: name.into(),
            intrinsic: None,
        }
    }

    /// Custom attribute of the parent span such as `parent.foo`
    pub fn parent(scope: AttributeScope, name: impl Into<String>) -> Self {
        Self {
            parent: true,
            ..Self::new(scope, name)
        }
    }

    /// Built-in field such as `duration` or `trace:rootName`
    pub fn intrinsic(intrinsic: Intrinsic) -> Self {
        Self {
            scope: AttributeScope::None,
            parent: false,
            name: String::new(),
            intrinsic: Some(intrinsic),
        }
    }

    pub fn is_intrinsic(&self) -> bool {
        self.intrinsic.is_some()
    }

    /// The entity the reference reads from
    pub fn target(&self) -> AttributeTarget {
        match self.intrinsic {
            Some(intrinsic) => match intrinsic.scope() {
                IntrinsicScope::Span => AttributeTarget::Span,
                IntrinsicScope::Trace => AttributeTarget::Trace,
                IntrinsicScope::Event => AttributeTarget::Event,
                IntrinsicScope::Link => AttributeTarget::Link,
                IntrinsicScope::Instrumentation => AttributeTarget::Instrumentation,
            },
            None => match self.scope {
                AttributeScope::Event => AttributeTarget::Event,
                AttributeScope::Link => AttributeTarget::Link,
                AttributeScope::Instrumentation => AttributeTarget::Instrumentation,
                _ => AttributeTarget::Span,
            },
        }
    }
}

fn needs_quoting(name: &str) -> bool {
    name.is_empty()
        || name.starts_with(|c: char| c.is_ascii_digit())
        || name.chars().any(is_attribute_terminator)
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(intrinsic) = self.intrinsic {
            return write!(f, "{}", intrinsic);
        }
        if self.parent {
            write!(f, "parent")?;
            if matches!(self.scope, AttributeScope::Span | AttributeScope::Resource) {
                write!(f, ".{}", self.scope.prefix())?;
            }
        } else {
            write!(f, "{}", self.scope.prefix())?;
        }
        if needs_quoting(&self.name) {
            write!(f, ".\"")?;
            for c in self.name.chars() {
                if c == '"' || c == '\\' {
                    write!(f, "\\")?;
                }
                write!(f, "{}", c)?;
            }
            write!(f, "\"")
        } else {
            write!(f, ".{}", self.name)
        }
    }
}

// ============================================================================
// Scalar expressions
// ============================================================================

/// Aggregate functions available in scalar filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    Count,
    Avg,
    Min,
    Max,
    Sum,
}

impl AggregateKind {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateKind::Count => "count",
            AggregateKind::Avg => "avg",
            AggregateKind::Min => "min",
            AggregateKind::Max => "max",
            AggregateKind::Sum => "sum",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "count" => Some(AggregateKind::Count),
            "avg" => Some(AggregateKind::Avg),
            "min" => Some(AggregateKind::Min),
            "max" => Some(AggregateKind::Max),
            "sum" => Some(AggregateKind::Sum),
            _ => None,
        }
    }
}

/// `count()` or `avg(field)` and friends
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub kind: AggregateKind,
    /// None only for `count()`
    pub field: Option<FieldExpression>,
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}({})", self.kind.name(), field),
            None => write!(f, "{}()", self.kind.name()),
        }
    }
}

/// Expression over aggregates and literals
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarExpression {
    Static(Static),
    Aggregate(Aggregate),
    Binary {
        op: Operator,
        lhs: Box<ScalarExpression>,
        rhs: Box<ScalarExpression>,
    },
}

impl ScalarExpression {
    /// Build an arithmetic operation, folding literals
    pub fn binary(op: Operator, lhs: ScalarExpression, rhs: ScalarExpression) -> Self {
        match (&lhs, &rhs) {
            (ScalarExpression::Static(l), ScalarExpression::Static(r)) => {
                ScalarExpression::Static(Static::binary(op, l, r))
            }
            _ => ScalarExpression::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        }
    }

    /// Visit every aggregate
    pub fn walk_aggregates(&self, f: &mut dyn FnMut(&Aggregate)) {
        match self {
            ScalarExpression::Static(_) => {}
            ScalarExpression::Aggregate(agg) => f(agg),
            ScalarExpression::Binary { lhs, rhs, .. } => {
                lhs.walk_aggregates(f);
                rhs.walk_aggregates(f);
            }
        }
    }

    fn nested(&self) -> NestedScalar<'_> {
        NestedScalar(self)
    }
}

struct NestedScalar<'a>(&'a ScalarExpression);

impl fmt::Display for NestedScalar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            ScalarExpression::Binary { .. } => write!(f, "({})", self.0),
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Display for ScalarExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarExpression::Static(value) => write!(f, "{}", value),
            ScalarExpression::Aggregate(agg) => write!(f, "{}", agg),
            ScalarExpression::Binary { op, lhs, rhs } => {
                write!(f, "{} {} {}", lhs.nested(), op, rhs.nested())
            }
        }
    }
}

/// `lhs op rhs` over scalar expressions, closing a pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarFilter {
    pub op: Operator,
    pub lhs: ScalarExpression,
    pub rhs: ScalarExpression,
}

impl ScalarFilter {
    /// Visit every aggregate on both sides
    pub fn walk_aggregates(&self, f: &mut dyn FnMut(&Aggregate)) {
        self.lhs.walk_aggregates(f);
        self.rhs.walk_aggregates(f);
    }
}

impl fmt::Display for ScalarFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs.nested(), self.op, self.rhs.nested())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(name: &str) -> FieldExpression {
        FieldExpression::Attribute(Attribute::new(AttributeScope::None, name))
    }

    #[test]
    fn test_nil_rewrites() {
        let e = FieldExpression::binary(Operator::NotEqual, attr("x"), FieldExpression::Static(Static::Nil));
        assert_eq!(e.to_string(), ".x != nil");
        assert!(matches!(e, FieldExpression::Unary { op: Operator::Exists, .. }));

        let e = FieldExpression::binary(Operator::Equal, FieldExpression::Static(Static::Nil), attr("x"));
        assert!(matches!(e, FieldExpression::Unary { op: Operator::NotExists, .. }));
    }

    #[test]
    fn test_constant_folding() {
        let sum = FieldExpression::binary(
            Operator::Add,
            FieldExpression::Static(Static::int(1)),
            FieldExpression::Static(Static::int(1)),
        );
        let cmp = FieldExpression::binary(Operator::Greater, sum, FieldExpression::Static(Static::int(1)));
        assert_eq!(cmp, FieldExpression::Static(Static::Bool(true)));

        let regex = FieldExpression::binary(
            Operator::Regex,
            FieldExpression::Static(Static::from("a")),
            FieldExpression::Static(Static::from("a")),
        );
        assert!(matches!(regex, FieldExpression::Binary { .. }));
    }

    #[test]
    fn test_attribute_display() {
        assert_eq!(Attribute::new(AttributeScope::None, "http.method").to_string(), ".http.method");
        assert_eq!(Attribute::new(AttributeScope::Resource, "service.name").to_string(), "resource.service.name");
        assert_eq!(Attribute::new(AttributeScope::Span, "a b").to_string(), "span.\"a b\"");
        assert_eq!(Attribute::new(AttributeScope::None, "1x").to_string(), ".\"1x\"");
        assert_eq!(Attribute::new(AttributeScope::None, "q\"").to_string(), ".\"q\\\"\"");
        assert_eq!(Attribute::parent(AttributeScope::None, "foo").to_string(), "parent.foo");
        assert_eq!(Attribute::parent(AttributeScope::Resource, "foo").to_string(), "parent.resource.foo");
        assert_eq!(Attribute::intrinsic(Intrinsic::TraceRootService).to_string(), "rootServiceName");
        assert_eq!(Attribute::intrinsic(Intrinsic::SpanId).to_string(), "span:id");
    }

    #[test]
    fn test_nested_display() {
        let e = FieldExpression::binary(
            Operator::And,
            FieldExpression::binary(Operator::Equal, attr("a"), FieldExpression::Static(Static::int(1))),
            FieldExpression::unary(Operator::Not, attr("b")),
        );
        assert_eq!(e.to_string(), "(.a = 1) && !.b");
        let filter = SpansetExpression::Filter(SpansetFilter::new(e));
        assert_eq!(filter.to_string(), "{ (.a = 1) && !.b }");
    }

    #[test]
    fn test_spanset_operand_parens() {
        let a = SpansetExpression::Filter(SpansetFilter::match_all());
        let join = SpansetExpression::structural(
            StructuralOperator::from_symbol(">>").unwrap(),
            a.clone(),
            a.clone(),
        );
        let both = SpansetExpression::logical(LogicalOperator::And, join, a);
        assert_eq!(both.to_string(), "({ true } >> { true }) && { true }");
    }

    #[test]
    fn test_hints() {
        let mut hints = Hints::new();
        hints.set(HINT_MOST_RECENT, Static::Bool(true));
        hints.set("custom", Static::from("v"));
        assert!(hints.most_recent());
        assert!(hints.anchored_regex());
        assert_eq!(hints.to_string(), "with(most_recent=true, custom=`v`)");

        let mut caller = Hints::new();
        caller.set(HINT_MOST_RECENT, Static::Bool(false));
        assert!(!hints.merged(&caller).most_recent());
    }

    #[test]
    fn test_filter_scope_flags() {
        let filter = SpansetFilter::new(FieldExpression::binary(
            Operator::Equal,
            FieldExpression::Attribute(Attribute::intrinsic(Intrinsic::EventName)),
            FieldExpression::Static(Static::from("exception")),
        ));
        assert!(filter.references_events);
        assert!(!filter.references_links);
    }

    #[test]
    fn test_scalar_display() {
        let count = ScalarExpression::Aggregate(Aggregate {
            kind: AggregateKind::Count,
            field: None,
        });
        let sum = ScalarExpression::binary(Operator::Add, count.clone(), ScalarExpression::Static(Static::int(1)));
        let filter = ScalarFilter {
            op: Operator::Greater,
            lhs: sum,
            rhs: ScalarExpression::Static(Static::int(2)),
        };
        assert_eq!(filter.to_string(), "(count() + 1) > 2");
    }
}
