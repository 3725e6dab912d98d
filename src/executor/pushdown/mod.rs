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

//! Condition Pushdown Framework
//!
//! Flattens a parsed query into [`FetchConditions`] a storage index can use
//! to skip traces that cannot match. The flattening over-approximates: a
//! trace that matches the query always satisfies the conditions, while a
//! trace that satisfies them may still fail evaluation.
//!
//! Filter predicates are reduced to a [`Requirement`] tree by a registry of
//! [`PushdownRule`]s. Spanset operators and pipeline stages combine those
//! trees, which are then normalized into the flat condition list.
//!
//! ## Adding a New Pushdown Rule
//!
//! 1. Create a new struct implementing `PushdownRule`
//! 2. Register it in `PushdownRegistry::new()`

mod rules;

use std::fmt;
use std::sync::OnceLock;

use crate::core::{JoinMode, LogicalOperator, Operator, Static};
use crate::model::IndexedTrace;
use crate::parser::{
    Attribute, AttributeTarget, FieldExpression, Pipeline, RootExpr, SpansetExpression,
    SpansetFilter, Stage,
};

use super::evaluator::{Cursor, Evaluator};
use super::pattern_cache::RegexCache;

pub use rules::*;

/// One flattened condition on a field
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub attribute: Attribute,
    /// None for fetch-only conditions, which name a field without filtering
    pub op: Option<Operator>,
    pub operands: Vec<Static>,
}

impl Condition {
    pub fn new(attribute: Attribute, op: Operator, operands: Vec<Static>) -> Self {
        Self {
            attribute,
            op: Some(op),
            operands,
        }
    }

    /// Name a field the query reads without constraining it
    pub fn fetch(attribute: Attribute) -> Self {
        Self {
            attribute,
            op: None,
            operands: Vec::new(),
        }
    }

    pub fn is_filter(&self) -> bool {
        self.op.is_some()
    }

    /// Whether one span satisfies this condition
    ///
    /// Fetch-only conditions are satisfied by every span.
    pub fn matches_span(&self, evaluator: &Evaluator<'_>, span: u32) -> bool {
        let Some(op) = self.op else {
            return true;
        };
        let data = evaluator.trace().span(span);
        let events = &data.events;
        let links = &data.links;
        let test = |cursor: Cursor<'_>| {
            let value = evaluator.resolve(&self.attribute, span, cursor);
            match op {
                Operator::Exists => !value.is_nil(),
                Operator::NotExists => value.is_nil(),
                op => self
                    .operands
                    .first()
                    .is_some_and(|operand| evaluator.compare(op, &value, operand)),
            }
        };
        match self.attribute.target() {
            AttributeTarget::Event if !events.is_empty() => events
                .iter()
                .any(|event| test(Cursor { event: Some(event), link: None })),
            AttributeTarget::Link if !links.is_empty() => links
                .iter()
                .any(|link| test(Cursor { event: None, link: Some(link) })),
            _ => test(Cursor::default()),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.op, self.operands.first()) {
            (None, _) => write!(f, "{}", self.attribute),
            (Some(Operator::Exists), _) => write!(f, "{} != nil", self.attribute),
            (Some(Operator::NotExists), _) => write!(f, "{} = nil", self.attribute),
            (Some(op), Some(operand)) => write!(f, "{} {} {}", self.attribute, op, operand),
            (Some(op), None) => write!(f, "{} {}", self.attribute, op),
        }
    }
}

/// Flattened conditions handed to a storage index
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConditions {
    pub conditions: Vec<Condition>,
    /// Every filtering condition must hold somewhere in a matching trace
    pub all_conditions: bool,
    /// Regular expressions are anchored at both ends
    pub anchored_regex: bool,
}

impl Default for FetchConditions {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            all_conditions: true,
            anchored_regex: true,
        }
    }
}

impl FetchConditions {
    /// Extract conditions from a parsed query
    pub fn from_query(root: &RootExpr) -> Self {
        let registry = global_pushdown_registry();
        let requirement = normalize(registry.pipeline(&root.pipeline));
        let mut out = Self::from_requirement(requirement);
        out.anchored_regex = root.hints.anchored_regex();

        for attr in root
            .filter_attributes()
            .into_iter()
            .chain(stage_attributes(&root.pipeline))
        {
            if !out.conditions.iter().any(|c| c.attribute == attr) {
                out.conditions.push(Condition::fetch(attr));
            }
        }
        out
    }

    fn from_requirement(requirement: Requirement) -> Self {
        let mut out = Self::default();
        match requirement {
            Requirement::Leaf(condition) => out.conditions.push(condition),
            Requirement::All(members) => {
                for member in members {
                    match member {
                        Requirement::Leaf(condition) => out.push_unique(condition),
                        other => other.walk_leaves(&mut |c| {
                            out.push_unique(Condition::fetch(c.attribute.clone()))
                        }),
                    }
                }
            }
            Requirement::Any(members) => {
                out.all_conditions = false;
                for member in members {
                    member.walk_leaves(&mut |c| out.push_unique(c.clone()));
                }
            }
            Requirement::Opaque => {}
        }
        out
    }

    fn push_unique(&mut self, condition: Condition) {
        if !self.conditions.contains(&condition) {
            self.conditions.push(condition);
        }
    }

    /// Filtering conditions, skipping fetch-only ones
    pub fn filters(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter().filter(|c| c.is_filter())
    }

    /// Whether an index may use these conditions to exclude traces
    pub fn pruning_enabled(&self) -> bool {
        let mut filters = self.filters().peekable();
        if filters.peek().is_none() {
            return false;
        }
        self.all_conditions || self.conditions.iter().all(Condition::is_filter)
    }

    /// Whether a trace may match the query these conditions came from
    ///
    /// Always true when pruning is disabled.
    pub fn may_match(&self, trace: &IndexedTrace, regex: &RegexCache) -> bool {
        if !self.pruning_enabled() {
            return true;
        }
        let evaluator = Evaluator::new(trace, regex, self.anchored_regex);
        let satisfied = |condition: &Condition| {
            trace
                .valid()
                .iter()
                .any(|span| condition.matches_span(&evaluator, span))
        };
        if self.all_conditions {
            self.filters().all(satisfied)
        } else {
            self.filters().any(satisfied)
        }
    }
}

impl fmt::Display for FetchConditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joiner = if self.all_conditions { " && " } else { " || " };
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                f.write_str(joiner)?;
            }
            write!(f, "{}", condition)?;
        }
        Ok(())
    }
}

/// What a matching trace must contain
#[derive(Debug, Clone, PartialEq)]
pub enum Requirement {
    /// Every member holds; `All([])` holds for every trace
    All(Vec<Requirement>),
    /// At least one member holds
    Any(Vec<Requirement>),
    /// Some span satisfies the condition
    Leaf(Condition),
    /// Cannot be expressed as conditions
    Opaque,
}

impl Requirement {
    fn walk_leaves(&self, f: &mut dyn FnMut(&Condition)) {
        match self {
            Requirement::All(members) | Requirement::Any(members) => {
                for member in members {
                    member.walk_leaves(f);
                }
            }
            Requirement::Leaf(condition) => f(condition),
            Requirement::Opaque => {}
        }
    }
}

/// Simplify a requirement tree
///
/// Opaque members of a conjunction are dropped since the rest still has
/// to hold. An opaque member of a disjunction makes the whole disjunction
/// opaque, and a member that always holds makes it always hold.
pub fn normalize(requirement: Requirement) -> Requirement {
    match requirement {
        Requirement::All(members) => {
            let mut out = Vec::new();
            for member in members.into_iter().map(normalize) {
                match member {
                    Requirement::Opaque => {}
                    Requirement::All(inner) => out.extend(inner),
                    other => out.push(other),
                }
            }
            if out.len() == 1 {
                out.pop().unwrap_or(Requirement::All(Vec::new()))
            } else {
                Requirement::All(out)
            }
        }
        Requirement::Any(members) => {
            let mut out = Vec::new();
            for member in members.into_iter().map(normalize) {
                match member {
                    Requirement::Opaque => return Requirement::Opaque,
                    Requirement::All(inner) if inner.is_empty() => {
                        return Requirement::All(Vec::new())
                    }
                    Requirement::Any(inner) => out.extend(inner),
                    other => out.push(other),
                }
            }
            match out.len() {
                0 => Requirement::Opaque,
                1 => out.pop().unwrap_or(Requirement::Opaque),
                _ => Requirement::Any(out),
            }
        }
        other => other,
    }
}

/// Attributes read by grouping, selection and aggregate stages
fn stage_attributes(pipeline: &Pipeline) -> Vec<Attribute> {
    let mut out = Vec::new();
    pipeline.walk_stages(&mut |stage| match stage {
        Stage::Grouping(fields) => {
            for field in fields {
                field.walk_attributes(&mut |attr| out.push(attr.clone()));
            }
        }
        Stage::FieldSelection(attrs) => out.extend(attrs.iter().cloned()),
        Stage::Aggregation(filter) => filter.walk_aggregates(&mut |agg| {
            if let Some(field) = &agg.field {
                field.walk_attributes(&mut |attr| out.push(attr.clone()));
            }
        }),
        _ => {}
    });
    out
}

/// Result of a pushdown attempt
#[derive(Debug)]
pub enum PushdownResult {
    /// Converted into a requirement
    Converted(Requirement),
    /// This rule doesn't apply to this expression (try next rule)
    NotApplicable,
    /// The expression matches the rule but cannot be flattened
    CannotPush,
}

/// Context for pushdown operations
pub struct PushdownContext<'a> {
    /// Registry used for recursive conversion of operands
    pub registry: &'a PushdownRegistry,
}

impl PushdownContext<'_> {
    /// Convert a sub-expression with the full rule set
    pub fn convert(&self, expr: &FieldExpression) -> Requirement {
        self.registry.requirement(expr)
    }
}

/// Trait for pushdown rules
///
/// Each rule is responsible for:
/// 1. Checking if it can handle a predicate
/// 2. Converting the predicate to a requirement
pub trait PushdownRule: Send + Sync {
    /// Rule name for debugging and logging
    fn name(&self) -> &'static str;

    /// Try to convert a filter predicate
    fn try_convert(&self, expr: &FieldExpression, ctx: &PushdownContext<'_>) -> PushdownResult;
}

/// Registry of all pushdown rules
///
/// The registry tries rules in order and uses the first one that applies.
pub struct PushdownRegistry {
    rules: Vec<Box<dyn PushdownRule>>,
}

impl Default for PushdownRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PushdownRegistry {
    /// Create a new registry with all built-in rules
    pub fn new() -> Self {
        let mut registry = Self { rules: vec![] };

        // Logical operators (handle compound expressions)
        registry.register(Box::new(LogicalAndRule));
        registry.register(Box::new(LogicalOrRule));
        registry.register(Box::new(LogicalNotRule));

        // Existence checks and comparisons
        registry.register(Box::new(ExistenceRule));
        registry.register(Box::new(ComparisonRule));

        // Literals and bare attributes
        registry.register(Box::new(StaticRule));
        registry.register(Box::new(BareAttributeRule));

        registry
    }

    /// Register a custom pushdown rule
    pub fn register(&mut self, rule: Box<dyn PushdownRule>) {
        self.rules.push(rule);
    }

    /// Names of the registered rules, in priority order
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Reduce a filter predicate to a requirement
    pub fn requirement(&self, expr: &FieldExpression) -> Requirement {
        let ctx = PushdownContext { registry: self };
        for rule in &self.rules {
            match rule.try_convert(expr, &ctx) {
                PushdownResult::Converted(requirement) => return requirement,
                PushdownResult::CannotPush => return Requirement::Opaque,
                PushdownResult::NotApplicable => continue,
            }
        }
        Requirement::Opaque
    }

    /// Requirement of a `{ }` filter
    pub fn filter(&self, filter: &SpansetFilter) -> Requirement {
        self.requirement(&filter.expr)
    }

    /// Requirement of a spanset expression
    pub fn spanset(&self, expr: &SpansetExpression) -> Requirement {
        match expr {
            SpansetExpression::Filter(filter) => self.filter(filter),
            SpansetExpression::Logical { op, lhs, rhs } => {
                let members = vec![self.spanset(lhs), self.spanset(rhs)];
                match op {
                    LogicalOperator::And => Requirement::All(members),
                    LogicalOperator::Or => Requirement::Any(members),
                }
            }
            // Negated joins can hold with an empty left side
            SpansetExpression::StructuralJoin { op, lhs, rhs } => match op.mode {
                JoinMode::Negated => self.spanset(rhs),
                JoinMode::Match | JoinMode::Union => {
                    Requirement::All(vec![self.spanset(lhs), self.spanset(rhs)])
                }
            },
            SpansetExpression::Subpipeline(pipeline) => self.pipeline(pipeline),
        }
    }

    /// Requirement of a pipeline: all of its spanset stages
    ///
    /// Aggregations, grouping and the other stages only ever drop
    /// spansets, so they add nothing.
    pub fn pipeline(&self, pipeline: &Pipeline) -> Requirement {
        Requirement::All(
            pipeline
                .stages
                .iter()
                .filter_map(|stage| match stage {
                    Stage::Spanset(expr) => Some(self.spanset(expr)),
                    _ => None,
                })
                .collect(),
        )
    }
}

/// Global pushdown registry
static GLOBAL_PUSHDOWN_REGISTRY: OnceLock<PushdownRegistry> = OnceLock::new();

/// Get the global pushdown registry
pub fn global_pushdown_registry() -> &'static PushdownRegistry {
    GLOBAL_PUSHDOWN_REGISTRY.get_or_init(PushdownRegistry::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AttributeScope;
    use crate::parser::parse;

    fn conditions(query: &str) -> FetchConditions {
        FetchConditions::from_query(&parse(query).unwrap())
    }

    fn rendered(query: &str) -> String {
        conditions(query).to_string()
    }

    #[test]
    fn test_conjunction() {
        let c = conditions(r#"{ .a = 1 && resource.b =~ "x.*" }"#);
        assert!(c.all_conditions);
        assert!(c.pruning_enabled());
        assert_eq!(c.to_string(), r#".a = 1 && resource.b =~ `x.*`"#);
    }

    #[test]
    fn test_mirrored_literal() {
        assert_eq!(rendered("{ 10 < .a }"), ".a > 10");
        assert_eq!(rendered("{ 1s >= duration }"), "duration <= 1s");
    }

    #[test]
    fn test_disjunction() {
        let c = conditions("{ .a = 1 || .b = 2 }");
        assert!(!c.all_conditions);
        assert!(c.pruning_enabled());
        assert_eq!(c.to_string(), ".a = 1 || .b = 2");

        let c = conditions("{ .a = 1 } || { .b = 2 && .c = 3 }");
        assert!(!c.all_conditions);
        assert_eq!(c.conditions.len(), 3);
        assert!(c.pruning_enabled());
    }

    #[test]
    fn test_mixed_conjunction_downgrades_disjunctions() {
        let c = conditions("{ .a = 1 && (.b = 2 || .c = 3) }");
        assert!(c.all_conditions);
        assert_eq!(c.to_string(), ".a = 1 && .b && .c");
        assert_eq!(c.filters().count(), 1);
    }

    #[test]
    fn test_opaque_parts() {
        // Opaque inside a conjunction is dropped
        assert_eq!(rendered("{ .a = 1 && .b = .c }"), ".a = 1 && .b && .c");
        // Opaque inside a disjunction hides everything
        let c = conditions("{ .a = 1 || .b = .c }");
        assert!(!c.pruning_enabled());
        let c = conditions("{ !(.a = 1) }");
        assert!(!c.pruning_enabled());
        assert_eq!(
            c.conditions,
            vec![Condition::fetch(Attribute::new(AttributeScope::None, "a"))]
        );
        // A regex with the pattern on the left cannot be flattened
        assert!(!conditions(r#"{ "x" =~ .a }"#).pruning_enabled());
    }

    #[test]
    fn test_match_all_never_prunes() {
        assert!(!conditions("{ }").pruning_enabled());
        assert!(!conditions("{ } | count() > 1").pruning_enabled());
        assert!(!conditions("{ true }").pruning_enabled());
    }

    #[test]
    fn test_existence_and_bare_attributes() {
        assert_eq!(rendered("{ .a != nil }"), ".a != nil");
        assert!(!conditions("{ .a = nil }").pruning_enabled());
        assert_eq!(rendered("{ .flag }"), ".flag = true");
    }

    #[test]
    fn test_structural_joins() {
        assert_eq!(rendered("{ .a = 1 } >> { .b = 2 }"), ".a = 1 && .b = 2");
        assert_eq!(rendered("{ .a = 1 } &> { .b = 2 }"), ".a = 1 && .b = 2");
        // Negated joins only constrain the right side
        assert_eq!(rendered("{ .a = 1 } !> { .b = 2 }"), ".b = 2 && .a");
    }

    #[test]
    fn test_fetch_only_stage_fields() {
        let c = conditions("{ .a = 1 } | by(.b) | avg(duration) > 1s | select(.c)");
        assert!(c.all_conditions);
        assert!(c.pruning_enabled());
        assert_eq!(c.to_string(), ".a = 1 && .b && duration && .c");

        // A disjunction with fetch-only fields cannot prune
        let c = conditions("{ .a = 1 || .b = 2 } | by(.c)");
        assert!(!c.pruning_enabled());
    }

    #[test]
    fn test_anchored_regex_hint() {
        assert!(conditions(r#"{ .a =~ "x" }"#).anchored_regex);
        assert!(!conditions(r#"{ .a =~ "x" } with(anchored_regex=false)"#).anchored_regex);
    }

    #[test]
    fn test_normalize() {
        let leaf = |name: &str| {
            Requirement::Leaf(Condition::new(
                Attribute::new(AttributeScope::None, name),
                Operator::Equal,
                vec![Static::Int(1)],
            ))
        };
        assert_eq!(
            normalize(Requirement::All(vec![leaf("a"), Requirement::Opaque])),
            leaf("a")
        );
        assert_eq!(
            normalize(Requirement::Any(vec![leaf("a"), Requirement::Opaque])),
            Requirement::Opaque
        );
        assert_eq!(
            normalize(Requirement::Any(vec![leaf("a"), Requirement::All(vec![])])),
            Requirement::All(vec![])
        );
        assert_eq!(
            normalize(Requirement::All(vec![
                leaf("a"),
                Requirement::All(vec![leaf("b"), Requirement::Any(vec![leaf("c"), leaf("d")])])
            ])),
            Requirement::All(vec![
                leaf("a"),
                leaf("b"),
                Requirement::Any(vec![leaf("c"), leaf("d")])
            ])
        );
    }

    #[test]
    fn test_registry_order() {
        assert_eq!(
            global_pushdown_registry().rule_names(),
            vec![
                "logical_and",
                "logical_or",
                "logical_not",
                "existence",
                "comparison",
                "static",
                "bare_attribute"
            ]
        );
    }
}
