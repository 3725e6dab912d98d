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

//! Built-in pushdown rules

use crate::core::{Operator, Static};
use crate::parser::{Attribute, FieldExpression};

use super::{Condition, PushdownContext, PushdownResult, PushdownRule, Requirement};

fn binary(
    expr: &FieldExpression,
    wanted: Operator,
) -> Option<(&FieldExpression, &FieldExpression)> {
    match expr {
        FieldExpression::Binary { op, lhs, rhs } if *op == wanted => Some((lhs, rhs)),
        _ => None,
    }
}

// =============================================================================
// Logical AND Rule: a && b
// =============================================================================

pub struct LogicalAndRule;

impl PushdownRule for LogicalAndRule {
    fn name(&self) -> &'static str {
        "logical_and"
    }

    fn try_convert(&self, expr: &FieldExpression, ctx: &PushdownContext<'_>) -> PushdownResult {
        match binary(expr, Operator::And) {
            Some((lhs, rhs)) => PushdownResult::Converted(Requirement::All(vec![
                ctx.convert(lhs),
                ctx.convert(rhs),
            ])),
            None => PushdownResult::NotApplicable,
        }
    }
}

// =============================================================================
// Logical OR Rule: a || b
// =============================================================================

pub struct LogicalOrRule;

impl PushdownRule for LogicalOrRule {
    fn name(&self) -> &'static str {
        "logical_or"
    }

    fn try_convert(&self, expr: &FieldExpression, ctx: &PushdownContext<'_>) -> PushdownResult {
        match binary(expr, Operator::Or) {
            Some((lhs, rhs)) => PushdownResult::Converted(Requirement::Any(vec![
                ctx.convert(lhs),
                ctx.convert(rhs),
            ])),
            None => PushdownResult::NotApplicable,
        }
    }
}

// =============================================================================
// Logical NOT Rule: !a
// =============================================================================

/// A negation holds when its operand does not, which says nothing about
/// which values a trace contains
pub struct LogicalNotRule;

impl PushdownRule for LogicalNotRule {
    fn name(&self) -> &'static str {
        "logical_not"
    }

    fn try_convert(&self, expr: &FieldExpression, _ctx: &PushdownContext<'_>) -> PushdownResult {
        match expr {
            FieldExpression::Unary {
                op: Operator::Not, ..
            } => PushdownResult::CannotPush,
            _ => PushdownResult::NotApplicable,
        }
    }
}

// =============================================================================
// Existence Rule: a != nil, a = nil
// =============================================================================

pub struct ExistenceRule;

impl PushdownRule for ExistenceRule {
    fn name(&self) -> &'static str {
        "existence"
    }

    fn try_convert(&self, expr: &FieldExpression, _ctx: &PushdownContext<'_>) -> PushdownResult {
        let FieldExpression::Unary { op, expr } = expr else {
            return PushdownResult::NotApplicable;
        };
        match (op, expr.as_ref()) {
            (Operator::Exists, FieldExpression::Attribute(attr)) => PushdownResult::Converted(
                Requirement::Leaf(Condition::new(attr.clone(), Operator::Exists, Vec::new())),
            ),
            // Absence holds for spans lacking the field, which an index
            // cannot enumerate
            (Operator::Exists | Operator::NotExists, _) => PushdownResult::CannotPush,
            _ => PushdownResult::NotApplicable,
        }
    }
}

// =============================================================================
// Comparison Rule: attr op literal, literal op attr
// =============================================================================

pub struct ComparisonRule;

impl PushdownRule for ComparisonRule {
    fn name(&self) -> &'static str {
        "comparison"
    }

    fn try_convert(&self, expr: &FieldExpression, _ctx: &PushdownContext<'_>) -> PushdownResult {
        let FieldExpression::Binary { op, lhs, rhs } = expr else {
            return PushdownResult::NotApplicable;
        };
        if !op.is_comparison() {
            return PushdownResult::NotApplicable;
        }

        match extract_comparison_parts(*op, lhs, rhs) {
            Some((attr, op, value)) => PushdownResult::Converted(Requirement::Leaf(
                Condition::new(attr.clone(), op, vec![value.clone()]),
            )),
            None => PushdownResult::CannotPush,
        }
    }
}

/// Split a comparison into attribute, operator and literal
///
/// A literal on the left is moved to the right with the operator mirrored.
/// Regex operators have no mirror, so `"x" =~ .a` is not flattened.
fn extract_comparison_parts<'a>(
    op: Operator,
    lhs: &'a FieldExpression,
    rhs: &'a FieldExpression,
) -> Option<(&'a Attribute, Operator, &'a Static)> {
    match (lhs, rhs) {
        (FieldExpression::Attribute(attr), FieldExpression::Static(value)) => {
            Some((attr, op, value))
        }
        (FieldExpression::Static(value), FieldExpression::Attribute(attr)) => {
            Some((attr, op.mirror()?, value))
        }
        _ => None,
    }
}

// =============================================================================
// Static Rule: { true }, { false }
// =============================================================================

/// Literal predicates do not depend on trace contents
pub struct StaticRule;

impl PushdownRule for StaticRule {
    fn name(&self) -> &'static str {
        "static"
    }

    fn try_convert(&self, expr: &FieldExpression, _ctx: &PushdownContext<'_>) -> PushdownResult {
        match expr {
            FieldExpression::Static(_) => PushdownResult::Converted(Requirement::All(Vec::new())),
            _ => PushdownResult::NotApplicable,
        }
    }
}

// =============================================================================
// Bare Attribute Rule: { .flag }
// =============================================================================

/// A bare attribute passes only when it is the boolean `true`
pub struct BareAttributeRule;

impl PushdownRule for BareAttributeRule {
    fn name(&self) -> &'static str {
        "bare_attribute"
    }

    fn try_convert(&self, expr: &FieldExpression, _ctx: &PushdownContext<'_>) -> PushdownResult {
        match expr {
            FieldExpression::Attribute(attr) => PushdownResult::Converted(Requirement::Leaf(
                Condition::new(attr.clone(), Operator::Equal, vec![Static::Bool(true)]),
            )),
            _ => PushdownResult::NotApplicable,
        }
    }
}
