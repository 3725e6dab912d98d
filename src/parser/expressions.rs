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

//! Expression parsing - field expressions, literals, attributes and
//! aggregate (scalar) expressions

use crate::core::{
    AttributeScope, Intrinsic, Kind, Operator, Static, Status, DURATION_UNITS,
};

use super::ast::*;
use super::parser::Parser;
use super::precedence::Precedence;
use super::token::TokenType;

impl Parser {
    // ========================================================================
    // Field expressions
    // ========================================================================

    /// Parse a field expression
    pub(crate) fn parse_field_expression(
        &mut self,
        precedence: Precedence,
    ) -> Option<FieldExpression> {
        let mut left = self.parse_field_prefix()?;

        while precedence < self.peek_field_precedence() {
            self.next_token();
            left = self.parse_field_infix(left)?;
        }

        Some(left)
    }

    fn parse_field_prefix(&mut self) -> Option<FieldExpression> {
        let token = self.cur_token.clone();
        match token.token_type {
            TokenType::Operator if token.literal == "!" || token.literal == "-" => {
                let op = if token.literal == "!" {
                    Operator::Not
                } else {
                    Operator::Sub
                };
                self.next_token();
                let operand = self.parse_field_expression(Precedence::Prefix)?;
                Some(FieldExpression::unary(op, operand))
            }
            TokenType::Punctuator if token.literal == "(" => {
                self.next_token();
                let expr = self.parse_field_expression(Precedence::Lowest)?;
                if !self.expect_peek_punctuator(")") {
                    return None;
                }
                Some(expr)
            }
            TokenType::Integer | TokenType::Float | TokenType::Duration | TokenType::String => {
                self.parse_static().map(FieldExpression::Static)
            }
            TokenType::Keyword if is_literal_keyword(&token.literal) => {
                self.parse_static().map(FieldExpression::Static)
            }
            TokenType::Attribute | TokenType::Scope | TokenType::Identifier => {
                self.parse_attribute().map(FieldExpression::Attribute)
            }
            _ => {
                self.syntax_error("field expression", &token);
                None
            }
        }
    }

    fn parse_field_infix(&mut self, left: FieldExpression) -> Option<FieldExpression> {
        let token = self.cur_token.clone();
        let Some(op) = Operator::from_binary_symbol(&token.literal) else {
            self.syntax_error("operator", &token);
            return None;
        };
        let precedence = Precedence::for_field_operator(&token.literal);

        self.next_token();
        let right_pos = self.cur_token.position;
        let right = self.parse_field_expression(precedence.right_binding())?;

        if op.is_regex() {
            if let FieldExpression::Static(pattern) = &right {
                let Some(pattern) = pattern.as_str() else {
                    self.semantic_error(
                        format!("regular expression must be a string, found {}", pattern),
                        right_pos,
                    );
                    return None;
                };
                if let Err(err) = regex::Regex::new(pattern) {
                    self.semantic_error(
                        format!("invalid regular expression {:?}: {}", pattern, err),
                        right_pos,
                    );
                    return None;
                }
            }
        }

        Some(FieldExpression::binary(op, left, right))
    }

    // ========================================================================
    // Literals
    // ========================================================================

    /// Parse the literal at the current token
    pub(crate) fn parse_static(&mut self) -> Option<Static> {
        let token = self.cur_token.clone();
        let literal = token.literal.as_str();
        let value = match token.token_type {
            TokenType::Integer => match literal.parse::<i64>() {
                Ok(n) => Static::Int(n),
                Err(_) => {
                    self.syntax_error("64-bit integer", &token);
                    return None;
                }
            },
            TokenType::Float => match literal.parse::<f64>() {
                Ok(f) => Static::Float(f),
                Err(_) => {
                    self.syntax_error("number", &token);
                    return None;
                }
            },
            TokenType::Duration => match parse_duration(literal) {
                Some(nanos) => Static::Duration(nanos),
                None => {
                    self.syntax_error("duration within 64-bit nanoseconds", &token);
                    return None;
                }
            },
            TokenType::String => Static::string(literal),
            TokenType::Keyword => match literal {
                "true" => Static::Bool(true),
                "false" => Static::Bool(false),
                "nil" => Static::Nil,
                "maxInt" => Static::Int(i64::MAX),
                "minInt" => Static::Int(i64::MIN),
                other => match (Status::from_keyword(other), Kind::from_keyword(other)) {
                    (Some(status), _) => Static::Status(status),
                    (_, Some(kind)) => Static::Kind(kind),
                    _ => {
                        self.syntax_error("literal", &token);
                        return None;
                    }
                },
            },
            _ => {
                self.syntax_error("literal", &token);
                return None;
            }
        };
        Some(value)
    }

    /// Parse a literal, allowing a leading `-` on numbers and durations
    pub(crate) fn parse_signed_static(&mut self) -> Option<Static> {
        if self.cur_token_is_operator("-") {
            self.next_token();
            let token = self.cur_token.clone();
            let value = self.parse_static()?;
            if !value.is_numeric() {
                self.syntax_error("number", &token);
                return None;
            }
            return Some(Static::unary(Operator::Sub, &value));
        }
        self.parse_static()
    }

    // ========================================================================
    // Attributes and intrinsics
    // ========================================================================

    /// Parse an attribute reference or intrinsic at the current token
    pub(crate) fn parse_attribute(&mut self) -> Option<Attribute> {
        let token = self.cur_token.clone();
        match token.token_type {
            TokenType::Attribute => Some(Attribute::new(AttributeScope::None, token.literal)),
            TokenType::Scope => {
                if !self.expect_peek(TokenType::Attribute, "attribute name") {
                    return None;
                }
                let name = self.cur_token.literal.clone();
                let attr = match token.literal.as_str() {
                    "parent" => Attribute::parent(AttributeScope::None, name),
                    "parent.span" => Attribute::parent(AttributeScope::Span, name),
                    "parent.resource" => Attribute::parent(AttributeScope::Resource, name),
                    scope => match AttributeScope::from_keyword(scope) {
                        Some(scope) => Attribute::new(scope, name),
                        None => {
                            self.semantic_error(
                                format!("unknown attribute scope '{}'", scope),
                                token.position,
                            );
                            return None;
                        }
                    },
                };
                Some(attr)
            }
            TokenType::Identifier if self.peek_token_is_punctuator(":") => {
                let scope = token.literal;
                self.next_token();
                if !self.expect_peek(TokenType::Identifier, "intrinsic name") {
                    return None;
                }
                let name = self.cur_token.literal.clone();
                if !Intrinsic::is_intrinsic_scope(&scope) {
                    self.semantic_error(
                        format!("unknown intrinsic scope '{}'", scope),
                        token.position,
                    );
                    return None;
                }
                match Intrinsic::from_scoped(&scope, &name) {
                    Some(intrinsic) => Some(Attribute::intrinsic(intrinsic)),
                    None => {
                        self.semantic_error(
                            format!("unknown intrinsic '{}:{}'", scope, name),
                            token.position,
                        );
                        None
                    }
                }
            }
            TokenType::Identifier => {
                if let Some(intrinsic) = Intrinsic::from_unscoped(&token.literal) {
                    return Some(Attribute::intrinsic(intrinsic));
                }
                if token.literal == "trace" && self.peek_token_is(TokenType::Attribute) {
                    self.semantic_error(
                        "attributes cannot be scoped to trace, use trace:<intrinsic>",
                        token.position,
                    );
                } else {
                    self.semantic_error(
                        format!("unknown identifier '{}'", token.literal),
                        token.position,
                    );
                }
                None
            }
            _ => {
                self.syntax_error("attribute", &token);
                None
            }
        }
    }

    // ========================================================================
    // Scalar expressions
    // ========================================================================

    /// Parse `lhs op rhs` over aggregates and literals
    pub(crate) fn parse_scalar_filter(&mut self) -> Option<ScalarFilter> {
        let start = self.cur_token.position;
        let lhs = self.parse_scalar_expression(Precedence::Lowest)?;

        let op = match Operator::from_binary_symbol(&self.peek_token.literal) {
            Some(op)
                if self.peek_token_is(TokenType::Operator)
                    && op.is_comparison()
                    && !op.is_regex() =>
            {
                op
            }
            _ => {
                let token = self.peek_token.clone();
                self.syntax_error("comparison operator", &token);
                return None;
            }
        };
        self.next_token();
        self.next_token();
        let rhs = self.parse_scalar_expression(Precedence::Lowest)?;

        let filter = ScalarFilter { op, lhs, rhs };
        let mut aggregates = 0;
        filter.walk_aggregates(&mut |_| aggregates += 1);
        if aggregates == 0 {
            self.semantic_error("scalar filter must reference an aggregate", start);
            return None;
        }
        Some(filter)
    }

    fn parse_scalar_expression(&mut self, precedence: Precedence) -> Option<ScalarExpression> {
        let mut left = self.parse_scalar_prefix()?;

        while precedence < self.peek_scalar_precedence() {
            self.next_token();
            let token = self.cur_token.clone();
            let Some(op) = Operator::from_binary_symbol(&token.literal) else {
                self.syntax_error("operator", &token);
                return None;
            };
            let op_precedence = Precedence::for_scalar_operator(&token.literal);
            self.next_token();
            let right = self.parse_scalar_expression(op_precedence.right_binding())?;
            left = ScalarExpression::binary(op, left, right);
        }

        Some(left)
    }

    fn parse_scalar_prefix(&mut self) -> Option<ScalarExpression> {
        let token = self.cur_token.clone();
        match token.token_type {
            TokenType::Keyword if AggregateKind::from_name(&token.literal).is_some() => {
                self.parse_aggregate().map(ScalarExpression::Aggregate)
            }
            TokenType::Operator if token.literal == "-" => {
                self.next_token();
                let operand = self.parse_scalar_expression(Precedence::Prefix)?;
                Some(ScalarExpression::binary(
                    Operator::Sub,
                    ScalarExpression::Static(Static::Int(0)),
                    operand,
                ))
            }
            TokenType::Punctuator if token.literal == "(" => {
                self.next_token();
                let expr = self.parse_scalar_expression(Precedence::Lowest)?;
                if !self.expect_peek_punctuator(")") {
                    return None;
                }
                Some(expr)
            }
            TokenType::Integer | TokenType::Float | TokenType::Duration => {
                self.parse_static().map(ScalarExpression::Static)
            }
            TokenType::Keyword if token.literal == "maxInt" || token.literal == "minInt" => {
                self.parse_static().map(ScalarExpression::Static)
            }
            _ => {
                self.syntax_error("aggregate or number", &token);
                None
            }
        }
    }

    /// Parse `count()` or `avg(field)` and friends
    fn parse_aggregate(&mut self) -> Option<Aggregate> {
        let token = self.cur_token.clone();
        let Some(kind) = AggregateKind::from_name(&token.literal) else {
            self.syntax_error("aggregate", &token);
            return None;
        };

        if !self.expect_peek_punctuator("(") {
            return None;
        }

        if kind == AggregateKind::Count {
            if !self.expect_peek_punctuator(")") {
                return None;
            }
            return Some(Aggregate { kind, field: None });
        }

        if self.peek_token_is_punctuator(")") {
            let found = self.peek_token.clone();
            self.syntax_error("field expression", &found);
            return None;
        }
        self.next_token();
        let field = self.parse_field_expression(Precedence::Lowest)?;
        if !self.expect_peek_punctuator(")") {
            return None;
        }
        Some(Aggregate {
            kind,
            field: Some(field),
        })
    }
}

/// Keywords that denote a literal value
pub(crate) fn is_literal_keyword(word: &str) -> bool {
    matches!(word, "true" | "false" | "nil" | "maxInt" | "minInt")
        || Status::from_keyword(word).is_some()
        || Kind::from_keyword(word).is_some()
}

/// Convert a duration literal such as `1.5ms` to nanoseconds
fn parse_duration(literal: &str) -> Option<i64> {
    let split = literal.find(|c: char| c.is_alphabetic())?;
    let (number, suffix) = literal.split_at(split);
    let unit = DURATION_UNITS
        .iter()
        .find(|(name, _)| *name == suffix)
        .map(|(_, unit)| *unit)?;

    if let Ok(n) = number.parse::<i64>() {
        return n.checked_mul(unit);
    }
    let value = number.parse::<f64>().ok()? * unit as f64;
    if value.is_finite() && value.abs() < i64::MAX as f64 {
        Some(value.round() as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(input: &str) -> FieldExpression {
        let mut parser = Parser::new(input);
        let expr = parser.parse_field_expression(Precedence::Lowest);
        assert!(parser.errors().is_empty(), "errors: {:?}", parser.errors());
        expr.unwrap()
    }

    fn field_error(input: &str) -> String {
        let mut parser = Parser::new(input);
        assert!(parser.parse_field_expression(Precedence::Lowest).is_none());
        parser.errors()[0].message.clone()
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1s"), Some(1_000_000_000));
        assert_eq!(parse_duration("1.5ms"), Some(1_500_000));
        assert_eq!(parse_duration("10µs"), Some(10_000));
        assert_eq!(parse_duration("2h"), Some(7_200_000_000_000));
        assert_eq!(parse_duration("3ns"), Some(3));
        assert_eq!(parse_duration("99999999999h"), None);
    }

    #[test]
    fn test_precedence() {
        assert_eq!(field(".a + 2 * 3").to_string(), ".a + 6");
        assert_eq!(field(".a * 2 + 3").to_string(), "(.a * 2) + 3");
        assert_eq!(field(".a = 1 || .b = 2 && .c = 3").to_string(), "(.a = 1) || ((.b = 2) && (.c = 3))");
        assert_eq!(field("2 ^ 3 ^ 2"), FieldExpression::Static(Static::Float(512.0)));
    }

    #[test]
    fn test_unary() {
        assert_eq!(field("-5"), FieldExpression::Static(Static::Int(-5)));
        assert_eq!(field("!.a").to_string(), "!.a");
        assert_eq!(field("-.a + 1").to_string(), "-.a + 1");
    }

    #[test]
    fn test_attributes_and_intrinsics() {
        assert_eq!(
            field("resource.service.name"),
            FieldExpression::Attribute(Attribute::new(AttributeScope::Resource, "service.name"))
        );
        assert_eq!(
            field("parent.resource.x"),
            FieldExpression::Attribute(Attribute::parent(AttributeScope::Resource, "x"))
        );
        assert_eq!(
            field("trace:rootName"),
            FieldExpression::Attribute(Attribute::intrinsic(Intrinsic::TraceRootSpan))
        );
        assert_eq!(
            field("duration"),
            FieldExpression::Attribute(Attribute::intrinsic(Intrinsic::Duration))
        );
        assert_eq!(
            field("parent"),
            FieldExpression::Attribute(Attribute::intrinsic(Intrinsic::Parent))
        );
    }

    #[test]
    fn test_literal_keywords() {
        assert_eq!(field("error"), FieldExpression::Static(Static::Status(Status::Error)));
        assert_eq!(field("server"), FieldExpression::Static(Static::Kind(Kind::Server)));
        assert_eq!(field("minInt"), FieldExpression::Static(Static::Int(i64::MIN)));
    }

    #[test]
    fn test_field_errors() {
        assert!(field_error("trace.foo").starts_with("attributes cannot be scoped to trace"));
        assert!(field_error("span:nope").starts_with("unknown intrinsic"));
        assert!(field_error("foo").starts_with("unknown identifier"));
        assert!(field_error(".a =~ \"(\"").starts_with("invalid regular expression"));
        assert!(field_error(".a =~ 1").starts_with("regular expression must be a string"));
        assert_eq!(field_error(": .a"), "expected field expression, found ':'");
    }

    #[test]
    fn test_literal_overflow_is_syntax_error() {
        let mut parser = Parser::new("99999999999999999999");
        assert!(parser.parse_field_expression(Precedence::Lowest).is_none());
        let err = &parser.errors()[0];
        assert!(err.is_syntax());
        assert_eq!(
            err.message,
            "expected 64-bit integer, found '99999999999999999999'"
        );

        let mut parser = Parser::new("9999999999999h");
        assert!(parser.parse_field_expression(Precedence::Lowest).is_none());
        assert!(parser.errors()[0].is_syntax());
    }

    #[test]
    fn test_nil_comparison_rewrite() {
        let expr = field(".a != nil");
        assert!(matches!(expr, FieldExpression::Unary { op: Operator::Exists, .. }));
        let expr = field("nil = .a");
        assert!(matches!(expr, FieldExpression::Unary { op: Operator::NotExists, .. }));
    }

    #[test]
    fn test_scalar_filter() {
        let mut parser = Parser::new("avg(duration) > 1s");
        let filter = parser.parse_scalar_filter().unwrap();
        assert_eq!(filter.op, Operator::Greater);
        assert_eq!(filter.to_string(), "avg(duration) > 1s");

        let mut parser = Parser::new("2 < count() * 2");
        let filter = parser.parse_scalar_filter().unwrap();
        assert_eq!(filter.to_string(), "2 < (count() * 2)");

        let mut parser = Parser::new("-sum(.a) >= 1");
        assert_eq!(
            parser.parse_scalar_filter().unwrap().to_string(),
            "(0 - sum(.a)) >= 1"
        );
    }

    #[test]
    fn test_scalar_filter_errors() {
        let mut parser = Parser::new("1 > 2");
        assert!(parser.parse_scalar_filter().is_none());
        assert_eq!(
            parser.errors()[0].message,
            "scalar filter must reference an aggregate"
        );

        let mut parser = Parser::new("count(.a) > 1");
        assert!(parser.parse_scalar_filter().is_none());
        assert_eq!(parser.errors()[0].message, "expected ')', found '.a'");

        let mut parser = Parser::new("avg() > 1");
        assert!(parser.parse_scalar_filter().is_none());
        assert_eq!(parser.errors()[0].message, "expected field expression, found ')'");

        let mut parser = Parser::new("count()");
        assert!(parser.parse_scalar_filter().is_none());
        assert_eq!(
            parser.errors()[0].message,
            "expected comparison operator, found end of query"
        );
    }
}
