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

//! Pipeline parsing - stages, spanset expressions and hints

use crate::core::{LogicalOperator, StructuralOperator};

use super::ast::*;
use super::parser::Parser;
use super::precedence::Precedence;
use super::token::TokenType;

/// Tokens scanned when deciding what a `(` opens
const PAREN_LOOKAHEAD: usize = 16;

impl Parser {
    /// Parse stages separated by `|`; the first must be a spanset expression
    pub(crate) fn parse_pipeline(&mut self) -> Option<Pipeline> {
        let first = self.parse_spanset_expression(Precedence::Lowest)?;
        let mut stages = vec![Stage::Spanset(first)];

        while self.peek_token_is_operator("|") {
            self.next_token();
            self.next_token();
            stages.push(self.parse_stage()?);
        }

        Some(Pipeline::new(stages))
    }

    fn parse_stage(&mut self) -> Option<Stage> {
        let token = self.cur_token.clone();
        match token.token_type {
            TokenType::Keyword => match token.literal.as_str() {
                "by" => self.parse_grouping(),
                "select" => self.parse_selection(),
                "coalesce" => {
                    if !self.expect_peek_punctuator("(") || !self.expect_peek_punctuator(")") {
                        return None;
                    }
                    Some(Stage::Coalesce)
                }
                name if AggregateKind::from_name(name).is_some() => {
                    self.parse_scalar_filter().map(Stage::Aggregation)
                }
                "maxInt" | "minInt" => self.parse_scalar_filter().map(Stage::Aggregation),
                _ => {
                    self.syntax_error("pipeline stage", &token);
                    None
                }
            },
            TokenType::Integer | TokenType::Float | TokenType::Duration => {
                self.parse_scalar_filter().map(Stage::Aggregation)
            }
            TokenType::Operator if token.literal == "-" => {
                self.parse_scalar_filter().map(Stage::Aggregation)
            }
            TokenType::Punctuator if token.literal == "(" && self.paren_opens_scalar() => {
                self.parse_scalar_filter().map(Stage::Aggregation)
            }
            TokenType::Punctuator if token.literal == "(" || token.literal == "{" => self
                .parse_spanset_expression(Precedence::Lowest)
                .map(Stage::Spanset),
            _ => {
                self.syntax_error("pipeline stage", &token);
                None
            }
        }
    }

    /// Decide whether the `(` at the current token opens a scalar expression
    fn paren_opens_scalar(&mut self) -> bool {
        let mut ahead = vec![self.peek_token.clone()];
        ahead.extend(self.lexer.peek_tokens(PAREN_LOOKAHEAD));
        ahead
            .iter()
            .find(|t| !t.is_punctuator("("))
            .map(|t| match t.token_type {
                TokenType::Keyword => {
                    AggregateKind::from_name(&t.literal).is_some()
                        || t.literal == "maxInt"
                        || t.literal == "minInt"
                }
                TokenType::Integer | TokenType::Float | TokenType::Duration => true,
                TokenType::Operator => t.literal == "-",
                _ => false,
            })
            .unwrap_or(false)
    }

    // ========================================================================
    // Spanset expressions
    // ========================================================================

    /// Parse a spanset expression
    pub(crate) fn parse_spanset_expression(
        &mut self,
        precedence: Precedence,
    ) -> Option<SpansetExpression> {
        let mut left = self.parse_spanset_primary()?;

        while precedence < self.peek_spanset_precedence() {
            self.next_token();
            let token = self.cur_token.clone();
            let op_precedence = Precedence::for_spanset_operator(&token.literal);
            self.next_token();
            let right = self.parse_spanset_expression(op_precedence)?;

            left = match token.literal.as_str() {
                "&&" => SpansetExpression::logical(LogicalOperator::And, left, right),
                "||" => SpansetExpression::logical(LogicalOperator::Or, left, right),
                symbol => match StructuralOperator::from_symbol(symbol) {
                    Some(op) => SpansetExpression::structural(op, left, right),
                    None => {
                        self.syntax_error("spanset operator", &token);
                        return None;
                    }
                },
            };
        }

        Some(left)
    }

    fn parse_spanset_primary(&mut self) -> Option<SpansetExpression> {
        if self.cur_token_is_punctuator("{") {
            return self.parse_spanset_filter().map(SpansetExpression::Filter);
        }

        if self.cur_token_is_punctuator("(") {
            self.next_token();
            let pipeline = self.parse_pipeline()?;
            if !self.expect_peek_punctuator(")") {
                return None;
            }
            let mut stages = pipeline.stages;
            if stages.len() == 1 {
                if let Some(Stage::Spanset(expr)) = stages.pop() {
                    return Some(expr);
                }
            }
            return Some(SpansetExpression::Subpipeline(Box::new(Pipeline::new(
                stages,
            ))));
        }

        let token = self.cur_token.clone();
        self.syntax_error("'{' or '('", &token);
        None
    }

    /// Parse `{ predicate }`; an empty filter matches every span
    fn parse_spanset_filter(&mut self) -> Option<SpansetFilter> {
        if self.peek_token_is_punctuator("}") {
            self.next_token();
            return Some(SpansetFilter::match_all());
        }

        self.next_token();
        let start = self.cur_token.position;
        let expr = self.parse_field_expression(Precedence::Lowest)?;
        if !self.expect_peek_punctuator("}") {
            return None;
        }

        if expr.is_non_boolean() {
            self.semantic_error(
                format!("filter expression must evaluate to a boolean: {}", expr),
                start,
            );
            return None;
        }

        Some(SpansetFilter::new(expr))
    }

    // ========================================================================
    // Grouping, selection and hints
    // ========================================================================

    /// Parse `by(field, ...)`
    fn parse_grouping(&mut self) -> Option<Stage> {
        let mut fields = Vec::new();
        self.parse_argument_list(|parser| {
            let expr = parser.parse_field_expression(Precedence::Lowest)?;
            fields.push(expr);
            Some(())
        })?;
        Some(Stage::Grouping(fields))
    }

    /// Parse `select(attribute, ...)`
    fn parse_selection(&mut self) -> Option<Stage> {
        let mut attrs = Vec::new();
        self.parse_argument_list(|parser| {
            attrs.push(parser.parse_attribute()?);
            Some(())
        })?;
        Some(Stage::FieldSelection(attrs))
    }

    /// Parse `with(name=value, ...)`
    pub(crate) fn parse_hints(&mut self) -> Option<Hints> {
        let mut hints = Hints::new();
        self.parse_argument_list(|parser| {
            if !parser.cur_token_is(TokenType::Identifier) {
                let token = parser.cur_token.clone();
                parser.syntax_error("hint name", &token);
                return None;
            }
            let name = parser.cur_token.literal.clone();
            if !parser.peek_token_is_operator("=") {
                let token = parser.peek_token.clone();
                parser.syntax_error("'='", &token);
                return None;
            }
            parser.next_token();
            parser.next_token();
            let value = parser.parse_signed_static()?;
            hints.set(name, value);
            Some(())
        })?;
        Some(hints)
    }

    /// Parse `( item, item, ... )` after a keyword; at least one item
    fn parse_argument_list<F>(&mut self, mut item: F) -> Option<()>
    where
        F: FnMut(&mut Parser) -> Option<()>,
    {
        if !self.expect_peek_punctuator("(") {
            return None;
        }
        if self.peek_token_is_punctuator(")") {
            let token = self.peek_token.clone();
            self.syntax_error("argument", &token);
            return None;
        }

        loop {
            self.next_token();
            item(self)?;
            if self.peek_token_is_punctuator(",") {
                self.next_token();
                continue;
            }
            if !self.expect_peek_punctuator(")") {
                return None;
            }
            return Some(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{JoinMode, Relation, Static};

    fn parse(input: &str) -> RootExpr {
        match Parser::new(input).parse_root() {
            Ok(root) => root,
            Err(err) => panic!("{}: {}", input, err),
        }
    }

    fn parse_error(input: &str) -> String {
        match Parser::new(input).parse_root() {
            Ok(root) => panic!("{} parsed as {}", input, root),
            Err(err) => err.first().map(|e| e.message.clone()).unwrap_or_default(),
        }
    }

    #[test]
    fn test_empty_filter() {
        let root = parse("{ }");
        assert_eq!(root.pipeline.stages.len(), 1);
        assert_eq!(root.to_string(), "{ true }");
    }

    #[test]
    fn test_structural_precedence() {
        let root = parse("{ .a } >> { .b } && { .c } || { .d }");
        let Stage::Spanset(SpansetExpression::Logical { op, lhs, .. }) = &root.pipeline.stages[0]
        else {
            panic!("expected logical expression");
        };
        assert_eq!(*op, LogicalOperator::Or);
        let SpansetExpression::Logical { op, lhs, .. } = lhs.as_ref() else {
            panic!("expected logical and");
        };
        assert_eq!(*op, LogicalOperator::And);
        assert!(matches!(
            lhs.as_ref(),
            SpansetExpression::StructuralJoin {
                op: StructuralOperator {
                    relation: Relation::Descendant,
                    mode: JoinMode::Match
                },
                ..
            }
        ));
    }

    #[test]
    fn test_structural_operators() {
        for symbol in [
            ">>", "<<", ">", "<", "~", "!>>", "!<<", "!>", "!<", "!~", "&>>", "&<<", "&>", "&<",
            "&~",
        ] {
            let root = parse(&format!("{{ .a }} {} {{ .b }}", symbol));
            assert_eq!(root.to_string(), format!("{{ .a }} {} {{ .b }}", symbol));
        }
    }

    #[test]
    fn test_pipeline_stages() {
        let root = parse(
            "{ .a = 1 } | by(resource.service.name) | count() > 2 | coalesce() | select(.b, duration)",
        );
        let stages = &root.pipeline.stages;
        assert_eq!(stages.len(), 5);
        assert!(matches!(stages[1], Stage::Grouping(ref f) if f.len() == 1));
        assert!(matches!(stages[2], Stage::Aggregation(_)));
        assert!(matches!(stages[3], Stage::Coalesce));
        assert!(matches!(stages[4], Stage::FieldSelection(ref a) if a.len() == 2));
    }

    #[test]
    fn test_paren_disambiguation() {
        let root = parse("{ } | (count() + 1) > 2");
        assert!(matches!(root.pipeline.stages[1], Stage::Aggregation(_)));

        let root = parse("{ } | ({ .a } >> { .b })");
        assert!(matches!(
            root.pipeline.stages[1],
            Stage::Spanset(SpansetExpression::StructuralJoin { .. })
        ));
    }

    #[test]
    fn test_subpipeline() {
        let root = parse("({ .a } | count() > 1) && { .b }");
        let Stage::Spanset(SpansetExpression::Logical { lhs, .. }) = &root.pipeline.stages[0]
        else {
            panic!("expected logical expression");
        };
        assert!(matches!(lhs.as_ref(), SpansetExpression::Subpipeline(p) if p.stages.len() == 2));
        assert_eq!(root.to_string(), "({ .a } | count() > 1) && { .b }");
    }

    #[test]
    fn test_single_stage_parens_collapse() {
        assert_eq!(parse("({ .a })"), parse("{ .a }"));
    }

    #[test]
    fn test_hints() {
        let root = parse("{ } with(most_recent=true, sample=-2)");
        assert!(root.hints.most_recent());
        assert_eq!(root.hints.get("sample"), Some(&Static::Int(-2)));
        assert_eq!(root.to_string(), "{ true } with(most_recent=true, sample=-2)");
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(parse_error(""), "expected '{' or '(', found end of query");
        assert_eq!(parse_error("{ .a = 1"), "expected '}', found end of query");
        assert_eq!(parse_error("count() > 1"), "expected '{' or '(', found 'count'");
        assert_eq!(parse_error("{ } | by()"), "expected argument, found ')'");
        assert_eq!(parse_error("{ } with()"), "expected argument, found ')'");
        assert_eq!(parse_error("{ } | select(1)"), "expected attribute, found '1'");
        assert_eq!(parse_error("{ } | foo"), "expected pipeline stage, found 'foo'");
        assert_eq!(parse_error("{ } foo"), "expected with or end of query, found 'foo'");
        assert_eq!(parse_error("{ .a } >> .b"), "expected '{' or '(', found '.b'");
    }

    #[test]
    fn test_filter_type_check() {
        assert!(parse_error("{ 1 }").starts_with("filter expression must evaluate to a boolean"));
        assert!(parse_error("{ .a + 1 }").starts_with("filter expression must evaluate to a boolean"));
        assert!(parse_error("{ -.a }").starts_with("filter expression must evaluate to a boolean"));
        parse("{ .flag }");
        parse("{ false }");
    }
}
