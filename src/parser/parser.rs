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

//! Query Parser - Main Parser struct and token helpers
//!
//! Parse functions are entered with `cur_token` on the first token of the
//! construct and return with `cur_token` on its last token. They return
//! `None` after recording an error; the first recorded error is the one
//! reported.

use super::ast::*;
use super::error::{ParseError, ParseErrors};
use super::lexer::Lexer;
use super::precedence::Precedence;
use super::token::{Position, Token, TokenType};

/// Query parser using the Pratt parsing algorithm
pub struct Parser {
    /// The lexer providing tokens
    pub(crate) lexer: Lexer,
    /// Current token being examined
    pub(crate) cur_token: Token,
    /// Next token (peek)
    pub(crate) peek_token: Token,
    /// Collected errors
    errors: Vec<ParseError>,
    /// Query text, kept for error context
    query: String,
}

impl Parser {
    /// Create a new parser for the given input
    pub fn new(input: &str) -> Self {
        let mut lexer = Lexer::new(input);
        let cur_token = lexer.next_token();
        let peek_token = lexer.next_token();

        Parser {
            lexer,
            cur_token,
            peek_token,
            errors: Vec::new(),
            query: input.to_string(),
        }
    }

    /// Parse the whole input as a query
    pub fn parse_root(&mut self) -> Result<RootExpr, ParseErrors> {
        let root = self.parse_root_expr();
        match root {
            Some(root) if self.errors.is_empty() => Ok(root),
            _ => {
                if self.errors.is_empty() {
                    let token = self.cur_token.clone();
                    self.syntax_error("a query", &token);
                }
                Err(ParseErrors::from_errors(
                    std::mem::take(&mut self.errors),
                    self.query.clone(),
                ))
            }
        }
    }

    fn parse_root_expr(&mut self) -> Option<RootExpr> {
        let pipeline = self.parse_pipeline()?;

        let mut hints = Hints::new();
        if self.peek_token_is_keyword("with") {
            self.next_token();
            hints = self.parse_hints()?;
        }

        if !self.peek_token_is(TokenType::Eof) {
            let token = self.peek_token.clone();
            self.syntax_error("with or end of query", &token);
            return None;
        }

        Some(RootExpr::new(pipeline, hints))
    }

    /// Advance to the next token
    pub(crate) fn next_token(&mut self) {
        self.cur_token = std::mem::replace(&mut self.peek_token, self.lexer.next_token());
    }

    /// Check if the current token is of the given type
    pub(crate) fn cur_token_is(&self, t: TokenType) -> bool {
        self.cur_token.token_type == t
    }

    /// Check if the peek token is of the given type
    pub(crate) fn peek_token_is(&self, t: TokenType) -> bool {
        self.peek_token.token_type == t
    }

    /// Check if the current token is a specific keyword
    pub(crate) fn cur_token_is_keyword(&self, keyword: &str) -> bool {
        self.cur_token.is_keyword(keyword)
    }

    /// Check if the peek token is a specific keyword
    pub(crate) fn peek_token_is_keyword(&self, keyword: &str) -> bool {
        self.peek_token.is_keyword(keyword)
    }

    /// Check if the current token is a specific punctuator
    pub(crate) fn cur_token_is_punctuator(&self, punc: &str) -> bool {
        self.cur_token.is_punctuator(punc)
    }

    /// Check if the peek token is a specific punctuator
    pub(crate) fn peek_token_is_punctuator(&self, punc: &str) -> bool {
        self.peek_token.is_punctuator(punc)
    }

    /// Check if the current token is a specific operator
    pub(crate) fn cur_token_is_operator(&self, op: &str) -> bool {
        self.cur_token.is_operator(op)
    }

    /// Check if the peek token is a specific operator
    pub(crate) fn peek_token_is_operator(&self, op: &str) -> bool {
        self.peek_token.is_operator(op)
    }

    /// Expect the peek token to be a specific punctuator and advance
    pub(crate) fn expect_peek_punctuator(&mut self, punc: &str) -> bool {
        if self.peek_token_is_punctuator(punc) {
            self.next_token();
            true
        } else {
            let token = self.peek_token.clone();
            self.syntax_error(&format!("'{}'", punc), &token);
            false
        }
    }

    /// Expect the peek token to be of a specific type and advance
    pub(crate) fn expect_peek(&mut self, t: TokenType, expected: &str) -> bool {
        if self.peek_token_is(t) {
            self.next_token();
            true
        } else {
            let token = self.peek_token.clone();
            self.syntax_error(expected, &token);
            false
        }
    }

    /// Get the precedence of the peek token between spanset expressions
    pub(crate) fn peek_spanset_precedence(&self) -> Precedence {
        match self.peek_token.token_type {
            TokenType::Operator => Precedence::for_spanset_operator(&self.peek_token.literal),
            _ => Precedence::Lowest,
        }
    }

    /// Get the precedence of the peek token between field expressions
    pub(crate) fn peek_field_precedence(&self) -> Precedence {
        match self.peek_token.token_type {
            TokenType::Operator => Precedence::for_field_operator(&self.peek_token.literal),
            _ => Precedence::Lowest,
        }
    }

    /// Get the precedence of the peek token between scalar expressions
    pub(crate) fn peek_scalar_precedence(&self) -> Precedence {
        match self.peek_token.token_type {
            TokenType::Operator => Precedence::for_scalar_operator(&self.peek_token.literal),
            _ => Precedence::Lowest,
        }
    }

    /// Record a syntax error at `found`
    pub(crate) fn syntax_error(&mut self, expected: &str, found: &Token) {
        self.errors
            .push(ParseError::syntax(expected, found.describe(), found.position));
    }

    /// Record a semantic error
    pub(crate) fn semantic_error(&mut self, message: impl Into<String>, position: Position) {
        self.errors.push(ParseError::semantic(message, position));
    }

    /// Get collected errors
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }
}
