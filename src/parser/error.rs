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

//! Parser error types

use std::fmt;

use super::token::Position;
use crate::core::Error;

/// What went wrong while parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Unexpected token or malformed literal
    Syntax { expected: String, found: String },
    /// Well-formed but meaningless: unknown field, scope or function
    Semantic,
}

/// A single parse error
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Error message
    pub message: String,
    /// Position in source
    pub position: Position,
    /// Query text where the error occurred
    pub context: String,
}

impl ParseError {
    /// Create a syntax error
    pub fn syntax(
        expected: impl Into<String>,
        found: impl Into<String>,
        position: Position,
    ) -> Self {
        let expected = expected.into();
        let found = found.into();
        Self {
            message: format!("expected {}, found {}", expected, found),
            kind: ParseErrorKind::Syntax { expected, found },
            position,
            context: String::new(),
        }
    }

    /// Create a semantic error
    pub fn semantic(message: impl Into<String>, position: Position) -> Self {
        Self {
            kind: ParseErrorKind::Semantic,
            message: message.into(),
            position,
            context: String::new(),
        }
    }

    /// Attach the query text
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self.kind, ParseErrorKind::Syntax { .. })
    }

    /// Format the error with context for display
    pub fn format_error(&self) -> String {
        if self.context.is_empty() {
            return self.to_string();
        }

        let lines: Vec<&str> = self.context.lines().collect();
        if self.position.line == 0 || self.position.line > lines.len() {
            return self.to_string();
        }

        let line = lines[self.position.line - 1];
        let pointer = " ".repeat(self.position.column.saturating_sub(1)) + "^";

        match get_suggestion(self) {
            Some(hint) => format!("{}\n{}\n{}\nhint: {}", self, line, pointer, hint),
            None => format!("{}\n{}\n{}", self, line, pointer),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        match err.kind {
            ParseErrorKind::Syntax { expected, found } => Error::Syntax {
                offset: err.position.offset,
                line: err.position.line,
                column: err.position.column,
                expected,
                found,
            },
            ParseErrorKind::Semantic => {
                Error::Semantic(format!("{} at {}", err.message, err.position))
            }
        }
    }
}

/// Collection of parse errors
#[derive(Debug, Clone)]
pub struct ParseErrors {
    /// List of errors
    pub errors: Vec<ParseError>,
    /// Original query string
    pub query: String,
}

impl ParseErrors {
    /// Create from a vector of errors
    pub fn from_errors(errors: Vec<ParseError>, query: impl Into<String>) -> Self {
        Self {
            errors,
            query: query.into(),
        }
    }

    /// Check if there are any errors
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// The error that stopped parsing
    pub fn first(&self) -> Option<&ParseError> {
        self.errors.first()
    }

    /// Format all errors for display
    pub fn format_errors(&self) -> String {
        let mut result = String::new();
        for err in &self.errors {
            let err = err.clone().with_context(self.query.clone());
            result.push_str(&err.format_error());
            result.push('\n');
        }
        result
    }
}

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.first() {
            Some(err) => write!(f, "{}", err),
            None => write!(f, "query parse error"),
        }
    }
}

impl std::error::Error for ParseErrors {}

impl From<ParseErrors> for Error {
    fn from(errs: ParseErrors) -> Self {
        match errs.errors.into_iter().next() {
            Some(err) => err.into(),
            None => Error::internal("parse failed without an error"),
        }
    }
}

/// Get a helpful suggestion for a parse error
fn get_suggestion(err: &ParseError) -> Option<&'static str> {
    let msg = &err.message;

    if msg.contains("expected '}'") {
        return Some("spanset filters are written as { condition } with one pair of braces");
    }

    if msg.contains("unterminated") {
        return Some("close the string with the same quote character that opened it");
    }

    if msg.contains("expected attribute name") {
        return Some(
            "attribute names follow the dot directly, e.g. .http.method or span.\"my attr\"",
        );
    }

    if msg.contains("unknown identifier") {
        return Some("custom attributes start with a dot or a scope, e.g. .foo or resource.foo");
    }

    if msg.contains("expected with or end of query") {
        return Some(
            "stages are separated with '|' and hints go last: { } | count() > 1 with(most_recent=true)",
        );
    }

    None
}
