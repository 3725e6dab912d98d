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

//! Query Parser
//!
//! This module turns query text into an immutable [`RootExpr`]:
//!
//! - [`Lexer`] - Tokenizer for query input
//! - [`Parser`] - Pratt parser that builds the AST from tokens
//! - [`ast`] - Abstract Syntax Tree types
//! - [`token`] - Token types
//! - [`error`] - Parser error types
//!
//! # Example
//!
//! ```
//! use traceql::parser::{parse, Stage};
//!
//! let root = parse("{ .http.status_code >= 500 } | count() > 2").unwrap();
//! assert_eq!(root.pipeline.stages.len(), 2);
//! assert!(matches!(root.pipeline.stages[1], Stage::Aggregation(_)));
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
#[allow(clippy::module_inception)]
pub mod parser;
pub mod precedence;
pub mod token;

// Expression and pipeline parsing are implemented as impl blocks on Parser
mod expressions;
mod pipeline;

// Re-export main types
pub use ast::{
    Aggregate, AggregateKind, Attribute, AttributeTarget, FieldExpression, Hint, Hints, Pipeline,
    RootExpr, ScalarExpression, ScalarFilter, SpansetExpression, SpansetFilter, Stage,
    HINT_ANCHORED_REGEX, HINT_MOST_RECENT,
};
pub use error::{ParseError, ParseErrorKind, ParseErrors};
pub use lexer::Lexer;
pub use parser::Parser;
pub use precedence::Precedence;
pub use token::{is_keyword, is_operator, Position, Token, TokenType, KEYWORDS, OPERATORS};

use crate::core::{Error, Result};

/// Parse a query
///
/// This is the main entry point for parsing query strings. The first
/// error found is returned as [`Error::Syntax`] or [`Error::Semantic`].
///
/// # Example
///
/// ```
/// use traceql::parser::parse;
///
/// assert!(parse("{ duration > 1s }").is_ok());
/// assert!(parse("{ duration > 1s").is_err());
/// ```
pub fn parse(query: &str) -> Result<RootExpr> {
    parse_query(query).map_err(Error::from)
}

/// Parse a query, keeping every error with its query context
pub fn parse_query(query: &str) -> std::result::Result<RootExpr, ParseErrors> {
    Parser::new(query).parse_root()
}

/// Parse a single attribute reference such as `.foo`, `resource.x` or
/// `span:duration`
pub fn parse_identifier(text: &str) -> Result<Attribute> {
    let identifier_error = |message: String| Error::Identifier {
        input: text.to_string(),
        message,
    };

    let mut parser = Parser::new(text);
    match parser.parse_attribute() {
        Some(attr) if parser.peek_token_is(TokenType::Eof) => Ok(attr),
        Some(_) => Err(identifier_error(format!(
            "unexpected {} after identifier",
            parser.peek_token.describe()
        ))),
        None => Err(identifier_error(
            parser
                .errors()
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "invalid identifier".to_string()),
        )),
    }
}

/// Split a query into tokens, ending at end of input or the first error
pub fn tokenize(query: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(query);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let stop = token.is_eof() || token.is_error();
        tokens.push(token);
        if stop {
            return tokens;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AttributeScope, Intrinsic};

    fn round_trip(query: &str) {
        let first = parse(query).unwrap_or_else(|e| panic!("{}: {}", query, e));
        let printed = first.to_string();
        let second = parse(&printed).unwrap_or_else(|e| panic!("{} -> {}: {}", query, printed, e));
        assert_eq!(first, second, "{} printed as {}", query, printed);
    }

    #[test]
    fn test_round_trip() {
        for query in [
            "{ }",
            "{ .a = 1 }",
            r#"{ span.http.method = "GET" && resource.service.name =~ "api-.*" }"#,
            "{ duration > 1.5ms || status = error }",
            "{ kind = server } >> { kind = client }",
            "({ .a } >> { .b }) && { .c } || { .d }",
            "{ .a } !< { .b }",
            "{ .\"weird name\" = `x\"y` }",
            "{ parent.span.x != nil && .y = nil }",
            "{ !(.a = 1) }",
            "{ .a * 2 + 1 > 3 }",
            "{ trace:rootName = \"root\" } | by(resource.service.name) | count() > 1",
            "{ } | avg(duration) > 100ms | coalesce() | select(.a, span:id)",
            "({ .a } | count() > 1) && { .b } with(most_recent=true)",
            "{ event:name = \"exception\" } | max(span.x) - min(span.x) >= 2",
            "{ .a = maxInt || .b = minInt }",
            "{ .x = \"line\\nbreak\" }",
        ] {
            round_trip(query);
        }
    }

    #[test]
    fn test_parse_errors_map_to_error_kinds() {
        assert!(matches!(parse("{ .a = }"), Err(Error::Syntax { .. })));
        assert!(matches!(parse("{ nope = 1 }"), Err(Error::Semantic(_))));
        assert!(matches!(parse("{ .a ="), Err(Error::Syntax { .. })));
    }

    #[test]
    fn test_syntax_error_position() {
        match parse("{ .a = 1 } | by(") {
            Err(Error::Syntax {
                offset,
                line,
                column,
                ..
            }) => {
                assert_eq!(offset, 16);
                assert_eq!(line, 1);
                assert_eq!(column, 17);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_identifier() {
        assert_eq!(
            parse_identifier(".foo.bar").unwrap(),
            Attribute::new(AttributeScope::None, "foo.bar")
        );
        assert_eq!(
            parse_identifier("span.x").unwrap(),
            Attribute::new(AttributeScope::Span, "x")
        );
        assert_eq!(
            parse_identifier("trace:id").unwrap(),
            Attribute::intrinsic(Intrinsic::TraceId)
        );

        let err = parse_identifier(".a = 1").unwrap_err();
        assert!(err.to_string().starts_with("failed to parse identifier"));
        let err = parse_identifier("nonsense").unwrap_err();
        assert!(err.to_string().starts_with("failed to parse identifier"));
    }

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("{ .a } | count()");
        assert_eq!(tokens.len(), 8);
        assert!(tokens[7].is_eof());

        let tokens = tokenize("{ .a & .b }");
        assert!(tokens.last().map(|t| t.is_error()).unwrap_or(false));
    }
}
