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

//! Token types for the query lexer

use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::LazyLock;

/// Position represents a position in the input source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Byte offset, starting at 0
    pub offset: usize,
    /// Line number, starting at 1
    pub line: usize,
    /// Column number, starting at 1
    pub column: usize,
}

impl Position {
    /// Create a new position
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// TokenType represents the type of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    /// Error token
    Error,
    /// End of input
    Eof,
    /// Bare word that is not a keyword (intrinsic names, hint names)
    Identifier,
    /// Reserved word (true, nil, error, server, count, by, with, ...)
    Keyword,
    /// Attribute scope directly followed by an attribute (`span`, `parent.resource`)
    Scope,
    /// Attribute name after a dot, unquoted and unescaped (`.http.method` -> `http.method`)
    Attribute,
    /// String literal, unescaped
    String,
    /// Integer number (123)
    Integer,
    /// Floating point number (1.5, .5)
    Float,
    /// Number with a unit suffix (10ms, 1.5m)
    Duration,
    /// Operator (=, =~, &&, >>, !<, +, |, ...)
    Operator,
    /// Punctuator ({, }, (, ), ",", :)
    Punctuator,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Error => write!(f, "ERROR"),
            TokenType::Eof => write!(f, "EOF"),
            TokenType::Identifier => write!(f, "IDENTIFIER"),
            TokenType::Keyword => write!(f, "KEYWORD"),
            TokenType::Scope => write!(f, "SCOPE"),
            TokenType::Attribute => write!(f, "ATTRIBUTE"),
            TokenType::String => write!(f, "STRING"),
            TokenType::Integer => write!(f, "INTEGER"),
            TokenType::Float => write!(f, "FLOAT"),
            TokenType::Duration => write!(f, "DURATION"),
            TokenType::Operator => write!(f, "OPERATOR"),
            TokenType::Punctuator => write!(f, "PUNCTUATOR"),
        }
    }
}

/// Token represents a lexical token
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The type of the token
    pub token_type: TokenType,
    /// The literal value; decoded for strings and attributes
    pub literal: String,
    /// The position in the source
    pub position: Position,
    /// Error message (if token_type is Error)
    pub error: Option<String>,
}

impl Token {
    /// Create a new token
    pub fn new(token_type: TokenType, literal: impl Into<String>, position: Position) -> Self {
        Self {
            token_type,
            literal: literal.into(),
            position,
            error: None,
        }
    }

    /// Create an error token
    pub fn error(
        message: impl Into<String>,
        literal: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            token_type: TokenType::Error,
            literal: literal.into(),
            position,
            error: Some(message.into()),
        }
    }

    /// Create an EOF token
    pub fn eof(position: Position) -> Self {
        Self {
            token_type: TokenType::Eof,
            literal: String::new(),
            position,
            error: None,
        }
    }

    /// Check if this is an EOF token
    pub fn is_eof(&self) -> bool {
        self.token_type == TokenType::Eof
    }

    /// Check if this is an error token
    pub fn is_error(&self) -> bool {
        self.token_type == TokenType::Error
    }

    /// Check if this is a keyword with the given value (case-sensitive)
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.token_type == TokenType::Keyword && self.literal == keyword
    }

    /// Check if this is an operator with the given value
    pub fn is_operator(&self, op: &str) -> bool {
        self.token_type == TokenType::Operator && self.literal == op
    }

    /// Check if this is a punctuator with the given value
    pub fn is_punctuator(&self, punct: &str) -> bool {
        self.token_type == TokenType::Punctuator && self.literal == punct
    }

    /// Short description used as the "found" part of syntax errors
    pub fn describe(&self) -> String {
        match self.token_type {
            TokenType::Eof => "end of query".to_string(),
            TokenType::Error => self
                .error
                .clone()
                .unwrap_or_else(|| "invalid token".to_string()),
            TokenType::Attribute => format!("'.{}'", self.literal),
            TokenType::String => format!("string {:?}", self.literal),
            _ => format!("'{}'", self.literal),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.token_type == TokenType::Error {
            write!(
                f,
                "{}: {} at {}",
                self.token_type,
                self.error.as_deref().unwrap_or("unknown error"),
                self.position
            )
        } else if self.token_type == TokenType::Keyword {
            write!(
                f,
                "{}: {} at {}",
                self.token_type, self.literal, self.position
            )
        } else {
            write!(
                f,
                "{}: '{}' at {}",
                self.token_type, self.literal, self.position
            )
        }
    }
}

/// Reserved words (case-sensitive)
pub static KEYWORDS: &[&str] = &[
    // Literals
    "true",
    "false",
    "nil",
    "maxInt",
    "minInt",
    // Statuses
    "error",
    "ok",
    "unset",
    // Kinds
    "unspecified",
    "internal",
    "server",
    "client",
    "producer",
    "consumer",
    // Aggregates
    "count",
    "avg",
    "min",
    "max",
    "sum",
    // Pipeline stages
    "by",
    "select",
    "coalesce",
    // Hints
    "with",
];

/// Compiled keyword set for O(1) lookups
static KEYWORD_SET: LazyLock<FxHashSet<&'static str>> =
    LazyLock::new(|| KEYWORDS.iter().copied().collect());

/// Check if a string is a reserved word
#[inline]
pub fn is_keyword(s: &str) -> bool {
    KEYWORD_SET.contains(s)
}

/// Words that scope a following `.attribute`
pub static ATTRIBUTE_SCOPES: &[&str] =
    &["span", "resource", "event", "link", "instrumentation", "parent"];

/// Check if a word scopes a following attribute
pub fn is_attribute_scope(s: &str) -> bool {
    ATTRIBUTE_SCOPES.contains(&s)
}

/// Field, spanset, structural and pipeline operators
pub static OPERATORS: &[&str] = &[
    // Comparison
    "=", "!=", "=~", "!~", ">", ">=", "<", "<=",
    // Logical
    "&&", "||", "!",
    // Arithmetic
    "+", "-", "*", "/", "%", "^",
    // Structural
    ">>", "<<", "~", "!>>", "!<<", "!>", "!<", "&>>", "&<<", "&>", "&<", "&~",
    // Pipe
    "|",
];

/// Compiled operator set for O(1) lookups
static OPERATOR_SET: LazyLock<FxHashSet<&'static str>> =
    LazyLock::new(|| OPERATORS.iter().copied().collect());

/// Check if a string is an operator
#[inline]
pub fn is_operator(s: &str) -> bool {
    OPERATOR_SET.contains(s)
}

/// Punctuators
pub static PUNCTUATORS: &[char] = &['{', '}', '(', ')', ',', ':'];

/// Check if a character is a punctuator
pub fn is_punctuator(c: char) -> bool {
    PUNCTUATORS.contains(&c)
}

/// Characters that can start an operator
pub fn is_operator_char(c: char) -> bool {
    matches!(
        c,
        '=' | '<' | '>' | '!' | '+' | '-' | '*' | '/' | '%' | '|' | '&' | '^' | '~'
    )
}

/// Characters that end an unquoted attribute name
pub fn is_attribute_terminator(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '\0' | '{'
                | '}'
                | '('
                | ')'
                | '='
                | '~'
                | '!'
                | '<'
                | '>'
                | '&'
                | '|'
                | '^'
                | ','
                | '*'
                | '/'
                | '%'
                | '"'
        )
}
