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

//! Error types for the query engine
//!
//! Query errors (syntax and semantic) are raised before any trace is
//! scanned. Evaluation never produces errors; collaborator failures are
//! surfaced unchanged.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why a search stopped before it could inspect every candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustedReason {
    /// The caller supplied deadline passed
    Deadline,
    /// The configured maximum number of inspected traces was reached
    ScanBudget,
    /// The caller cancelled the search
    Cancelled,
}

impl fmt::Display for ExhaustedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExhaustedReason::Deadline => write!(f, "deadline exceeded"),
            ExhaustedReason::ScanBudget => write!(f, "scan budget exhausted"),
            ExhaustedReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Main error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // =========================================================================
    // Query errors
    // =========================================================================
    /// Unexpected token or malformed literal
    #[error("syntax error at line {line}, column {column}: expected {expected}, found {found}")]
    Syntax {
        /// Byte offset into the query text
        offset: usize,
        line: usize,
        column: usize,
        expected: String,
        found: String,
    },

    /// Unknown scope, function or field, or an otherwise invalid construct
    #[error("semantic error: {0}")]
    Semantic(String),

    /// Identifier parsing failed
    #[error("failed to parse identifier {input:?}: {message}")]
    Identifier { input: String, message: String },

    // =========================================================================
    // Execution errors
    // =========================================================================
    /// Search stopped early; the partial result is still meaningful
    #[error("resource exhausted: {reason}")]
    ResourceExhausted { reason: ExhaustedReason },

    /// Invalid engine configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // =========================================================================
    // Collaborator errors
    // =========================================================================
    /// A candidate source or storage index failed
    #[error("source error: {message}")]
    Source { message: String },

    /// IO error
    #[error("io error: {message}")]
    Io { message: String },

    /// Trace decoding error
    #[error("decode error: {message}")]
    Decode { message: String },

    // =========================================================================
    // Internal errors
    // =========================================================================
    /// Internal error
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new Syntax error
    pub fn syntax(
        offset: usize,
        line: usize,
        column: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Error::Syntax {
            offset,
            line,
            column,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a new Semantic error
    pub fn semantic(message: impl Into<String>) -> Self {
        Error::Semantic(message.into())
    }

    /// Create a new Source error
    pub fn source(message: impl Into<String>) -> Self {
        Error::Source {
            message: message.into(),
        }
    }

    /// Create a new Decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Error::Decode {
            message: message.into(),
        }
    }

    /// Create a new InvalidConfig error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfig(message.into())
    }

    /// Create a new Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Check if the error was caused by the query text
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            Error::Syntax { .. } | Error::Semantic(_) | Error::Identifier { .. }
        )
    }

    /// Check if the error is a soft truncation rather than a failure
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, Error::ResourceExhausted { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode {
            message: err.to_string(),
        }
    }
}
