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

//! Core types and definitions
//!
//! This module contains the fundamental types used throughout the engine:
//!
//! - [`Static`] - Literals and resolved field values
//! - [`Operator`] - Field operators (=, !=, =~, +, &&, ...)
//! - [`StructuralOperator`] - Span tree relations (>>, <<, >, <, ~ and variants)
//! - [`Intrinsic`] - Built-in span, trace, event and link fields
//! - [`EngineConfig`] - Execution configuration
//! - [`Error`] - Error types for all engine operations

pub mod config;
pub mod error;
pub mod types;
pub mod value;

// Re-export main types for convenience
pub use config::EngineConfig;
pub use error::{Error, ExhaustedReason, Result};
pub use types::{
    AttributeScope, Intrinsic, IntrinsicScope, JoinMode, Kind, LogicalOperator, Operator,
    Relation, Status, StructuralOperator,
};
pub use value::{format_duration, quote_string, Static, DURATION_UNITS};
