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

//! Operator precedence levels for the Pratt parser
//!
//! Spanset operators and field operators share symbols (`>`, `<`, `!~`,
//! `&&`), so each context has its own lookup.

/// Precedence levels (higher number = higher precedence)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
#[derive(Default)]
pub enum Precedence {
    /// Lowest precedence
    #[default]
    Lowest = 1,
    /// Spanset union (`||` between spansets)
    SpansetOr = 2,
    /// Spanset intersection (`&&` between spansets)
    SpansetAnd = 3,
    /// Structural operators (>>, <<, >, <, ~ and variants)
    Structural = 4,
    /// Logical OR inside a filter
    Or = 5,
    /// Logical AND inside a filter
    And = 6,
    /// Comparison operators (=, !=, =~, !~, <, <=, >, >=)
    Comparison = 7,
    /// Addition and subtraction (+, -)
    Sum = 8,
    /// Multiplication, division and modulo (*, /, %)
    Product = 9,
    /// Exponentiation (^), right-associative
    Power = 10,
    /// Prefix operators (!, -)
    Prefix = 11,
}

impl Precedence {
    /// Get precedence for an operator between field expressions
    pub fn for_field_operator(op: &str) -> Precedence {
        match op {
            "||" => Precedence::Or,
            "&&" => Precedence::And,
            "=" | "!=" | "=~" | "!~" | "<" | "<=" | ">" | ">=" => Precedence::Comparison,
            "+" | "-" => Precedence::Sum,
            "*" | "/" | "%" => Precedence::Product,
            "^" => Precedence::Power,
            _ => Precedence::Lowest,
        }
    }

    /// Get precedence for an operator between spanset expressions
    pub fn for_spanset_operator(op: &str) -> Precedence {
        match op {
            "||" => Precedence::SpansetOr,
            "&&" => Precedence::SpansetAnd,
            ">>" | "<<" | ">" | "<" | "~" | "!>>" | "!<<" | "!>" | "!<" | "!~" | "&>>"
            | "&<<" | "&>" | "&<" | "&~" => Precedence::Structural,
            _ => Precedence::Lowest,
        }
    }

    /// Get precedence for an operator between scalar (aggregate) expressions
    pub fn for_scalar_operator(op: &str) -> Precedence {
        match op {
            "+" | "-" => Precedence::Sum,
            "*" | "/" | "%" => Precedence::Product,
            "^" => Precedence::Power,
            _ => Precedence::Lowest,
        }
    }

    /// Precedence used for the right operand of an operator at this level
    ///
    /// Left-associative levels bind the right side one step tighter; `^`
    /// binds it at its own level so `2 ^ 3 ^ 2` is `2 ^ (3 ^ 2)`.
    pub fn right_binding(self) -> Precedence {
        match self {
            Precedence::Power => Precedence::Product,
            other => other,
        }
    }
}
