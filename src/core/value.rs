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

//! Static values - literals in queries and resolved field values
//!
//! [`Static`] is a closed tagged union. Comparison and arithmetic are
//! defined per tag pair; every pair that is not listed compares false and
//! computes to nil, so evaluation never fails on heterogeneous data.
//!
//! The `PartialEq`/`Hash` implementations are *structural* (floats by bit
//! pattern) and exist for AST equality and group keys. Query equality lives
//! in [`Static::compare`].

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::ser::{Serialize, SerializeSeq, Serializer};

use super::types::{Kind, Operator, Status};

const NANOS_PER_MICRO: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;

/// Duration units accepted after a numeric literal, longest suffix first
pub const DURATION_UNITS: &[(&str, i64)] = &[
    ("ns", 1),
    ("us", NANOS_PER_MICRO),
    ("µs", NANOS_PER_MICRO),
    ("ms", NANOS_PER_MILLI),
    ("s", NANOS_PER_SECOND),
    ("m", NANOS_PER_MINUTE),
    ("h", NANOS_PER_HOUR),
];

/// A literal or a resolved field value
#[derive(Debug, Clone, Default)]
pub enum Static {
    /// Absent value
    #[default]
    Nil,
    Int(i64),
    Float(f64),
    String(Arc<str>),
    Bool(bool),
    /// Nanoseconds
    Duration(i64),
    Status(Status),
    Kind(Kind),
    /// Homogeneous or mixed scalar array attribute
    Array(Arc<[Static]>),
}

impl Static {
    pub fn nil() -> Self {
        Static::Nil
    }

    pub fn int(value: i64) -> Self {
        Static::Int(value)
    }

    pub fn float(value: f64) -> Self {
        Static::Float(value)
    }

    pub fn string(value: impl Into<Arc<str>>) -> Self {
        Static::String(value.into())
    }

    pub fn bool(value: bool) -> Self {
        Static::Bool(value)
    }

    pub fn duration_nanos(nanos: i64) -> Self {
        Static::Duration(nanos)
    }

    pub fn duration(d: std::time::Duration) -> Self {
        Static::Duration(i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
    }

    /// Name of the value's tag, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Static::Nil => "nil",
            Static::Int(_) => "int",
            Static::Float(_) => "float",
            Static::String(_) => "string",
            Static::Bool(_) => "bool",
            Static::Duration(_) => "duration",
            Static::Status(_) => "status",
            Static::Kind(_) => "kind",
            Static::Array(_) => "array",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Static::Nil)
    }

    /// Returns true for int, float and duration
    pub fn is_numeric(&self) -> bool {
        matches!(self, Static::Int(_) | Static::Float(_) | Static::Duration(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Static::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Static::String(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Static::Int(n) | Static::Duration(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric value widened to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Static::Int(n) | Static::Duration(n) => Some(*n as f64),
            Static::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// True only for the boolean `true`
    pub fn is_true(&self) -> bool {
        matches!(self, Static::Bool(true))
    }

    // =========================================================================
    // Comparison
    // =========================================================================

    /// Evaluate a comparison operator
    ///
    /// `regex` is called as `regex(pattern, text)` for `=~` and `!~`.
    /// Arrays satisfy a comparison against a scalar when any element does;
    /// `!=` and `!~` hold when no element equals or matches.
    pub fn compare<F>(op: Operator, lhs: &Static, rhs: &Static, regex: &mut F) -> bool
    where
        F: FnMut(&str, &str) -> bool,
    {
        match (lhs, rhs) {
            (Static::Array(l), Static::Array(r)) => match op {
                Operator::Equal => arrays_equal(l, r),
                Operator::NotEqual => !arrays_equal(l, r),
                _ => false,
            },
            (Static::Array(items), scalar) => match op {
                Operator::NotEqual => !items
                    .iter()
                    .any(|item| Self::compare_scalar(Operator::Equal, item, scalar, regex)),
                Operator::NotRegex => !items
                    .iter()
                    .any(|item| Self::compare_scalar(Operator::Regex, item, scalar, regex)),
                _ => items
                    .iter()
                    .any(|item| Self::compare_scalar(op, item, scalar, regex)),
            },
            (scalar, Static::Array(items)) => match op {
                Operator::NotEqual => !items
                    .iter()
                    .any(|item| Self::compare_scalar(Operator::Equal, scalar, item, regex)),
                Operator::NotRegex => !items
                    .iter()
                    .any(|item| Self::compare_scalar(Operator::Regex, scalar, item, regex)),
                _ => items
                    .iter()
                    .any(|item| Self::compare_scalar(op, scalar, item, regex)),
            },
            _ => Self::compare_scalar(op, lhs, rhs, regex),
        }
    }

    fn compare_scalar<F>(op: Operator, lhs: &Static, rhs: &Static, regex: &mut F) -> bool
    where
        F: FnMut(&str, &str) -> bool,
    {
        match op {
            Operator::Equal => lhs.query_eq(rhs) == Some(true),
            Operator::NotEqual => lhs.query_eq(rhs) == Some(false),
            Operator::Greater => lhs.query_cmp(rhs) == Some(Ordering::Greater),
            Operator::GreaterEqual => matches!(
                lhs.query_cmp(rhs),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::Less => lhs.query_cmp(rhs) == Some(Ordering::Less),
            Operator::LessEqual => {
                matches!(lhs.query_cmp(rhs), Some(Ordering::Less | Ordering::Equal))
            }
            Operator::Regex => match (lhs, rhs) {
                (Static::String(text), Static::String(pattern)) => regex(pattern, text),
                _ => false,
            },
            Operator::NotRegex => match (lhs, rhs) {
                (Static::String(text), Static::String(pattern)) => !regex(pattern, text),
                _ => false,
            },
            _ => false,
        }
    }

    /// Query equality; None when the tags are not comparable
    pub fn query_eq(&self, other: &Static) -> Option<bool> {
        match (self, other) {
            (Static::Nil, _) | (_, Static::Nil) => None,
            (Static::String(a), Static::String(b)) => Some(a == b),
            (Static::String(s), n @ (Static::Int(_) | Static::Float(_)))
            | (n @ (Static::Int(_) | Static::Float(_)), Static::String(s)) => {
                Some(s.as_ref() == n.literal_text().as_str())
            }
            (Static::Bool(a), Static::Bool(b)) => Some(a == b),
            (Static::Status(a), Static::Status(b)) => Some(a == b),
            (Static::Kind(a), Static::Kind(b)) => Some(a == b),
            (Static::Status(s), Static::Int(n)) | (Static::Int(n), Static::Status(s)) => {
                Some(s.code() == *n)
            }
            _ if self.is_numeric() && other.is_numeric() => {
                self.numeric_cmp(other).map(|o| o == Ordering::Equal)
            }
            _ => None,
        }
    }

    /// Query ordering; None when the tags are not ordered
    pub fn query_cmp(&self, other: &Static) -> Option<Ordering> {
        match (self, other) {
            (Static::String(a), Static::String(b)) => Some(a.as_ref().cmp(b.as_ref())),
            (Static::String(s), n @ (Static::Int(_) | Static::Float(_))) => {
                Some(s.as_ref().cmp(n.literal_text().as_str()))
            }
            (n @ (Static::Int(_) | Static::Float(_)), Static::String(s)) => {
                Some(n.literal_text().as_str().cmp(s.as_ref()))
            }
            _ if self.is_numeric() && other.is_numeric() => self.numeric_cmp(other),
            _ => None,
        }
    }

    fn numeric_cmp(&self, other: &Static) -> Option<Ordering> {
        match (self.as_i64(), other.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => self.as_f64()?.partial_cmp(&other.as_f64()?),
        }
    }

    /// Text of a numeric literal as it compares against string attributes
    fn literal_text(&self) -> String {
        match self {
            Static::Int(n) => n.to_string(),
            Static::Float(f) => f.to_string(),
            _ => String::new(),
        }
    }

    // =========================================================================
    // Arithmetic and logic
    // =========================================================================

    /// Evaluate an arithmetic or logical binary operator
    pub fn binary(op: Operator, lhs: &Static, rhs: &Static) -> Static {
        match op {
            Operator::And => {
                Static::Bool(lhs.as_bool().unwrap_or(false) && rhs.as_bool().unwrap_or(false))
            }
            Operator::Or => {
                Static::Bool(lhs.as_bool().unwrap_or(false) || rhs.as_bool().unwrap_or(false))
            }
            _ if op.is_arithmetic() => arithmetic(op, lhs, rhs),
            _ => Static::Nil,
        }
    }

    /// Evaluate `!` or unary `-`
    pub fn unary(op: Operator, value: &Static) -> Static {
        match (op, value) {
            (Operator::Not, Static::Bool(b)) => Static::Bool(!b),
            (Operator::Sub, Static::Int(n)) => match n.checked_neg() {
                Some(v) => Static::Int(v),
                None => Static::Float(-(*n as f64)),
            },
            (Operator::Sub, Static::Float(f)) => Static::Float(-f),
            (Operator::Sub, Static::Duration(d)) => {
                d.checked_neg().map(Static::Duration).unwrap_or(Static::Nil)
            }
            (Operator::Exists, v) => Static::Bool(!v.is_nil()),
            (Operator::NotExists, v) => Static::Bool(v.is_nil()),
            _ => Static::Nil,
        }
    }

    /// Add a numeric value into an accumulator, used by sum and avg
    ///
    /// Returns false once the sum is no longer representable. The
    /// accumulator is then nil, and callers must not keep adding to it.
    pub fn sum_into(&mut self, other: &Static) -> bool {
        let next = match self {
            Static::Nil => other.clone(),
            _ => arithmetic(Operator::Add, self, other),
        };
        *self = next;
        !self.is_nil()
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Plain rendering for result output: strings are not quoted
    pub fn to_plain_string(&self) -> String {
        match self {
            Static::String(s) => s.to_string(),
            Static::Nil => String::new(),
            other => other.to_string(),
        }
    }
}

fn arrays_equal(l: &[Static], r: &[Static]) -> bool {
    l.len() == r.len() && l.iter().zip(r).all(|(a, b)| a.query_eq(b) == Some(true))
}

fn float_result(value: f64) -> Static {
    if value.is_finite() {
        Static::Float(value)
    } else {
        Static::Nil
    }
}

fn float_arithmetic(op: Operator, a: f64, b: f64) -> Static {
    match op {
        Operator::Add => float_result(a + b),
        Operator::Sub => float_result(a - b),
        Operator::Mult => float_result(a * b),
        Operator::Div if b == 0.0 => Static::Nil,
        Operator::Div => float_result(a / b),
        Operator::Mod if b == 0.0 => Static::Nil,
        Operator::Mod => float_result(a % b),
        Operator::Power => float_result(a.powf(b)),
        _ => Static::Nil,
    }
}

fn arithmetic(op: Operator, lhs: &Static, rhs: &Static) -> Static {
    match (lhs, rhs) {
        (Static::Int(a), Static::Int(b)) => {
            let exact = match op {
                Operator::Add => a.checked_add(*b),
                Operator::Sub => a.checked_sub(*b),
                Operator::Mult => a.checked_mul(*b),
                Operator::Mod if *b == 0 => return Static::Nil,
                Operator::Mod => a.checked_rem(*b),
                _ => None,
            };
            match exact {
                Some(v) => Static::Int(v),
                None => float_arithmetic(op, *a as f64, *b as f64),
            }
        }
        (Static::Duration(a), Static::Duration(b)) => {
            let exact = match op {
                Operator::Add => a.checked_add(*b),
                Operator::Sub => a.checked_sub(*b),
                Operator::Mod if *b == 0 => return Static::Nil,
                Operator::Mod => a.checked_rem(*b),
                _ => None,
            };
            match exact {
                Some(v) => Static::Duration(v),
                None => float_arithmetic(op, *a as f64, *b as f64),
            }
        }
        (Static::Duration(d), Static::Int(n)) | (Static::Int(n), Static::Duration(d)) => {
            let exact = match op {
                Operator::Add => d.checked_add(*n),
                Operator::Mult => d.checked_mul(*n),
                Operator::Sub if matches!(lhs, Static::Duration(_)) => d.checked_sub(*n),
                Operator::Sub => n.checked_sub(*d),
                Operator::Div if matches!(lhs, Static::Duration(_)) => {
                    if *n == 0 {
                        return Static::Nil;
                    }
                    d.checked_div(*n)
                }
                _ => None,
            };
            match exact {
                Some(v) => Static::Duration(v),
                None => float_arithmetic(
                    op,
                    lhs.as_f64().unwrap_or(0.0),
                    rhs.as_f64().unwrap_or(0.0),
                ),
            }
        }
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => float_arithmetic(op, a, b),
            _ => Static::Nil,
        },
    }
}

/// Render nanoseconds in the largest unit that represents them exactly
pub fn format_duration(nanos: i64) -> String {
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 0 {
        return match nanos.checked_neg() {
            Some(abs) => format!("-{}", format_duration(abs)),
            None => format!("{}ns", nanos),
        };
    }
    for (suffix, unit) in [
        ("h", NANOS_PER_HOUR),
        ("m", NANOS_PER_MINUTE),
        ("s", NANOS_PER_SECOND),
        ("ms", NANOS_PER_MILLI),
        ("us", NANOS_PER_MICRO),
    ] {
        if nanos % unit == 0 {
            return format!("{}{}", nanos / unit, suffix);
        }
    }
    format!("{}ns", nanos)
}

/// Quote a string literal so that it lexes back to the same text
pub fn quote_string(s: &str) -> String {
    if !s.contains('`') {
        return format!("`{}`", s);
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl fmt::Display for Static {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Static::Nil => write!(f, "nil"),
            Static::Int(i64::MIN) => write!(f, "minInt"),
            Static::Int(n) => write!(f, "{}", n),
            Static::Float(v) if v.fract() == 0.0 => write!(f, "{:.1}", v),
            Static::Float(v) => write!(f, "{}", v),
            Static::String(s) => write!(f, "{}", quote_string(s)),
            Static::Bool(b) => write!(f, "{}", b),
            Static::Duration(d) => write!(f, "{}", format_duration(*d)),
            Static::Status(s) => write!(f, "{}", s),
            Static::Kind(k) => write!(f, "{}", k),
            Static::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl PartialEq for Static {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Static::Nil, Static::Nil) => true,
            (Static::Int(a), Static::Int(b)) => a == b,
            (Static::Float(a), Static::Float(b)) => a.to_bits() == b.to_bits(),
            (Static::String(a), Static::String(b)) => a == b,
            (Static::Bool(a), Static::Bool(b)) => a == b,
            (Static::Duration(a), Static::Duration(b)) => a == b,
            (Static::Status(a), Static::Status(b)) => a == b,
            (Static::Kind(a), Static::Kind(b)) => a == b,
            (Static::Array(a), Static::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Static {}

impl Hash for Static {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Static::Nil => {}
            Static::Int(n) | Static::Duration(n) => n.hash(state),
            Static::Float(f) => f.to_bits().hash(state),
            Static::String(s) => s.hash(state),
            Static::Bool(b) => b.hash(state),
            Static::Status(s) => s.hash(state),
            Static::Kind(k) => k.hash(state),
            Static::Array(items) => items.hash(state),
        }
    }
}

impl Serialize for Static {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Static::Nil => serializer.serialize_none(),
            Static::Int(n) => serializer.serialize_i64(*n),
            Static::Float(f) => serializer.serialize_f64(*f),
            Static::String(s) => serializer.serialize_str(s),
            Static::Bool(b) => serializer.serialize_bool(*b),
            Static::Duration(d) => serializer.serialize_str(&format_duration(*d)),
            Static::Status(s) => serializer.serialize_str(s.as_str()),
            Static::Kind(k) => serializer.serialize_str(k.as_str()),
            Static::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl From<i64> for Static {
    fn from(value: i64) -> Self {
        Static::Int(value)
    }
}

impl From<f64> for Static {
    fn from(value: f64) -> Self {
        Static::Float(value)
    }
}

impl From<bool> for Static {
    fn from(value: bool) -> Self {
        Static::Bool(value)
    }
}

impl From<&str> for Static {
    fn from(value: &str) -> Self {
        Static::String(Arc::from(value))
    }
}

impl From<String> for Static {
    fn from(value: String) -> Self {
        Static::String(Arc::from(value))
    }
}

impl From<Status> for Static {
    fn from(value: Status) -> Self {
        Static::Status(value)
    }
}

impl From<Kind> for Static {
    fn from(value: Kind) -> Self {
        Static::Kind(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(op: Operator, l: &Static, r: &Static) -> bool {
        Static::compare(op, l, r, &mut |p: &str, t: &str| p == t)
    }

    #[test]
    fn test_numeric_cross_compare() {
        assert!(cmp(Operator::Equal, &Static::int(1), &Static::float(1.0)));
        assert!(cmp(Operator::Greater, &Static::duration_nanos(5), &Static::int(3)));
        assert!(cmp(
            Operator::LessEqual,
            &Static::float(2.5),
            &Static::duration_nanos(3)
        ));
        assert!(!cmp(Operator::Equal, &Static::int(1), &Static::bool(true)));
    }

    #[test]
    fn test_nil_never_matches() {
        assert!(!cmp(Operator::Equal, &Static::Nil, &Static::int(1)));
        assert!(!cmp(Operator::NotEqual, &Static::Nil, &Static::int(1)));
        assert!(!cmp(Operator::Equal, &Static::Nil, &Static::Nil));
    }

    #[test]
    fn test_wrong_type_is_false_both_ways() {
        let s = Static::from("abc");
        let b = Static::bool(true);
        assert!(!cmp(Operator::Equal, &s, &b));
        assert!(!cmp(Operator::NotEqual, &s, &b));
        assert!(!cmp(Operator::Greater, &b, &b));
    }

    #[test]
    fn test_string_numeric_lexicographic() {
        // "404" > "200" and "1000" < "200" as strings
        assert!(cmp(Operator::Greater, &Static::from("404"), &Static::int(200)));
        assert!(cmp(Operator::Less, &Static::from("1000"), &Static::int(200)));
        assert!(cmp(Operator::Equal, &Static::from("200"), &Static::int(200)));
    }

    #[test]
    fn test_status_equals_code() {
        assert!(cmp(Operator::Equal, &Static::Status(Status::Error), &Static::int(2)));
        assert!(!cmp(Operator::Greater, &Static::Status(Status::Error), &Static::int(1)));
    }

    #[test]
    fn test_array_semantics() {
        let arr = Static::Array(Arc::from(vec![Static::from("a"), Static::from("b")]));
        assert!(cmp(Operator::Equal, &arr, &Static::from("b")));
        assert!(!cmp(Operator::Equal, &arr, &Static::from("c")));
        assert!(cmp(Operator::NotEqual, &arr, &Static::from("c")));
        assert!(!cmp(Operator::NotEqual, &arr, &Static::from("a")));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(
            Static::binary(Operator::Add, &Static::int(1), &Static::int(2)),
            Static::int(3)
        );
        assert_eq!(
            Static::binary(Operator::Div, &Static::int(1), &Static::int(2)),
            Static::float(0.5)
        );
        assert_eq!(
            Static::binary(Operator::Div, &Static::int(1), &Static::int(0)),
            Static::Nil
        );
        assert_eq!(
            Static::binary(
                Operator::Add,
                &Static::duration_nanos(1_000),
                &Static::duration_nanos(500)
            ),
            Static::duration_nanos(1_500)
        );
        assert_eq!(
            Static::binary(Operator::Add, &Static::int(i64::MAX), &Static::int(1)),
            Static::float(i64::MAX as f64 + 1.0)
        );
        assert_eq!(
            Static::binary(Operator::Add, &Static::from("a"), &Static::int(1)),
            Static::Nil
        );
    }

    #[test]
    fn test_logic_treats_non_bool_as_false() {
        assert_eq!(
            Static::binary(Operator::Or, &Static::from("x"), &Static::bool(true)),
            Static::bool(true)
        );
        assert_eq!(
            Static::binary(Operator::And, &Static::int(1), &Static::bool(true)),
            Static::bool(false)
        );
        assert_eq!(Static::unary(Operator::Not, &Static::int(1)), Static::Nil);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(3 * NANOS_PER_HOUR), "3h");
        assert_eq!(format_duration(90 * NANOS_PER_SECOND), "90s");
        assert_eq!(format_duration(1_500_000), "1500us");
        assert_eq!(format_duration(7), "7ns");
        assert_eq!(format_duration(-2 * NANOS_PER_MILLI), "-2ms");
    }

    #[test]
    fn test_display_literals() {
        assert_eq!(Static::float(3.0).to_string(), "3.0");
        assert_eq!(Static::float(1.25).to_string(), "1.25");
        assert_eq!(Static::int(i64::MIN).to_string(), "minInt");
        assert_eq!(Static::from("foo").to_string(), "`foo`");
        assert_eq!(Static::from("a`b").to_string(), "\"a`b\"");
        assert_eq!(Static::Status(Status::Ok).to_string(), "ok");
    }

    #[test]
    fn test_sum_into() {
        let mut acc = Static::Nil;
        acc.sum_into(&Static::int(2));
        acc.sum_into(&Static::float(0.5));
        assert_eq!(acc, Static::float(2.5));

        let mut acc = Static::float(f64::MAX);
        assert!(!acc.sum_into(&Static::float(f64::MAX)));
        assert!(acc.is_nil());
    }
}
