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

//! Closed enumerations shared by the parser, evaluator and data model

use std::fmt;

use serde::Deserialize;

/// Span kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    #[default]
    #[serde(alias = "SPAN_KIND_UNSPECIFIED")]
    Unspecified,
    #[serde(alias = "SPAN_KIND_INTERNAL")]
    Internal,
    #[serde(alias = "SPAN_KIND_SERVER")]
    Server,
    #[serde(alias = "SPAN_KIND_CLIENT")]
    Client,
    #[serde(alias = "SPAN_KIND_PRODUCER")]
    Producer,
    #[serde(alias = "SPAN_KIND_CONSUMER")]
    Consumer,
}

impl Kind {
    /// Keyword used for this kind in query text
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Unspecified => "unspecified",
            Kind::Internal => "internal",
            Kind::Server => "server",
            Kind::Client => "client",
            Kind::Producer => "producer",
            Kind::Consumer => "consumer",
        }
    }

    /// Resolve a query keyword
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "unspecified" => Some(Kind::Unspecified),
            "internal" => Some(Kind::Internal),
            "server" => Some(Kind::Server),
            "client" => Some(Kind::Client),
            "producer" => Some(Kind::Producer),
            "consumer" => Some(Kind::Consumer),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Span status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    #[serde(alias = "STATUS_CODE_UNSET")]
    Unset,
    #[serde(alias = "STATUS_CODE_OK")]
    Ok,
    #[serde(alias = "STATUS_CODE_ERROR")]
    Error,
}

impl Status {
    /// Keyword used for this status in query text
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unset => "unset",
            Status::Ok => "ok",
            Status::Error => "error",
        }
    }

    /// Wire code of the status (unset=0, ok=1, error=2)
    pub fn code(&self) -> i64 {
        match self {
            Status::Unset => 0,
            Status::Ok => 1,
            Status::Error => 2,
        }
    }

    /// Resolve a query keyword
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "unset" => Some(Status::Unset),
            "ok" => Some(Status::Ok),
            "error" => Some(Status::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operators usable inside a spanset filter and in scalar filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mult,
    Div,
    Mod,
    Power,
    Equal,
    NotEqual,
    Regex,
    NotRegex,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    And,
    Or,
    Not,
    /// `x != nil`
    Exists,
    /// `x = nil`
    NotExists,
}

impl Operator {
    /// Returns the textual form of the operator
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mult => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Power => "^",
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::Regex => "=~",
            Operator::NotRegex => "!~",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Not => "!",
            Operator::Exists => "!= nil",
            Operator::NotExists => "= nil",
        }
    }

    /// Resolve a binary operator token
    pub fn from_binary_symbol(s: &str) -> Option<Self> {
        match s {
            "+" => Some(Operator::Add),
            "-" => Some(Operator::Sub),
            "*" => Some(Operator::Mult),
            "/" => Some(Operator::Div),
            "%" => Some(Operator::Mod),
            "^" => Some(Operator::Power),
            "=" => Some(Operator::Equal),
            "!=" => Some(Operator::NotEqual),
            "=~" => Some(Operator::Regex),
            "!~" => Some(Operator::NotRegex),
            ">" => Some(Operator::Greater),
            ">=" => Some(Operator::GreaterEqual),
            "<" => Some(Operator::Less),
            "<=" => Some(Operator::LessEqual),
            "&&" => Some(Operator::And),
            "||" => Some(Operator::Or),
            _ => None,
        }
    }

    /// Returns true for `+ - * / % ^`
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Operator::Add
                | Operator::Sub
                | Operator::Mult
                | Operator::Div
                | Operator::Mod
                | Operator::Power
        )
    }

    /// Returns true for comparison operators including regex
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Equal
                | Operator::NotEqual
                | Operator::Regex
                | Operator::NotRegex
                | Operator::Greater
                | Operator::GreaterEqual
                | Operator::Less
                | Operator::LessEqual
        )
    }

    /// Returns true for `=~` and `!~`
    pub fn is_regex(&self) -> bool {
        matches!(self, Operator::Regex | Operator::NotRegex)
    }

    /// Operator that gives the same result with swapped operands
    ///
    /// Regex operators are not symmetric and return None.
    pub fn mirror(&self) -> Option<Self> {
        match self {
            Operator::Equal => Some(Operator::Equal),
            Operator::NotEqual => Some(Operator::NotEqual),
            Operator::Greater => Some(Operator::Less),
            Operator::GreaterEqual => Some(Operator::LessEqual),
            Operator::Less => Some(Operator::Greater),
            Operator::LessEqual => Some(Operator::GreaterEqual),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Tree relation tested by a structural operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// `>>` right is a descendant of left
    Descendant,
    /// `<<` right is an ancestor of left
    Ancestor,
    /// `>` right is a direct child of left
    Child,
    /// `<` right is the direct parent of left
    Parent,
    /// `~` right shares a parent with left
    Sibling,
}

/// How a structural join builds its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinMode {
    /// Right spans with at least one related left span
    Match,
    /// Right spans with no related left span (`!` prefix)
    Negated,
    /// Related spans from both sides (`&` prefix)
    Union,
}

/// One of the fifteen structural operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructuralOperator {
    pub relation: Relation,
    pub mode: JoinMode,
}

impl StructuralOperator {
    pub fn new(relation: Relation, mode: JoinMode) -> Self {
        Self { relation, mode }
    }

    /// Returns the textual form of the operator
    pub fn symbol(&self) -> &'static str {
        match (self.mode, self.relation) {
            (JoinMode::Match, Relation::Descendant) => ">>",
            (JoinMode::Match, Relation::Ancestor) => "<<",
            (JoinMode::Match, Relation::Child) => ">",
            (JoinMode::Match, Relation::Parent) => "<",
            (JoinMode::Match, Relation::Sibling) => "~",
            (JoinMode::Negated, Relation::Descendant) => "!>>",
            (JoinMode::Negated, Relation::Ancestor) => "!<<",
            (JoinMode::Negated, Relation::Child) => "!>",
            (JoinMode::Negated, Relation::Parent) => "!<",
            (JoinMode::Negated, Relation::Sibling) => "!~",
            (JoinMode::Union, Relation::Descendant) => "&>>",
            (JoinMode::Union, Relation::Ancestor) => "&<<",
            (JoinMode::Union, Relation::Child) => "&>",
            (JoinMode::Union, Relation::Parent) => "&<",
            (JoinMode::Union, Relation::Sibling) => "&~",
        }
    }

    /// Resolve an operator token
    pub fn from_symbol(s: &str) -> Option<Self> {
        let (mode, rest) = if let Some(rest) = s.strip_prefix('!') {
            (JoinMode::Negated, rest)
        } else if let Some(rest) = s.strip_prefix('&') {
            (JoinMode::Union, rest)
        } else {
            (JoinMode::Match, s)
        };
        let relation = match rest {
            ">>" => Relation::Descendant,
            "<<" => Relation::Ancestor,
            ">" => Relation::Child,
            "<" => Relation::Parent,
            "~" => Relation::Sibling,
            _ => return None,
        };
        Some(Self { relation, mode })
    }
}

impl fmt::Display for StructuralOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// `&&` and `||` between spanset expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            LogicalOperator::And => "&&",
            LogicalOperator::Or => "||",
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Entity an attribute reference targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttributeScope {
    /// `.foo`: span first, then resource
    #[default]
    None,
    Span,
    Resource,
    Event,
    Link,
    Instrumentation,
}

impl AttributeScope {
    /// Prefix used in query text, empty for unscoped references
    pub fn prefix(&self) -> &'static str {
        match self {
            AttributeScope::None => "",
            AttributeScope::Span => "span",
            AttributeScope::Resource => "resource",
            AttributeScope::Event => "event",
            AttributeScope::Link => "link",
            AttributeScope::Instrumentation => "instrumentation",
        }
    }

    /// Resolve a scope keyword that may prefix a dotted attribute
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "span" => Some(AttributeScope::Span),
            "resource" => Some(AttributeScope::Resource),
            "event" => Some(AttributeScope::Event),
            "link" => Some(AttributeScope::Link),
            "instrumentation" => Some(AttributeScope::Instrumentation),
            _ => None,
        }
    }
}

/// Scope of a built-in field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrinsicScope {
    Span,
    Trace,
    Event,
    Link,
    Instrumentation,
}

/// Built-in, always present fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    Duration,
    Name,
    Status,
    StatusMessage,
    Kind,
    Parent,
    SpanId,
    ParentId,
    ChildCount,
    NestedSetLeft,
    NestedSetRight,
    NestedSetParent,
    TraceDuration,
    TraceRootSpan,
    TraceRootService,
    TraceId,
    EventName,
    EventTimeSinceStart,
    LinkTraceId,
    LinkSpanId,
    InstrumentationName,
    InstrumentationVersion,
}

impl Intrinsic {
    /// Canonical textual form, unscoped when an unscoped spelling exists
    pub fn name(&self) -> &'static str {
        match self {
            Intrinsic::Duration => "duration",
            Intrinsic::Name => "name",
            Intrinsic::Status => "status",
            Intrinsic::StatusMessage => "statusMessage",
            Intrinsic::Kind => "kind",
            Intrinsic::Parent => "parent",
            Intrinsic::SpanId => "span:id",
            Intrinsic::ParentId => "span:parentID",
            Intrinsic::ChildCount => "span:childCount",
            Intrinsic::NestedSetLeft => "nestedSetLeft",
            Intrinsic::NestedSetRight => "nestedSetRight",
            Intrinsic::NestedSetParent => "nestedSetParent",
            Intrinsic::TraceDuration => "traceDuration",
            Intrinsic::TraceRootSpan => "rootName",
            Intrinsic::TraceRootService => "rootServiceName",
            Intrinsic::TraceId => "trace:id",
            Intrinsic::EventName => "event:name",
            Intrinsic::EventTimeSinceStart => "event:timeSinceStart",
            Intrinsic::LinkTraceId => "link:traceID",
            Intrinsic::LinkSpanId => "link:spanID",
            Intrinsic::InstrumentationName => "instrumentation:name",
            Intrinsic::InstrumentationVersion => "instrumentation:version",
        }
    }

    /// Scope the intrinsic reads from
    pub fn scope(&self) -> IntrinsicScope {
        match self {
            Intrinsic::TraceDuration
            | Intrinsic::TraceRootSpan
            | Intrinsic::TraceRootService
            | Intrinsic::TraceId => IntrinsicScope::Trace,
            Intrinsic::EventName | Intrinsic::EventTimeSinceStart => IntrinsicScope::Event,
            Intrinsic::LinkTraceId | Intrinsic::LinkSpanId => IntrinsicScope::Link,
            Intrinsic::InstrumentationName | Intrinsic::InstrumentationVersion => {
                IntrinsicScope::Instrumentation
            }
            _ => IntrinsicScope::Span,
        }
    }

    /// Resolve a bare identifier such as `duration`
    pub fn from_unscoped(s: &str) -> Option<Self> {
        match s {
            "duration" => Some(Intrinsic::Duration),
            "name" => Some(Intrinsic::Name),
            "status" => Some(Intrinsic::Status),
            "statusMessage" => Some(Intrinsic::StatusMessage),
            "kind" => Some(Intrinsic::Kind),
            "parent" => Some(Intrinsic::Parent),
            "traceDuration" => Some(Intrinsic::TraceDuration),
            "rootName" => Some(Intrinsic::TraceRootSpan),
            "rootServiceName" => Some(Intrinsic::TraceRootService),
            "nestedSetLeft" => Some(Intrinsic::NestedSetLeft),
            "nestedSetRight" => Some(Intrinsic::NestedSetRight),
            "nestedSetParent" => Some(Intrinsic::NestedSetParent),
            _ => None,
        }
    }

    /// Resolve a `scope:name` pair such as `trace:rootName`
    pub fn from_scoped(scope: &str, name: &str) -> Option<Self> {
        match (scope, name) {
            ("trace", "duration") => Some(Intrinsic::TraceDuration),
            ("trace", "rootName") => Some(Intrinsic::TraceRootSpan),
            ("trace", "rootService") => Some(Intrinsic::TraceRootService),
            ("trace", "id") => Some(Intrinsic::TraceId),
            ("span", "duration") => Some(Intrinsic::Duration),
            ("span", "name") => Some(Intrinsic::Name),
            ("span", "kind") => Some(Intrinsic::Kind),
            ("span", "status") => Some(Intrinsic::Status),
            ("span", "statusMessage") => Some(Intrinsic::StatusMessage),
            ("span", "id") => Some(Intrinsic::SpanId),
            ("span", "parentID") => Some(Intrinsic::ParentId),
            ("span", "childCount") => Some(Intrinsic::ChildCount),
            ("event", "name") => Some(Intrinsic::EventName),
            ("event", "timeSinceStart") => Some(Intrinsic::EventTimeSinceStart),
            ("link", "traceID") => Some(Intrinsic::LinkTraceId),
            ("link", "spanID") => Some(Intrinsic::LinkSpanId),
            ("instrumentation", "name") => Some(Intrinsic::InstrumentationName),
            ("instrumentation", "version") => Some(Intrinsic::InstrumentationVersion),
            _ => None,
        }
    }

    /// Returns true for scope keywords that accept the `scope:name` form
    pub fn is_intrinsic_scope(s: &str) -> bool {
        matches!(s, "trace" | "span" | "event" | "link" | "instrumentation")
    }
}

impl fmt::Display for Intrinsic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_symbols() {
        for sym in [
            ">>", "<<", ">", "<", "~", "!>>", "!<<", "!>", "!<", "!~", "&>>", "&<<", "&>", "&<",
            "&~",
        ] {
            let op = StructuralOperator::from_symbol(sym).unwrap();
            assert_eq!(op.symbol(), sym);
        }
        assert!(StructuralOperator::from_symbol("&&").is_none());
        assert!(StructuralOperator::from_symbol("!=").is_none());
    }

    #[test]
    fn test_intrinsic_names_resolve() {
        let all = [
            Intrinsic::Duration,
            Intrinsic::Name,
            Intrinsic::Status,
            Intrinsic::StatusMessage,
            Intrinsic::Kind,
            Intrinsic::Parent,
            Intrinsic::SpanId,
            Intrinsic::ParentId,
            Intrinsic::ChildCount,
            Intrinsic::NestedSetLeft,
            Intrinsic::NestedSetRight,
            Intrinsic::NestedSetParent,
            Intrinsic::TraceDuration,
            Intrinsic::TraceRootSpan,
            Intrinsic::TraceRootService,
            Intrinsic::TraceId,
            Intrinsic::EventName,
            Intrinsic::EventTimeSinceStart,
            Intrinsic::LinkTraceId,
            Intrinsic::LinkSpanId,
            Intrinsic::InstrumentationName,
            Intrinsic::InstrumentationVersion,
        ];
        for intrinsic in all {
            let name = intrinsic.name();
            let resolved = match name.split_once(':') {
                Some((scope, field)) => Intrinsic::from_scoped(scope, field),
                None => Intrinsic::from_unscoped(name),
            };
            assert_eq!(resolved, Some(intrinsic), "{}", name);
        }
    }

    #[test]
    fn test_invalid_scoped_intrinsics() {
        assert!(Intrinsic::from_scoped("trace", "name").is_none());
        assert!(Intrinsic::from_scoped("trace", "rootServiceName").is_none());
        assert!(Intrinsic::from_scoped("span", "rootServiceName").is_none());
        assert!(Intrinsic::from_scoped("parent", "id").is_none());
        assert!(Intrinsic::from_scoped("", "duration").is_none());
    }

    #[test]
    fn test_operator_mirror() {
        assert_eq!(Operator::Greater.mirror(), Some(Operator::Less));
        assert_eq!(Operator::LessEqual.mirror(), Some(Operator::GreaterEqual));
        assert_eq!(Operator::Equal.mirror(), Some(Operator::Equal));
        assert_eq!(Operator::Regex.mirror(), None);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::Unset.code(), 0);
        assert_eq!(Status::Ok.code(), 1);
        assert_eq!(Status::Error.code(), 2);
        assert_eq!(Status::from_keyword("error"), Some(Status::Error));
        assert_eq!(Kind::from_keyword("server"), Some(Kind::Server));
        assert_eq!(Kind::from_keyword("error"), None);
    }
}
