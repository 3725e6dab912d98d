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

//! Decoded trace data
//!
//! These are read-only inputs built by a storage collaborator. Resources and
//! instrumentation scopes are shared between spans through `Arc`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use compact_str::CompactString;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::{Error, Kind, Result, Static, Status};

/// Attribute key under which a resource names its service
pub const SERVICE_NAME: &str = "service.name";

// ============================================================================
// Identifiers
// ============================================================================

/// 128-bit trace identifier, rendered as 32 lower-case hex digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TraceId(pub u128);

/// 64-bit span identifier, rendered as 16 lower-case hex digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SpanId(pub u64);

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

type RadixParser<T> = fn(&str, u32) -> std::result::Result<T, std::num::ParseIntError>;

fn parse_hex<T>(s: &str, max_digits: usize, parse: RadixParser<T>) -> Result<T> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() || digits.len() > max_digits {
        return Err(Error::decode(format!("invalid id '{}'", s)));
    }
    parse(digits, 16).map_err(|_| Error::decode(format!("invalid id '{}'", s)))
}

impl FromStr for TraceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_hex(s, 32, u128::from_str_radix).map(TraceId)
    }
}

impl FromStr for SpanId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_hex(s, 16, u64::from_str_radix).map(SpanId)
    }
}

macro_rules! hex_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error> {
                let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_serde!(TraceId);
hex_serde!(SpanId);

// ============================================================================
// Attributes
// ============================================================================

/// Attribute value as stored on spans, resources, events and links
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<AttributeValue>),
    Map(FxHashMap<CompactString, AttributeValue>),
}

impl AttributeValue {
    /// Convert to a query value; maps and nested arrays become nil
    pub fn to_static(&self) -> Static {
        match self {
            AttributeValue::Bool(b) => Static::Bool(*b),
            AttributeValue::Int(n) => Static::Int(*n),
            AttributeValue::Float(f) => Static::Float(*f),
            AttributeValue::String(s) => Static::from(s.as_str()),
            AttributeValue::Array(items) => Static::Array(
                items
                    .iter()
                    .map(|item| match item {
                        AttributeValue::Array(_) | AttributeValue::Map(_) => Static::Nil,
                        scalar => scalar.to_static(),
                    })
                    .collect(),
            ),
            AttributeValue::Map(_) => Static::Nil,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Key to value mapping with dotted-path lookup into nested maps
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Attributes(FxHashMap<CompactString, AttributeValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<CompactString>, value: impl Into<AttributeValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Look up `key`, descending into map values when the exact key is absent
    ///
    /// `a.b.c` tries `a.b.c`, then `a` -> `b.c`, then `a.b` -> `c`.
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        lookup(&self.0, key)
    }

    /// Resolve `key` to a query value, nil when absent
    pub fn value(&self, key: &str) -> Static {
        self.get(key).map(AttributeValue::to_static).unwrap_or_default()
    }
}

fn lookup<'a>(
    map: &'a FxHashMap<CompactString, AttributeValue>,
    key: &str,
) -> Option<&'a AttributeValue> {
    if let Some(value) = map.get(key) {
        return Some(value);
    }
    for (i, _) in key.match_indices('.') {
        if let Some(AttributeValue::Map(inner)) = map.get(&key[..i]) {
            if let Some(value) = lookup(inner, &key[i + 1..]) {
                return Some(value);
            }
        }
    }
    None
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
    K: Into<CompactString>,
    V: Into<AttributeValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Attributes(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ============================================================================
// Trace entities
// ============================================================================

/// Producer-level attributes shared by every span it emitted
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub attributes: Attributes,
}

impl Resource {
    pub fn new(attributes: Attributes) -> Self {
        Self { attributes }
    }

    /// Resource with only `service.name` set
    pub fn service(name: &str) -> Self {
        Self::new(Attributes::from_iter([(SERVICE_NAME, name)]))
    }

    pub fn service_name(&self) -> Option<&str> {
        match self.attributes.get(SERVICE_NAME) {
            Some(AttributeValue::String(s)) => Some(s),
            _ => None,
        }
    }
}

/// Library that produced a span
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InstrumentationScope {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub attributes: Attributes,
}

/// Timestamped annotation on a span
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpanEvent {
    pub name: String,
    /// Nanoseconds since the owning span started
    pub time_since_start: u64,
    pub attributes: Attributes,
}

/// Reference from a span to a span of (possibly) another trace
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpanLink {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub attributes: Attributes,
}

/// A single operation within a trace
#[derive(Debug, Clone)]
pub struct Span {
    pub span_id: SpanId,
    /// None for root spans
    pub parent_span_id: Option<SpanId>,
    pub name: String,
    pub kind: Kind,
    pub status: Status,
    pub status_message: String,
    /// Unix nanoseconds
    pub start_time: u64,
    /// Unix nanoseconds
    pub end_time: u64,
    pub attributes: Attributes,
    pub resource: Arc<Resource>,
    pub events: Vec<SpanEvent>,
    pub links: Vec<SpanLink>,
    pub scope: Arc<InstrumentationScope>,
}

impl Span {
    pub fn new(span_id: u64, name: impl Into<String>) -> Self {
        Self {
            span_id: SpanId(span_id),
            parent_span_id: None,
            name: name.into(),
            kind: Kind::Unspecified,
            status: Status::Unset,
            status_message: String::new(),
            start_time: 0,
            end_time: 0,
            attributes: Attributes::new(),
            resource: Arc::default(),
            events: Vec::new(),
            links: Vec::new(),
            scope: Arc::default(),
        }
    }

    pub fn with_parent(mut self, parent: u64) -> Self {
        self.parent_span_id = Some(SpanId(parent));
        self
    }

    pub fn with_kind(mut self, kind: Kind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_status(mut self, status: Status, message: impl Into<String>) -> Self {
        self.status = status;
        self.status_message = message.into();
        self
    }

    pub fn with_times(mut self, start: u64, end: u64) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn with_attribute(
        mut self,
        key: impl Into<CompactString>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(key, value);
        self
    }

    pub fn with_resource(mut self, resource: Arc<Resource>) -> Self {
        self.resource = resource;
        self
    }

    pub fn with_scope(mut self, scope: Arc<InstrumentationScope>) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_event(mut self, event: SpanEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_link(mut self, link: SpanLink) -> Self {
        self.links.push(link);
        self
    }

    /// End minus start in nanoseconds, zero for inverted timestamps
    pub fn duration_nanos(&self) -> i64 {
        i64::try_from(self.end_time.saturating_sub(self.start_time)).unwrap_or(i64::MAX)
    }
}

/// A trace: one identifier and the spans recorded for it
#[derive(Debug, Clone, Default)]
pub struct Trace {
    pub trace_id: TraceId,
    pub spans: Vec<Span>,
}

impl Trace {
    pub fn new(trace_id: u128, spans: Vec<Span>) -> Self {
        Self {
            trace_id: TraceId(trace_id),
            spans,
        }
    }

    /// Earliest span start, zero for an empty trace
    pub fn start_time(&self) -> u64 {
        self.spans.iter().map(|s| s.start_time).min().unwrap_or(0)
    }

    /// Latest span end, zero for an empty trace
    pub fn end_time(&self) -> u64 {
        self.spans.iter().map(|s| s.end_time).max().unwrap_or(0)
    }

    /// Latest end minus earliest start in nanoseconds
    pub fn duration_nanos(&self) -> i64 {
        i64::try_from(self.end_time().saturating_sub(self.start_time())).unwrap_or(i64::MAX)
    }

    /// First span without a parent
    pub fn root_span(&self) -> Option<&Span> {
        self.spans.iter().find(|s| s.parent_span_id.is_none())
    }

    /// True when any span overlaps the half-open `[start, end)` window
    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        !self.spans.is_empty() && self.start_time() < end && self.end_time() >= start
    }
}
