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

//! OTLP/JSON trace decoding
//!
//! Accepts the JSON encoding of an OTLP `TracesData` message
//! (`resourceSpans` -> `scopeSpans` -> `spans`), or an array of them.
//! Ids are hex strings, 64-bit integers may be numbers or strings, kinds
//! and status codes may be numbers or enum names. Event timestamps are
//! absolute in OTLP and become offsets from the span start.
//!
//! A span that fails to decode poisons only its own trace; the other
//! traces of the document are still returned.

use std::sync::Arc;

use compact_str::CompactString;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::core::{Error, Kind, Result, Status};
use crate::model::{
    AttributeValue, Attributes, InstrumentationScope, Resource, Span, SpanEvent, SpanId,
    SpanLink, Trace, TraceId,
};

/// Traces decoded from one document
#[derive(Debug, Default)]
pub struct DecodedTraces {
    /// Traces in order of first appearance
    pub traces: Vec<Trace>,
    /// Traces with at least one undecodable span
    pub failures: Vec<(TraceId, Error)>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    Many(Vec<TracesData>),
    One(TracesData),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracesData {
    #[serde(default)]
    resource_spans: Vec<ResourceSpans>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceSpans {
    #[serde(default)]
    resource: Option<OtlpResource>,
    #[serde(default, alias = "instrumentationLibrarySpans")]
    scope_spans: Vec<ScopeSpans>,
}

#[derive(Deserialize, Default)]
struct OtlpResource {
    #[serde(default)]
    attributes: Vec<KeyValue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScopeSpans {
    #[serde(default, alias = "instrumentationLibrary")]
    scope: Option<OtlpScope>,
    #[serde(default)]
    spans: Vec<OtlpSpan>,
}

#[derive(Deserialize, Default)]
struct OtlpScope {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    attributes: Vec<KeyValue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtlpSpan {
    trace_id: String,
    #[serde(default)]
    span_id: String,
    #[serde(default)]
    parent_span_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    kind: Option<KindCode>,
    #[serde(default)]
    start_time_unix_nano: Option<Uint64>,
    #[serde(default)]
    end_time_unix_nano: Option<Uint64>,
    #[serde(default)]
    attributes: Vec<KeyValue>,
    #[serde(default)]
    status: Option<OtlpStatus>,
    #[serde(default)]
    events: Vec<OtlpEvent>,
    #[serde(default)]
    links: Vec<OtlpLink>,
}

#[derive(Deserialize)]
struct OtlpStatus {
    #[serde(default)]
    code: Option<StatusCode>,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtlpEvent {
    #[serde(default)]
    time_unix_nano: Option<Uint64>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    attributes: Vec<KeyValue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtlpLink {
    trace_id: String,
    span_id: String,
    #[serde(default)]
    attributes: Vec<KeyValue>,
}

#[derive(Deserialize)]
struct KeyValue {
    key: String,
    #[serde(default)]
    value: AnyValue,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AnyValue {
    string_value: Option<String>,
    bool_value: Option<bool>,
    int_value: Option<Int64>,
    double_value: Option<f64>,
    array_value: Option<ArrayValue>,
    kvlist_value: Option<KeyValueList>,
    bytes_value: Option<String>,
}

#[derive(Deserialize, Default)]
struct ArrayValue {
    #[serde(default)]
    values: Vec<AnyValue>,
}

#[derive(Deserialize, Default)]
struct KeyValueList {
    #[serde(default)]
    values: Vec<KeyValue>,
}

/// Protobuf JSON writes 64-bit integers as strings
#[derive(Deserialize)]
#[serde(untagged)]
enum Uint64 {
    Number(u64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Int64 {
    Number(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KindCode {
    Number(u8),
    Name(Kind),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StatusCode {
    Number(u8),
    Name(Status),
}

impl Uint64 {
    fn get(&self, field: &str) -> Result<u64> {
        match self {
            Uint64::Number(n) => Ok(*n),
            Uint64::Text(s) => s
                .parse()
                .map_err(|_| Error::decode(format!("invalid {} '{}'", field, s))),
        }
    }
}

impl Int64 {
    fn get(&self) -> Result<i64> {
        match self {
            Int64::Number(n) => Ok(*n),
            Int64::Text(s) => s
                .parse()
                .map_err(|_| Error::decode(format!("invalid intValue '{}'", s))),
        }
    }
}

impl KindCode {
    fn get(&self) -> Result<Kind> {
        match self {
            KindCode::Name(kind) => Ok(*kind),
            KindCode::Number(0) => Ok(Kind::Unspecified),
            KindCode::Number(1) => Ok(Kind::Internal),
            KindCode::Number(2) => Ok(Kind::Server),
            KindCode::Number(3) => Ok(Kind::Client),
            KindCode::Number(4) => Ok(Kind::Producer),
            KindCode::Number(5) => Ok(Kind::Consumer),
            KindCode::Number(n) => Err(Error::decode(format!("invalid span kind {}", n))),
        }
    }
}

impl StatusCode {
    fn get(&self) -> Result<Status> {
        match self {
            StatusCode::Name(status) => Ok(*status),
            StatusCode::Number(0) => Ok(Status::Unset),
            StatusCode::Number(1) => Ok(Status::Ok),
            StatusCode::Number(2) => Ok(Status::Error),
            StatusCode::Number(n) => Err(Error::decode(format!("invalid status code {}", n))),
        }
    }
}

/// Decode a JSON document
pub fn decode_traces(json: &str) -> Result<DecodedTraces> {
    let documents = match serde_json::from_str::<Document>(json)? {
        Document::Many(docs) => docs,
        Document::One(doc) => vec![doc],
    };

    let mut out = DecodedTraces::default();
    let mut slots: FxHashMap<TraceId, usize> = FxHashMap::default();
    let mut poisoned: FxHashMap<TraceId, Error> = FxHashMap::default();

    for data in documents {
        for resource_spans in data.resource_spans {
            let resource = Arc::new(Resource::new(attributes(
                resource_spans.resource.unwrap_or_default().attributes,
            )?));

            for scope_spans in resource_spans.scope_spans {
                let scope = scope_spans.scope.unwrap_or_default();
                let scope = Arc::new(InstrumentationScope {
                    name: scope.name,
                    version: scope.version,
                    attributes: attributes(scope.attributes)?,
                });

                for raw in scope_spans.spans {
                    // Without a trace id the span cannot be attributed
                    let trace_id: TraceId = raw.trace_id.parse()?;
                    let slot = *slots.entry(trace_id).or_insert_with(|| {
                        out.traces.push(Trace {
                            trace_id,
                            spans: Vec::new(),
                        });
                        out.traces.len() - 1
                    });

                    match decode_span(raw, &resource, &scope) {
                        Ok(span) => out.traces[slot].spans.push(span),
                        Err(err) => {
                            poisoned.entry(trace_id).or_insert(err);
                        }
                    }
                }
            }
        }
    }

    if !poisoned.is_empty() {
        out.traces.retain(|trace| {
            if let Some(err) = poisoned.remove(&trace.trace_id) {
                out.failures.push((trace.trace_id, err));
                false
            } else {
                true
            }
        });
    }

    Ok(out)
}

fn decode_span(
    raw: OtlpSpan,
    resource: &Arc<Resource>,
    scope: &Arc<InstrumentationScope>,
) -> Result<Span> {
    let span_id: SpanId = raw.span_id.parse()?;
    let parent_span_id = if raw.parent_span_id.is_empty() {
        None
    } else {
        Some(raw.parent_span_id.parse::<SpanId>()?)
    };
    let start_time = match &raw.start_time_unix_nano {
        Some(v) => v.get("startTimeUnixNano")?,
        None => 0,
    };
    let end_time = match &raw.end_time_unix_nano {
        Some(v) => v.get("endTimeUnixNano")?,
        None => start_time,
    };
    let kind = match &raw.kind {
        Some(code) => code.get()?,
        None => Kind::Unspecified,
    };
    let (status, status_message) = match raw.status {
        Some(status) => (
            match &status.code {
                Some(code) => code.get()?,
                None => Status::Unset,
            },
            status.message,
        ),
        None => (Status::Unset, String::new()),
    };

    let mut events = Vec::with_capacity(raw.events.len());
    for event in raw.events {
        let time = match &event.time_unix_nano {
            Some(v) => v.get("timeUnixNano")?,
            None => start_time,
        };
        events.push(SpanEvent {
            name: event.name,
            time_since_start: time.saturating_sub(start_time),
            attributes: attributes(event.attributes)?,
        });
    }

    let mut links = Vec::with_capacity(raw.links.len());
    for link in raw.links {
        links.push(SpanLink {
            trace_id: link.trace_id.parse()?,
            span_id: link.span_id.parse()?,
            attributes: attributes(link.attributes)?,
        });
    }

    Ok(Span {
        span_id,
        parent_span_id,
        name: raw.name,
        kind,
        status,
        status_message,
        start_time,
        end_time,
        attributes: attributes(raw.attributes)?,
        resource: resource.clone(),
        events,
        links,
        scope: scope.clone(),
    })
}

fn attributes(kvs: Vec<KeyValue>) -> Result<Attributes> {
    let mut out = Attributes::new();
    for kv in kvs {
        if let Some(value) = any_value(kv.value)? {
            out.insert(kv.key, value);
        }
    }
    Ok(out)
}

/// Empty values carry nothing and are dropped
fn any_value(value: AnyValue) -> Result<Option<AttributeValue>> {
    if let Some(s) = value.string_value {
        return Ok(Some(AttributeValue::String(s)));
    }
    if let Some(b) = value.bool_value {
        return Ok(Some(AttributeValue::Bool(b)));
    }
    if let Some(n) = value.int_value {
        return Ok(Some(AttributeValue::Int(n.get()?)));
    }
    if let Some(f) = value.double_value {
        return Ok(Some(AttributeValue::Float(f)));
    }
    if let Some(array) = value.array_value {
        let mut items = Vec::with_capacity(array.values.len());
        for item in array.values {
            if let Some(item) = any_value(item)? {
                items.push(item);
            }
        }
        return Ok(Some(AttributeValue::Array(items)));
    }
    if let Some(list) = value.kvlist_value {
        let mut map: FxHashMap<CompactString, AttributeValue> = FxHashMap::default();
        for kv in list.values {
            if let Some(v) = any_value(kv.value)? {
                map.insert(CompactString::from(kv.key), v);
            }
        }
        return Ok(Some(AttributeValue::Map(map)));
    }
    Ok(value.bytes_value.map(AttributeValue::String))
}
