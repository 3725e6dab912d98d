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

//! Parser surface: printing, error reporting and compiled plans

use traceql::parser::{parse_query, TokenType};
use traceql::{parse, tokenize, Engine, Error};

#[test]
fn test_printed_queries_parse_back_equal() {
    let queries = [
        r#"{ resource.service.name = "api" && span.http.status_code >= 500 }"#,
        r#"{ name = "A" } > { name = "B" } >> { name = "C" }"#,
        "{ .a } &~ { .b } || { .c } !>> { .d }",
        "{ duration > 90m } | by(span.region, resource.zone) | count() >= 2",
        "{ event.exception.type != nil } | select(event:name, link:traceID)",
        "{ instrumentation.name = \"otel\" && instrumentation:version = \"1.0\" }",
        "{ span.size / 1024 > 2.5 || -span.delta < -3 }",
        "{ } | sum(span.bytes) / count() > 10 with(anchored_regex=false, most_recent=true)",
        "{ status = 2 && kind != unspecified && statusMessage =~ \"time.*\" }",
    ];
    for query in queries {
        let first = parse(query).unwrap_or_else(|e| panic!("{}: {}", query, e));
        let printed = first.to_string();
        let second = parse(&printed).unwrap_or_else(|e| panic!("{} -> {}: {}", query, printed, e));
        assert_eq!(first, second, "{} printed as {}", query, printed);
        // Printing is a fixed point
        assert_eq!(printed, second.to_string());
    }
}

#[test]
fn test_syntax_error_carries_position() {
    let err = parse("{ .a = 1 } | count( > 2").unwrap_err();
    match err {
        Error::Syntax {
            offset,
            column,
            found,
            ..
        } => {
            assert_eq!(offset, 20);
            assert_eq!(column, 21);
            assert_eq!(found, "'>'");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_literal_overflow_is_syntax_error() {
    match parse("{ .a = 99999999999999999999 }").unwrap_err() {
        Error::Syntax {
            offset,
            expected,
            found,
            ..
        } => {
            assert_eq!(offset, 7);
            assert_eq!(expected, "64-bit integer");
            assert_eq!(found, "'99999999999999999999'");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(
        parse("{ duration > 9999999999999h }").unwrap_err(),
        Error::Syntax { .. }
    ));
}

#[test]
fn test_formatted_errors_point_at_offending_token() {
    let errors = parse_query("{ .a = 1 ").unwrap_err();
    let formatted = errors.format_errors();
    let lines: Vec<&str> = formatted.lines().collect();
    assert!(lines[0].starts_with("expected '}', found end of query"));
    assert_eq!(lines[1], "{ .a = 1 ");
    assert_eq!(lines[2], "         ^");
}

#[test]
fn test_semantic_errors() {
    for query in ["{ nosuch = 1 }", "{ span:nope = 1 }", "{ .a =~ \"(\" }"] {
        let err = parse(query).unwrap_err();
        assert!(matches!(err, Error::Semantic(_)), "{}: {:?}", query, err);
    }
    assert!(parse("{ } | frobnicate()").unwrap_err().is_query_error());
}

#[test]
fn test_tokenize_attributes() {
    let tokens = tokenize(r#"{ resource."service name" = "x" }"#);
    let kinds: Vec<TokenType> = tokens.iter().map(|t| t.token_type).collect();
    assert_eq!(
        kinds,
        vec![
            TokenType::Punctuator,
            TokenType::Scope,
            TokenType::Attribute,
            TokenType::Operator,
            TokenType::String,
            TokenType::Punctuator,
            TokenType::Eof,
        ]
    );
    assert_eq!(tokens[2].literal, "service name");
}

#[test]
fn test_explain_describes_plan() {
    let engine = Engine::sequential();
    let plan = engine
        .explain(r#"{ resource.service.name = "api" } >> { status = error } | count() > 1"#)
        .unwrap();
    assert!(plan.starts_with("query:"));
    assert!(plan.contains("stage 1:"));
    assert!(plan.contains("stage 2:  count() > 1"));
    assert!(plan.contains("pruning:    enabled"));
    assert!(plan.contains("resource.service.name"));

    let plan = engine.explain("{ }").unwrap();
    assert!(plan.contains("conditions: none"));
}

#[test]
fn test_compiled_queries_are_cached() {
    let engine = Engine::sequential();
    let a = engine.compile("{ .a = 1 }").unwrap();
    let b = engine.compile("{ .a = 1 }").unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
    assert!(engine.compile("{ .a = }").is_err());
}
