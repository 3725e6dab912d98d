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

//! Lexer, parser and condition extraction benchmarks
//!
//! Run with: cargo bench --bench parse

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use traceql::{parse, tokenize, CompiledQuery};

const SIMPLE: &str = r#"{ resource.service.name = "api" }"#;
const COMPLEX: &str = r#"({ kind = server && span.http.method = "POST" } >> { status = error || duration > 1.5s }) && { .db.system =~ "postgres|mysql" } | by(resource.service.name) | count() > 2 | select(span.http.url, .db.statement) with(most_recent=true)"#;

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");
    group.bench_function("simple", |b| b.iter(|| black_box(tokenize(black_box(SIMPLE)))));
    group.bench_function("complex", |b| b.iter(|| black_box(tokenize(black_box(COMPLEX)))));
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.bench_function("simple", |b| b.iter(|| black_box(parse(black_box(SIMPLE)).unwrap())));
    group.bench_function("complex", |b| b.iter(|| black_box(parse(black_box(COMPLEX)).unwrap())));
    group.bench_function("error", |b| {
        b.iter(|| black_box(parse(black_box("{ .a = 1 } | count( > 2")).is_err()))
    });
    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile complex", |b| {
        b.iter(|| black_box(CompiledQuery::compile(black_box(COMPLEX)).unwrap()))
    });
}

criterion_group!(benches, bench_tokenize, bench_parse, bench_compile);
criterion_main!(benches);
