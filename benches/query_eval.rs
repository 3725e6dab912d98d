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

//! Query evaluation benchmarks over synthetic traces
//!
//! Run with: cargo bench --bench query_eval

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use traceql::{
    Engine, EngineConfig, Kind, MemoryStorage, Resource, SearchRequest, Span, Status, Trace,
};

const TRACE_COUNT: u128 = 2_000;
const SERVICES: [&str; 6] = ["frontend", "cart", "checkout", "payment", "shipping", "db"];

/// Random call tree: every span picks an earlier span as its parent
fn random_trace(rng: &mut StdRng, id: u128) -> Trace {
    let resources: Vec<Arc<Resource>> = SERVICES
        .iter()
        .map(|s| Arc::new(Resource::service(s)))
        .collect();
    let spans_in_trace = rng.gen_range(5..60u64);
    let base = id as u64 * 1_000_000_000;
    let mut spans = Vec::with_capacity(spans_in_trace as usize);
    for i in 0..spans_in_trace {
        let start = base + rng.gen_range(0..500_000_000);
        let end = start + rng.gen_range(1_000..800_000_000);
        let status_code: i64 = if rng.gen_bool(0.05) { 500 } else { 200 };
        let mut span = Span::new(i + 1, format!("op-{}", rng.gen_range(0..20)))
            .with_times(start, end)
            .with_kind(if i == 0 { Kind::Server } else { Kind::Client })
            .with_attribute("http.status_code", status_code)
            .with_attribute("retries", rng.gen_range(0..4i64))
            .with_resource(resources[rng.gen_range(0..resources.len())].clone());
        if i > 0 {
            span = span.with_parent(rng.gen_range(1..=i));
        }
        if status_code == 500 {
            span = span.with_status(Status::Error, "internal error");
        }
        spans.push(span);
    }
    Trace::new(id, spans)
}

fn setup_storage() -> MemoryStorage {
    let mut rng = StdRng::seed_from_u64(42);
    let storage = MemoryStorage::new("bench");
    for id in 1..=TRACE_COUNT {
        storage.insert(random_trace(&mut rng, id));
    }
    storage
}

const QUERIES: [(&str, &str); 6] = [
    ("match_all", "{ }"),
    ("attribute", r#"{ resource.service.name = "payment" && span.http.status_code = 500 }"#),
    ("regex", r#"{ name =~ "op-1.*" }"#),
    ("descendant", r#"{ kind = server } >> { status = error }"#),
    ("count", "{ span.retries > 2 } | count() > 5"),
    ("group", "{ } | by(resource.service.name) | avg(duration) > 300ms"),
];

fn bench_full_scan(c: &mut Criterion) {
    let storage = setup_storage();
    let sequential = Engine::sequential();
    let parallel = Engine::new(EngineConfig::default()).unwrap();
    // Large limit so every trace is evaluated
    let request = SearchRequest::new().with_limit(TRACE_COUNT as usize);

    let mut group = c.benchmark_group("full scan");
    group.sample_size(20);
    for (name, query) in QUERIES {
        group.bench_with_input(BenchmarkId::new("sequential", name), query, |b, q| {
            b.iter(|| {
                let response = sequential.evaluate(black_box(q), &request, &[&storage]).unwrap();
                black_box(response.traces.len())
            });
        });
        group.bench_with_input(BenchmarkId::new("parallel", name), query, |b, q| {
            b.iter(|| {
                let response = parallel.evaluate(black_box(q), &request, &[&storage]).unwrap();
                black_box(response.traces.len())
            });
        });
    }
    group.finish();
}

fn bench_pruned_scan(c: &mut Criterion) {
    let storage = setup_storage();
    let engine = Engine::sequential();
    let request = SearchRequest::new().with_limit(TRACE_COUNT as usize);
    let query = r#"{ resource.service.name = "payment" && span.http.status_code = 500 }"#;

    let mut group = c.benchmark_group("pruning");
    group.sample_size(20);
    group.bench_function("unpruned", |b| {
        b.iter(|| black_box(engine.evaluate(query, &request, &[&storage]).unwrap()));
    });
    group.bench_function("pruned", |b| {
        b.iter(|| {
            black_box(
                engine
                    .evaluate_with_index(query, &request, &[&storage], Some(&storage))
                    .unwrap(),
            )
        });
    });
    group.finish();
}

fn bench_most_recent(c: &mut Criterion) {
    let storage = setup_storage();
    let engine = Engine::sequential();
    let request = SearchRequest::new().with_limit(20).with_most_recent(true);

    c.bench_function("most recent 20", |b| {
        b.iter(|| {
            let response = engine
                .evaluate(black_box("{ status = error }"), &request, &[&storage])
                .unwrap();
            black_box(response.traces.len())
        });
    });
}

criterion_group!(benches, bench_full_scan, bench_pruned_scan, bench_most_recent);
criterion_main!(benches);
