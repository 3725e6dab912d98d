#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use traceql::{Engine, Kind, Resource, Span, Status, Trace};

fn fixture() -> Arc<Trace> {
    let shop = Arc::new(Resource::service("shop"));
    Arc::new(Trace::new(
        1,
        vec![
            Span::new(1, "GET /")
                .with_kind(Kind::Server)
                .with_times(0, 1_000)
                .with_resource(shop.clone()),
            Span::new(2, "query")
                .with_parent(1)
                .with_times(100, 900)
                .with_attribute("db.rows", 12i64)
                .with_attribute("db.system", "postgres")
                .with_resource(shop),
            Span::new(3, "broken")
                .with_parent(2)
                .with_times(900, 100)
                .with_status(Status::Error, "timeout"),
            Span::new(3, "duplicate").with_parent(7),
        ],
    ))
}

fuzz_target!(|data: &[u8]| {
    if let Ok(query) = std::str::from_utf8(data) {
        let engine = Engine::sequential();
        // Evaluation never panics, whatever the query computes
        if let Ok(compiled) = engine.compile(query) {
            let _ = engine.evaluate_trace(&compiled, fixture(), 0);
        }
    }
});
