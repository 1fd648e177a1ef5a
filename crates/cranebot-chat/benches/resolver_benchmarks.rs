//! Benchmarks for response resolution.
//!
//! Resolution runs on every user turn, so the cost of each match step
//! (exact, substring, keyword, default) is measured separately. Live-data
//! rules additionally pay for template substitution.

use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use cranebot_chat::{FixedReading, LiveReading, ResponseResolver};

fn resolver() -> ResponseResolver {
    ResponseResolver::builtin().with_readings(Arc::new(FixedReading(LiveReading {
        vibration: 9.5,
        temperature: 72.0,
        load: 64.0,
        torque: 175.0,
    })))
}

/// Inputs that stop at each match step.
fn inputs_by_step() -> Vec<(&'static str, &'static str)> {
    vec![
        ("exact", "Safety Features"),
        ("substring", "please tell me about drones today"),
        ("keyword", "any drone footage?"),
        ("default", "what is the weather like in lisbon"),
        ("live_exact", "show live data"),
    ]
}

fn bench_resolve_by_step(c: &mut Criterion) {
    let resolver = resolver();

    let mut group = c.benchmark_group("resolve");
    group.sample_size(200);
    group.measurement_time(Duration::from_secs(5));

    for (name, input) in inputs_by_step() {
        group.bench_function(name, |b| b.iter(|| resolver.resolve(input)));
    }

    group.finish();
}

fn bench_resolve_long_input(c: &mut Criterion) {
    let resolver = resolver();
    // Near the default length cap, with no keyword anywhere.
    let long_input: String = "lorem ipsum dolor sit amet ".repeat(70);

    let mut group = c.benchmark_group("resolve_long_input");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("default_fallthrough", |b| {
        b.iter(|| resolver.resolve(&long_input))
    });

    group.bench_function("batch_100_mixed", |b| {
        let inputs = inputs_by_step();
        b.iter(|| {
            let mut out = Vec::with_capacity(100);
            for i in 0..100 {
                out.push(resolver.resolve(inputs[i % inputs.len()].1));
            }
            out
        });
    });

    group.finish();
}

criterion_group!(benches, bench_resolve_by_step, bench_resolve_long_input);
criterion_main!(benches);
