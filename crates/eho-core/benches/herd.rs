//! Herd optimizer and compression throughput.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use eho_core::{
    Coordinate, DimensionExtender, EmbeddingCompressor, HerdConfig, HerdOptimizer, MemoryQuery,
};

fn herd_benchmarks(c: &mut Criterion) {
    let compressor = EmbeddingCompressor::default();
    let query = MemoryQuery::new("Retrieve brand dashboard for Monster Omni");

    c.bench_function("encode_query", |b| {
        b.iter(|| compressor.encode(black_box(&query.text)))
    });

    let base = compressor.encode(&query.text).unwrap_or_else(|_| Coordinate::zeros());
    let extended = DimensionExtender::default().extend_at(&base, &query, 1_771_632_000);
    let hot: Vec<Coordinate> = (0..8)
        .map(|i| extended.with_payload(&[0.01 * i as f64; 21]))
        .collect();
    let optimizer = HerdOptimizer::new(HerdConfig {
        time_budget_ms: 10_000,
        ..HerdConfig::default()
    });

    c.bench_function("optimize_fresh_identity", |b| {
        b.iter(|| optimizer.optimize(black_box(&extended), "brand-042"))
    });

    c.bench_function("optimize_with_hot_history", |b| {
        b.iter(|| optimizer.optimize_with_history(black_box(&extended), "brand-042", &hot))
    });
}

criterion_group!(benches, herd_benchmarks);
criterion_main!(benches);
