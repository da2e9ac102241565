//! Benchmarks the pure decay-weighted cumulative-score math (§4.4.3) over a
//! range of history lengths. No I/O: this exercises exactly the hot loop
//! `ScoringEngine::recalculate_skill` runs once per history row.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mastery_core::scoring::decay::{cumulative_score, weight_rows, ScoreInput};

fn synthetic_history(n: usize) -> Vec<ScoreInput> {
    (0..n)
        .map(|i| ScoreInput {
            target_evidence_volume: 5.0,
            validity_modifier: 0.8 + (i % 3) as f64 * 0.1,
            performance_score: 0.5 + (i % 5) as f64 * 0.1,
        })
        .collect()
}

fn decay_weighting_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring_decay");
    for size in &[10usize, 100, 1_000] {
        let rows = synthetic_history(*size);
        group.bench_with_input(BenchmarkId::new("weight_rows", size), &rows, |b, rows| {
            b.iter(|| black_box(weight_rows(rows, 0.9)));
        });
        group.bench_with_input(BenchmarkId::new("cumulative_score", size), &rows, |b, rows| {
            b.iter(|| black_box(cumulative_score(rows, 0.9, 0.0)));
        });
    }
    group.finish();
}

criterion_group!(benches, decay_weighting_benchmark);
criterion_main!(benches);
