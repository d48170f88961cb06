//! Resolution and planner benchmarks for splash_core.
//!
//! Run with: `cargo bench -p splash_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use splash_core::orders::legal_orders;
use splash_core::planner::OpponentModel;
use splash_core::prelude::*;
use splash_test_utils::fixtures;

/// One resolved turn with random legal orders on both sides.
pub fn resolve_benchmark(c: &mut Criterion) {
    let base = fixtures::skirmish();
    let mut zero = RandomPolicy::new(11);
    let mut one = RandomPolicy::new(12);
    let a = zero.get_move(&base, Side::Zero);
    let b = one.get_move(&base, Side::One);

    c.bench_function("apply_turn", |bench| {
        bench.iter(|| {
            let mut state = base.clone();
            black_box(state.apply(black_box(&a), black_box(&b)))
        });
    });

    c.bench_function("legal_orders_bomber", |bench| {
        let mut out = Vec::new();
        bench.iter(|| {
            legal_orders(black_box(&base), 2, &mut out);
            black_box(out.len())
        });
    });
}

/// Full planner decisions with a fixed depth and no effective deadline.
pub fn planner_benchmark(c: &mut Criterion) {
    let base = fixtures::skirmish();
    let config = PlannerConfig {
        beam_width: 8,
        depth: 2,
        top_k: 3,
        time_budget_ms: 60_000,
        opponent: OpponentModel::Greedy,
        weights: EvalWeights::default(),
    };
    let mut planner = BeamPlanner::new(config);
    let mut opponent = GreedyPolicy::new();

    c.bench_function("beam_plan_depth2", |bench| {
        bench.iter(|| black_box(planner.plan(black_box(&base), Side::Zero, &mut opponent)));
    });
}

criterion_group!(benches, resolve_benchmark, planner_benchmark);
criterion_main!(benches);
