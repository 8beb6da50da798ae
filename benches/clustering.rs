//! Benchmarks for delta computation and clustering on synthetic demand.
//!
//! Run with: `cargo bench --bench clustering --features synthetic`

use criterion::{BenchmarkId, Criterion, SamplingMode, criterion_group, criterion_main};
use densitypeak::synthetic::DemandScenario;
use densitypeak::{
    ClusterConfig, DensityPeakCluster, Propagation, compute_delta, propagate, propagate_fixpoint,
    select_centers,
};
use std::time::Duration;

const HOTSPOTS: usize = 8;

// ============================================================================
// 1. Delta pass scaling
// ============================================================================

fn bench_delta_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("delta_scaling");
    group.sampling_mode(SamplingMode::Flat);
    group.warm_up_time(Duration::from_secs(3));

    for side in [50u64, 100, 200, 400] {
        let demand = DemandScenario::city(side, HOTSPOTS, 7)
            .generate()
            .expect("valid scenario");
        let cells = side * side;

        if cells >= 100_000 {
            group.sample_size(10);
        }

        group.bench_with_input(BenchmarkId::new("cells", cells), &demand.units, |b, units| {
            b.iter(|| compute_delta(units));
        });
    }

    group.finish();
}

// ============================================================================
// 2. Propagation: single pass vs fixpoint
// ============================================================================

fn bench_propagation(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagation");

    let demand = DemandScenario::city(200, HOTSPOTS, 7)
        .generate()
        .expect("valid scenario");
    let table = compute_delta(&demand.units);
    let config = ClusterConfig::new(100.0, 5.0);
    let centers = select_centers(&table, &config).expect("centers");

    group.bench_function("single_pass", |b| {
        b.iter(|| propagate(&table, &centers));
    });

    group.sample_size(10);
    group.bench_function("fixpoint", |b| {
        b.iter(|| propagate_fixpoint(&table, &centers));
    });

    group.finish();
}

// ============================================================================
// 3. Re-clustering with different thresholds
// ============================================================================

fn bench_recluster(c: &mut Criterion) {
    let mut group = c.benchmark_group("recluster");

    let demand = DemandScenario::city(200, HOTSPOTS, 7)
        .generate()
        .expect("valid scenario");
    let dpc = DensityPeakCluster::new(demand.units);

    for delta_threshold in [2.0, 5.0, 10.0] {
        let config =
            ClusterConfig::new(100.0, delta_threshold).with_propagation(Propagation::SinglePass);
        group.bench_with_input(
            BenchmarkId::new("delta_threshold", delta_threshold),
            &config,
            |b, cfg| {
                b.iter(|| dpc.cluster(cfg));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_delta_scaling,
    bench_propagation,
    bench_recluster
);
criterion_main!(benches);
