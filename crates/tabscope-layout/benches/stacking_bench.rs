//! Benchmarks for lane stacking and window partitioning.
//!
//! Run with: cargo bench -p tabscope-layout --bench stacking_bench
//!
//! The quadratic reference is measured alongside the sliding-window version
//! so the crossover is visible in the report.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tabscope_core::config::WindowSize;
use tabscope_core::event::{Event, Timestamp};
use tabscope_core::window::partition;
use tabscope_layout::stacking::{build_lanes, stack_levels, stack_levels_naive};

/// Deterministic bursty timeline: groups of eight events 150 ms apart,
/// groups 1.7 s apart, spread over four tabs.
fn bursty_events(n: usize) -> Vec<Arc<Event>> {
    (0..n)
        .map(|i| {
            let group = (i / 8) as i64;
            let within = (i % 8) as i64;
            Arc::new(Event::new(i as u64, (i % 4) as u64 + 1, group * 1_700 + within * 150))
        })
        .collect()
}

fn times(events: &[Arc<Event>]) -> Vec<Timestamp> {
    let mut times: Vec<_> = events.iter().map(|e| e.timestamp).collect();
    times.sort_unstable();
    times
}

// =============================================================================
// Stacking
// =============================================================================

fn bench_stacking(c: &mut Criterion) {
    let mut group = c.benchmark_group("stacking/levels");
    for n in [1_000usize, 10_000] {
        let times = times(&bursty_events(n));
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("sliding", n), &times, |b, times| {
            b.iter(|| black_box(stack_levels(black_box(times), 2_000)));
        });
        group.bench_with_input(BenchmarkId::new("naive", n), &times, |b, times| {
            b.iter(|| black_box(stack_levels_naive(black_box(times), 2_000)));
        });
    }
    group.finish();
}

fn bench_build_lanes(c: &mut Criterion) {
    let mut group = c.benchmark_group("stacking/build_lanes");
    for n in [1_000usize, 10_000] {
        let events = bursty_events(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &events, |b, events| {
            b.iter(|| black_box(build_lanes(black_box(events), 2_000)));
        });
    }
    group.finish();
}

// =============================================================================
// Partitioning
// =============================================================================

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("window/partition");
    for n in [1_000usize, 10_000] {
        let events = bursty_events(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &events, |b, events| {
            b.iter(|| black_box(partition(black_box(events), WindowSize::default())));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_stacking, bench_build_lanes, bench_partition);
criterion_main!(benches);
