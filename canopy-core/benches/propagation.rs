//! Benchmarks for dependency request propagation and accessor reads.
//!
//! Run with: cargo bench -p canopy-core -- propagation

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use canopy_core::dependency::{dispatch, DependencyRequest};
use canopy_core::{define, provide, resolve, Component, DependencyToken};

/// Build a chain `depth` components deep with the provider at the root.
fn chain(depth: usize, token: &DependencyToken<u64>) -> (Component, Component) {
    let root = Component::new("root");
    provide(&root, token, || 7);

    let mut leaf = root.clone();
    for _ in 1..depth {
        let child = Component::new("node");
        leaf.append_child(&child).expect("chain has no cycles");
        leaf = child;
    }
    root.connect().expect("root provides the token");
    (root, leaf)
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagation/dispatch");

    for depth in [1, 8, 64, 512] {
        let token = define::<u64>("bench");
        let (_root, leaf) = chain(depth, &token);

        group.bench_with_input(BenchmarkId::from_parameter(depth), &leaf, |b, leaf| {
            b.iter(|| {
                let mut value = 0;
                let mut request = DependencyRequest::new(token, |p| value = p.get());
                dispatch(black_box(leaf), &mut request);
                drop(request);
                black_box(value)
            });
        });
    }
    group.finish();
}

fn bench_accessor(c: &mut Criterion) {
    let token = define::<u64>("bench");
    let (_root, leaf) = chain(64, &token);
    let accessor = resolve(&leaf, &token).expect("leaf is connected under a provider");

    c.bench_function("propagation/accessor_get", |b| {
        b.iter(|| black_box(accessor.get()));
    });
}

criterion_group!(benches, bench_dispatch, bench_accessor);
criterion_main!(benches);
