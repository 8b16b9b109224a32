use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use quadpath::demo;
use quadpath::{start_path, Quad, QuadStore, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random "knows" graph with `size` people and ~5 edges each
fn social_store(size: usize) -> QuadStore {
    let store = QuadStore::memory(true, true).unwrap();
    let mut rng = StdRng::seed_from_u64(17);
    let quads: Vec<Quad> = (0..size * 5)
        .map(|_| {
            let from = rng.gen_range(0..size);
            let to = rng.gen_range(0..size);
            Quad::raw(&format!("person{}", from), "knows", &format!("person{}", to), "")
        })
        .collect();
    store.add_quads(quads).unwrap();
    store
}

/// Benchmark batch insertion throughput
fn bench_batch_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_insert");

    for size in [100, 1000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let store = QuadStore::memory(true, true).unwrap();
                let quads = (0..size).map(|i| Quad::raw(&format!("s{}", i), "p", &format!("o{}", i % 97), ""));
                store.add_quads(quads).unwrap();
                criterion::black_box(store.len());
            });
        });
    }
    group.finish();
}

/// Benchmark multi-hop traversal latency
fn bench_traversal(c: &mut Criterion) {
    let mut group = c.benchmark_group("traversal");

    for size in [100, 1000, 10_000].iter() {
        let store = social_store(*size);
        let knows = Value::iri("knows");

        group.bench_with_input(BenchmarkId::new("two_hops", size), size, |b, _| {
            b.iter(|| {
                let path = start_path(&store, [Value::iri("person0")])
                    .out([knows.clone()])
                    .out([knows.clone()]);
                criterion::black_box(path.count().unwrap());
            });
        });

        group.bench_with_input(BenchmarkId::new("three_hops_unique", size), size, |b, _| {
            b.iter(|| {
                let path = start_path(&store, [Value::iri("person0")])
                    .out([knows.clone()])
                    .unique()
                    .out([knows.clone()])
                    .unique()
                    .out([knows.clone()])
                    .unique();
                criterion::black_box(path.count().unwrap());
            });
        });
    }
    group.finish();
}

/// Benchmark the shop recommendation query
fn bench_recommendations(c: &mut Criterion) {
    let mut group = c.benchmark_group("recommendations");

    for customers in [10, 100, 1000].iter() {
        let store = QuadStore::memory(true, true).unwrap();
        demo::load_shop(&store, *customers, &mut StdRng::seed_from_u64(3)).unwrap();
        let john = Value::iri(demo::JOHN_DOE);

        group.bench_with_input(BenchmarkId::from_parameter(customers), customers, |b, _| {
            b.iter(|| {
                let ranking = demo::recommendations_for_customer(&store, &john).unwrap();
                criterion::black_box(ranking.len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_batch_insert, bench_traversal, bench_recommendations);
criterion_main!(benches);
