use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mtree::{Entry, Key, Tree};

#[derive(Debug, Clone, PartialEq)]
struct Point([f64; 16]);

impl Key for Point {
    fn distance(&self, other: &Self) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}

fn lcg_next(state: &mut u64) -> f64 {
    *state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
    ((*state >> 33) as f64) / (1u64 << 31) as f64 - 1.0
}

fn random_point(state: &mut u64) -> Point {
    let mut coords = [0.0f64; 16];
    for c in coords.iter_mut() {
        *c = lcg_next(state);
    }
    Point(coords)
}

fn build_tree(n: u64) -> Tree<Point, 16, 250> {
    let mut tree = Tree::new();
    let mut state = 0x2545F4914F6CDD1Du64;
    for i in 0..n {
        tree.insert(Entry::new(i, random_point(&mut state)));
    }
    tree
}

fn bench_range_query(c: &mut Criterion) {
    let tree = build_tree(100_000);
    let query = Point([0.0; 16]);

    c.bench_function("range_query_small_radius", |b| {
        b.iter(|| black_box(tree.range_query(black_box(&query), black_box(0.05))))
    });

    c.bench_function("range_query_large_radius", |b| {
        b.iter(|| black_box(tree.range_query(black_box(&query), black_box(2.0))))
    });
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("insert_10k", |b| {
        b.iter(|| black_box(build_tree(10_000)));
    });
}

criterion_group!(benches, bench_range_query, bench_insert);
criterion_main!(benches);
