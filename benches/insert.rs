use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use quantile_sketch::DDSketch;
use rand::SeedableRng;
use rand_distr::{Distribution, Pareto};

fn make_points(size: usize) -> Vec<f64> {
    // Generate samples that roughly correspond to the latency of a typical web service, in
    // microseconds: big hump at the beginning with a long tail, bottoming out at 15
    // milliseconds and tailing off up to 10 seconds.
    let distribution = Pareto::new(1.0, 1.0).expect("pareto distribution should be valid");
    let seed = 0xC0FFEE;

    let mut rng = rand::rngs::SmallRng::seed_from_u64(seed);
    distribution
        .sample_iter(&mut rng)
        // Scale by 10,000 to get microseconds.
        .map(|n| n * 10_000.0)
        .filter(|n| *n > 15_000.0 && *n < 10_000_000.0)
        .take(size)
        .collect::<Vec<_>>()
}

fn bench_insert(c: &mut Criterion) {
    let sizes = [1usize, 10, 100, 1_000, 10_000];

    let mut group = c.benchmark_group("DDSketch/insert");
    for size in sizes {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let vals = make_points(size);
            b.iter(|| {
                let mut sketch = DDSketch::new(0.01).unwrap();
                for val in &vals {
                    sketch.add(*val);
                }
                sketch
            });
        });
    }
    group.finish();
}

fn bench_quantile(c: &mut Criterion) {
    let mut group = c.benchmark_group("DDSketch/quantile");
    for size in [100usize, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut sketch = DDSketch::new(0.01).unwrap();
            for val in make_points(size) {
                sketch.add(val);
            }

            b.iter(|| {
                (
                    sketch.get_quantile_value(0.5),
                    sketch.get_quantile_value(0.95),
                    sketch.get_quantile_value(0.99),
                )
            });
        });
    }
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("DDSketch/merge");
    for size in [10usize, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let vals = make_points(size);

            let mut s1 = DDSketch::new(0.01).unwrap();
            let mut s2 = DDSketch::new(0.01).unwrap();
            for val in &vals[..size / 2] {
                s1.add(*val);
            }
            for val in &vals[size / 2..] {
                s2.add(*val);
            }

            b.iter(|| {
                let mut target = s1.clone();
                target.merge(&s2).unwrap();
                target
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_quantile, bench_merge);
criterion_main!(benches);
