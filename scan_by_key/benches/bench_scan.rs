use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode};
use rand::{Rng, SeedableRng};
use rand_hc::Hc128Rng;
use scan_by_key::{exclusive_scan_by_key, inclusive_scan_by_key, par, seq};

const SEED: &[u8; 32] = b"q8Xb2LmVt0KzRw7NcYd4HsJe1PuGa5Of";

/// Creates sorted keys whose segments average `mean_segment` elements.
fn create_random_keys(len: usize, mean_segment: u32, rng: &mut impl Rng) -> Vec<u32> {
    let mut key = 0u32;
    let mut result = Vec::with_capacity(len);
    for _ in 0..len {
        if rng.gen_range(0..mean_segment) == 0 {
            key += 1;
        }
        result.push(key);
    }
    result
}

fn create_random_values(len: usize, rng: &mut impl Rng) -> Vec<u32> {
    (0..len).map(|_| rng.gen_range(0..16)).collect()
}

pub fn scan_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("Policy comparison");
    group.sample_size(10);
    group.sampling_mode(SamplingMode::Flat);

    for len in [100_000usize, 1_000_000, 10_000_000] {
        let mut rng = Hc128Rng::from_seed(*SEED);
        let keys = create_random_keys(len, 64, &mut rng);
        let values = create_random_values(len, &mut rng);
        let mut out = vec![0u32; len];

        group.bench_with_input(BenchmarkId::new("Inclusive/Par", len), &len, |b, _| {
            b.iter(|| {
                inclusive_scan_by_key(&par(), &keys, &values, &mut out[..]).unwrap();
            })
        });

        group.bench_with_input(BenchmarkId::new("Inclusive/Seq", len), &len, |b, _| {
            b.iter(|| {
                inclusive_scan_by_key(&seq(), &keys, &values, &mut out[..]).unwrap();
            })
        });

        group.bench_with_input(BenchmarkId::new("Exclusive/Par", len), &len, |b, _| {
            b.iter(|| {
                exclusive_scan_by_key(&par(), &keys, &values, &mut out[..]).unwrap();
            })
        });

        group.bench_with_input(BenchmarkId::new("Exclusive/Seq", len), &len, |b, _| {
            b.iter(|| {
                exclusive_scan_by_key(&seq(), &keys, &values, &mut out[..]).unwrap();
            })
        });
    }

    group.finish();
}

criterion_group!(benches, scan_comparison);
criterion_main!(benches);
