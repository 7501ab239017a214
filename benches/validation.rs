//! Benchmarks for path validation.
//!
//! Run with: `cargo bench --bench validation`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};

use path_validator::core::hash::chained_digest;
use path_validator::core::path::Path;
use path_validator::validator::SpeedPolicy;
use path_validator::{
    AccountId, HashScheme, InMemoryLedger, PathValidator, SampleLayout, ValidatorConfig,
};

/// Unit-step path with `samples` samples.
fn walk(samples: usize) -> Vec<u8> {
    (0..samples).flat_map(|i| (i as u16).to_be_bytes()).collect()
}

/// Seeded random bytes; the digest does not care about path shape.
fn noise(len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}

fn bench_digest(c: &mut Criterion) {
    let mut group = c.benchmark_group("chained_digest");

    for samples in [64, 1024, 16384] {
        let path = noise(samples * 2);
        group.throughput(Throughput::Bytes(path.len() as u64));

        for scheme in [HashScheme::Keccak256, HashScheme::Sha256] {
            group.bench_with_input(BenchmarkId::new(scheme.as_str(), samples), &path, |b, path| {
                b.iter(|| chained_digest(scheme, black_box(path)))
            });
        }
    }

    group.finish();
}

fn bench_speed(c: &mut Criterion) {
    let mut group = c.benchmark_group("speed_evaluate");

    for samples in [64, 1024, 16384] {
        let bytes = walk(samples);
        group.throughput(Throughput::Elements(samples as u64));

        for layout in [SampleLayout::Scalar, SampleLayout::Planar] {
            let policy = SpeedPolicy::new(1, layout);
            group.bench_with_input(BenchmarkId::new(layout.as_str(), samples), &bytes, |b, bytes| {
                b.iter(|| {
                    let path = Path::parse(black_box(bytes)).unwrap();
                    policy.evaluate(&path)
                })
            });
        }
    }

    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let config = ValidatorConfig { fee: 0, ..Default::default() };
    let validator = PathValidator::new(&config, Arc::new(InMemoryLedger::new()));
    let payer = AccountId::derive("bench");
    let path = walk(1024);
    let proof = chained_digest(config.hash_scheme, &path).unwrap();

    c.bench_function("validate_1024_samples", |b| {
        b.iter(|| validator.validate(&payer, black_box(&proof), black_box(&path)))
    });
}

criterion_group!(benches, bench_digest, bench_speed, bench_validate);
criterion_main!(benches);
