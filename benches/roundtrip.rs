//! Benchmarks for generation and verification
//!
//! Run with: cargo bench --bench roundtrip
//!
//! Measures instance generation alone, one codec at a time, and the full
//! selection → generation → verification path per kind.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use schema_roundtrip::model::{Service, Status, Table};
use schema_roundtrip::{CodecKind, Harness, HarnessBuilder, HarnessConfig, Object};
use std::hint::black_box;

const INPUT_LEN: usize = 8192;

/// Deterministic pseudo-random input (xorshift32).
fn input(seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9E37_79B9) | 1;
    (0..INPUT_LEN)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

fn harness_with(codecs: Vec<CodecKind>) -> Harness {
    HarnessBuilder::new()
        .with_config(HarnessConfig {
            codecs,
            ..HarnessConfig::default()
        })
        .build()
        .expect("default harness")
}

fn bench_generate<T: Object>(c: &mut Criterion, harness: &Harness) {
    let data = input(1);
    c.bench_function(&format!("generate_{}", T::type_name()), |b| {
        b.iter(|| {
            let _ = black_box(harness.generate::<T>(black_box(&data)));
        });
    });
}

fn bench_generation(c: &mut Criterion) {
    let harness = harness_with(vec![CodecKind::Json]);
    bench_generate::<Status>(c, &harness);
    bench_generate::<Table>(c, &harness);
    bench_generate::<Service>(c, &harness);
}

fn bench_codecs(c: &mut Criterion) {
    let mut group = c.benchmark_group("verify_service");
    let data = input(2);
    for codec in [CodecKind::Json, CodecKind::Binary] {
        let harness = harness_with(vec![codec]);
        let mut service = harness.generate::<Service>(&data).unwrap_or_default();
        if let Some(gvk) = harness.scheme().external_kind_for::<Service>() {
            *service.type_meta_mut() = gvk.to_type_meta();
        }
        group.bench_with_input(BenchmarkId::from_parameter(codec), &service, |b, service| {
            b.iter(|| {
                let _ = black_box(harness.verify_object(black_box(service), None));
            });
        });
    }
    group.finish();
}

fn bench_verify_by_kind(c: &mut Criterion) {
    let harness = harness_with(vec![CodecKind::Json, CodecKind::Binary]);
    let kinds: Vec<String> = harness
        .selectable_kinds()
        .iter()
        .map(|gvk| format!("{}_{}", gvk.version, gvk.kind))
        .collect();
    let data = input(3);

    let mut group = c.benchmark_group("verify");
    group.throughput(Throughput::Bytes(INPUT_LEN as u64));
    for (index, kind) in kinds.iter().enumerate() {
        group.bench_with_input(BenchmarkId::from_parameter(kind), &index, |b, &index| {
            b.iter(|| {
                let _ = black_box(harness.verify(black_box(&data), index));
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_generation,
    bench_codecs,
    bench_verify_by_kind
);
criterion_main!(benches);
