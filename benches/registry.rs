//! Benchmarks for the proximity registry hot path.
//!
//! Every batch from the scanner goes through `update`, which merges,
//! evicts, re-ranks and publishes under one lock, so its cost grows with the
//! number of tracked beacons rather than the batch size alone.

use beacon_proximity::{
    ProximityRegistry, RawReading, RegistryConfig, Timestamp, decode_ibeacon, ranking,
};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

const TEST_UUID: &str = "f7826da6-4fa2-4e98-8024-bc5b71e0893e";

fn reading(minor: u16, distance: f64) -> RawReading {
    RawReading {
        origin_id: TEST_UUID.to_string(),
        group_id: 1,
        sub_id: i32::from(minor),
        signal_strength: -70,
        reference_tx_power: -59,
        estimated_distance: distance,
    }
}

/// A batch where every beacon reports, in reverse distance order
fn batch(beacons: u16) -> Vec<RawReading> {
    (0..beacons)
        .map(|minor| reading(minor, f64::from(beacons - minor) * 0.25))
        .collect()
}

/// Example iBeacon manufacturer payload (major 1, minor 46, -59 dBm)
fn ibeacon_payload() -> Vec<u8> {
    let mut data = vec![0x02, 0x15];
    data.extend_from_slice(&[
        0xF7, 0x82, 0x6D, 0xA6, 0x4F, 0xA2, 0x4E, 0x98, 0x80, 0x24, 0xBC, 0x5B, 0x71, 0xE0, 0x89,
        0x3E,
    ]);
    data.extend_from_slice(&[0x00, 0x01, 0x00, 0x2E, 0xC5]);
    data
}

/// Benchmark merging a full batch into a registry already tracking the same beacons
fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_update");

    for beacons in [1u16, 10, 100] {
        let readings = batch(beacons);
        group.throughput(Throughput::Elements(u64::from(beacons)));
        group.bench_with_input(BenchmarkId::from_parameter(beacons), &readings, |b, readings| {
            let registry = ProximityRegistry::new(RegistryConfig::default()).unwrap();
            registry.update(readings, Timestamp::ZERO);
            let mut now = 0u64;

            b.iter(|| {
                now += 1;
                let summary = registry.update(black_box(readings), Timestamp::from_millis(now));
                black_box(summary)
            })
        });
    }

    group.finish();
}

/// Benchmark a sweep that evicts every tracked beacon
fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_sweep");

    for beacons in [10u16, 100] {
        let readings = batch(beacons);
        group.throughput(Throughput::Elements(u64::from(beacons)));
        group.bench_with_input(BenchmarkId::from_parameter(beacons), &readings, |b, readings| {
            b.iter(|| {
                let registry = ProximityRegistry::new(RegistryConfig::default()).unwrap();
                registry.update(readings, Timestamp::ZERO);
                let evicted = registry.sweep_expired(Timestamp::from_millis(60_000));
                black_box(evicted)
            })
        });
    }

    group.finish();
}

/// Benchmark ranking in isolation
fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");

    let registry = ProximityRegistry::new(RegistryConfig::default()).unwrap();
    registry.update(&batch(100), Timestamp::ZERO);
    let entries = registry.snapshot().ranked().to_vec();

    group.throughput(Throughput::Elements(100));
    group.bench_function("100_beacons", |b| {
        b.iter(|| black_box(ranking::rank(black_box(&entries))))
    });

    group.finish();
}

/// Benchmark decoding a manufacturer payload into a reading
fn bench_decode(c: &mut Criterion) {
    let payload = ibeacon_payload();
    c.bench_function("decode_ibeacon", |b| {
        b.iter(|| black_box(decode_ibeacon(black_box(&payload), black_box(-65))))
    });
}

criterion_group!(benches, bench_update, bench_sweep, bench_rank, bench_decode);
criterion_main!(benches);
