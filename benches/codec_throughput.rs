//! Benchmarks for the wire path
//!
//! Measures:
//! - Batch encode and decode at several batch sizes
//! - Header decode
//! - Framed send and receive over an in-memory duplex pipe
//!
//! Platform: Cross-platform (no sockets, CI-safe)

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use gazestream::protocol::{codec, frame};
use gazestream::{Batch, Connection, GazeRecord};
use std::hint::black_box;

fn sample_batch(len: u64) -> Batch {
    (0..len)
        .map(|n| GazeRecord {
            sequence_number: n,
            capture_time_seconds: 1_700_000_000 + n,
            capture_time_subsecond: (n % 1000) as u32,
            eye_id: n % 2 == 0,
            confidence: 1.0,
            gaze_x: 0.25,
            gaze_y: 0.75,
            pupil_diameter: (n % 100) as u32,
        })
        .collect()
}

const BATCH_SIZES: [u64; 3] = [1, 10, 1000];

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_encode");
    for len in BATCH_SIZES {
        let batch = sample_batch(len);
        group.throughput(Throughput::Bytes(codec::encoded_len(batch.len()) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &batch, |b, batch| {
            b.iter(|| black_box(codec::encode(black_box(batch))))
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_decode");
    for len in BATCH_SIZES {
        let payload = codec::encode(&sample_batch(len));
        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &payload, |b, payload| {
            b.iter(|| black_box(codec::decode(black_box(payload))))
        });
    }
    group.finish();
}

fn bench_header(c: &mut Criterion) {
    let header = frame::encode_header(codec::encoded_len(1000)).unwrap();
    c.bench_function("decode_header", |b| b.iter(|| black_box(frame::decode_header(black_box(&header)))));
}

fn bench_connection_round_trip(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    let batch = sample_batch(10);

    let (a, b) = tokio::io::duplex(64 * 1024);
    let mut tx = Connection::new(a, "bench-tx");
    let mut rx = Connection::new(b, "bench-rx");

    let mut group = c.benchmark_group("connection");
    group.throughput(Throughput::Elements(batch.len() as u64));
    group.bench_function("send_receive_10", |bencher| {
        bencher.iter(|| {
            runtime.block_on(async {
                tx.send(&batch).await.unwrap();
                black_box(rx.receive().await.unwrap())
            })
        })
    });
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_header, bench_connection_round_trip);
criterion_main!(benches);
