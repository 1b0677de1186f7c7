//! # Host Bridge Benchmarks
//!
//! Hot paths of a single call:
//!
//! | Path | What runs |
//! |------|-----------|
//! | envelope | encode and decode of a request envelope |
//! | pool | pooled encode versus a fresh buffer |
//! | transport | base64 framing through the engine bridge |
//! | registry | push and drain of operation events |

use bridge_runtime::features::ad::{AdReward, ShowAdEvent, ShowAdEventKind};
use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hb_01_wire_codec::{BufferPool, Message};
use hb_02_transport_bridge::{EngineBridge, HostDispatch, TransportConfig};
use hb_03_rpc_multiplexer::Envelope;
use hb_04_operation_registry::OperationRegistry;
use shared_types::CorrelationId;
use std::sync::Arc;
use std::time::Duration;

struct NullHost;

impl HostDispatch for NullHost {
    fn dispatch_event(&self, _event_name: &str, payload: &str) {
        black_box(payload.len());
    }
}

fn envelope(size: usize) -> Envelope {
    Envelope::request(
        CorrelationId::new().to_string(),
        "StorageService.SetItem",
        Bytes::from(vec![0xAB; size]),
    )
}

fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope");

    for size in [0usize, 64, 1024, 16 * 1024] {
        let request = envelope(size);
        let encoded = request.encode_to_vec();

        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(BenchmarkId::new("encode", size), &request, |b, request| {
            b.iter(|| black_box(request.encode_to_vec()))
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &encoded, |b, encoded| {
            b.iter(|| black_box(Envelope::decode(encoded).map(|e| e.payload.len())))
        });
    }

    group.finish();
}

fn bench_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool");
    let request = envelope(1024);
    let pool = BufferPool::new(8);

    group.bench_function("pooled_encode", |b| {
        b.iter(|| pool.with_encoded(&request, |bytes| black_box(bytes.len())))
    });
    group.bench_function("fresh_encode", |b| {
        b.iter(|| black_box(request.encode_to_vec().len()))
    });

    group.finish();
}

fn bench_transport(c: &mut Criterion) {
    let mut group = c.benchmark_group("transport");
    let bridge = EngineBridge::new(TransportConfig::default());
    bridge.connect_host(Arc::new(NullHost));

    for size in [64usize, 1024, 16 * 1024] {
        let payload = vec![0x5A; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("send_to_host", size), &payload, |b, payload| {
            b.iter(|| bridge.send_to_host(black_box(payload)))
        });
    }

    group.finish();
}

fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");
    let registry = OperationRegistry::<ShowAdEvent>::new(Duration::from_secs(600));

    for batch in [1usize, 10, 100] {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::new("push_then_poll", batch), &batch, |b, &batch| {
            b.iter(|| {
                let (id, sink) = registry.start();
                for i in 0..batch {
                    sink.emit(ShowAdEvent::new(ShowAdEventKind::UserEarnedReward(AdReward {
                        unit_type: "coins".to_string(),
                        unit_amount: i as i32,
                    })));
                }
                sink.finish();
                black_box(registry.poll(&id).events.len())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_envelope, bench_pool, bench_transport, bench_registry);
criterion_main!(benches);
