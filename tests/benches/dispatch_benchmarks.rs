//! # Dispatch Hot Path Benchmarks
//!
//! | Path | Work per call |
//! |------|---------------|
//! | Failure classification | walk of the error source chain |
//! | Subscriber lookup | registry enumeration for one address |
//! | Failure bookkeeping | increment, threshold check, reset |
//! | Per-subscriber copy | re-identify and encode one event |
//! | Fallback echo | build the outbound echo of an inbound event |

use std::io;

use cep_01_dispatch::{
    classify, DeliveryError, InMemorySubscriberRegistry, InboundFallbackLoop, SubscriberRegistry,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shared_bus::RoutedMessage;
use shared_types::CloudEvent;
use uuid::Uuid;

const ADDRESS: &str = "/cluster/node/worker-0/sync/ptp-status/lock-state";

fn sample_event() -> CloudEvent {
    CloudEvent::new(
        ADDRESS,
        "event.sync.ptp-status.ptp-state-change",
        Some(serde_json::json!({"state": "LOCKED", "offset": -12})),
    )
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");

    let refused = DeliveryError::connect(
        "http://u2/event",
        io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
    );
    let timeout = DeliveryError::timeout("http://u2/event");
    let status = DeliveryError::UnexpectedStatus {
        uri: "http://u2/event".into(),
        status: 500,
    };

    group.bench_function("connection_refused", |b| {
        b.iter(|| black_box(classify(black_box(&refused))))
    });
    group.bench_function("timeout", |b| {
        b.iter(|| black_box(classify(black_box(&timeout))))
    });
    group.bench_function("unexpected_status", |b| {
        b.iter(|| black_box(classify(black_box(&status))))
    });
    group.finish();
}

fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("subscriber_registry");

    for subscribers in [1usize, 10, 100] {
        let registry = InMemorySubscriberRegistry::new(10);
        for i in 0..subscribers {
            registry.subscribe(
                Uuid::new_v4(),
                Some(format!("http://consumer-{i}:9089/event")),
                ADDRESS,
            );
        }
        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::new("subscribers_by_resource", subscribers),
            &registry,
            |b, registry| b.iter(|| black_box(registry.subscribers_by_resource(ADDRESS))),
        );
    }

    let registry = InMemorySubscriberRegistry::new(u32::MAX);
    let client = Uuid::new_v4();
    registry.subscribe(client, Some("http://consumer:9089/event".into()), ADDRESS);
    group.bench_function("increment_and_reset", |b| {
        b.iter(|| {
            black_box(registry.increment_failure_and_check_threshold(client));
            registry.reset_failure_count(client);
        })
    });
    group.finish();
}

fn bench_per_subscriber_copy(c: &mut Criterion) {
    let event = sample_event();
    c.bench_function("reidentify_and_encode", |b| {
        b.iter(|| {
            let copy = event.with_id(Uuid::new_v4().to_string());
            black_box(copy.to_bytes())
        })
    });
}

fn bench_fallback_echo(c: &mut Criterion) {
    let raw = sample_event().to_bytes().unwrap_or_default();
    let msg = RoutedMessage::event(ADDRESS, raw);
    c.bench_function("fallback_echo", |b| {
        b.iter(|| black_box(InboundFallbackLoop::echo(black_box(&msg))))
    });
}

criterion_group!(
    benches,
    bench_classify,
    bench_registry,
    bench_per_subscriber_copy,
    bench_fallback_echo
);
criterion_main!(benches);
