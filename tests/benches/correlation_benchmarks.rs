//! # Booking Bridge Benchmarks
//!
//! | Path | Target |
//! |------|--------|
//! | Validation of a booking parameter set | < 1µs |
//! | Register + resolve one waiter | < 5µs |
//! | Full round trip over the in-memory backbone | < 1ms |

use booking_gateway::{
    validate, CorrelationId, CorrelationRegistry, Operation, Params, ResponseEnvelope,
};
use booking_tests::harness::{always, test_config, Harness, Reply};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn booking_params() -> Params {
    let mut params = Params::new();
    params.insert("userId".into(), "user-1".into());
    params.insert("scheduleSlotId".into(), "slot-1".into());
    params.insert("peopleQuantity".into(), "2".into());
    params
}

fn bench_validation(c: &mut Criterion) {
    let params = booking_params();
    c.bench_function("validate_book_schedule_slot", |b| {
        b.iter(|| black_box(validate(Operation::BookScheduleSlot, black_box(&params)).is_ok()))
    });
}

fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation-registry");

    for outstanding in [0usize, 1_000, 10_000] {
        let registry = Arc::new(CorrelationRegistry::new());
        let deadline = Instant::now() + Duration::from_secs(3_600);
        let _background: Vec<_> = (0..outstanding)
            .map(|_| {
                registry
                    .register(CorrelationId::new(), deadline, Operation::AllScheduleSlots)
                    .unwrap()
            })
            .collect();

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("register_resolve", outstanding),
            &outstanding,
            |b, _| {
                b.iter(|| {
                    let id = CorrelationId::new();
                    let waiter = registry
                        .register(id, deadline, Operation::AllScheduleSlots)
                        .unwrap();
                    registry.resolve(ResponseEnvelope::new(id, None));
                    black_box(waiter);
                })
            },
        );
    }

    group.finish();
}

fn bench_round_trip(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let harness = rt
        .block_on(Harness::start(
            test_config(Duration::from_secs(5)),
            always(Reply::Json(json!({"a": 1}))),
        ))
        .unwrap();
    let handler = harness.bridge.handler();
    let params = Params::new();

    c.bench_function("round_trip_in_memory", |b| {
        b.to_async(&rt).iter(|| {
            let handler = Arc::clone(&handler);
            let params = params.clone();
            async move { black_box(handler.all_schedule_slots(&params).await.is_ok()) }
        })
    });
}

criterion_group!(benches, bench_validation, bench_registry, bench_round_trip);
criterion_main!(benches);
