//! Broker benchmarks using Criterion.
//!
//! - Synchronous send fan-out across subscriber counts
//! - Queue flush throughput, with and without subscriber feedback
//! - Delayed list maturation under seeded random delays

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rusty_events_bench::{BenchEvent, broker_with_counters, random_schedule};

fn bench_send(c: &mut Criterion) {
    let mut group = c.benchmark_group("send");

    for subscribers in [1, 16, 256] {
        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::new("fan_out", subscribers),
            &subscribers,
            |b, &n| {
                let (mut broker, _counters) = broker_with_counters(n, false);
                let mut frame = 0;
                b.iter(|| {
                    frame += 1;
                    black_box(broker.send(&BenchEvent::Tick(frame)).unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("flush");

    for events in [100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(events as u64));

        group.bench_with_input(BenchmarkId::new("drain", events), &events, |b, &n| {
            let (mut broker, _counters) = broker_with_counters(4, false);
            b.iter(|| {
                for i in 0..n {
                    broker.enqueue(&BenchEvent::Tick(i as u64)).unwrap();
                }
                black_box(broker.flush_queue().unwrap());
            });
        });

        group.bench_with_input(BenchmarkId::new("echo", events), &events, |b, &n| {
            let (mut broker, _counters) = broker_with_counters(4, true);
            b.iter(|| {
                for i in 0..n {
                    broker
                        .enqueue(&BenchEvent::Collision {
                            a: i as u32,
                            b: 0,
                            contacts: 1,
                        })
                        .unwrap();
                }
                black_box(broker.flush_queue().unwrap());
            });
        });
    }

    group.finish();
}

fn bench_advance_time(c: &mut Criterion) {
    let mut group = c.benchmark_group("advance_time");

    for events in [100, 1_000, 10_000] {
        let schedule = random_schedule(12345, events, 1.0);
        group.throughput(Throughput::Elements(events as u64));
        group.bench_with_input(
            BenchmarkId::new("one_second_at_60fps", events),
            &schedule,
            |b, schedule| {
                let (mut broker, _counters) = broker_with_counters(1, false);
                b.iter(|| {
                    for (event, delay) in schedule {
                        broker.schedule(event, *delay).unwrap();
                    }
                    let mut matured = 0;
                    while broker.delayed_len() > 0 {
                        matured += broker.pump(1.0 / 60.0).unwrap().promoted;
                    }
                    black_box(matured);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_send, bench_flush, bench_advance_time);
criterion_main!(benches);
