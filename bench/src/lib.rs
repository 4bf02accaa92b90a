//! Benchmark utilities for the event broker.
//!
//! ```bash
//! cargo bench -p rusty_events_bench
//! cargo bench -p rusty_events_bench -- flush
//! ```
//!
//! Results are written to `target/criterion/` with HTML reports.

use std::{cell::RefCell, rc::Rc};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rusty_events::{Broker, Category, Context, Event, Subscriber};

#[derive(Clone, Debug, Event)]
pub enum BenchEvent {
    Tick(u64),
    Collision { a: u32, b: u32, contacts: u32 },
    Sound { audio_event: i32 },
}

/// Counts deliveries. Optionally answers every collision with a queued sound.
#[derive(Default)]
pub struct Counter {
    pub received: u64,
    pub echo: bool,
}

impl Subscriber<BenchEvent> for Counter {
    fn receive(&mut self, event: &BenchEvent, ctx: &mut Context<'_, BenchEvent>) {
        self.received += 1;
        if self.echo {
            if let BenchEvent::Collision { contacts, .. } = event {
                ctx.enqueue(&BenchEvent::Sound {
                    audio_event: *contacts as i32,
                });
            }
        }
    }
}

/// A broker with `count` counters subscribed to every category. The handles must outlive the
/// broker's use.
pub fn broker_with_counters(
    count: usize,
    echo: bool,
) -> (Broker<BenchEvent>, Vec<Rc<RefCell<Counter>>>) {
    let mut broker = Broker::new();
    let counters: Vec<_> = (0..count)
        .map(|_| {
            Rc::new(RefCell::new(Counter {
                received: 0,
                echo,
            }))
        })
        .collect();
    for counter in &counters {
        broker
            .attach(counter, BenchEventCategory::all())
            .expect("fresh broker accepts subscribers");
    }
    (broker, counters)
}

/// Seeded random collisions paired with delays in `0..max_delay` seconds.
pub fn random_schedule(seed: u64, count: usize, max_delay: f32) -> Vec<(BenchEvent, f32)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let event = BenchEvent::Collision {
                a: rng.gen_range(0..1_000),
                b: rng.gen_range(0..1_000),
                contacts: rng.gen_range(1..8),
            };
            (event, rng.gen_range(0.0..max_delay))
        })
        .collect()
}
