//! A small headless game loop driven by a fixed-step pump.
//!
//! Run with `cargo run --example game_loop`.

use std::{cell::RefCell, rc::Rc, time::Duration};

use rusty_events::{Broker, Context, Event, Pump, Subscriber, time::SIXTY_FPS};

#[allow(dead_code)]
#[derive(Clone, Debug, Event)]
enum GameEvent {
    GameStart { start_time: f32 },
    GameEnd { time_elapsed: f32 },
    SoundCue { audio_event: i32 },
    CollisionEnter { a: u32, b: u32, contacts: u32 },
}

/// Plays a sound for every collision and reacts to the end of the game.
struct Audio {
    cues: u32,
}

impl Subscriber<GameEvent> for Audio {
    fn receive(&mut self, event: &GameEvent, ctx: &mut Context<'_, GameEvent>) {
        match event {
            GameEvent::CollisionEnter { a, b, .. } => {
                println!("collision between {a} and {b}, queueing a sound cue");
                ctx.enqueue(&GameEvent::SoundCue { audio_event: 7 });
            }
            GameEvent::SoundCue { audio_event } => {
                self.cues += 1;
                println!("playing sound {audio_event}");
            }
            GameEvent::GameEnd { time_elapsed } => {
                println!("game over after {time_elapsed}s, {} cues played", self.cues);
                ctx.unsubscribe_all();
            }
            GameEvent::GameStart { .. } => {}
        }
    }

    fn name(&self) -> &str {
        "audio"
    }
}

fn main() -> rusty_events::Result<()> {
    let mut broker = Broker::<GameEvent>::new();
    let audio = Rc::new(RefCell::new(Audio { cues: 0 }));
    broker.attach(
        &audio,
        [
            GameEventCategory::CollisionEnter,
            GameEventCategory::SoundCue,
            GameEventCategory::GameEnd,
        ],
    )?;

    broker.send(&GameEvent::GameStart { start_time: 0.0 })?;
    broker.schedule(
        &GameEvent::CollisionEnter {
            a: 1,
            b: 2,
            contacts: 3,
        },
        0.5,
    )?;
    broker.schedule(&GameEvent::GameEnd { time_elapsed: 1.0 }, 1.0)?;

    // Simulate two seconds of 30 fps frames on a 60 fps fixed step.
    let mut pump = Pump::fixed(SIXTY_FPS);
    for _ in 0..60 {
        let cycle = pump.step(&mut broker, Duration::from_millis(33))?;
        if cycle.drained > 0 {
            println!(
                "frame {}: {} matured, {} dispatched",
                pump.time().frame,
                cycle.promoted,
                cycle.drained
            );
        }
    }

    broker.teardown();
    Ok(())
}
