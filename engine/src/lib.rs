//! Typed, in-process event dispatch for cycle-driven applications.
//!
//! Components subscribe to categories of an [`Event`] type on a [`Broker`]. Producers either
//! [`send`](Broker::send) events synchronously, [`enqueue`](Broker::enqueue) them for the end of
//! the current cycle, or [`schedule`](Broker::schedule) them after some seconds of elapsed time.
//! The driving loop pumps the broker once per cycle, directly or through a [`Pump`].
//!
//! ```rust,ignore
//! use std::{cell::RefCell, rc::Rc};
//! use rusty_events::{Broker, Context, Event, Subscriber};
//!
//! #[derive(Clone, Debug, Event)]
//! enum GameEvent {
//!     GameStart { start_time: f32 },
//!     GameEnd { time_elapsed: f32 },
//! }
//!
//! struct Scoreboard;
//!
//! impl Subscriber<GameEvent> for Scoreboard {
//!     fn receive(&mut self, event: &GameEvent, _ctx: &mut Context<'_, GameEvent>) {
//!         println!("{event:?}");
//!     }
//! }
//!
//! let mut broker = Broker::<GameEvent>::new();
//! let scoreboard = Rc::new(RefCell::new(Scoreboard));
//! broker.attach(&scoreboard, [GameEventCategory::GameEnd])?;
//!
//! broker.schedule(&GameEvent::GameEnd { time_elapsed: 2.0 }, 2.0)?;
//! broker.pump(1.0)?; // nothing yet
//! broker.pump(1.0)?; // GameEnd delivered
//! ```

// Allows `#[derive(Event)]` to name `::rusty_events` from inside this crate.
extern crate self as rusty_events;

pub mod broker;
pub mod config;
pub mod error;
pub mod event;
pub mod logger;
pub mod pump;
pub mod time;

pub use broker::{Broker, Context, Cycle, State, Subscriber, SubscriberId};
pub use config::Config;
pub use error::{Error, Result};
pub use event::{Category, Event, Field, Registry};
pub use pump::Pump;
pub use time::Time;

pub use rusty_events_macros::Event;
