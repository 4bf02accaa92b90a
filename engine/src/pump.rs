//! Clock-driven cycle loop for a [`Broker`].
//!
//! A [`Pump`] owns a [`Time`] and turns frames into broker cycles: each frame it advances the
//! broker's delayed list and then flushes the pending queue.
//!
//! - **Variable** pumps advance delayed events by the frame delta once per frame.
//! - **Fixed** pumps advance them by the fixed step once per accumulated step, so delayed
//!   delivery is independent of the frame rate.
//!
//! ```rust,ignore
//! let mut pump = Pump::fixed(SIXTY_FPS);
//! loop {
//!     let cycle = pump.tick(&mut broker)?;
//!     // render, sleep, ...
//! }
//! ```

use std::time::Duration;

use crate::{
    broker::{Broker, Cycle},
    error::Result,
    event::Event,
    time::Time,
};

/// Drives a broker from a frame clock.
#[derive(Debug, Clone)]
pub struct Pump {
    time: Time,
}

impl Pump {
    /// A pump that advances delayed events by the whole frame delta each frame.
    pub fn variable() -> Self {
        Self {
            time: Time::new(Duration::ZERO),
        }
    }

    /// A pump that advances delayed events in fixed steps.
    pub fn fixed(step: Duration) -> Self {
        Self {
            time: Time::new(step),
        }
    }

    /// The clock of the last frame.
    #[inline]
    pub fn time(&self) -> &Time {
        &self.time
    }

    /// Run one cycle using the wall clock delta since the previous frame.
    pub fn tick<E: Event>(&mut self, broker: &mut Broker<E>) -> Result<Cycle> {
        self.time = self.time.next();
        self.run(broker)
    }

    /// Run one cycle for an explicit frame delta.
    pub fn step<E: Event>(&mut self, broker: &mut Broker<E>, delta: Duration) -> Result<Cycle> {
        self.time = self.time.advance(delta);
        self.run(broker)
    }

    /// Restart timing, e.g. after the loop was paused. Pending fixed steps are discarded.
    pub fn resume(&mut self) {
        self.time.reset_now();
    }

    fn run<E: Event>(&mut self, broker: &mut Broker<E>) -> Result<Cycle> {
        let mut promoted = 0;
        if self.time.fixed_time_step.is_zero() {
            promoted += broker.advance_time(self.time.delta.as_secs_f32())?;
        } else {
            let step = self.time.fixed_time_step.as_secs_f32();
            while self.time.has_fixed() {
                self.time.increment_fixed();
                promoted += broker.advance_time(step)?;
            }
        }
        let drained = broker.flush_queue()?;
        Ok(Cycle { promoted, drained })
    }
}

impl Default for Pump {
    fn default() -> Self {
        Self::fixed(crate::time::SIXTY_FPS)
    }
}
