use std::collections::VecDeque;

use crate::error::{Error, Result};

/// Delays must be finite and not negative. Zero is valid and means "enqueue".
pub(crate) fn check_delay(delay: f32) -> Result<()> {
    if delay.is_finite() && delay >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidDelay { delay })
    }
}

pub(crate) fn check_time_step(dt: f32) -> Result<()> {
    if dt.is_finite() && dt >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidTimeStep { dt })
    }
}

/// Slack allowed when comparing the clock against a due time, so that time steps summing to a
/// delay mature the event despite `f32` rounding.
const MATURITY_TOLERANCE: f64 = 1e-6;

struct Delayed<E> {
    event: E,
    /// Clock reading at which the event matures.
    due: f64,
}

/// Events waiting for a countdown, kept in the order they were scheduled.
///
/// The list keeps its own clock of elapsed seconds and stores an absolute due time per entry,
/// so maturity depends on the total time advanced rather than on a chain of per-step
/// subtractions.
pub(crate) struct DelayedList<E> {
    entries: Vec<Delayed<E>>,
    elapsed: f64,
}

impl<E> DelayedList<E> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            elapsed: 0.0,
        }
    }

    pub(crate) fn push(&mut self, event: E, delay: f32) {
        self.entries.push(Delayed {
            event,
            due: self.elapsed + f64::from(delay),
        });
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drop every entry without maturing it and reset the clock. Returns how many were dropped.
    pub(crate) fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.elapsed = 0.0;
        count
    }

    /// Advance the clock by `dt` and move every entry now due onto the back of `matured`, in
    /// schedule order. Survivors keep their relative order.
    pub(crate) fn advance(&mut self, dt: f32, matured: &mut VecDeque<E>) -> usize {
        self.elapsed += f64::from(dt);
        let now = self.elapsed + MATURITY_TOLERANCE;
        let before = matured.len();
        let entries = std::mem::take(&mut self.entries);
        self.entries.reserve(entries.len());
        for entry in entries {
            if entry.due <= now {
                matured.push_back(entry.event);
            } else {
                self.entries.push(entry);
            }
        }
        matured.len() - before
    }
}
