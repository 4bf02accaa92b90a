use std::time::{Duration, Instant};

/// Fixed step of a sixty frames per second loop.
pub const SIXTY_FPS: Duration = Duration::from_nanos(16_666_666);

/// A `Time` represents a specific amount of time elapsed within a cycle loop for a single
/// frame. Each frame captures total elapsed time as well as the delta time since the last frame.
/// New frames are intended to be generated from a previous frame using the `next()` method, or
/// `advance()` when the caller supplies the delta itself (replays, tests, headless runs).
#[derive(Debug, Copy, Clone)]
pub struct Time {
    // The instant when this frame was created
    instant: Instant,
    /// Step of fixed frames. `Duration::ZERO` disables fixed frames.
    pub fixed_time_step: Duration,
    /// The time delta since the last frame
    pub delta: Duration,
    /// The total elapsed time since the first frame
    pub time: Duration,
    /// The total elapsed time since the first frame but incremented by the fixed time step
    pub fixed_time: Duration,
    /// Number of frames since the first frame
    pub frame: u64,
    /// An accumulator for fixed time step calculations
    accumulator: Duration,
}

impl Time {
    /// Construct a new `Time` with delta and time set to `0`.
    pub fn new(fixed_time_step: Duration) -> Self {
        Self {
            instant: Instant::now(),
            fixed_time_step,
            delta: Duration::ZERO,
            time: Duration::ZERO,
            fixed_time: Duration::ZERO,
            frame: 0,
            accumulator: Duration::ZERO,
        }
    }

    /// Create the next frame from the wall clock. This will capture the delta from the last
    /// frame and update the cumulative time.
    pub fn next(self) -> Self {
        let delta = self.instant.elapsed();
        Self {
            instant: Instant::now(),
            ..self.advance(delta)
        }
    }

    /// Create the next frame with an explicit delta.
    pub fn advance(self, delta: Duration) -> Self {
        Self {
            delta,
            time: self.time + delta,
            frame: self.frame + 1,
            accumulator: self.accumulator + delta,
            ..self
        }
    }

    /// Determine whether this frame has accumulated enough delta for a fixed frame.
    pub fn has_fixed(&self) -> bool {
        !self.fixed_time_step.is_zero() && self.accumulator >= self.fixed_time_step
    }

    /// Increment the fixed frame time accumulation
    pub fn increment_fixed(&mut self) {
        self.fixed_time += self.fixed_time_step;
        self.accumulator -= self.fixed_time_step;
    }

    /// Reset the time frame to now with zeroed accumulator. This is useful for situations where
    /// the loop is paused and resumed.
    pub fn reset_now(&mut self) {
        self.instant = Instant::now();
        self.accumulator = Duration::ZERO;
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new(SIXTY_FPS)
    }
}
