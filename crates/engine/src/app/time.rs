use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time source. `now` is measured from an arbitrary fixed origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        Instant::now().saturating_duration_since(self.origin)
    }
}

/// Hand-driven clock. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, delta: Duration) {
        self.now.set(self.now.get().saturating_add(delta));
    }

    pub fn advance_secs(&self, seconds: f64) {
        self.advance(Duration::from_secs_f64(seconds));
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

pub struct Time {
    clock: Box<dyn Clock>,
    last: Duration,
    delta: Duration,
    elapsed_seconds: f64,
}

impl fmt::Debug for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Time")
            .field("last", &self.last)
            .field("delta", &self.delta)
            .field("elapsed_seconds", &self.elapsed_seconds)
            .finish()
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::with_clock(Box::new(MonotonicClock::default()))
    }
}

impl Time {
    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            last: Duration::ZERO,
            delta: Duration::ZERO,
            elapsed_seconds: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.last = self.clock.now();
        self.delta = Duration::ZERO;
        self.elapsed_seconds = 0.0;
    }

    /// Samples the clock. The first call after `reset` reports the gap since
    /// the reset, not zero.
    pub fn update(&mut self) {
        let now = self.clock.now();
        self.delta = now.saturating_sub(self.last);
        self.elapsed_seconds += self.delta.as_secs_f64();
        self.last = now;
    }

    /// Frame delta at clock resolution.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }
}
