//! Tick Sources
//!
//! The director advances its virtual clock one fixed step at a time. A
//! [`FixedRateClock`] paces those steps in real time; a [`SteppedClock`]
//! returns immediately so tests can run whole interactions instantly.

use std::thread;
use std::time::{Duration, Instant};

/// Provides the next tick of a fixed-step clock.
pub trait TickSource: Send {
    /// Waits for the next tick and returns its length in seconds.
    fn tick(&mut self) -> f32;

    /// Length of one tick in seconds.
    fn dt(&self) -> f32;
}

/// Sleeps until each fixed tick boundary.
#[derive(Debug)]
pub struct FixedRateClock {
    period: Duration,
    next: Instant,
}

impl FixedRateClock {
    pub fn new(tick_rate: u32) -> Self {
        let period = Duration::from_secs_f64(1.0 / f64::from(tick_rate.max(1)));
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl TickSource for FixedRateClock {
    fn tick(&mut self) -> f32 {
        let now = Instant::now();
        if self.next > now {
            thread::sleep(self.next - now);
            self.next += self.period;
        } else {
            // Fell behind: start a fresh schedule instead of bursting.
            self.next = now + self.period;
        }
        self.dt()
    }

    fn dt(&self) -> f32 {
        self.period.as_secs_f32()
    }
}

/// Returns a fixed dt without sleeping.
#[derive(Debug, Clone)]
pub struct SteppedClock {
    dt: f32,
    ticks: u64,
}

impl SteppedClock {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            dt: 1.0 / tick_rate.max(1) as f32,
            ticks: 0,
        }
    }

    /// Ticks taken so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl TickSource for SteppedClock {
    fn tick(&mut self) -> f32 {
        self.ticks += 1;
        self.dt
    }

    fn dt(&self) -> f32 {
        self.dt
    }
}
