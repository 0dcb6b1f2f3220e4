//! Frame bookkeeping.

use crate::limits::FRAMES_IN_FLIGHT;
use std::time::{Duration, Instant};

/// Tracks the global frame number and maps it onto frames in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameProvider {
    frame_number: u64,
}

impl FrameProvider {
    pub const fn new() -> Self {
        Self { frame_number: 0 }
    }

    /// Index of the per-frame resource copy used by the current frame.
    #[inline]
    pub const fn current_frame_index(&self) -> usize {
        (self.frame_number % FRAMES_IN_FLIGHT as u64) as usize
    }

    /// Total number of frames rendered so far.
    #[inline]
    pub const fn current_frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Advance to the next frame.
    #[inline]
    pub fn advance(&mut self) {
        self.frame_number += 1;
    }
}

/// Measures the time between frames.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    last: Instant,
    delta: Duration,
    /// Upper bound applied to the delta, so a stall does not teleport simulations.
    max_delta: Duration,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            last: start,
            delta: Duration::ZERO,
            max_delta: Duration::from_millis(250),
        }
    }

    #[must_use]
    pub const fn with_max_delta(mut self, max_delta: Duration) -> Self {
        self.max_delta = max_delta;
        self
    }

    /// Start a new frame and return the delta time in seconds.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    /// Start a new frame at the given instant and return the delta time in seconds.
    pub fn tick_at(&mut self, now: Instant) -> f32 {
        self.delta = now.saturating_duration_since(self.last).min(self.max_delta);
        self.last = now;
        self.delta_seconds()
    }

    /// Delta time of the last tick in seconds.
    #[inline]
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}
