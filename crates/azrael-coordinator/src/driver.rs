//! Wall-clock pacing for the tick loop (§4.6, §9).
//!
//! Grounded in `nebula-app::game_loop::GameLoop`'s accumulator, but
//! deliberately without its catch-up behaviour: a physics coordinator that
//! falls behind wall-clock should run one tick at its configured `dt` and
//! let the simulation clock slip, not replay a backlog of ticks in a burst
//! (replaying N ticks back-to-back would create N work packages at once,
//! defeating the point of pacing the worker pool at a fixed rate). This is
//! an explicit deviation from a renderer-facing frame loop's usual
//! catch-up behaviour.

use std::time::{Duration, Instant};

use tracing::warn;

use crate::coordinator::{Coordinator, TickReport};

/// Drives a [`Coordinator`] at a fixed wall-clock period, capped at one tick
/// per call to [`TickDriver::poll`] regardless of how much time has elapsed.
pub struct TickDriver {
    period: Duration,
    previous_time: Instant,
    accumulator: Duration,
}

impl TickDriver {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            previous_time: Instant::now(),
            accumulator: Duration::ZERO,
        }
    }

    /// Measures elapsed wall-clock time and runs at most one tick if a full
    /// period has accumulated. Returns `None` if the period hasn't elapsed
    /// yet.
    ///
    /// Unlike a render loop's accumulator, the remainder is *not* carried
    /// forward across more than one period: if the caller is so far behind
    /// that more than `period` has accumulated, the excess is dropped so a
    /// single slow call can't trigger a burst of back-to-back ticks.
    pub fn poll(&mut self, coordinator: &mut Coordinator) -> Option<TickReport> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.previous_time);
        self.previous_time = now;
        self.accumulator += elapsed;

        if self.accumulator < self.period {
            return None;
        }

        if self.accumulator > self.period * 2 {
            warn!(
                behind_ms = (self.accumulator - self.period).as_millis(),
                "tick driver fell behind wall clock, dropping backlog instead of catching up"
            );
        }
        self.accumulator = Duration::ZERO;

        Some(coordinator.tick())
    }
}
