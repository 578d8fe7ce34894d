//! A monotonic start/stop/elapsed timer (spec.md §4.1), the primitive
//! every checker and the transition FSM build on.

use std::time::{Duration, Instant};

/// Anything that can stand in for `Instant::now()`. Production code
/// uses [`SystemClock`]; tests inject a manual clock so the FSM and
/// checker tests don't sleep real wall-clock time (SPEC_FULL.md §5).
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// `start()` records t0; `stop()` records t1; `elapsed_seconds()`
/// returns `t1 - t0` once stopped, else `now - t0`.
pub struct MonotonicTimer<C: Clock = SystemClock> {
    clock: C,
    start: Option<Instant>,
    stop: Option<Instant>,
}

impl MonotonicTimer<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MonotonicTimer<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MonotonicTimer<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            start: None,
            stop: None,
        }
    }

    pub fn start(&mut self) {
        self.start = Some(self.clock.now());
        self.stop = None;
    }

    pub fn stop(&mut self) {
        self.stop = Some(self.clock.now());
    }

    pub fn is_running(&self) -> bool {
        self.start.is_some() && self.stop.is_none()
    }

    /// `0.0` if never started.
    pub fn elapsed_seconds(&self) -> f32 {
        let Some(start) = self.start else {
            return 0.0;
        };
        let end = self.stop.unwrap_or_else(|| self.clock.now());
        end.saturating_duration_since(start).as_secs_f32()
    }

    pub fn elapsed(&self) -> Duration {
        let Some(start) = self.start else {
            return Duration::ZERO;
        };
        let end = self.stop.unwrap_or_else(|| self.clock.now());
        end.saturating_duration_since(start)
    }
}
