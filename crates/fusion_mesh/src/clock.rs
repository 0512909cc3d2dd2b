//! Time source for regeneration cost tracking.

use std::cell::Cell;

// WASM compat: std::time::Instant panics on wasm32
use web_time::Instant;

/// Monotonic millisecond clock.
pub trait Clock {
  /// Milliseconds since an arbitrary fixed origin.
  fn now_ms(&self) -> f64;
}

/// Wall clock measured from construction.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
  start: Instant,
}

impl SystemClock {
  pub fn new() -> Self {
    Self {
      start: Instant::now(),
    }
  }
}

impl Default for SystemClock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock for SystemClock {
  fn now_ms(&self) -> f64 {
    self.start.elapsed().as_secs_f64() * 1000.0
  }
}

/// Clock advanced by hand, for deterministic runs.
#[derive(Debug, Default)]
pub struct ManualClock {
  now: Cell<f64>,
  /// Added after every read, so each reading advances time.
  step: f64,
}

impl ManualClock {
  pub fn new() -> Self {
    Self::default()
  }

  /// Clock that advances `step_ms` every time it is read.
  pub fn stepping(step_ms: f64) -> Self {
    Self {
      now: Cell::new(0.0),
      step: step_ms,
    }
  }

  pub fn advance(&self, ms: f64) {
    self.now.set(self.now.get() + ms);
  }

  pub fn set(&self, ms: f64) {
    self.now.set(ms);
  }
}

impl Clock for ManualClock {
  fn now_ms(&self) -> f64 {
    let now = self.now.get();
    self.now.set(now + self.step);
    now
  }
}
