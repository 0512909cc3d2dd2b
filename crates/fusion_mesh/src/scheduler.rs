//! RemeshScheduler - amortizes cube regeneration across ticks.
//!
//! Dirty cubes wait in a FIFO queue (each key at most once). Every tick
//! starts as many regenerations as the time budget allows, based on an
//! exponentially smoothed per-cube cost:
//!
//! ```text
//! max_per_tick = max(1, floor(budget_ms / smoothed_cost_ms))   (1 while no data)
//! smoothed     = smoothed * alpha + (1 - alpha) * cost          (per cube)
//! ```
//!
//! The budget limits how many cubes are *started*; a single slow cube can
//! still overrun it.

use std::collections::{HashSet, VecDeque};

use crate::clock::Clock;
use crate::constants::DEFAULT_COST_SMOOTHING;
use crate::types::CubeKey;

/// Smoothed costs at or below this are treated as "no data yet".
const MIN_COST_MS: f64 = 1e-6;

/// Statistics from one scheduler tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickStats {
  /// Cubes regenerated this tick.
  pub regenerated: usize,
  /// Queued keys whose cube no longer existed.
  pub skipped: usize,
  /// Cap computed from the budget at the start of the tick.
  pub max_per_tick: usize,
  /// Time spent regenerating in milliseconds.
  pub elapsed_ms: f64,
  /// Keys still queued afterwards.
  pub pending: usize,
}

/// Dirty-cube queue with a rolling cost estimate.
#[derive(Debug, Clone)]
pub struct RemeshScheduler {
  queue: VecDeque<CubeKey>,
  queued: HashSet<CubeKey>,
  smoothed_cost_ms: f64,
  alpha: f64,
}

impl RemeshScheduler {
  /// Scheduler with smoothing factor `alpha` in `[0, 1)`.
  pub fn new(alpha: f64) -> Self {
    Self {
      queue: VecDeque::new(),
      queued: HashSet::new(),
      smoothed_cost_ms: 0.0,
      alpha,
    }
  }

  pub fn set_smoothing(&mut self, alpha: f64) {
    self.alpha = alpha;
  }

  /// Current smoothed per-cube regeneration cost.
  #[inline]
  pub fn smoothed_cost_ms(&self) -> f64 {
    self.smoothed_cost_ms
  }

  /// Number of queued cubes.
  #[inline]
  pub fn pending_count(&self) -> usize {
    self.queue.len()
  }

  #[inline]
  pub fn has_pending(&self) -> bool {
    !self.queue.is_empty()
  }

  #[inline]
  pub fn is_queued(&self, key: CubeKey) -> bool {
    self.queued.contains(&key)
  }

  /// Queued keys in dequeue order.
  pub fn pending(&self) -> impl Iterator<Item = CubeKey> + '_ {
    self.queue.iter().copied()
  }

  /// Queue `key` unless it is already waiting. Returns true if queued.
  pub fn enqueue(&mut self, key: CubeKey) -> bool {
    if !self.queued.insert(key) {
      return false;
    }
    self.queue.push_back(key);
    true
  }

  /// Queue every dirty cube from `(key, is_dirty)` pairs. Returns the number
  /// of newly queued cubes.
  pub fn scan_and_enqueue(&mut self, cubes: impl IntoIterator<Item = (CubeKey, bool)>) -> usize {
    cubes
      .into_iter()
      .filter(|&(_, dirty)| dirty)
      .filter(|&(key, _)| self.enqueue(key))
      .count()
  }

  /// Cubes that fit in `budget_ms` at the current cost estimate (at least 1).
  pub fn max_per_tick(&self, budget_ms: f64) -> usize {
    if self.smoothed_cost_ms <= MIN_COST_MS {
      return 1;
    }
    let fit = (budget_ms / self.smoothed_cost_ms).floor();
    if fit.is_finite() && fit >= 1.0 {
      fit.min(usize::MAX as f64) as usize
    } else {
      1
    }
  }

  /// Fold one measured regeneration cost into the estimate.
  pub fn record_cost(&mut self, cost_ms: f64) {
    self.smoothed_cost_ms = self.smoothed_cost_ms * self.alpha + (1.0 - self.alpha) * cost_ms;
  }

  /// Dequeue up to [`max_per_tick`](Self::max_per_tick) cubes and run
  /// `regenerate` on each.
  ///
  /// `regenerate` returns false when the key no longer names a cube; such
  /// keys are dropped without affecting the cost estimate.
  pub fn tick<C, F>(&mut self, budget_ms: f64, clock: &C, mut regenerate: F) -> TickStats
  where
    C: Clock + ?Sized,
    F: FnMut(CubeKey) -> bool,
  {
    let max_per_tick = self.max_per_tick(budget_ms);
    let mut stats = TickStats {
      max_per_tick,
      ..Default::default()
    };
    let tick_start = clock.now_ms();

    while stats.regenerated < max_per_tick {
      let Some(key) = self.queue.pop_front() else {
        break;
      };
      self.queued.remove(&key);

      let start = clock.now_ms();
      if !regenerate(key) {
        stats.skipped += 1;
        continue;
      }
      let cost = (clock.now_ms() - start).max(0.0);
      self.record_cost(cost);
      stats.regenerated += 1;
    }

    stats.elapsed_ms = (clock.now_ms() - tick_start).max(0.0);
    stats.pending = self.queue.len();
    stats
  }

  /// Drop `key` from the queue if present.
  pub fn remove(&mut self, key: CubeKey) -> bool {
    if !self.queued.remove(&key) {
      return false;
    }
    self.queue.retain(|&queued| queued != key);
    true
  }

  /// Drop every queued key. The cost estimate is kept.
  pub fn clear(&mut self) {
    self.queue.clear();
    self.queued.clear();
  }
}

impl Default for RemeshScheduler {
  fn default() -> Self {
    Self::new(DEFAULT_COST_SMOOTHING)
  }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod scheduler_test;
