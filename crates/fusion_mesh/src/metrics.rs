//! Engine-agnostic metrics collection for fusion and remeshing.
//!
//! Feature-gated and runtime-toggled to ensure zero overhead when disabled.
//!
//! # Usage
//!
//! ```ignore
//! use fusion_mesh::metrics::{FusionMetrics, COLLECT_METRICS};
//!
//! // Compile with --features metrics
//! // Runtime toggle:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! // Read after a few ticks:
//! let avg = manager.metrics().avg_regen_timing_us();
//! ```

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;

/// Runtime toggle for metrics collection.
/// Set to false to disable metrics gathering at runtime.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Check if metrics collection is enabled (both compile-time and runtime).
#[inline]
pub fn is_enabled() -> bool {
  #[cfg(feature = "metrics")]
  {
    COLLECT_METRICS.load(Ordering::Relaxed)
  }
  #[cfg(not(feature = "metrics"))]
  {
    false
  }
}

/// Rolling window for storing recent values (e.g., timing history).
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
  buffer: VecDeque<T>,
  capacity: usize,
}

impl<T> RollingWindow<T> {
  /// Create a new rolling window with the given capacity.
  pub fn new(capacity: usize) -> Self {
    Self {
      buffer: VecDeque::with_capacity(capacity),
      capacity,
    }
  }

  /// Push a new value, evicting the oldest if at capacity.
  pub fn push(&mut self, value: T) {
    if self.capacity == 0 {
      return;
    }
    if self.buffer.len() >= self.capacity {
      self.buffer.pop_front();
    }
    self.buffer.push_back(value);
  }

  pub fn len(&self) -> usize {
    self.buffer.len()
  }

  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
  }

  /// Iterate over values (oldest to newest).
  pub fn iter(&self) -> impl Iterator<Item = &T> {
    self.buffer.iter()
  }

  /// Most recent value.
  pub fn last(&self) -> Option<&T> {
    self.buffer.back()
  }
}

impl<T: Copy + Default + std::ops::Add<Output = T>> RollingWindow<T> {
  /// Compute the sum of all values.
  pub fn sum(&self) -> T {
    self.buffer.iter().copied().fold(T::default(), |acc, x| acc + x)
  }
}

impl RollingWindow<u64> {
  /// Compute the average of all values.
  pub fn average(&self) -> f64 {
    if self.buffer.is_empty() {
      0.0
    } else {
      self.sum() as f64 / self.buffer.len() as f64
    }
  }
}

impl Default for RollingWindow<u64> {
  fn default() -> Self {
    Self::new(128) // ~2 seconds of ticks at 60fps
  }
}

/// Counters and timings for one [`crate::FusionManager`].
#[derive(Debug, Clone, Default)]
pub struct FusionMetrics {
  /// Point fusions that updated a voxel (secondary samples included).
  pub observations_fused: u64,
  /// Point fusions rejected because the cube was regenerating.
  pub observations_busy: u64,
  /// Point fusions rejected as outside the addressable grid.
  pub observations_out_of_range: u64,
  /// Observations rejected for non-finite input or non-positive weight.
  pub observations_invalid: u64,
  /// Cubes created this session.
  pub cubes_created: u64,
  /// Cube regenerations this session.
  pub cubes_regenerated: u64,
  /// Rolling window of single-cube regeneration times in microseconds.
  pub regen_timings: RollingWindow<u64>,
  /// Last single-cube regeneration time in microseconds.
  pub last_regen_us: u64,
}

impl FusionMetrics {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reset timings. Session counters are cumulative and kept.
  pub fn reset(&mut self) {
    self.regen_timings.clear();
    self.last_regen_us = 0;
  }

  pub fn record_fused(&mut self) {
    if is_enabled() {
      self.observations_fused += 1;
    }
  }

  pub fn record_busy(&mut self) {
    if is_enabled() {
      self.observations_busy += 1;
    }
  }

  pub fn record_out_of_range(&mut self) {
    if is_enabled() {
      self.observations_out_of_range += 1;
    }
  }

  pub fn record_invalid(&mut self) {
    if is_enabled() {
      self.observations_invalid += 1;
    }
  }

  pub fn record_cube_created(&mut self) {
    if is_enabled() {
      self.cubes_created += 1;
    }
  }

  /// Record one cube regeneration and its cost.
  pub fn record_regeneration(&mut self, timing_us: u64) {
    if is_enabled() {
      self.cubes_regenerated += 1;
      self.regen_timings.push(timing_us);
      self.last_regen_us = timing_us;
    }
  }

  /// Observations rejected for any reason.
  pub fn observations_dropped(&self) -> u64 {
    self.observations_busy + self.observations_out_of_range + self.observations_invalid
  }

  /// Average single-cube regeneration time in microseconds.
  pub fn avg_regen_timing_us(&self) -> f64 {
    self.regen_timings.average()
  }
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
  use super::*;

  #[test]
  fn test_rolling_window() {
    let mut window = RollingWindow::new(3);
    assert!(window.is_empty());

    window.push(10u64);
    window.push(20);
    window.push(30);
    assert_eq!(window.sum(), 60);
    assert_eq!(window.average(), 20.0);

    // Oldest is evicted
    window.push(40);
    assert_eq!(window.len(), 3);
    assert_eq!(window.average(), 30.0);
    assert_eq!(window.last(), Some(&40));
  }

  #[test]
  fn test_fusion_counters() {
    let mut metrics = FusionMetrics::new();
    metrics.record_fused();
    metrics.record_fused();
    metrics.record_busy();
    metrics.record_out_of_range();
    metrics.record_invalid();
    metrics.record_cube_created();

    assert_eq!(metrics.observations_fused, 2);
    assert_eq!(metrics.observations_dropped(), 3);
    assert_eq!(metrics.cubes_created, 1);
  }

  #[test]
  fn test_regeneration_timing() {
    let mut metrics = FusionMetrics::new();
    metrics.record_regeneration(1000);
    metrics.record_regeneration(3000);

    assert_eq!(metrics.cubes_regenerated, 2);
    assert_eq!(metrics.avg_regen_timing_us(), 2000.0);
    assert_eq!(metrics.last_regen_us, 3000);

    metrics.reset();
    assert!(metrics.regen_timings.is_empty());
    assert_eq!(metrics.cubes_regenerated, 2, "counters are cumulative");
  }
}
