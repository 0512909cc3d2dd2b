//! FusionConfig - tunable parameters for fusion, meshing and scheduling.

use thiserror::Error;

use crate::constants::{
  DEFAULT_COST_SMOOTHING, DEFAULT_CUBE_SIZE, DEFAULT_DIRTY_THRESHOLD, DEFAULT_ISO_LEVEL,
  DEFAULT_MAX_WEIGHT, DEFAULT_RESOLUTION, DEFAULT_TIME_BUDGET_MS, MAX_RESOLUTION,
};

/// A configuration value that was rejected at the setter boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
  #[error("cube size must be finite and positive, got {0}")]
  CubeSize(f32),

  #[error("resolution must be in 1..={max}, got {got}", max = MAX_RESOLUTION)]
  Resolution { got: u32 },

  #[error("iso level must be finite and within [-1, 1], got {0}")]
  IsoLevel(f32),

  #[error("max weight must be finite and positive, got {0}")]
  MaxWeight(f32),

  #[error("dirty threshold must be finite and non-negative, got {0}")]
  DirtyThreshold(f32),

  #[error("cost smoothing must be within [0, 1), got {0}")]
  CostSmoothing(f64),

  #[error("time budget must be finite and positive, got {0} ms")]
  TimeBudget(f32),
}

/// Parameters for a [`crate::FusionManager`].
#[derive(Clone, Debug, PartialEq)]
pub struct FusionConfig {
  /// Edge length of a meshing cube in world units.
  pub cube_size: f32,

  /// Voxels per cube edge. Voxel size = cube_size / resolution.
  pub resolution: u32,

  /// Isosurface threshold used by the polygonizer.
  pub iso_level: f32,

  /// Weight after which fusion stops moving a voxel's value.
  pub max_weight: f32,

  /// Fraction of voxel size a value must move to mark its cube dirty.
  pub dirty_threshold: f32,

  /// Exponential smoothing factor for per-cube regeneration cost.
  /// smoothed = smoothed * alpha + (1 - alpha) * cost
  pub cost_smoothing: f64,

  /// Default regeneration budget per tick in milliseconds.
  pub time_budget_ms: f32,
}

impl FusionConfig {
  pub fn with_cube_size(mut self, cube_size: f32) -> Self {
    self.cube_size = cube_size;
    self
  }

  pub fn with_resolution(mut self, resolution: u32) -> Self {
    self.resolution = resolution;
    self
  }

  pub fn with_iso_level(mut self, iso_level: f32) -> Self {
    self.iso_level = iso_level;
    self
  }

  pub fn with_max_weight(mut self, max_weight: f32) -> Self {
    self.max_weight = max_weight;
    self
  }

  pub fn with_dirty_threshold(mut self, dirty_threshold: f32) -> Self {
    self.dirty_threshold = dirty_threshold;
    self
  }

  pub fn with_cost_smoothing(mut self, cost_smoothing: f64) -> Self {
    self.cost_smoothing = cost_smoothing;
    self
  }

  pub fn with_time_budget_ms(mut self, time_budget_ms: f32) -> Self {
    self.time_budget_ms = time_budget_ms;
    self
  }

  /// Size of one voxel in world units.
  #[inline]
  pub fn voxel_size(&self) -> f32 {
    self.cube_size / self.resolution as f32
  }

  /// Absolute value change that marks a cube dirty.
  #[inline]
  pub fn dirty_distance(&self) -> f32 {
    self.dirty_threshold * self.voxel_size()
  }

  /// Check every field, reporting the first invalid one.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if !(self.cube_size.is_finite() && self.cube_size > 0.0) {
      return Err(ConfigError::CubeSize(self.cube_size));
    }
    if self.resolution == 0 || self.resolution > MAX_RESOLUTION {
      return Err(ConfigError::Resolution {
        got: self.resolution,
      });
    }
    validate_iso_level(self.iso_level)?;
    if !(self.max_weight.is_finite() && self.max_weight > 0.0) {
      return Err(ConfigError::MaxWeight(self.max_weight));
    }
    if !(self.dirty_threshold.is_finite() && self.dirty_threshold >= 0.0) {
      return Err(ConfigError::DirtyThreshold(self.dirty_threshold));
    }
    if !(0.0..1.0).contains(&self.cost_smoothing) {
      return Err(ConfigError::CostSmoothing(self.cost_smoothing));
    }
    validate_time_budget(self.time_budget_ms)?;
    Ok(())
  }
}

impl Default for FusionConfig {
  fn default() -> Self {
    Self {
      cube_size: DEFAULT_CUBE_SIZE,
      resolution: DEFAULT_RESOLUTION,
      iso_level: DEFAULT_ISO_LEVEL,
      max_weight: DEFAULT_MAX_WEIGHT,
      dirty_threshold: DEFAULT_DIRTY_THRESHOLD,
      cost_smoothing: DEFAULT_COST_SMOOTHING,
      time_budget_ms: DEFAULT_TIME_BUDGET_MS,
    }
  }
}

pub(crate) fn validate_iso_level(iso_level: f32) -> Result<(), ConfigError> {
  if iso_level.is_finite() && (-1.0..=1.0).contains(&iso_level) {
    Ok(())
  } else {
    Err(ConfigError::IsoLevel(iso_level))
  }
}

pub(crate) fn validate_time_budget(time_budget_ms: f32) -> Result<(), ConfigError> {
  if time_budget_ms.is_finite() && time_budget_ms > 0.0 {
    Ok(())
  } else {
    Err(ConfigError::TimeBudget(time_budget_ms))
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
