//! Scan configuration loaded from TOML.
//!
//! ```toml
//! [fusion]
//! resolution = 16
//! time_budget_ms = 4.0
//!
//! [scene]
//! shape = "sphere"
//! center = [0.5, 0.5, 0.5]
//! radius = 0.35
//!
//! [sensor]
//! frames = 120
//! ```
//!
//! Every key is optional.

use anyhow::{Context, Result};
use fusion_mesh::FusionConfig;
use glam::Vec3;
use serde::Deserialize;
use std::path::Path;

/// Root scan configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub fusion: FusionSection,
  pub scene: SceneConfig,
  pub sensor: SensorConfig,
}

/// Mirrors [`FusionConfig`]; omitted keys keep its defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FusionSection {
  pub cube_size: Option<f32>,
  pub resolution: Option<u32>,
  pub iso_level: Option<f32>,
  pub max_weight: Option<f32>,
  pub dirty_threshold: Option<f32>,
  pub cost_smoothing: Option<f64>,
  pub time_budget_ms: Option<f32>,
}

impl FusionSection {
  pub fn to_config(&self) -> FusionConfig {
    let mut config = FusionConfig::default();
    if let Some(v) = self.cube_size {
      config.cube_size = v;
    }
    if let Some(v) = self.resolution {
      config.resolution = v;
    }
    if let Some(v) = self.iso_level {
      config.iso_level = v;
    }
    if let Some(v) = self.max_weight {
      config.max_weight = v;
    }
    if let Some(v) = self.dirty_threshold {
      config.dirty_threshold = v;
    }
    if let Some(v) = self.cost_smoothing {
      config.cost_smoothing = v;
    }
    if let Some(v) = self.time_budget_ms {
      config.time_budget_ms = v;
    }
    config
  }
}

/// Analytic shape the synthetic sensor observes.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum SceneConfig {
  Sphere {
    center: [f32; 3],
    radius: f32,
  },
  Box {
    center: [f32; 3],
    half_extents: [f32; 3],
  },
}

impl SceneConfig {
  pub fn center(&self) -> Vec3 {
    match *self {
      SceneConfig::Sphere { center, .. } | SceneConfig::Box { center, .. } => Vec3::from(center),
    }
  }
}

impl Default for SceneConfig {
  fn default() -> Self {
    SceneConfig::Sphere {
      center: [0.0, 0.0, 0.0],
      radius: 0.6,
    }
  }
}

/// Orbiting depth sensor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
  /// Frames to simulate.
  pub frames: u32,
  /// Distance from the scene center.
  pub orbit_radius: f32,
  /// Height above the scene center.
  pub orbit_height: f32,
  /// Orbit angle advanced per frame, in degrees.
  pub degrees_per_frame: f32,
  /// Depth image is `rays x rays`.
  pub rays: u32,
  /// Full field of view, in degrees.
  pub fov_degrees: f32,
  /// Uniform depth noise amplitude in world units.
  pub depth_noise: f32,
  /// Confidence weight of every observation.
  pub weight: f32,
  /// Maximum ray length.
  pub max_range: f32,
  pub seed: u64,
}

impl Default for SensorConfig {
  fn default() -> Self {
    Self {
      frames: 120,
      orbit_radius: 2.0,
      orbit_height: 0.5,
      degrees_per_frame: 3.0,
      rays: 48,
      fov_degrees: 50.0,
      depth_noise: 0.005,
      weight: 1.0,
      max_range: 5.0,
      seed: 1,
    }
  }
}

impl Config {
  /// Load configuration from a TOML file.
  pub fn load(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
  }
}
