//! Synthetic depth sensor orbiting an analytic scene.
//!
//! ```text
//!        sensor ●──────▶ ray ──╮
//!          ╱                   ▼ hit + noise → Observation
//!   orbit ╱      ┌─────────┐
//!        ●       │  scene  │
//!                └─────────┘
//! ```
//!
//! Rays are sphere-traced against the scene's signed distance; each hit is
//! jittered along the ray by uniform depth noise.

use fusion_mesh::Observation;
use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{SceneConfig, SensorConfig};

const MAX_STEPS: u32 = 128;
const HIT_EPSILON: f32 = 1e-4;

/// Signed distance to the configured shape.
pub fn scene_distance(scene: &SceneConfig, point: Vec3) -> f32 {
  match *scene {
    SceneConfig::Sphere { center, radius } => (point - Vec3::from(center)).length() - radius,
    SceneConfig::Box {
      center,
      half_extents,
    } => {
      let q = (point - Vec3::from(center)).abs() - Vec3::from(half_extents);
      q.max(Vec3::ZERO).length() + q.max_element().min(0.0)
    }
  }
}

/// Distance along `direction` to the first surface hit, if any.
pub fn sphere_trace(scene: &SceneConfig, origin: Vec3, direction: Vec3, max_range: f32) -> Option<f32> {
  let mut t = 0.0;
  for _ in 0..MAX_STEPS {
    let d = scene_distance(scene, origin + direction * t);
    if d < HIT_EPSILON {
      return Some(t);
    }
    t += d;
    if t > max_range {
      return None;
    }
  }
  None
}

/// Sensor circling the scene center, one depth frame per call.
pub struct OrbitSensor {
  scene: SceneConfig,
  sensor: SensorConfig,
  frame: u32,
  rng: StdRng,
}

impl OrbitSensor {
  pub fn new(scene: SceneConfig, sensor: SensorConfig) -> Self {
    let rng = StdRng::seed_from_u64(sensor.seed);
    Self {
      scene,
      sensor,
      frame: 0,
      rng,
    }
  }

  /// Sensor position for `frame`.
  pub fn position(&self, frame: u32) -> Vec3 {
    let angle = (frame as f32 * self.sensor.degrees_per_frame).to_radians();
    self.scene.center()
      + Vec3::new(
        angle.cos() * self.sensor.orbit_radius,
        self.sensor.orbit_height,
        angle.sin() * self.sensor.orbit_radius,
      )
  }

  /// Capture the next depth frame.
  pub fn capture(&mut self) -> Vec<Observation> {
    let origin = self.position(self.frame);
    self.frame += 1;

    let forward = (self.scene.center() - origin).normalize_or_zero();
    let rotation = Quat::from_rotation_arc(Vec3::NEG_Z, forward);
    let rays = self.sensor.rays.max(1);
    let half_fov = (self.sensor.fov_degrees * 0.5).to_radians().tan();

    let mut observations = Vec::with_capacity((rays * rays) as usize);
    for row in 0..rays {
      for col in 0..rays {
        let u = ((col as f32 + 0.5) / rays as f32) * 2.0 - 1.0;
        let v = ((row as f32 + 0.5) / rays as f32) * 2.0 - 1.0;
        let direction = (rotation * Vec3::new(u * half_fov, v * half_fov, -1.0)).normalize();

        let Some(depth) = sphere_trace(&self.scene, origin, direction, self.sensor.max_range) else {
          continue;
        };
        let noise = if self.sensor.depth_noise > 0.0 {
          self
            .rng
            .random_range(-self.sensor.depth_noise..self.sensor.depth_noise)
        } else {
          0.0
        };
        let point = origin + direction * (depth + noise);
        if let Some(observation) = Observation::from_sensor(origin, point, self.sensor.weight) {
          observations.push(observation);
        }
      }
    }
    observations
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sphere() -> SceneConfig {
    SceneConfig::Sphere {
      center: [0.0, 0.0, 0.0],
      radius: 0.5,
    }
  }

  #[test]
  fn test_box_distance() {
    let scene = SceneConfig::Box {
      center: [0.0, 0.0, 0.0],
      half_extents: [1.0, 1.0, 1.0],
    };
    assert!((scene_distance(&scene, Vec3::new(2.0, 0.0, 0.0)) - 1.0).abs() < 1e-6);
    assert!((scene_distance(&scene, Vec3::ZERO) + 1.0).abs() < 1e-6);
  }

  #[test]
  fn test_sphere_trace_hits_front_face() {
    let t = sphere_trace(&sphere(), Vec3::new(0.0, 0.0, 2.0), Vec3::NEG_Z, 5.0).expect("hit");
    assert!((t - 1.5).abs() < 1e-3);
    assert!(sphere_trace(&sphere(), Vec3::new(0.0, 2.0, 2.0), Vec3::NEG_Z, 5.0).is_none());
  }

  #[test]
  fn test_capture_lands_on_surface() {
    let sensor = SensorConfig {
      rays: 8,
      depth_noise: 0.0,
      ..Default::default()
    };
    let mut scanner = OrbitSensor::new(sphere(), sensor);
    let frame = scanner.capture();
    assert!(!frame.is_empty());
    for observation in &frame {
      assert!((observation.point.length() - 0.5).abs() < 1e-3);
      assert!((observation.direction.length() - 1.0).abs() < 1e-5);
    }
  }
}
