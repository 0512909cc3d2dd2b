//! FusionManager - routes observations into cubes and drives remeshing.
//!
//! # Per-observation flow
//!
//! ```text
//! insert_observation(p, d, w)
//!   │
//!   ├─▶ cube = find_or_create(floor(p / cube_size))
//!   ├─▶ v = cube.insert_point(p)                       primary sample
//!   ├─▶ cube.insert_point(p ∓ d*voxel_size, anchor p)  secondary sample
//!   │       (- when v > 0: back off toward the sensor, + otherwise)
//!   └─▶ local index has a 0 on axis a?
//!           └─▶ repeat in the cube across the -a face
//! ```
//!
//! # Per-tick flow
//!
//! ```text
//! queue_dirty_for_regeneration()   scan every cube, queue the dirty ones
//! tick(budget_ms)                  regenerate what fits, publish meshes
//! ```
//!
//! Everything runs on the caller's thread. A cube that is regenerating
//! rejects insertions with [`FuseOutcome::Busy`]; rejected observations are
//! not retried.

use glam::{IVec3, Vec3};
// WASM compat: std::time::Instant panics on wasm32
use web_time::Instant;

use crate::clock::{Clock, SystemClock};
use crate::config::{validate_iso_level, validate_time_budget, ConfigError, FusionConfig};
use crate::cube::{MeshingCube, RegenerationStats};
use crate::hash::GridHasher;
use crate::key_tree::KeyTree;
use crate::metrics::FusionMetrics;
use crate::presentation::{MeshPresenter, NullPresenter};
use crate::raycast;
use crate::scheduler::{RemeshScheduler, TickStats};
use crate::source::PointSource;
use crate::types::{CubeKey, MeshStats, Observation, VoxelHit};
use crate::voxel::{is_valid_sample, FuseOutcome};

/// Owns every cube and runs fusion and remeshing.
pub struct FusionManager<P: MeshPresenter = NullPresenter> {
  config: FusionConfig,
  hasher: GridHasher,
  cubes: KeyTree<CubeKey, MeshingCube>,
  scheduler: RemeshScheduler,
  presenter: P,
  clock: Box<dyn Clock>,
  metrics: FusionMetrics,
}

impl FusionManager<NullPresenter> {
  /// Headless manager.
  pub fn new(config: FusionConfig) -> Result<Self, ConfigError> {
    Self::with_presenter(config, NullPresenter::default())
  }
}

impl<P: MeshPresenter> FusionManager<P> {
  /// Manager publishing meshes to `presenter`.
  pub fn with_presenter(config: FusionConfig, presenter: P) -> Result<Self, ConfigError> {
    config.validate()?;
    Ok(Self {
      scheduler: RemeshScheduler::new(config.cost_smoothing),
      config,
      hasher: GridHasher::cube_grid(),
      cubes: KeyTree::new(),
      presenter,
      clock: Box::new(SystemClock::new()),
      metrics: FusionMetrics::new(),
    })
  }

  /// Replace the time source used for regeneration cost tracking.
  pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
    self.clock = Box::new(clock);
    self
  }

  // ---------------------------------------------------------------------------
  // Accessors
  // ---------------------------------------------------------------------------

  pub fn config(&self) -> &FusionConfig {
    &self.config
  }

  pub fn metrics(&self) -> &FusionMetrics {
    &self.metrics
  }

  pub fn presenter(&self) -> &P {
    &self.presenter
  }

  pub fn presenter_mut(&mut self) -> &mut P {
    &mut self.presenter
  }

  /// Cube-grid hasher.
  pub fn hasher(&self) -> &GridHasher {
    &self.hasher
  }

  /// Number of live cubes.
  pub fn cube_count(&self) -> usize {
    self.cubes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cubes.is_empty()
  }

  /// Keys of all cubes in ascending order.
  pub fn cube_keys(&self) -> Vec<CubeKey> {
    self.cubes.keys()
  }

  pub fn cube(&self, key: CubeKey) -> Option<&MeshingCube> {
    self.cubes.get(key)
  }

  /// Cube containing a world point, if it exists.
  pub fn cube_at(&self, point: Vec3) -> Option<&MeshingCube> {
    if !point.is_finite() {
      return None;
    }
    let coord = self.cube_coord(point);
    if !self.hasher.contains(coord) {
      return None;
    }
    self.cubes.get(self.hasher.hash(coord))
  }

  /// Key of the cube at grid coordinate `coord`.
  pub fn cube_key(&self, coord: IVec3) -> CubeKey {
    self.hasher.hash(coord)
  }

  /// Cubes queued for regeneration.
  pub fn pending_regenerations(&self) -> usize {
    self.scheduler.pending_count()
  }

  /// Current smoothed per-cube regeneration cost.
  pub fn smoothed_cost_ms(&self) -> f64 {
    self.scheduler.smoothed_cost_ms()
  }

  #[inline]
  fn cube_coord(&self, point: Vec3) -> IVec3 {
    (point / self.config.cube_size).floor().as_ivec3()
  }

  // ---------------------------------------------------------------------------
  // Configuration
  // ---------------------------------------------------------------------------

  /// Replace the whole configuration.
  ///
  /// A change of cube size or resolution clears every cube.
  pub fn set_config(&mut self, config: FusionConfig) -> Result<(), ConfigError> {
    if let Err(err) = config.validate() {
      tracing::warn!(%err, "Rejected fusion config");
      return Err(err);
    }
    let layout_changed =
      config.cube_size != self.config.cube_size || config.resolution != self.config.resolution;
    let iso_changed = config.iso_level != self.config.iso_level;

    self.scheduler.set_smoothing(config.cost_smoothing);
    self.config = config;
    if layout_changed {
      self.clear_all();
    } else if iso_changed {
      self.mark_all_dirty();
    }
    Ok(())
  }

  /// Change the default regeneration budget.
  pub fn set_time_budget_ms(&mut self, time_budget_ms: f32) -> Result<(), ConfigError> {
    if let Err(err) = validate_time_budget(time_budget_ms) {
      tracing::warn!(%err, "Rejected time budget");
      return Err(err);
    }
    self.config.time_budget_ms = time_budget_ms;
    Ok(())
  }

  /// Change the isosurface threshold. Every cube is marked dirty.
  pub fn set_iso_level(&mut self, iso_level: f32) -> Result<(), ConfigError> {
    if let Err(err) = validate_iso_level(iso_level) {
      tracing::warn!(%err, "Rejected iso level");
      return Err(err);
    }
    if iso_level != self.config.iso_level {
      self.config.iso_level = iso_level;
      self.mark_all_dirty();
    }
    Ok(())
  }

  /// Change voxels per cube edge. Existing cubes are cleared.
  pub fn set_resolution(&mut self, resolution: u32) -> Result<(), ConfigError> {
    let config = self.config.clone().with_resolution(resolution);
    self.set_config(config)
  }

  fn mark_all_dirty(&mut self) {
    for (_, cube) in self.cubes.iter_mut() {
      cube.field_mut().mark_dirty();
    }
  }

  // ---------------------------------------------------------------------------
  // Fusion
  // ---------------------------------------------------------------------------

  /// Fuse one observation.
  ///
  /// Returns the outcome in the cube containing `point`. Replicas fused into
  /// neighboring cubes are not reported. Non-finite input or a weight that
  /// is not positive is rejected with [`FuseOutcome::Invalid`] before any
  /// cube is touched.
  pub fn insert_observation(&mut self, point: Vec3, direction: Vec3, weight: f32) -> FuseOutcome {
    if !is_valid_sample(point, point, direction, weight) {
      tracing::debug!(%point, %direction, weight, "Rejected invalid observation");
      self.metrics.record_invalid();
      return FuseOutcome::Invalid;
    }
    let coord = self.cube_coord(point);
    let outcome = self.fuse_into_cube(coord, point, direction, weight);

    let FuseOutcome::Fused { index, .. } = outcome else {
      return outcome;
    };

    // Replicate across negative faces. Each branch only continues along
    // later axes, so every neighbor cube is visited once.
    let mut pending = vec![(coord, index, 0b111u8)];
    while let Some((coord, index, axes)) = pending.pop() {
      for axis in 0..3 {
        if axes & (1 << axis) == 0 || index[axis] != 0 {
          continue;
        }
        let mut neighbor = coord;
        neighbor[axis] -= 1;
        if let FuseOutcome::Fused { index, .. } =
          self.fuse_into_cube(neighbor, point, direction, weight)
        {
          let later_axes = axes & !((1u8 << (axis + 1)) - 1);
          pending.push((neighbor, index, later_axes));
        }
      }
    }

    outcome
  }

  /// Fuse an [`Observation`].
  pub fn insert(&mut self, observation: &Observation) -> FuseOutcome {
    self.insert_observation(observation.point, observation.direction, observation.weight)
  }

  /// Fuse every observation `source` has pending, in order. Returns how many
  /// were pulled.
  pub fn drain_source(&mut self, source: &mut impl PointSource) -> usize {
    let mut count = 0;
    while let Some(observation) = source.next_observation() {
      self.insert(&observation);
      count += 1;
    }
    count
  }

  /// Primary and secondary sample in the cube at `coord`.
  fn fuse_into_cube(&mut self, coord: IVec3, point: Vec3, direction: Vec3, weight: f32) -> FuseOutcome {
    let Some(key) = self.find_or_create_cube(coord) else {
      self.metrics.record_out_of_range();
      return FuseOutcome::OutOfField;
    };
    let voxel_size = self.config.voxel_size();
    let Some(cube) = self.cubes.get_mut(key) else {
      return FuseOutcome::OutOfField;
    };

    let outcome = cube.insert_point(point, point, direction, weight, &self.config);
    let value = match outcome {
      FuseOutcome::Fused { value, .. } => value,
      FuseOutcome::Busy => {
        tracing::trace!(key, "Dropped observation, cube is regenerating");
        self.metrics.record_busy();
        return outcome;
      }
      FuseOutcome::OutOfField => {
        self.metrics.record_out_of_range();
        return outcome;
      }
      FuseOutcome::Invalid => {
        self.metrics.record_invalid();
        return outcome;
      }
    };
    self.metrics.record_fused();

    let offset = if value > 0.0 {
      -direction * voxel_size
    } else {
      direction * voxel_size
    };
    match cube.insert_point(point + offset, point, direction, weight, &self.config) {
      FuseOutcome::Fused { .. } => self.metrics.record_fused(),
      _ => self.metrics.record_out_of_range(),
    }

    outcome
  }

  fn find_or_create_cube(&mut self, coord: IVec3) -> Option<CubeKey> {
    if !self.hasher.contains(coord) {
      tracing::warn!(
        x = coord.x,
        y = coord.y,
        z = coord.z,
        "Cube coordinate outside the addressable grid"
      );
      return None;
    }
    let key = self.hasher.hash(coord);
    if self.cubes.contains_key(key) {
      return Some(key);
    }

    let coord = self.hasher.unhash(key);
    let world_position = coord.as_vec3() * self.config.cube_size;
    let resource = self.presenter.instantiate_cube(key, world_position);
    self
      .cubes
      .insert(key, MeshingCube::new(key, coord, &self.config, resource));
    self.metrics.record_cube_created();
    tracing::debug!(key, x = coord.x, y = coord.y, z = coord.z, "Created cube");
    Some(key)
  }

  // ---------------------------------------------------------------------------
  // Regeneration
  // ---------------------------------------------------------------------------

  /// Queue every dirty cube. Returns how many were newly queued.
  pub fn queue_dirty_for_regeneration(&mut self) -> usize {
    self
      .scheduler
      .scan_and_enqueue(self.cubes.iter().map(|(key, cube)| (key, cube.is_dirty())))
  }

  /// Queue a cube regardless of its dirty flag.
  pub fn request_regeneration(&mut self, key: CubeKey) -> bool {
    self.cubes.contains_key(key) && self.scheduler.enqueue(key)
  }

  /// Regenerate as many queued cubes as `time_budget_ms` allows.
  #[tracing::instrument(skip_all, name = "fusion::tick")]
  pub fn tick(&mut self, time_budget_ms: f32) -> TickStats {
    let iso_level = self.config.iso_level;
    let cubes = &mut self.cubes;
    let presenter = &mut self.presenter;
    let metrics = &mut self.metrics;

    let stats = self
      .scheduler
      .tick(time_budget_ms as f64, self.clock.as_ref(), |key| {
        let Some(cube) = cubes.get_mut(key) else {
          return false;
        };
        regenerate_and_publish(cube, presenter, metrics, iso_level);
        true
      });

    if stats.regenerated > 0 {
      tracing::debug!(
        regenerated = stats.regenerated,
        pending = stats.pending,
        max_per_tick = stats.max_per_tick,
        "Remesh tick"
      );
    }
    stats
  }

  /// Queue dirty cubes and tick with the configured budget.
  pub fn update(&mut self) -> TickStats {
    self.queue_dirty_for_regeneration();
    self.tick(self.config.time_budget_ms)
  }

  /// Mark a cube as regenerating so insertions into it are rejected.
  ///
  /// For hosts that rebuild a cube outside [`tick`](Self::tick). Returns
  /// false if the cube does not exist.
  pub fn begin_regeneration(&mut self, key: CubeKey) -> bool {
    let Some(cube) = self.cubes.get_mut(key) else {
      return false;
    };
    cube.begin_regeneration();
    true
  }

  pub fn end_regeneration(&mut self, key: CubeKey) -> bool {
    let Some(cube) = self.cubes.get_mut(key) else {
      return false;
    };
    cube.end_regeneration();
    true
  }

  // ---------------------------------------------------------------------------
  // Whole-structure operations
  // ---------------------------------------------------------------------------

  /// Release every cube and its presenter resource.
  pub fn clear_all(&mut self) {
    let released = self.cubes.len();
    for (_, mut cube) in self.cubes.drain() {
      cube.clear();
      self.presenter.destroy_cube(cube.resource());
    }
    self.scheduler.clear();
    if released > 0 {
      tracing::debug!(released, "Cleared all cubes");
    }
  }

  /// Totals over every cube's current mesh.
  pub fn compute_stats(&self) -> MeshStats {
    let mut stats = MeshStats {
      total_cubes: self.cubes.len(),
      ..Default::default()
    };
    for (_, cube) in self.cubes.iter() {
      stats.total_vertices += cube.mesh().vertex_count();
      stats.total_triangles += cube.mesh().triangle_count();
    }
    stats
  }

  /// Observed voxels crossed by the segment `start..stop`, in walk order.
  pub fn raycast_voxels(&self, start: Vec3, stop: Vec3) -> Vec<VoxelHit> {
    raycast::raycast_voxels(&self.cubes, &self.hasher, self.config.cube_size, start, stop)
  }
}

fn regenerate_and_publish<P: MeshPresenter>(
  cube: &mut MeshingCube,
  presenter: &mut P,
  metrics: &mut FusionMetrics,
  iso_level: f32,
) -> RegenerationStats {
  let start = Instant::now();
  let stats = cube.regenerate(iso_level);
  presenter.publish_mesh(cube.resource(), cube.mesh());
  metrics.record_regeneration(start.elapsed().as_micros() as u64);
  stats
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod manager_test;
