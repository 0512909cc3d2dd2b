use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::clock::ManualClock;
use crate::presentation::ResourceHandle;
use crate::source::BufferedSource;
use crate::types::CubeMesh;

#[derive(Default)]
struct RecordingPresenter {
  next: u64,
  created: Vec<(CubeKey, Vec3, ResourceHandle)>,
  published: Vec<(ResourceHandle, usize)>,
  destroyed: Vec<ResourceHandle>,
}

impl MeshPresenter for RecordingPresenter {
  fn instantiate_cube(&mut self, key: CubeKey, world_position: Vec3) -> ResourceHandle {
    let handle = ResourceHandle(self.next);
    self.next += 1;
    self.created.push((key, world_position, handle));
    handle
  }

  fn publish_mesh(&mut self, handle: ResourceHandle, mesh: &CubeMesh) {
    self.published.push((handle, mesh.triangle_count()));
  }

  fn destroy_cube(&mut self, handle: ResourceHandle) {
    self.destroyed.push(handle);
  }
}

fn manager() -> FusionManager {
  FusionManager::new(FusionConfig::default()).expect("default config is valid")
}

/// Queue dirty cubes and tick until nothing is pending.
fn settle<P: MeshPresenter>(manager: &mut FusionManager<P>) {
  manager.queue_dirty_for_regeneration();
  for _ in 0..100 {
    if manager.pending_regenerations() == 0 {
      return;
    }
    manager.tick(1000.0);
  }
  panic!("regeneration queue never drained");
}

/// 100 points inside the unit cube, each looking outward from its center.
fn scatter_points(manager: &mut FusionManager<impl MeshPresenter>) {
  let mut rng = StdRng::seed_from_u64(42);
  let center = Vec3::splat(0.5);
  for _ in 0..100 {
    let point = Vec3::new(
      rng.random_range(0.1..0.9),
      rng.random_range(0.1..0.9),
      rng.random_range(0.1..0.9),
    );
    let direction = (point - center).normalize_or_zero();
    if direction == Vec3::ZERO {
      continue;
    }
    manager.insert_observation(point, direction, 1.0);
  }
}

fn voxel_at(manager: &FusionManager<impl MeshPresenter>, coord: IVec3, index: IVec3) -> (f32, f32) {
  let cube = manager
    .cube(manager.cube_key(coord))
    .expect("cube exists");
  let voxel = cube.field().get(index).expect("voxel exists");
  (voxel.value, voxel.weight)
}

#[test]
fn test_new_rejects_invalid_config() {
  let config = FusionConfig::default().with_resolution(0);
  assert!(matches!(
    FusionManager::new(config),
    Err(ConfigError::Resolution { got: 0 })
  ));
}

#[test]
fn test_point_at_origin_reaches_every_adjacent_cube() {
  let mut manager = manager();
  let voxel_size = manager.config().voxel_size();

  let outcome = manager.insert_observation(Vec3::ZERO, Vec3::Z, 1.0);
  assert_eq!(
    outcome,
    FuseOutcome::Fused {
      value: 0.5 * voxel_size,
      index: IVec3::ZERO
    }
  );

  let (value, weight) = voxel_at(&manager, IVec3::ZERO, IVec3::ZERO);
  assert!((value - 0.5 * voxel_size).abs() < 1e-6);
  assert_eq!(weight, 1.0);

  // Positive value: the secondary sample steps back along the ray.
  let (value, weight) = voxel_at(&manager, IVec3::ZERO, IVec3::new(0, 0, -1));
  assert!((value + 0.5 * voxel_size).abs() < 1e-6);
  assert_eq!(weight, 1.0);

  // Three zero coordinates: the origin cube plus all seven cubes across its
  // negative faces, each fused once.
  assert_eq!(manager.cube_count(), 8);
  for coord in [
    IVec3::new(-1, 0, 0),
    IVec3::new(0, -1, 0),
    IVec3::new(0, 0, -1),
    IVec3::new(-1, -1, 0),
    IVec3::new(-1, 0, -1),
    IVec3::new(0, -1, -1),
    IVec3::new(-1, -1, -1),
  ] {
    let index = IVec3::new(
      if coord.x < 0 { 16 } else { 0 },
      if coord.y < 0 { 16 } else { 0 },
      if coord.z < 0 { 16 } else { 0 },
    );
    let (value, weight) = voxel_at(&manager, coord, index);
    assert_eq!(weight, 1.0, "cube {coord} fused more than once");
    assert!((value - 0.5 * voxel_size).abs() < 1e-6);
  }
}

#[test]
fn test_scattered_points_mesh_a_single_cube() {
  let mut manager = manager();
  scatter_points(&mut manager);
  assert_eq!(manager.cube_count(), 1);

  settle(&mut manager);

  let stats = manager.compute_stats();
  assert_eq!(stats.total_cubes, 1);
  assert!(stats.total_triangles > 0);
  assert!(stats.total_vertices >= stats.total_triangles * 3);

  let cube = manager.cube(manager.cube_key(IVec3::ZERO)).expect("cube");
  assert!(cube.mesh().is_consistent());
  assert!(!cube.is_dirty());
}

#[test]
fn test_face_point_replicates_into_one_neighbor() {
  let mut manager = manager();
  manager.insert_observation(Vec3::new(0.0, 0.5, 0.5), Vec3::X, 1.0);

  assert_eq!(manager.cube_count(), 2);
  let (own_value, _) = voxel_at(&manager, IVec3::ZERO, IVec3::new(0, 8, 8));
  let (value, weight) = voxel_at(&manager, IVec3::new(-1, 0, 0), IVec3::new(16, 8, 8));
  assert_eq!(weight, 1.0);
  assert!((value - own_value).abs() < 1e-6);
}

#[test]
fn test_regenerating_cube_rejects_insertions() {
  let mut manager = manager();
  let point = Vec3::splat(0.5);
  manager.insert_observation(point, Vec3::Z, 1.0);
  let key = manager.cube_key(IVec3::ZERO);
  let before = voxel_at(&manager, IVec3::ZERO, IVec3::splat(8));

  assert!(manager.begin_regeneration(key));
  assert_eq!(manager.insert_observation(point, Vec3::Z, 1.0), FuseOutcome::Busy);
  assert_eq!(voxel_at(&manager, IVec3::ZERO, IVec3::splat(8)), before);

  assert!(manager.end_regeneration(key));
  assert!(matches!(
    manager.insert_observation(point, Vec3::Z, 1.0),
    FuseOutcome::Fused { .. }
  ));
  assert_eq!(voxel_at(&manager, IVec3::ZERO, IVec3::splat(8)).1, 2.0);

  assert!(!manager.begin_regeneration(manager.cube_key(IVec3::splat(3))));
}

#[test]
fn test_regeneration_is_idempotent() {
  let mut manager = manager();
  scatter_points(&mut manager);
  settle(&mut manager);

  let key = manager.cube_key(IVec3::ZERO);
  let first = manager.cube(key).expect("cube").mesh().clone();
  assert_eq!(manager.queue_dirty_for_regeneration(), 0, "nothing changed");

  assert!(manager.request_regeneration(key));
  let stats = manager.tick(1000.0);
  assert_eq!(stats.regenerated, 1);
  assert_eq!(manager.cube(key).expect("cube").mesh(), &first);
}

#[test]
fn test_primary_voxel_fusion_is_order_independent() {
  let a = (Vec3::new(0.51, 0.51, 0.51), 1.0);
  let b = (Vec3::new(0.52, 0.505, 0.515), 2.0);

  let mut forward = manager();
  forward.insert_observation(a.0, Vec3::Z, a.1);
  forward.insert_observation(b.0, Vec3::Z, b.1);

  let mut backward = manager();
  backward.insert_observation(b.0, Vec3::Z, b.1);
  backward.insert_observation(a.0, Vec3::Z, a.1);

  let (fv, fw) = voxel_at(&forward, IVec3::ZERO, IVec3::splat(8));
  let (bv, bw) = voxel_at(&backward, IVec3::ZERO, IVec3::splat(8));
  assert_eq!(fw, 3.0);
  assert_eq!(bw, 3.0);
  assert!((fv - bv).abs() < 1e-6);
}

#[test]
fn test_out_of_range_point_is_rejected() {
  let mut manager = manager();
  let outcome = manager.insert_observation(Vec3::new(600.0, 0.5, 0.5), Vec3::Z, 1.0);
  assert_eq!(outcome, FuseOutcome::OutOfField);
  assert!(manager.is_empty());
  assert!(manager.cube_at(Vec3::new(600.0, 0.5, 0.5)).is_none());
}

#[test]
fn test_invalid_observations_are_rejected_without_side_effects() {
  let mut manager = FusionManager::with_presenter(FusionConfig::default(), RecordingPresenter::default())
    .expect("valid config");
  let point = Vec3::splat(0.5);
  manager.insert_observation(point, Vec3::Z, 1.0);
  settle(&mut manager);
  let before = voxel_at(&manager, IVec3::ZERO, IVec3::splat(8));

  let observations = [
    (point, Vec3::Z, f32::NAN),
    (point, Vec3::Z, -5.0),
    (point, Vec3::Z, 0.0),
    (point, Vec3::new(0.0, f32::NAN, 1.0), 1.0),
    (Vec3::new(f32::NAN, 0.5, 0.5), Vec3::Z, 1.0),
    (Vec3::new(0.0, f32::NEG_INFINITY, 0.5), Vec3::Z, 1.0),
  ];
  for (point, direction, weight) in observations {
    assert_eq!(
      manager.insert_observation(point, direction, weight),
      FuseOutcome::Invalid,
      "{point} {direction} {weight}"
    );
  }

  assert_eq!(manager.cube_count(), 1, "no cube created");
  assert_eq!(manager.presenter().created.len(), 1);
  assert_eq!(voxel_at(&manager, IVec3::ZERO, IVec3::splat(8)), before);
  assert!(!manager.cube(manager.cube_key(IVec3::ZERO)).expect("cube").is_dirty());
  assert!(manager.cube_at(Vec3::new(f32::NAN, 0.5, 0.5)).is_none());

  // The voxel keeps fusing normally afterwards.
  manager.insert_observation(point, Vec3::Z, 1.0);
  let (value, weight) = voxel_at(&manager, IVec3::ZERO, IVec3::splat(8));
  assert!(value.is_finite());
  assert_eq!(weight, before.1 + 1.0);
}

#[test]
fn test_raycast_with_far_endpoints_is_clipped_to_grid() {
  let mut manager = manager();
  manager.insert_observation(Vec3::splat(0.5), Vec3::Z, 1.0);

  let hits = manager.raycast_voxels(Vec3::new(-1e12, 0.51, 0.51), Vec3::new(1e12, 0.51, 0.51));
  let indices: Vec<_> = hits.iter().map(|hit| hit.index).collect();
  assert_eq!(indices, vec![IVec3::splat(8)]);

  let hits = manager.raycast_voxels(Vec3::new(1e12, 0.51, 0.51), Vec3::new(-1e12, 0.51, 0.51));
  assert_eq!(hits.len(), 1, "reverse direction");

  assert!(manager
    .raycast_voxels(Vec3::new(-1e12, 1e12, 0.5), Vec3::new(1e12, 1e12, 0.5))
    .is_empty());
  assert!(manager
    .raycast_voxels(Vec3::new(f32::NAN, 0.5, 0.5), Vec3::splat(0.5))
    .is_empty());
}

#[test]
fn test_presenter_sees_cube_lifecycle() {
  let mut manager = FusionManager::with_presenter(FusionConfig::default(), RecordingPresenter::default())
    .expect("valid config")
    .with_clock(ManualClock::stepping(0.5));

  manager.insert_observation(Vec3::ZERO, Vec3::Z, 1.0);
  assert_eq!(manager.presenter().created.len(), 8);
  assert!(manager
    .presenter()
    .created
    .iter()
    .any(|&(_, position, _)| position == Vec3::new(-1.0, -1.0, -1.0)));

  settle(&mut manager);
  assert_eq!(manager.presenter().published.len(), 8);
  assert_eq!(manager.compute_stats().total_cubes, 8);

  manager.clear_all();
  let mut created: Vec<_> = manager.presenter().created.iter().map(|c| c.2).collect();
  let mut destroyed = manager.presenter().destroyed.clone();
  created.sort_by_key(|h| h.0);
  destroyed.sort_by_key(|h| h.0);
  assert_eq!(created, destroyed);
  assert!(manager.is_empty());
  assert_eq!(manager.pending_regenerations(), 0);
  assert_eq!(manager.compute_stats(), MeshStats::default());
}

#[test]
fn test_tick_respects_cost_budget() {
  let mut manager = manager().with_clock(ManualClock::stepping(1.0));
  for x in 0..5 {
    manager.insert_observation(Vec3::new(x as f32 + 0.5, 0.5, 0.5), Vec3::Z, 1.0);
  }
  assert_eq!(manager.queue_dirty_for_regeneration(), 5);
  assert_eq!(manager.queue_dirty_for_regeneration(), 0, "already queued");

  // No cost estimate yet: one cube.
  let stats = manager.tick(4.0);
  assert_eq!(stats.regenerated, 1);
  assert_eq!(manager.pending_regenerations(), 4);

  // Smoothed cost is now 0.03 ms, so the rest fits.
  let stats = manager.tick(4.0);
  assert_eq!(stats.regenerated, 4);
  assert_eq!(manager.pending_regenerations(), 0);
}

#[test]
fn test_set_resolution_clears_cubes() {
  let mut manager = manager();
  manager.insert_observation(Vec3::splat(0.5), Vec3::Z, 1.0);
  manager.queue_dirty_for_regeneration();

  assert!(manager.set_resolution(8).is_ok());
  assert_eq!(manager.config().resolution, 8);
  assert!(manager.is_empty());
  assert_eq!(manager.pending_regenerations(), 0);
}

#[test]
fn test_invalid_setters_keep_state() {
  let mut manager = manager();
  manager.insert_observation(Vec3::splat(0.5), Vec3::Z, 1.0);
  let config = manager.config().clone();

  assert!(matches!(
    manager.set_resolution(0),
    Err(ConfigError::Resolution { got: 0 })
  ));
  assert!(manager.set_iso_level(f32::NAN).is_err());
  assert!(manager.set_time_budget_ms(-1.0).is_err());
  assert!(manager
    .set_config(FusionConfig::default().with_cube_size(0.0))
    .is_err());

  assert_eq!(manager.config(), &config);
  assert_eq!(manager.cube_count(), 1);

  assert!(manager.set_time_budget_ms(8.0).is_ok());
  assert_eq!(manager.config().time_budget_ms, 8.0);
}

#[test]
fn test_iso_change_marks_cubes_dirty() {
  let mut manager = manager();
  manager.insert_observation(Vec3::splat(0.5), Vec3::Z, 1.0);
  settle(&mut manager);
  let key = manager.cube_key(IVec3::ZERO);
  assert!(!manager.cube(key).expect("cube").is_dirty());

  assert!(manager.set_iso_level(0.01).is_ok());
  assert!(manager.cube(key).expect("cube").is_dirty());
  assert_eq!(manager.queue_dirty_for_regeneration(), 1);
}

#[test]
fn test_drain_source_fuses_in_order() {
  let mut manager = manager();
  let mut source: BufferedSource = [
    Observation::new(Vec3::new(0.5, 0.5, 0.5), Vec3::Z, 1.0),
    Observation::new(Vec3::new(1.5, 0.5, 0.5), Vec3::Z, 1.0),
    Observation::new(Vec3::new(0.5, 0.5, 0.5), Vec3::Z, 1.0),
  ]
  .into_iter()
  .collect();

  assert_eq!(manager.drain_source(&mut source), 3);
  assert!(source.is_empty());
  assert_eq!(manager.cube_count(), 2);
  assert_eq!(voxel_at(&manager, IVec3::ZERO, IVec3::splat(8)).1, 2.0);
}

#[test]
fn test_raycast_finds_fused_voxels() {
  let mut manager = manager();
  manager.insert_observation(Vec3::splat(0.5), Vec3::Z, 1.0);

  let hits = manager.raycast_voxels(Vec3::new(0.51, 0.51, -1.0), Vec3::new(0.51, 0.51, 2.0));
  let indices: Vec<_> = hits.iter().map(|hit| hit.index).collect();
  assert_eq!(indices, vec![IVec3::new(8, 8, 7), IVec3::splat(8)]);
  assert!(hits.iter().all(|hit| hit.cube == manager.cube_key(IVec3::ZERO)));
}
