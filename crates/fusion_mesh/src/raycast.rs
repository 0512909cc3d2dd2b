//! Ray queries against fused voxels.
//!
//! A segment is walked through the cube grid cell by cell. Inside every
//! occupied cube the clipped segment is walked again through the voxel grid,
//! collecting voxels that carry observations.
//!
//! ```text
//!   cube grid            voxel grid inside an occupied cube
//!   ┌───┬───┬───┐        ┌─┬─┬─┬─┐
//!   │ ● │   │   │        │●│ │ │ │   ● start
//!   ├──╲┼───┼───┤        ├─┼╲┼─┼─┤
//!   │   │╲──│───│─▶      │ │ │╲┼─┼─▶
//!   └───┴───┴───┘        └─┴─┴─┴─┘
//! ```
//!
//! Both walks visit exactly the cells the segment passes through (3D DDA),
//! bounded by the Manhattan distance between the end cells. Segments are
//! clipped to the addressable cube grid first, so the walk length is bounded
//! by the grid size whatever the endpoints.

use glam::{DVec3, IVec3, Vec3};

use crate::cube::MeshingCube;
use crate::hash::GridHasher;
use crate::key_tree::KeyTree;
use crate::types::{CubeKey, VoxelHit};

/// Iterator over the grid cells crossed by a segment.
#[derive(Clone, Debug)]
pub struct GridWalk {
  cell: IVec3,
  step: IVec3,
  t_max: Vec3,
  t_delta: Vec3,
  remaining: u64,
}

impl GridWalk {
  /// Walk from `start` to `stop` through a grid of `cell_size` cells whose
  /// cell `(0,0,0)` spans `[0, cell_size)³`.
  ///
  /// Yields nothing for non-finite endpoints.
  pub fn new(start: Vec3, stop: Vec3, cell_size: f32) -> Self {
    if !(start.is_finite() && stop.is_finite()) {
      return Self {
        cell: IVec3::ZERO,
        step: IVec3::ZERO,
        t_max: Vec3::INFINITY,
        t_delta: Vec3::INFINITY,
        remaining: 0,
      };
    }
    let first = (start / cell_size).floor().as_ivec3();
    let last = (stop / cell_size).floor().as_ivec3();
    let delta = stop - start;

    let mut step = IVec3::ZERO;
    let mut t_max = Vec3::INFINITY;
    let mut t_delta = Vec3::INFINITY;
    for axis in 0..3 {
      let d = delta[axis];
      if d > 0.0 {
        step[axis] = 1;
        let boundary = (first[axis] + 1) as f32 * cell_size;
        t_max[axis] = (boundary - start[axis]) / d;
        t_delta[axis] = cell_size / d;
      } else if d < 0.0 {
        step[axis] = -1;
        let boundary = first[axis] as f32 * cell_size;
        t_max[axis] = (boundary - start[axis]) / d;
        t_delta[axis] = -cell_size / d;
      }
    }

    // Widened: saturated far endpoints would overflow i32.
    let span = (last.as_i64vec3() - first.as_i64vec3()).abs();
    Self {
      cell: first,
      step,
      t_max,
      t_delta,
      remaining: (span.x + span.y + span.z) as u64 + 1,
    }
  }
}

impl Iterator for GridWalk {
  type Item = IVec3;

  fn next(&mut self) -> Option<IVec3> {
    if self.remaining == 0 {
      return None;
    }
    self.remaining -= 1;
    let current = self.cell;

    let axis = if self.t_max.x <= self.t_max.y && self.t_max.x <= self.t_max.z {
      0
    } else if self.t_max.y <= self.t_max.z {
      1
    } else {
      2
    };
    self.cell[axis] = self.cell[axis].saturating_add(self.step[axis]);
    self.t_max[axis] += self.t_delta[axis];

    Some(current)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    match usize::try_from(self.remaining) {
      Ok(remaining) => (remaining, Some(remaining)),
      Err(_) => (usize::MAX, None),
    }
  }
}

/// Endpoints of the part of `start..stop` inside the box.
///
/// Computed in double precision and clamped to the box, so endpoints far
/// outside it do not swamp the clipped coordinates.
pub fn clip_to_box(start: Vec3, stop: Vec3, min: Vec3, max: Vec3) -> Option<(Vec3, Vec3)> {
  let (start, stop) = (start.as_dvec3(), stop.as_dvec3());
  let (min, max) = (min.as_dvec3(), max.as_dvec3());
  let (t0, t1) = slab_range(start, stop, min, max)?;
  let delta = stop - start;
  let at = |t: f64| (start + delta * t).clamp(min, max).as_vec3();
  Some((at(t0), at(t1)))
}

/// Parameter range `[t0, t1]` of `start + t * (stop - start)` inside the box.
fn slab_range(start: DVec3, stop: DVec3, min: DVec3, max: DVec3) -> Option<(f64, f64)> {
  if !(start.is_finite() && stop.is_finite()) {
    return None;
  }
  let delta = stop - start;
  let mut t0 = 0.0f64;
  let mut t1 = 1.0f64;

  for axis in 0..3 {
    let d = delta[axis];
    if d.abs() <= f64::EPSILON {
      if start[axis] < min[axis] || start[axis] > max[axis] {
        return None;
      }
      continue;
    }
    let mut a = (min[axis] - start[axis]) / d;
    let mut b = (max[axis] - start[axis]) / d;
    if a > b {
      std::mem::swap(&mut a, &mut b);
    }
    t0 = t0.max(a);
    t1 = t1.min(b);
    if t0 > t1 {
      return None;
    }
  }

  Some((t0, t1))
}

/// Observed voxels of `cube` crossed by the segment, in walk order.
pub fn raycast_cube(cube: &MeshingCube, start: Vec3, stop: Vec3, hits: &mut Vec<VoxelHit>) {
  let origin = cube.origin();
  let size = cube.cube_size();
  let Some((entry, exit)) = clip_to_box(start, stop, origin, origin + Vec3::splat(size)) else {
    return;
  };

  // Keep both ends strictly inside so the walk stays in interior cells.
  let inside = Vec3::splat(size * (1.0 - 1e-5));
  let local_start = (entry - origin).clamp(Vec3::ZERO, inside);
  let local_stop = (exit - origin).clamp(Vec3::ZERO, inside);

  let field = cube.field();
  for index in GridWalk::new(local_start, local_stop, field.voxel_size()) {
    if !field.is_interior(index) {
      continue;
    }
    let Some(voxel) = field.get(index) else {
      continue;
    };
    if !voxel.is_observed() {
      continue;
    }
    hits.push(VoxelHit {
      cube: cube.key(),
      index,
      center: origin + voxel.anchor,
      value: voxel.value,
      weight: voxel.weight,
    });
  }
}

/// Every observed voxel crossed by the segment `start..stop`.
///
/// Only the part of the segment inside the addressable cube grid is walked.
pub fn raycast_voxels(
  cubes: &KeyTree<CubeKey, MeshingCube>,
  hasher: &GridHasher,
  cube_size: f32,
  start: Vec3,
  stop: Vec3,
) -> Vec<VoxelHit> {
  let mut hits = Vec::new();
  let grid_min = Vec3::splat(hasher.min_coord() as f32 * cube_size);
  let grid_max = Vec3::splat((hasher.max_coord() + 1) as f32 * cube_size);
  let Some((start, stop)) = clip_to_box(start, stop, grid_min, grid_max) else {
    return hits;
  };

  for coord in GridWalk::new(start, stop, cube_size) {
    if !hasher.contains(coord) {
      continue;
    }
    if let Some(cube) = cubes.get(hasher.hash(coord)) {
      raycast_cube(cube, start, stop, &mut hits);
    }
  }
  hits
}

#[cfg(test)]
#[path = "raycast_test.rs"]
mod raycast_test;
