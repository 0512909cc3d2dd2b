//! Core data types shared across fusion and meshing.

use glam::{IVec3, Vec2, Vec3};

/// Packed cube-grid coordinate (see [`crate::hash::GridHasher::cube_grid`]).
pub type CubeKey = i32;

/// Packed voxel coordinate within one cube's field.
pub type VoxelKey = i32;

/// One depth-sensor sample ready for fusion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
  /// Measured surface point in world space.
  pub point: Vec3,

  /// Unit direction of the ray from the sensor to `point`.
  pub direction: Vec3,

  /// Confidence weight of the measurement (> 0).
  pub weight: f32,
}

impl Observation {
  pub fn new(point: Vec3, direction: Vec3, weight: f32) -> Self {
    Self {
      point,
      direction,
      weight,
    }
  }

  /// Build an observation from a sensor origin and the measured point.
  ///
  /// Returns `None` when the two coincide (no usable ray direction).
  pub fn from_sensor(sensor_origin: Vec3, point: Vec3, weight: f32) -> Option<Self> {
    let direction = (point - sensor_origin).try_normalize()?;
    Some(Self::new(point, direction, weight))
  }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMaxAABB {
  pub min: Vec3,
  pub max: Vec3,
}

impl MinMaxAABB {
  /// Create AABB with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: Vec3::INFINITY,
      max: Vec3::NEG_INFINITY,
    }
  }

  /// Create AABB from min/max corners.
  pub fn new(min: Vec3, max: Vec3) -> Self {
    Self { min, max }
  }

  /// Expand AABB to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: Vec3) {
    self.min = self.min.min(point);
    self.max = self.max.max(point);
  }

  /// Check if AABB is valid (min <= max on all axes).
  pub fn is_valid(&self) -> bool {
    self.min.cmple(self.max).all()
  }
}

impl Default for MinMaxAABB {
  fn default() -> Self {
    Self::empty()
  }
}

/// Mesh buffers owned by one meshing cube.
///
/// `normals`, `uvs` and `vertices` are parallel; `triangles` holds three
/// vertex indices per triangle. Positions are in world space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CubeMesh {
  pub vertices: Vec<Vec3>,
  pub normals: Vec<Vec3>,
  pub uvs: Vec<Vec2>,
  pub triangles: Vec<u32>,
  /// Bounding box of `vertices`, invalid when the mesh is empty.
  pub bounds: MinMaxAABB,
}

impl CubeMesh {
  pub fn new() -> Self {
    Self::default()
  }

  /// Clear all buffers, preserving capacity.
  pub fn clear(&mut self) {
    self.vertices.clear();
    self.normals.clear();
    self.uvs.clear();
    self.triangles.clear();
    self.bounds = MinMaxAABB::empty();
  }

  /// Returns true if no geometry was generated.
  pub fn is_empty(&self) -> bool {
    self.triangles.is_empty()
  }

  /// Number of vertices.
  pub fn vertex_count(&self) -> usize {
    self.vertices.len()
  }

  /// Number of triangles.
  pub fn triangle_count(&self) -> usize {
    self.triangles.len() / 3
  }

  /// Recompute `bounds` from the vertex buffer.
  pub fn recompute_bounds(&mut self) {
    let mut bounds = MinMaxAABB::empty();
    for &vertex in &self.vertices {
      bounds.encapsulate(vertex);
    }
    self.bounds = bounds;
  }

  /// True when the parallel-buffer invariants hold.
  pub fn is_consistent(&self) -> bool {
    self.triangles.len() % 3 == 0
      && self.normals.len() == self.vertices.len()
      && self.uvs.len() == self.vertices.len()
      && self
        .triangles
        .iter()
        .all(|&index| (index as usize) < self.vertices.len())
  }
}

/// Read-only diagnostic snapshot over the whole cube index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshStats {
  pub total_vertices: usize,
  pub total_triangles: usize,
  pub total_cubes: usize,
}

/// A populated voxel crossed by a ray query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelHit {
  /// Cube that owns the voxel.
  pub cube: CubeKey,
  /// Voxel index within the cube.
  pub index: IVec3,
  /// World-space center of the voxel.
  pub center: Vec3,
  /// Fused signed-distance value.
  pub value: f32,
  /// Accumulated confidence weight.
  pub weight: f32,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
