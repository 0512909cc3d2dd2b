//! MeshingCube - one fixed-size sub-volume with its voxels and mesh.
//!
//! # Regeneration
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │ 1. regenerating = true       (insertions return Busy)             │
//! │ 2. prepare_for_meshing       pad neighbors of surface voxels      │
//! │ 3. begin_extraction          snapshot values, dirty = false       │
//! │ 4. for each interior voxel (min corner of a cell, key order):     │
//! │      polygonize the cell, append vertices + triangles,            │
//! │      flat normals, UV assignment, record triangle starts          │
//! │ 5. recompute bounds                                               │
//! │ 6. regenerating = false                                           │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mesh vertices are in world space.

use glam::{IVec3, Vec3};
use smallvec::SmallVec;

use crate::config::FusionConfig;
use crate::marching_cubes::{face_normal, polygonize};
use crate::presentation::ResourceHandle;
use crate::types::{CubeKey, CubeMesh};
use crate::uv::{self, UV_UNASSIGNED};
use crate::voxel::{FuseOutcome, VoxelField};

/// Summary of one regeneration pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegenerationStats {
  /// Voxels created by neighbor padding.
  pub padded_voxels: usize,
  /// Cells that had all 8 corners.
  pub cells_visited: usize,
  pub vertices: usize,
  pub triangles: usize,
}

/// A cube of the outer grid with its voxel field and mesh buffers.
pub struct MeshingCube {
  key: CubeKey,
  coord: IVec3,
  origin: Vec3,
  cube_size: f32,
  field: VoxelField,
  mesh: CubeMesh,
  resource: ResourceHandle,
}

impl MeshingCube {
  /// Empty cube at grid coordinate `coord`.
  pub fn new(key: CubeKey, coord: IVec3, config: &FusionConfig, resource: ResourceHandle) -> Self {
    Self {
      key,
      coord,
      origin: coord.as_vec3() * config.cube_size,
      cube_size: config.cube_size,
      field: VoxelField::new(config.resolution, config.cube_size),
      mesh: CubeMesh::new(),
      resource,
    }
  }

  #[inline]
  pub fn key(&self) -> CubeKey {
    self.key
  }

  /// Grid coordinate of this cube.
  #[inline]
  pub fn coord(&self) -> IVec3 {
    self.coord
  }

  /// World-space minimum corner.
  #[inline]
  pub fn origin(&self) -> Vec3 {
    self.origin
  }

  #[inline]
  pub fn cube_size(&self) -> f32 {
    self.cube_size
  }

  #[inline]
  pub fn resource(&self) -> ResourceHandle {
    self.resource
  }

  #[inline]
  pub fn field(&self) -> &VoxelField {
    &self.field
  }

  #[inline]
  pub fn field_mut(&mut self) -> &mut VoxelField {
    &mut self.field
  }

  #[inline]
  pub fn mesh(&self) -> &CubeMesh {
    &self.mesh
  }

  #[inline]
  pub fn is_dirty(&self) -> bool {
    self.field.is_dirty()
  }

  #[inline]
  pub fn is_regenerating(&self) -> bool {
    self.field.is_regenerating()
  }

  /// Enter the regenerating state. Insertions return [`FuseOutcome::Busy`]
  /// until [`end_regeneration`](Self::end_regeneration).
  pub fn begin_regeneration(&mut self) {
    self.field.set_regenerating(true);
  }

  pub fn end_regeneration(&mut self) {
    self.field.set_regenerating(false);
  }

  /// Convert a world point into cube-local coordinates.
  #[inline]
  pub fn to_local(&self, world_point: Vec3) -> Vec3 {
    world_point - self.origin
  }

  /// Fuse an observation given in world space.
  ///
  /// `index_point` selects the voxel, `anchor_point` is the measured point.
  pub fn insert_point(
    &mut self,
    index_point: Vec3,
    anchor_point: Vec3,
    direction: Vec3,
    weight: f32,
    config: &FusionConfig,
  ) -> FuseOutcome {
    let index_local = self.to_local(index_point);
    let anchor_local = self.to_local(anchor_point);
    self
      .field
      .insert_point(index_local, anchor_local, direction, weight, config)
  }

  /// Rebuild the mesh buffers from the current voxel values.
  #[tracing::instrument(skip_all, name = "cube::regenerate", fields(key = self.key))]
  pub fn regenerate(&mut self, iso_level: f32) -> RegenerationStats {
    self.begin_regeneration();

    let mut stats = RegenerationStats {
      padded_voxels: self.field.prepare_for_meshing(iso_level),
      ..Default::default()
    };
    self.field.begin_extraction();
    self.mesh.clear();

    let cells: Vec<IVec3> = self
      .field
      .iter()
      .map(|voxel| voxel.index)
      .filter(|&index| self.field.is_interior(index))
      .collect();

    for index in cells {
      // Cells with a missing corner are skipped.
      let Some((values, anchors)) = self.field.cell_corners(index) else {
        continue;
      };
      stats.cells_visited += 1;

      let cell = polygonize(iso_level, &values, &anchors);
      if cell.is_empty() {
        continue;
      }

      let base = self.mesh.vertices.len() as u32;
      for &vertex in &cell.vertices {
        self.mesh.vertices.push(self.origin + vertex);
        self.mesh.normals.push(Vec3::ZERO);
        self.mesh.uvs.push(UV_UNASSIGNED);
      }

      let mut starts: SmallVec<[u32; 4]> = SmallVec::new();
      for local in &cell.triangles {
        let triangle = local.map(|vertex| base + vertex as u32);
        starts.push(self.mesh.triangles.len() as u32);
        self.mesh.triangles.extend_from_slice(&triangle);

        let [a, b, c] = triangle.map(|vertex| self.mesh.vertices[vertex as usize]);
        let normal = face_normal(a, b, c);
        for vertex in triangle {
          self.mesh.normals[vertex as usize] = normal;
        }
        uv::assign_triangle(&mut self.mesh.uvs, triangle);
      }

      if let Some(voxel) = self.field.get_mut(index) {
        voxel.triangle_starts = starts;
      }
    }

    self.mesh.recompute_bounds();
    stats.vertices = self.mesh.vertex_count();
    stats.triangles = self.mesh.triangle_count();

    self.end_regeneration();
    tracing::debug!(
      key = self.key,
      vertices = stats.vertices,
      triangles = stats.triangles,
      padded = stats.padded_voxels,
      "Regenerated cube"
    );
    stats
  }

  /// Average flat normal of the triangles emitted by the cell whose minimum
  /// corner is voxel `index`.
  ///
  /// Returns `None` when that voxel does not exist or emitted nothing.
  pub fn voxel_normal(&self, index: IVec3) -> Option<Vec3> {
    let voxel = self.field.get(index)?;
    let mut sum = Vec3::ZERO;
    for &start in &voxel.triangle_starts {
      let start = start as usize;
      let corners = self.mesh.triangles.get(start..start + 3)?;
      let [a, b, c] = [corners[0], corners[1], corners[2]]
        .map(|vertex| self.mesh.vertices.get(vertex as usize).copied());
      sum += face_normal(a?, b?, c?);
    }
    sum.try_normalize()
  }

  /// Drop all voxels and mesh data.
  pub fn clear(&mut self) {
    self.field.clear();
    self.mesh.clear();
  }
}

#[cfg(test)]
#[path = "cube_test.rs"]
mod cube_test;
