//! Marching cubes polygonization of a single cell.
//!
//! ```text
//!   8 corner values ──▶ case index (bit i = value[i] < iso)
//!                          │
//!                          ├─▶ EDGE_TABLE[case]  which edges are cut
//!                          │      └─▶ one interpolated vertex per cut edge
//!                          │
//!                          └─▶ TRI_TABLE[case]   edge triples
//!                                 └─▶ triangles over the cell's vertices
//! ```
//!
//! Vertices are shared between the triangles of one cell but not across
//! cells; the caller appends them to its mesh buffers and owns normals.

pub mod tables;

use glam::Vec3;
use smallvec::SmallVec;

pub use tables::{EDGE_CORNERS, EDGE_TABLE, MAX_CASE_TRIANGLES, TRI_TABLE};

/// Geometry emitted for one cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellPolygons {
  /// Interpolated edge crossings (at most 12).
  pub vertices: SmallVec<[Vec3; 12]>,
  /// Triangles as indices into `vertices`.
  pub triangles: SmallVec<[[u8; 3]; MAX_CASE_TRIANGLES]>,
}

impl CellPolygons {
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.triangles.is_empty()
  }

  #[inline]
  pub fn triangle_count(&self) -> usize {
    self.triangles.len()
  }
}

/// Case index for 8 corner values: bit `i` is set when corner `i` is below
/// `iso_level`.
#[inline]
pub fn case_index(iso_level: f32, values: &[f32; 8]) -> u8 {
  let mut case = 0u8;
  for (i, &value) in values.iter().enumerate() {
    if value < iso_level {
      case |= 1 << i;
    }
  }
  case
}

/// Number of triangles the table emits for `case`.
#[inline]
pub fn case_triangle_count(case: u8) -> usize {
  TRI_TABLE[case as usize]
    .iter()
    .take_while(|&&edge| edge >= 0)
    .count()
    / 3
}

/// Point on segment `a`-`b` where the linear interpolant crosses `iso_level`.
#[inline]
pub fn interpolate_edge(iso_level: f32, a: Vec3, b: Vec3, value_a: f32, value_b: f32) -> Vec3 {
  let delta = value_b - value_a;
  if delta.abs() <= f32::EPSILON {
    return a;
  }
  let t = ((iso_level - value_a) / delta).clamp(0.0, 1.0);
  a + (b - a) * t
}

/// Polygonize one cell.
///
/// Returns an empty result when every corner is on the same side of
/// `iso_level`.
pub fn polygonize(iso_level: f32, values: &[f32; 8], positions: &[Vec3; 8]) -> CellPolygons {
  let case = case_index(iso_level, values) as usize;
  let edge_mask = EDGE_TABLE[case];
  let mut out = CellPolygons::default();
  if edge_mask == 0 {
    return out;
  }

  // Local vertex slot of each cut edge.
  let mut edge_vertex = [u8::MAX; 12];
  for (edge, corners) in EDGE_CORNERS.iter().enumerate() {
    if edge_mask & (1 << edge) == 0 {
      continue;
    }
    let (c0, c1) = (corners[0] as usize, corners[1] as usize);
    edge_vertex[edge] = out.vertices.len() as u8;
    out.vertices.push(interpolate_edge(
      iso_level,
      positions[c0],
      positions[c1],
      values[c0],
      values[c1],
    ));
  }

  for triple in TRI_TABLE[case].chunks_exact(3) {
    if triple[0] < 0 {
      break;
    }
    out.triangles.push([
      edge_vertex[triple[0] as usize],
      edge_vertex[triple[1] as usize],
      edge_vertex[triple[2] as usize],
    ]);
  }

  out
}

/// Flat face normal for triangle `(a, b, c)`: `normalize(cross(a - b, b - c))`.
///
/// Degenerate triangles yield zero.
#[inline]
pub fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
  (a - b).cross(b - c).normalize_or_zero()
}
