//! Discrete UV assignment for tiling a 2x2 texture pattern across triangles.
//!
//! Every vertex receives one of three palette corners; a fourth value marks
//! "not assigned yet". A triangle is well-formed when its three vertices carry
//! three distinct corners.
//!
//! ```text
//!   (0,1) A ─── B (1,1)
//!         │   ╱
//!         │  ╱
//!         │ ╱
//!   (0,0) C
//! ```
//!
//! Assignment is local: each new triangle inspects the UVs its vertices
//! already carry (from earlier triangles sharing them) and fills in the rest
//! from a fixed rule table. It is not a graph coloring. When the last face of
//! a closed fan meets two vertices that already share a corner, the third
//! vertex takes the first corner that differs from theirs and that face keeps
//! the duplicate.

use glam::Vec2;
use smallvec::SmallVec;

/// Vertex UV that has not been decided yet.
pub const UV_UNASSIGNED: Vec2 = Vec2::new(-1.0, -1.0);

/// Palette corners in assignment order.
pub const UV_PALETTE: [Vec2; 3] = [Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 0.0)];

#[inline]
fn is_assigned(uv: Vec2) -> bool {
  uv != UV_UNASSIGNED
}

/// First palette corner not contained in `taken`.
#[inline]
fn first_free(taken: &[Vec2]) -> Vec2 {
  UV_PALETTE
    .iter()
    .copied()
    .find(|corner| !taken.contains(corner))
    .unwrap_or(UV_PALETTE[0])
}

/// Assign palette corners to the unassigned vertices of one triangle.
///
/// `uvs` is the cube's UV buffer; vertices not yet seen must hold
/// [`UV_UNASSIGNED`]. Triangles whose vertices are all assigned are left
/// untouched. Indices outside `uvs` are ignored.
pub fn assign_triangle(uvs: &mut [Vec2], triangle: [u32; 3]) {
  let [a, b, c] = triangle.map(|index| index as usize);
  if a >= uvs.len() || b >= uvs.len() || c >= uvs.len() {
    return;
  }

  let corners = [a, b, c];
  let assigned: SmallVec<[Vec2; 3]> = corners
    .iter()
    .map(|&vertex| uvs[vertex])
    .filter(|&uv| is_assigned(uv))
    .collect();

  match assigned.len() {
    0 => {
      for (slot, &vertex) in corners.iter().enumerate() {
        uvs[vertex] = UV_PALETTE[slot];
      }
    }
    1 | 2 => {
      // Fill the gaps in vertex order, each taking the first corner not
      // already present on the triangle.
      let mut taken = assigned;
      for &vertex in &corners {
        if is_assigned(uvs[vertex]) {
          continue;
        }
        let corner = first_free(&taken);
        uvs[vertex] = corner;
        taken.push(corner);
      }
    }
    _ => {}
  }
}

/// True when the triangle's three UVs are assigned and pairwise distinct.
pub fn is_well_formed(uvs: &[Vec2], triangle: [u32; 3]) -> bool {
  let [a, b, c] = triangle.map(|index| uvs.get(index as usize).copied().unwrap_or(UV_UNASSIGNED));
  is_assigned(a) && is_assigned(b) && is_assigned(c) && a != b && b != c && a != c
}

#[cfg(test)]
#[path = "uv_test.rs"]
mod uv_test;
