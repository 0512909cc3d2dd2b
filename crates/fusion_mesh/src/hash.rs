//! Reversible integer hashing of 3D grid coordinates.
//!
//! Both the cube grid and every cube's voxel field address cells with the
//! same packing:
//!
//! ```text
//! key = x + dim*y + dim²*z
//! ```
//!
//! Each axis must stay within `[lo, lo + dim)` for the key to be reversible.
//! The cube grid is centered (`lo = -dim/2`) so negative coordinates wrap the
//! same way two's-complement digits do; voxel fields start at `-VOXEL_MARGIN`.

use glam::{IVec3, Vec3};

use crate::constants::{CUBE_HASH_DIM, VOXEL_MARGIN};

/// Packs 3D integer coordinates into a single `i32` key and back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridHasher {
  dim: i32,
  lo: i32,
}

impl GridHasher {
  /// Hasher for the unbounded-ish cube grid, addressable in `[-dim/2, dim/2)`.
  pub const fn centered(dim: i32) -> Self {
    Self { dim, lo: -(dim / 2) }
  }

  /// Hasher for the cube grid using [`CUBE_HASH_DIM`].
  pub const fn cube_grid() -> Self {
    Self::centered(CUBE_HASH_DIM)
  }

  /// Hasher for a voxel field with `resolution` interior cells per axis plus
  /// [`VOXEL_MARGIN`] cells on both sides.
  pub const fn voxel_field(resolution: u32) -> Self {
    Self {
      dim: resolution as i32 + 2 * VOXEL_MARGIN,
      lo: -VOXEL_MARGIN,
    }
  }

  /// Cells per axis.
  #[inline]
  pub fn dim(&self) -> i32 {
    self.dim
  }

  /// Smallest addressable coordinate on each axis.
  #[inline]
  pub fn min_coord(&self) -> i32 {
    self.lo
  }

  /// Largest addressable coordinate on each axis (inclusive).
  #[inline]
  pub fn max_coord(&self) -> i32 {
    self.lo + self.dim - 1
  }

  /// True when every axis of `cell` is addressable without aliasing.
  #[inline]
  pub fn contains(&self, cell: IVec3) -> bool {
    let lo = IVec3::splat(self.lo);
    let hi = IVec3::splat(self.max_coord());
    cell.cmpge(lo).all() && cell.cmple(hi).all()
  }

  /// Pack a cell coordinate into its key.
  #[inline]
  pub fn hash(&self, cell: IVec3) -> i32 {
    cell.x + self.dim * cell.y + self.dim * self.dim * cell.z
  }

  /// Floor a point (already divided by the cell size) and pack it.
  #[inline]
  pub fn hash_point(&self, scaled_point: Vec3) -> i32 {
    self.hash(scaled_point.floor().as_ivec3())
  }

  /// Inverse of [`hash`](Self::hash) for addressable coordinates.
  pub fn unhash(&self, key: i32) -> IVec3 {
    let dim = self.dim as i64;
    let lo = self.lo as i64;
    // Shift every axis into [0, dim) so plain division extracts the digits.
    let mut k = key as i64 - lo * (1 + dim + dim * dim);

    let x = k.rem_euclid(dim);
    k = k.div_euclid(dim);
    let y = k.rem_euclid(dim);
    k = k.div_euclid(dim);
    let z = k;

    IVec3::new((x + lo) as i32, (y + lo) as i32, (z + lo) as i32)
  }

  /// Key of the neighbor one step along the negative direction of `axis`.
  #[inline]
  pub fn negative_neighbor(&self, key: i32, axis: usize) -> i32 {
    match axis {
      0 => key - 1,
      1 => key - self.dim,
      _ => key - self.dim * self.dim,
    }
  }
}

#[cfg(test)]
#[path = "hash_test.rs"]
mod hash_test;
