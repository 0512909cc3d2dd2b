//! Grid layout constants for meshing cubes and their voxel fields.
//!
//! # Cube Grid
//!
//! World space is split into cubes of `cube_size` units. A cube coordinate is
//! packed into a single key by [`crate::hash::GridHasher`]:
//!
//! ```text
//! key = x + D*y + D²*z          D = CUBE_HASH_DIM = 1000
//!
//! addressable per axis: [-500, 500)
//! neighbor across -X face: key - 1
//! neighbor across -Y face: key - D
//! neighbor across -Z face: key - D²
//! ```
//!
//! # Voxel Field Layout
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  Voxel index:  -2   -1 │  0    1   ...   R-1  │  R   R+1           │
//! │                 └──┬───┘  └───── interior ───┘  └──┬──┘            │
//! │               negative       cells that emit      positive         │
//! │                margin          triangles           margin          │
//! │                                                                    │
//! │  Margin voxels are fused and padded, never polygonized directly.   │
//! │  Cell R-1 reads its +1 corners from the positive margin.           │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Corner Layout
//!
//! ```text
//!       7──────6         Corners:
//!      /│     /│           0=(0,0,0)  1=(1,0,0)  2=(1,1,0)  3=(0,1,0)
//!     4─┼────5 │           4=(0,0,1)  5=(1,0,1)  6=(1,1,1)  7=(0,1,1)
//!     │ 3────┼─2
//!     │/     │/          +Y
//!     0──────1            │  +Z
//!                         │ /
//!                         └───+X
//! ```

use glam::IVec3;

/// Per-axis dimension of the cube-level spatial hash.
pub const CUBE_HASH_DIM: i32 = 1000;

/// Extra voxel layers reserved on each side of a cube's interior.
pub const VOXEL_MARGIN: i32 = 2;

/// Largest accepted voxel resolution per cube edge.
pub const MAX_RESOLUTION: u32 = 256;

/// Default cube edge length in world units.
pub const DEFAULT_CUBE_SIZE: f32 = 1.0;

/// Default voxels per cube edge.
pub const DEFAULT_RESOLUTION: u32 = 16;

/// Default isosurface threshold.
pub const DEFAULT_ISO_LEVEL: f32 = 0.0;

/// Default weight after which fusion stops moving a voxel's value.
pub const DEFAULT_MAX_WEIGHT: f32 = 30.0;

/// Default minimum value change (fraction of voxel size) that dirties a cube.
pub const DEFAULT_DIRTY_THRESHOLD: f32 = 0.1;

/// Default exponential smoothing factor for per-cube regeneration cost.
pub const DEFAULT_COST_SMOOTHING: f64 = 0.97;

/// Default regeneration time budget per tick in milliseconds.
pub const DEFAULT_TIME_BUDGET_MS: f32 = 4.0;

/// Value of a voxel that has never been observed (definitely empty).
pub const EMPTY_VALUE: f32 = -1.0;

/// Offsets of the 8 cell corners relative to the cell's minimum corner.
///
/// Ordered to match the marching cubes case tables.
pub const CORNER_OFFSETS: [IVec3; 8] = [
  IVec3::new(0, 0, 0),
  IVec3::new(1, 0, 0),
  IVec3::new(1, 1, 0),
  IVec3::new(0, 1, 0),
  IVec3::new(0, 0, 1),
  IVec3::new(1, 0, 1),
  IVec3::new(1, 1, 1),
  IVec3::new(0, 1, 1),
];

/// The 26 neighbor offsets of a voxel: 8 in the same layer, 9 above, 9 below.
pub const NEIGHBOR_OFFSETS: [IVec3; 26] = generate_neighbor_offsets();

const fn generate_neighbor_offsets() -> [IVec3; 26] {
  let mut offsets = [IVec3::ZERO; 26];
  let mut count = 0;
  let mut dz = -1;

  while dz <= 1 {
    let mut dy = -1;
    while dy <= 1 {
      let mut dx = -1;
      while dx <= 1 {
        if dx != 0 || dy != 0 || dz != 0 {
          offsets[count] = IVec3::new(dx, dy, dz);
          count += 1;
        }
        dx += 1;
      }
      dy += 1;
    }
    dz += 1;
  }

  offsets
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
