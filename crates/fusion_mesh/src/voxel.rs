//! Voxel storage and weighted point fusion for one meshing cube.
//!
//! Voxels are addressed by a local index in `[-VOXEL_MARGIN, R + VOXEL_MARGIN)`
//! per axis, packed with [`GridHasher::voxel_field`] and stored sparsely in a
//! [`KeyTree`]. All positions handled here are cube-local: `(0,0,0)` is the
//! cube's minimum corner.
//!
//! # Fusion
//!
//! ```text
//!   sensor ──────────────────────────▶ measured point p
//!            direction d                 │
//!                                        ▼
//!   ┌─────┬─────┬─────┐   penetration = d · (anchor - p)
//!   │     │  a  │     │   value'  = (value*w + penetration*w_new) / (w + w_new)
//!   └─────┴─────┴─────┘   weight' = w + w_new
//!      voxel containing p, anchored at its cell center a
//! ```
//!
//! Once a voxel's weight reaches `max_weight`, further hits only accumulate
//! weight. A fused value below -1 resets the voxel to "definitely empty".

use glam::{IVec3, Vec3};
use smallvec::SmallVec;

use crate::config::FusionConfig;
use crate::constants::{CORNER_OFFSETS, EMPTY_VALUE, NEIGHBOR_OFFSETS};
use crate::hash::GridHasher;
use crate::key_tree::KeyTree;
use crate::types::VoxelKey;

/// Smallest fused unit of a meshing cube.
#[derive(Clone, Debug, PartialEq)]
pub struct Voxel {
  /// Local index within the owning cube.
  pub index: IVec3,

  /// Signed-distance-like value, conceptually in [-1, 1].
  pub value: f32,

  /// Accumulated confidence weight.
  pub weight: f32,

  /// Value at the time of the last mesh extraction.
  pub last_meshed_value: f32,

  /// Cube-local reference position used by fusion (the cell center).
  pub anchor: Vec3,

  /// True once all 26 neighbors have been padded in.
  pub neighbors_created: bool,

  /// Start offsets (into the cube's triangle buffer) of triangles emitted by
  /// the cell whose minimum corner is this voxel.
  pub triangle_starts: SmallVec<[u32; 4]>,
}

impl Voxel {
  /// Fresh voxel at `index`, anchored at its cell center.
  pub fn new(index: IVec3, voxel_size: f32) -> Self {
    Self {
      index,
      value: EMPTY_VALUE,
      weight: 0.0,
      last_meshed_value: EMPTY_VALUE,
      anchor: (index.as_vec3() + Vec3::splat(0.5)) * voxel_size,
      neighbors_created: false,
      triangle_starts: SmallVec::new(),
    }
  }

  /// True once at least one observation contributed to this voxel.
  #[inline]
  pub fn is_observed(&self) -> bool {
    self.weight > 0.0
  }
}

/// Result of fusing one point into a voxel field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FuseOutcome {
  /// The point was fused; `value` is the voxel's new value.
  Fused { value: f32, index: IVec3 },
  /// The field is being regenerated. Nothing was mutated.
  Busy,
  /// The point maps outside the addressable field (including margin).
  OutOfField,
  /// Non-finite coordinates or direction, or a weight that is not finite
  /// and positive. Nothing was mutated.
  Invalid,
}

impl FuseOutcome {
  /// Fused value, if the point was accepted.
  pub fn value(&self) -> Option<f32> {
    match *self {
      FuseOutcome::Fused { value, .. } => Some(value),
      _ => None,
    }
  }
}

/// True when a sample can be fused without poisoning a voxel.
#[inline]
pub fn is_valid_sample(index_point: Vec3, anchor_point: Vec3, direction: Vec3, weight: f32) -> bool {
  index_point.is_finite()
    && anchor_point.is_finite()
    && direction.is_finite()
    && weight.is_finite()
    && weight > 0.0
}

/// Sparse per-cube voxel grid with fusion and dirtiness tracking.
pub struct VoxelField {
  resolution: u32,
  voxel_size: f32,
  hasher: GridHasher,
  voxels: KeyTree<VoxelKey, Voxel>,
  dirty: bool,
  regenerating: bool,
}

impl VoxelField {
  /// Empty field with `resolution` interior voxels per axis.
  pub fn new(resolution: u32, cube_size: f32) -> Self {
    Self {
      resolution,
      voxel_size: cube_size / resolution as f32,
      hasher: GridHasher::voxel_field(resolution),
      voxels: KeyTree::new(),
      dirty: false,
      regenerating: false,
    }
  }

  #[inline]
  pub fn resolution(&self) -> u32 {
    self.resolution
  }

  #[inline]
  pub fn voxel_size(&self) -> f32 {
    self.voxel_size
  }

  #[inline]
  pub fn hasher(&self) -> &GridHasher {
    &self.hasher
  }

  /// Number of stored voxels, margin included.
  #[inline]
  pub fn len(&self) -> usize {
    self.voxels.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.voxels.is_empty()
  }

  /// True when a voxel changed enough since the last extraction.
  #[inline]
  pub fn is_dirty(&self) -> bool {
    self.dirty
  }

  #[inline]
  pub fn mark_dirty(&mut self) {
    self.dirty = true;
  }

  #[inline]
  pub fn is_regenerating(&self) -> bool {
    self.regenerating
  }

  pub fn set_regenerating(&mut self, regenerating: bool) {
    self.regenerating = regenerating;
  }

  /// Pack a local index into its key.
  #[inline]
  pub fn voxel_key(&self, index: IVec3) -> VoxelKey {
    self.hasher.hash(index)
  }

  /// Local index of the voxel containing a cube-local point.
  #[inline]
  pub fn local_index(&self, local_point: Vec3) -> IVec3 {
    (local_point / self.voxel_size).floor().as_ivec3()
  }

  /// True when `index` lies within `[0, resolution)` on every axis.
  #[inline]
  pub fn is_interior(&self, index: IVec3) -> bool {
    let hi = IVec3::splat(self.resolution as i32);
    index.cmpge(IVec3::ZERO).all() && index.cmplt(hi).all()
  }

  /// Look up a voxel. Never creates one.
  pub fn get(&self, index: IVec3) -> Option<&Voxel> {
    if !self.hasher.contains(index) {
      return None;
    }
    self.voxels.get(self.voxel_key(index))
  }

  pub fn get_mut(&mut self, index: IVec3) -> Option<&mut Voxel> {
    if !self.hasher.contains(index) {
      return None;
    }
    let key = self.voxel_key(index);
    self.voxels.get_mut(key)
  }

  /// Return the voxel at `index`, creating an empty one if needed.
  ///
  /// Returns `None` when `index` is outside the addressable field.
  pub fn query_or_create(&mut self, index: IVec3) -> Option<&mut Voxel> {
    if !self.hasher.contains(index) {
      return None;
    }
    let key = self.voxel_key(index);
    let voxel_size = self.voxel_size;
    let (voxel, _) = self
      .voxels
      .get_or_insert_with(key, || Voxel::new(index, voxel_size));
    Some(voxel)
  }

  /// Fuse one observation.
  ///
  /// `index_point` selects the voxel; `anchor_point` is the measured point
  /// the penetration is computed against. Both are cube-local. They differ
  /// only for secondary samples taken one voxel along the observation ray.
  pub fn insert_point(
    &mut self,
    index_point: Vec3,
    anchor_point: Vec3,
    direction: Vec3,
    weight: f32,
    config: &FusionConfig,
  ) -> FuseOutcome {
    if self.regenerating {
      return FuseOutcome::Busy;
    }
    if !is_valid_sample(index_point, anchor_point, direction, weight) {
      return FuseOutcome::Invalid;
    }

    let index = self.local_index(index_point);
    let dirty_distance = config.dirty_threshold * self.voxel_size;
    let Some(voxel) = self.query_or_create(index) else {
      return FuseOutcome::OutOfField;
    };

    let penetration = direction.dot(voxel.anchor - anchor_point);
    let old_weight = voxel.weight;
    let new_weight = old_weight + weight;

    let mut new_value = if old_weight >= config.max_weight || new_weight <= 0.0 {
      voxel.value
    } else {
      (voxel.value * old_weight + penetration * weight) / new_weight
    };

    if new_value < EMPTY_VALUE {
      new_value = EMPTY_VALUE;
      voxel.weight = 0.0;
    } else {
      voxel.weight = new_weight;
    }
    voxel.value = new_value;

    let changed = (voxel.last_meshed_value - new_value).abs() > dirty_distance;
    if changed {
      self.dirty = true;
    }

    FuseOutcome::Fused {
      value: new_value,
      index,
    }
  }

  /// Pad the 26 neighbors of every voxel above `iso_level` whose neighbors
  /// have not been created yet, so every cell touching the surface has all
  /// 8 corners. Returns the number of voxels created.
  pub fn prepare_for_meshing(&mut self, iso_level: f32) -> usize {
    let pending: Vec<IVec3> = self
      .voxels
      .iter()
      .filter(|(_, voxel)| voxel.value > iso_level && !voxel.neighbors_created)
      .map(|(_, voxel)| voxel.index)
      .collect();

    let before = self.voxels.len();
    for index in pending {
      for offset in NEIGHBOR_OFFSETS {
        // Margin edges simply have fewer neighbors.
        let _ = self.query_or_create(index + offset);
      }
      if let Some(voxel) = self.get_mut(index) {
        voxel.neighbors_created = true;
      }
    }
    self.voxels.len() - before
  }

  /// Record the current values as meshed, clear triangle bookkeeping and
  /// reset the dirty flag.
  pub fn begin_extraction(&mut self) {
    for (_, voxel) in self.voxels.iter_mut() {
      voxel.last_meshed_value = voxel.value;
      voxel.triangle_starts.clear();
    }
    self.dirty = false;
  }

  /// Values of the 8 corners of the cell whose minimum corner is `index`.
  ///
  /// Returns `None` if any corner voxel is missing.
  pub fn cell_corners(&self, index: IVec3) -> Option<([f32; 8], [Vec3; 8])> {
    let mut values = [0.0; 8];
    let mut anchors = [Vec3::ZERO; 8];
    for (i, offset) in CORNER_OFFSETS.iter().enumerate() {
      let voxel = self.get(index + *offset)?;
      values[i] = voxel.value;
      anchors[i] = voxel.anchor;
    }
    Some((values, anchors))
  }

  /// Voxels in key order.
  pub fn iter(&self) -> impl Iterator<Item = &Voxel> + '_ {
    self.voxels.iter().map(|(_, voxel)| voxel)
  }

  /// Drop every voxel and reset flags.
  pub fn clear(&mut self) {
    self.voxels.clear();
    self.dirty = false;
    self.regenerating = false;
  }
}

#[cfg(test)]
#[path = "voxel_test.rs"]
mod voxel_test;
