use std::collections::HashSet;

use super::*;

#[test]
fn test_neighbor_offsets_are_unique_and_exclude_center() {
  let unique: HashSet<_> = NEIGHBOR_OFFSETS.iter().copied().collect();
  assert_eq!(unique.len(), 26);
  assert!(!unique.contains(&IVec3::ZERO));

  for offset in &NEIGHBOR_OFFSETS {
    assert!(offset.abs().max_element() == 1, "{offset} is not adjacent");
  }
}

#[test]
fn test_neighbor_offsets_layer_split() {
  let same_layer = NEIGHBOR_OFFSETS.iter().filter(|o| o.z == 0).count();
  let above = NEIGHBOR_OFFSETS.iter().filter(|o| o.z == 1).count();
  let below = NEIGHBOR_OFFSETS.iter().filter(|o| o.z == -1).count();

  assert_eq!((same_layer, above, below), (8, 9, 9));
}

#[test]
fn test_corner_offsets() {
  assert_eq!(CORNER_OFFSETS[0], IVec3::ZERO);
  assert_eq!(CORNER_OFFSETS[6], IVec3::ONE);

  let unique: HashSet<_> = CORNER_OFFSETS.iter().copied().collect();
  assert_eq!(unique.len(), 8, "Corners must cover the unit cube");
}

#[test]
fn test_hash_dim_fits_i32() {
  let half = CUBE_HASH_DIM as i64 / 2;
  let max_key = half + half * CUBE_HASH_DIM as i64 + half * (CUBE_HASH_DIM as i64).pow(2);
  assert!(max_key < i32::MAX as i64);
}
