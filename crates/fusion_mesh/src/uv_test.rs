use super::*;

const A: Vec2 = UV_PALETTE[0];
const B: Vec2 = UV_PALETTE[1];
const C: Vec2 = UV_PALETTE[2];

fn blank(count: usize) -> Vec<Vec2> {
  vec![UV_UNASSIGNED; count]
}

#[test]
fn test_fresh_triangle_gets_palette_in_order() {
  let mut uvs = blank(3);
  assign_triangle(&mut uvs, [0, 1, 2]);
  assert_eq!(uvs, vec![A, B, C]);
  assert!(is_well_formed(&uvs, [0, 1, 2]));
}

#[test]
fn test_one_assigned_fills_remaining_two() {
  let mut uvs = blank(3);
  uvs[1] = A;
  assign_triangle(&mut uvs, [0, 1, 2]);
  assert_eq!(uvs, vec![B, A, C]);

  let mut uvs = blank(3);
  uvs[2] = B;
  assign_triangle(&mut uvs, [0, 1, 2]);
  assert_eq!(uvs, vec![A, C, B]);
}

#[test]
fn test_two_distinct_assigned_takes_the_third() {
  for (first, second, expected) in [(A, B, C), (B, C, A), (C, A, B)] {
    let mut uvs = blank(3);
    uvs[0] = first;
    uvs[2] = second;
    assign_triangle(&mut uvs, [0, 1, 2]);
    assert_eq!(uvs[1], expected);
    assert!(is_well_formed(&uvs, [0, 1, 2]));
  }
}

#[test]
fn test_two_equal_assigned_keeps_known_duplicate() {
  let mut uvs = blank(3);
  uvs[0] = B;
  uvs[1] = B;
  assign_triangle(&mut uvs, [0, 1, 2]);
  assert_eq!(uvs[2], A, "first corner that differs from the pair");
  assert!(!is_well_formed(&uvs, [0, 1, 2]));
}

#[test]
fn test_fully_assigned_triangle_is_untouched() {
  let mut uvs = vec![C, C, C];
  assign_triangle(&mut uvs, [0, 1, 2]);
  assert_eq!(uvs, vec![C, C, C]);
}

#[test]
fn test_shared_edge_propagates_constraints() {
  // Two triangles sharing edge (1, 2): the fourth vertex must take the
  // corner the shared edge lacks, which is the first triangle's vertex 0.
  let mut uvs = blank(4);
  assign_triangle(&mut uvs, [0, 1, 2]);
  assign_triangle(&mut uvs, [2, 1, 3]);
  assert_eq!(uvs[3], uvs[0]);
  assert!(is_well_formed(&uvs, [0, 1, 2]));
  assert!(is_well_formed(&uvs, [2, 1, 3]));
}

#[test]
fn test_out_of_range_indices_are_ignored() {
  let mut uvs = blank(2);
  assign_triangle(&mut uvs, [0, 1, 2]);
  assert_eq!(uvs, blank(2));
}
