use super::*;

#[test]
fn test_aabb_encapsulate() {
  let mut aabb = MinMaxAABB::empty();
  assert!(!aabb.is_valid());

  aabb.encapsulate(Vec3::new(1.0, 2.0, 3.0));
  aabb.encapsulate(Vec3::new(-1.0, -2.0, -3.0));

  assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, -3.0));
  assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 3.0));
  assert!(aabb.is_valid());
}

#[test]
fn test_observation_from_sensor() {
  let obs = Observation::from_sensor(Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0), 0.5)
    .expect("distinct points give a direction");
  assert_eq!(obs.direction, Vec3::Z);
  assert_eq!(obs.weight, 0.5);

  assert!(Observation::from_sensor(Vec3::ONE, Vec3::ONE, 1.0).is_none());
}

#[test]
fn test_cube_mesh_clear_and_counts() {
  let mut mesh = CubeMesh::new();
  mesh.vertices.extend([Vec3::ZERO, Vec3::X, Vec3::Y]);
  mesh.normals.extend([Vec3::Z; 3]);
  mesh.uvs.extend([Vec2::ZERO; 3]);
  mesh.triangles.extend([0, 1, 2]);
  mesh.recompute_bounds();

  assert_eq!(mesh.vertex_count(), 3);
  assert_eq!(mesh.triangle_count(), 1);
  assert!(mesh.is_consistent());
  assert_eq!(mesh.bounds.max, Vec3::new(1.0, 1.0, 0.0));

  mesh.clear();
  assert!(mesh.is_empty());
  assert_eq!(mesh.triangle_count(), 0);
  assert!(!mesh.bounds.is_valid());
}

#[test]
fn test_cube_mesh_detects_broken_buffers() {
  let mut mesh = CubeMesh::new();
  mesh.vertices.push(Vec3::ZERO);
  mesh.triangles.extend([0, 0]);
  assert!(!mesh.is_consistent());
}
