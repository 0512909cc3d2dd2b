//! MeshPresenter - callback interface for whatever renders the cubes.
//!
//! The fusion core never owns GPU buffers or scene objects. It asks the host
//! for an opaque handle when a cube is created, hands the handle back with
//! fresh buffers after every regeneration, and releases it on clear.

use glam::Vec3;

use crate::types::{CubeKey, CubeMesh};

/// Opaque host-side resource backing one cube.
///
/// The core never interprets the value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceHandle(pub u64);

/// Callback interface for engine bridges.
///
/// # Example
///
/// ```ignore
/// struct SceneBridge {
///     scene: Scene,
/// }
///
/// impl MeshPresenter for SceneBridge {
///     fn instantiate_cube(&mut self, _key: CubeKey, world_position: Vec3) -> ResourceHandle {
///         ResourceHandle(self.scene.spawn_mesh_object(world_position))
///     }
///     fn publish_mesh(&mut self, handle: ResourceHandle, mesh: &CubeMesh) {
///         self.scene.upload(handle.0, mesh);
///     }
///     fn destroy_cube(&mut self, handle: ResourceHandle) {
///         self.scene.despawn(handle.0);
///     }
/// }
/// ```
pub trait MeshPresenter {
  /// Called once when a cube is created at `world_position` (its minimum
  /// corner).
  fn instantiate_cube(&mut self, key: CubeKey, world_position: Vec3) -> ResourceHandle;

  /// Called after a cube's mesh has been regenerated.
  fn publish_mesh(&mut self, handle: ResourceHandle, mesh: &CubeMesh);

  /// Called when a cube is released.
  fn destroy_cube(&mut self, handle: ResourceHandle);
}

/// No-op implementation for testing and headless operation.
///
/// Hands out sequential handles so they stay distinguishable.
#[derive(Debug, Default)]
pub struct NullPresenter {
  next: u64,
}

impl MeshPresenter for NullPresenter {
  fn instantiate_cube(&mut self, _key: CubeKey, _world_position: Vec3) -> ResourceHandle {
    let handle = ResourceHandle(self.next);
    self.next += 1;
    handle
  }

  fn publish_mesh(&mut self, _handle: ResourceHandle, _mesh: &CubeMesh) {
    // No-op
  }

  fn destroy_cube(&mut self, _handle: ResourceHandle) {
    // No-op
  }
}
