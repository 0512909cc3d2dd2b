//! fusion_mesh - Engine independent depth fusion and incremental meshing
//!
//! This crate turns a stream of oriented 3D points from a depth sensor into a
//! triangle mesh that is refined as observations accumulate. Space is split
//! into cubes, each holding a sparse grid of voxels with a fused signed
//! distance value. Dirty cubes are re-polygonized with Marching Cubes under a
//! per-tick time budget.
//!
//! # Features
//!
//! - **Weighted fusion**: Running signed-distance averages per voxel with a
//!   weight cap and secondary samples along the observation ray
//! - **Seamless cubes**: Observations on a cube's low faces are replicated
//!   into the neighbors' margin voxels
//! - **Budgeted remeshing**: FIFO scheduler sized by a smoothed cost estimate
//! - **Host-agnostic output**: Meshes go out through [`MeshPresenter`]
//!
//! # Example
//!
//! ```ignore
//! use fusion_mesh::{FusionConfig, FusionManager};
//! use glam::Vec3;
//!
//! let mut manager = FusionManager::new(FusionConfig::default())?;
//!
//! // Feed observations from the sensor...
//! manager.insert_observation(Vec3::new(0.4, 0.5, 0.6), Vec3::Z, 1.0);
//!
//! // Once per frame
//! let tick = manager.update();
//! let stats = manager.compute_stats();
//! println!("{} cubes, {} triangles", stats.total_cubes, stats.total_triangles);
//! ```

pub mod constants;
pub mod hash;
pub mod key_tree;
pub mod types;

// Re-export commonly used items
pub use constants::{CORNER_OFFSETS, EMPTY_VALUE, NEIGHBOR_OFFSETS};
pub use hash::GridHasher;
pub use key_tree::KeyTree;
pub use types::{CubeKey, CubeMesh, MeshStats, MinMaxAABB, Observation, VoxelHit, VoxelKey};

// Tunables and their validation
pub mod config;
pub use config::{ConfigError, FusionConfig};

// Per-cube sparse voxel grid
pub mod voxel;
pub use voxel::{FuseOutcome, Voxel, VoxelField};

// Marching Cubes polygonization
pub mod marching_cubes;

// Triangle UV palette
pub mod uv;

// Meshing cube: voxel field + mesh buffers
pub mod cube;
pub use cube::{MeshingCube, RegenerationStats};

// Budgeted regeneration queue
pub mod clock;
pub mod scheduler;
pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::{RemeshScheduler, TickStats};

// Host callbacks
pub mod presentation;
pub use presentation::{MeshPresenter, NullPresenter, ResourceHandle};

// Observation feeds
pub mod source;
pub use source::{channel, BufferedSource, ChannelSource, ObservationSender, PointSource};

// Ray queries
pub mod raycast;

// Engine-agnostic metrics
pub mod metrics;
pub use metrics::FusionMetrics;

// Top-level orchestrator
pub mod manager;
pub use manager::FusionManager;
