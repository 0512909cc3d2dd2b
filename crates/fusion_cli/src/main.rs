//! Synthetic depth scan driver.
//!
//! Orbits a simulated depth sensor around an analytic scene, fuses every
//! frame into a [`FusionManager`] and reports the resulting mesh.
//!
//! Per frame:
//! - capture: sphere-trace a depth image and turn hits into observations
//! - fuse: drain the observations into the manager
//! - update: queue dirty cubes and regenerate within the time budget

mod config;
mod scan;

use std::collections::HashMap;
use std::path::PathBuf;
use std::thread;

use anyhow::{bail, Context, Result};
use clap::Parser;
use fusion_mesh::{
  BufferedSource, CubeKey, CubeMesh, FusionManager, MeshPresenter, ResourceHandle,
};
use glam::Vec3;

use config::Config;
use scan::OrbitSensor;

/// Synthetic depth scan driver for fusion_mesh.
#[derive(Parser, Debug)]
#[command(name = "fusion_scan")]
#[command(about = "Fuses a simulated depth scan into an incremental mesh")]
struct Args {
  /// Path to configuration TOML file (defaults for every key when omitted).
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Override the number of frames to simulate.
  #[arg(short, long)]
  frames: Option<u32>,

  /// Override the regeneration budget per frame in milliseconds.
  #[arg(short, long)]
  budget_ms: Option<f32>,

  /// Capture on a separate thread and hand frames over a channel.
  #[arg(long)]
  threaded: bool,
}

/// Keeps the latest triangle count per published cube.
#[derive(Default)]
struct StatsPresenter {
  next: u64,
  triangles: HashMap<ResourceHandle, usize>,
  published: u64,
}

impl MeshPresenter for StatsPresenter {
  fn instantiate_cube(&mut self, key: CubeKey, world_position: Vec3) -> ResourceHandle {
    let handle = ResourceHandle(self.next);
    self.next += 1;
    self.triangles.insert(handle, 0);
    log::trace!("cube {key} at {world_position} -> {handle:?}");
    handle
  }

  fn publish_mesh(&mut self, handle: ResourceHandle, mesh: &CubeMesh) {
    self.triangles.insert(handle, mesh.triangle_count());
    self.published += 1;
  }

  fn destroy_cube(&mut self, handle: ResourceHandle) {
    self.triangles.remove(&handle);
  }
}

fn main() -> Result<()> {
  env_logger::init();
  let args = Args::parse();

  let mut config = match &args.config {
    Some(path) => {
      println!("Loading config from: {}", path.display());
      Config::load(path)?
    }
    None => Config::default(),
  };
  if let Some(frames) = args.frames {
    config.sensor.frames = frames;
  }
  if let Some(budget_ms) = args.budget_ms {
    config.fusion.time_budget_ms = Some(budget_ms);
  }

  let fusion_config = config.fusion.to_config();
  let mut manager = FusionManager::with_presenter(fusion_config, StatsPresenter::default())
    .context("Invalid [fusion] configuration")?;

  println!(
    "Scanning {} frames at {} voxels per cube edge",
    config.sensor.frames,
    manager.config().resolution
  );

  let sensor = OrbitSensor::new(config.scene, config.sensor.clone());
  let frames = config.sensor.frames;
  let fused = if args.threaded {
    run_threaded(&mut manager, sensor, frames)?
  } else {
    run_inline(&mut manager, sensor, frames)
  };

  // Drain whatever the per-frame budget left behind.
  manager.queue_dirty_for_regeneration();
  while manager.pending_regenerations() > 0 {
    manager.tick(f32::MAX);
  }

  let stats = manager.compute_stats();
  let presenter = manager.presenter();
  let presented: usize = presenter.triangles.values().sum();
  println!("\nObservations fused: {fused}");
  println!("Cubes:              {}", stats.total_cubes);
  println!("Vertices:           {}", stats.total_vertices);
  println!("Triangles:          {}", stats.total_triangles);
  println!("Meshes published:   {}", presenter.published);
  println!("Smoothed cost:      {:.3} ms/cube", manager.smoothed_cost_ms());
  if fusion_mesh::metrics::is_enabled() {
    let metrics = manager.metrics();
    println!("Dropped samples:    {}", metrics.observations_dropped());
    println!("Avg regeneration:   {:.1} us", metrics.avg_regen_timing_us());
  }

  if presented != stats.total_triangles {
    bail!("presenter holds {presented} triangles but cubes hold {}", stats.total_triangles);
  }
  Ok(())
}

fn run_inline(manager: &mut FusionManager<StatsPresenter>, mut sensor: OrbitSensor, frames: u32) -> usize {
  let mut fused = 0;
  for frame in 0..frames {
    let mut source: BufferedSource = sensor.capture().into_iter().collect();
    fused += manager.drain_source(&mut source);
    let tick = manager.update();
    log::debug!(
      "frame {frame}: regenerated {}, pending {}",
      tick.regenerated,
      tick.pending
    );
  }
  fused
}

fn run_threaded(
  manager: &mut FusionManager<StatsPresenter>,
  mut sensor: OrbitSensor,
  frames: u32,
) -> Result<usize> {
  let (sender, mut source) = fusion_mesh::channel(4);
  let producer = thread::spawn(move || {
    for _ in 0..frames {
      if !sender.send_batch(sensor.capture()) {
        break;
      }
    }
  });

  let mut fused = 0;
  let mut frame = 0u32;
  while !source.is_finished() {
    fused += manager.drain_source(&mut source);
    let tick = manager.update();
    log::debug!(
      "frame {frame}: regenerated {}, pending {}",
      tick.regenerated,
      tick.pending
    );
    frame += 1;
    thread::yield_now();
  }

  if producer.join().is_err() {
    bail!("sensor thread panicked");
  }
  Ok(fused)
}
