#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Pipeline
//!
//! A concurrent chunk processing pipeline for voxel worlds.
//!
//! The crate keeps a practically infinite world of chunk columns and, for
//! every chunk near an observer, deterministically generates its blocks,
//! propagates sun and colored light, and builds face-culled geometry, all on
//! a pool of worker threads so the presentation thread never blocks.
//!
//! ## Key Modules
//!
//! * `core` - Shared concurrency primitives and the pipeline error type
//! * `engine_state` - Configuration, voxel data, meshing and the scheduler
//!
//! ## Architecture
//!
//! Every chunk moves through `Empty -> Light -> Mesh -> Upload -> Done`:
//! * Generation fills the blocks from noise and seeds sunlight at the sky
//! * Lighting waits until all eight neighbors have terrain, then relaxes light
//!   across the 3x3 neighborhood
//! * Meshing waits until all eight neighbors are lit, then emits the visible
//!   faces of every section
//! * The presentation thread uploads the buffers and marks the chunk done
//!
//! ## Usage
//!
//! ```no_run
//! fn main() {
//!     if let Err(err) = voxel_pipeline::run() {
//!         eprintln!("{err}");
//!     }
//! }
//! ```
//!
//! ## Performance Considerations
//!
//! * Palette-compressed block storage and one `u16` of light per voxel
//! * Per-stage tiered queues with parking instead of busy retries
//! * Neighborhood locks taken in ascending coordinate order

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use cgmath::{Point2, Point3};
use log::info;
use web_time::Instant;

pub mod core;
pub mod engine_state;

pub use crate::core::PipelineError;
pub use engine_state::config::{ConfigError, EngineConfig};
pub use engine_state::rendering::presenter::{MeshBufferState, MeshPresenter};
pub use engine_state::task_management::{PipelineScheduler, PipelineStats};
pub use engine_state::voxels::chunk::{ChunkCoordinate, ChunkStatus};
pub use engine_state::EngineState;

use engine_state::voxels::world::chunks_in_radius;

/// Longest the headless run waits for the area around the origin.
const RUN_TIMEOUT: Duration = Duration::from_secs(120);

/// Time between two presentation frames of the headless run.
const FRAME_TIME: Duration = Duration::from_millis(16);

/// Headless run: builds the area around the origin and reports statistics.
///
/// The config is read from the JSON file named by the first command line
/// argument, or the defaults are used.
pub fn run() -> Result<(), PipelineError> {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let mut state = EngineState::new(config)?;
    state.start()?;

    let origin = Point2::new(0, 0);
    let radius = state.config.render_radius;
    // Only chunks one ring inside the radius get meshed.
    let expected = if radius >= 2 {
        chunks_in_radius(origin, radius - 2).len()
    } else {
        0
    };

    let started = Instant::now();
    let mut presenter = MeshBufferState::new();
    let mut done = 0;
    state.update_observer(Point3::new(0, state.config.sea_level, 0));

    while done < expected && started.elapsed() < RUN_TIMEOUT {
        done += state.process_uploads(&mut presenter)?;
        thread::sleep(FRAME_TIME);
    }

    let analytics = presenter.analytics();
    info!(
        "{} of {} chunks done in {:?}: {} quads, {} bytes resident",
        done,
        expected,
        started.elapsed(),
        presenter.quad_count(),
        analytics.resident_bytes
    );
    let stats = state.stats();
    info!(
        "Average generation {:?}, light {:?}, meshing {:?}",
        stats.generation.average, stats.light.average, stats.meshing.average
    );

    state.shutdown();
    Ok(())
}
