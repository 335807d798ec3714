//! # Engine State Module
//!
//! The top-level container that wires the chunk pipeline together.
//!
//! ## Key Components
//!
//! * `EngineState` - Owns the config, the world and the scheduler
//! * `config` - Immutable settings loaded from JSON
//! * `rendering` - Meshing, the vertex format and the presenter boundary
//! * `task_management` - The pipeline scheduler and its worker pool
//! * `voxels` - Blocks, chunks, terrain generation and lighting
//!
//! ## Architecture
//!
//! `EngineState` is driven from the presentation thread. Each frame the
//! embedding application reports where the observer is, and hands its
//! presenter to `process_uploads`. Everything expensive happens on the
//! scheduler's workers.
//!
//! ## Performance Considerations
//!
//! * Chunks are requested only when the observer crosses a chunk border
//! * Samples for chunks that fell out of range are dropped from the queues
//! * Chunks well outside the radius are evicted from the world

use std::sync::Arc;

use cgmath::Point3;
use log::{debug, info};

use crate::core::PipelineError;
use config::EngineConfig;
use rendering::atlas::{GridTextureAtlas, TextureAtlas};
use rendering::presenter::MeshPresenter;
use task_management::{PipelineScheduler, PipelineStats};
use voxels::block::{BlockId, BlockRegistry, DefaultBlockRegistry};
use voxels::chunk::{ChunkCoordinate, ChunkStatus};
use voxels::generation::{FbmNoiseProvider, NoiseProvider};
use voxels::world::{chunk_distance, chunks_in_radius, World};

pub mod config;
pub mod rendering;
pub mod task_management;
pub mod voxels;

/// Chunks farther than the render radius plus this margin are evicted.
const EVICTION_MARGIN: i32 = 2;

/// The main state container for the pipeline.
///
/// # Examples
///
/// ```no_run
/// use cgmath::Point3;
/// use voxel_pipeline::engine_state::config::EngineConfig;
/// use voxel_pipeline::engine_state::rendering::presenter::MeshBufferState;
/// use voxel_pipeline::engine_state::EngineState;
///
/// let mut engine_state = EngineState::new(EngineConfig::default()).unwrap();
/// engine_state.start().unwrap();
/// let mut presenter = MeshBufferState::new();
///
/// // Main loop
/// loop {
///     engine_state.update_observer(Point3::new(0, 64, 0));
///     engine_state.process_uploads(&mut presenter).unwrap();
/// }
/// ```
pub struct EngineState {
    /// Validated settings shared by every component
    pub config: Arc<EngineConfig>,
    /// The chunk store
    pub world: Arc<World>,
    /// Drives chunks through the pipeline
    pub scheduler: PipelineScheduler,
    /// Chunk the observer was last seen in
    observer: Option<ChunkCoordinate>,
    /// Evicted chunks the presenter has not been told about yet
    evicted: Vec<ChunkCoordinate>,
}

impl EngineState {
    /// Creates an engine with the built-in blocks, Perlin terrain and the
    /// default texture atlas.
    ///
    /// # Errors
    /// Returns `PipelineError::Config` if the configuration is invalid.
    pub fn new(config: EngineConfig) -> Result<Self, PipelineError> {
        Self::with_collaborators(
            config,
            Arc::new(DefaultBlockRegistry::with_builtin_blocks()),
            Arc::new(FbmNoiseProvider::new()),
            Arc::new(GridTextureAtlas::with_default_textures()),
        )
    }

    /// Creates an engine with caller-supplied block registry, noise and atlas.
    ///
    /// # Arguments
    /// * `config` - Settings; validated before anything is built
    /// * `registry` - Block behaviors
    /// * `noise` - Noise fields for the terrain generator
    /// * `atlas` - Texture lookup for the mesher
    pub fn with_collaborators(
        config: EngineConfig,
        registry: Arc<dyn BlockRegistry>,
        noise: Arc<dyn NoiseProvider>,
        atlas: Arc<dyn TextureAtlas>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let config = Arc::new(config);
        let world = Arc::new(World::new(config.clone(), registry));
        let scheduler = PipelineScheduler::new(world.clone(), noise, atlas);

        Ok(Self {
            config,
            world,
            scheduler,
            observer: None,
            evicted: Vec::new(),
        })
    }

    /// Spawns the configured number of workers.
    pub fn start(&self) -> Result<(), PipelineError> {
        self.scheduler.start(self.config.worker_count)
    }

    /// Reports the observer's block position.
    ///
    /// When the observer entered a new chunk, every chunk within the render
    /// radius is requested (the observer's chunk and its ring at high
    /// priority), queued samples that fell out of range are dropped, and far
    /// chunks are evicted.
    ///
    /// # Returns
    /// `true` if the observer changed chunks.
    pub fn update_observer(&mut self, position: Point3<i32>) -> bool {
        let center = self.world.chunk_coordinate_of(position);
        if self.observer == Some(center) {
            return false;
        }
        self.observer = Some(center);
        debug!("Observer entered chunk ({}, {})", center.x, center.y);
        self.request_around(center);
        true
    }

    fn request_around(&mut self, center: ChunkCoordinate) {
        let radius = self.scheduler.render_radius();
        self.scheduler.discard_outside(center, radius);

        for (coordinate, distance) in chunks_in_radius(center, radius) {
            self.scheduler.request(coordinate, distance, distance <= 1);
        }

        let eviction_radius = radius + EVICTION_MARGIN;
        for coordinate in self.world.loaded_coordinates() {
            if chunk_distance(center, coordinate) > eviction_radius {
                self.world.remove_chunk(coordinate);
                self.evicted.push(coordinate);
            }
        }
    }

    /// Changes the render radius and re-requests around the observer.
    pub fn set_render_radius(&mut self, radius: i32) {
        self.scheduler.set_render_radius(radius);
        if let Some(center) = self.observer {
            self.request_around(center);
        }
    }

    /// Hands finished chunks to `presenter` and tells it about evictions.
    /// Must always be called from the same thread.
    ///
    /// # Returns
    /// Number of chunks published.
    pub fn process_uploads(
        &mut self,
        presenter: &mut dyn MeshPresenter,
    ) -> Result<usize, PipelineError> {
        let published = self.scheduler.poll_uploads(presenter)?;
        for coordinate in self.evicted.drain(..) {
            presenter.remove_chunk(coordinate);
        }
        Ok(published)
    }

    /// Places `id` at `position` and re-queues the chunks that can see it.
    ///
    /// # Returns
    /// `true` if a loaded voxel changed.
    pub fn set_block(&self, position: Point3<i32>, id: BlockId) -> Result<bool, PipelineError> {
        let changed = self.world.set_block_at(position, id)?;
        if changed {
            self.scheduler.block_changed(position);
        }
        Ok(changed)
    }

    pub fn status(&self, coordinate: ChunkCoordinate) -> Option<ChunkStatus> {
        self.scheduler.status(coordinate)
    }

    pub fn stats(&self) -> PipelineStats {
        self.scheduler.stats()
    }

    /// Stops the workers. The world is left as it is.
    pub fn shutdown(&self) {
        let stats = self.scheduler.stats();
        info!(
            "Shutting down: {} generated, {} lit, {} meshed, {} uploaded, {} failed",
            stats.generation.completed,
            stats.light.completed,
            stats.meshing.completed,
            stats.uploaded,
            stats.failed
        );
        self.scheduler.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point2;
    use config::ConfigError;

    fn small_config() -> EngineConfig {
        EngineConfig {
            chunk_size: 16,
            section_count: 2,
            sea_level: 12,
            render_radius: 3,
            worker_count: 0,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig {
            chunk_size: 8,
            ..small_config()
        };
        let result = EngineState::new(config);
        assert!(matches!(
            result,
            Err(PipelineError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn observer_requests_only_on_chunk_change() {
        let mut state = EngineState::new(small_config()).unwrap();

        assert!(state.update_observer(Point3::new(3, 20, 3)));
        assert_eq!(state.world.chunk_count(), 49);
        assert!(!state.update_observer(Point3::new(15, 0, 0)));
        assert_eq!(state.stats().queued, 49);

        // One chunk over: a new column of seven comes in range.
        assert!(state.update_observer(Point3::new(16, 0, 0)));
        assert_eq!(state.world.chunk_count(), 56);
    }

    #[test]
    fn far_chunks_are_evicted() {
        let mut state = EngineState::new(small_config()).unwrap();
        state.update_observer(Point3::new(0, 0, 0));
        state.update_observer(Point3::new(16 * 10, 0, 0));

        assert!(state.world.get_chunk_at(Point2::new(0, 0)).is_none());
        assert!(state.world.get_chunk_at(Point2::new(10, 0)).is_some());
        assert_eq!(state.evicted.len(), 49);
    }
}
