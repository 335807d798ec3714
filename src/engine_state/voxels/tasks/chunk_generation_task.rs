//! # Chunk Generation Task
//!
//! This module defines the `ChunkGenerationTask`, the first pipeline stage. It
//! fills an `Empty` chunk with terrain and queues its sky voxels for sunlight.

use std::sync::Arc;

use log::debug;

use crate::{
    core::PipelineError,
    engine_state::{
        task_management::task::{StageContext, StageTask},
        voxels::{chunk::ChunkStatus, generation::TerrainGenerator},
    },
};

/// Synthesizes the blocks of a chunk: `Empty -> Light`.
///
/// Generation only depends on the seed and the chunk coordinate, so it never
/// waits for neighbors.
pub struct ChunkGenerationTask {
    generator: Arc<TerrainGenerator>,
}

impl ChunkGenerationTask {
    /// Creates a new chunk generation task.
    ///
    /// # Arguments
    /// * `generator` - The terrain generator shared by all workers
    pub fn new(generator: Arc<TerrainGenerator>) -> Self {
        ChunkGenerationTask { generator }
    }
}

impl StageTask for ChunkGenerationTask {
    fn name(&self) -> &'static str {
        "generation"
    }

    fn input_status(&self) -> ChunkStatus {
        ChunkStatus::Empty
    }

    fn output_status(&self) -> ChunkStatus {
        ChunkStatus::Light
    }

    /// Generates the column and swaps it into the chunk in one write.
    fn process(&self, context: &StageContext<'_>) -> Result<(), PipelineError> {
        let coordinate = context.coordinate();
        let volume = self.generator.generate(coordinate)?;
        debug!(
            "Generated chunk ({}, {}) with {} palette entries",
            coordinate.x,
            coordinate.y,
            volume.blocks().palette_len()
        );
        context.chunk.replace_volume(volume);
        Ok(())
    }
}
