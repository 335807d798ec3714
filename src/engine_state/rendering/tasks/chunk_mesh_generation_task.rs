//! Task for generating mesh data for chunks in a background thread.
//!
//! This module contains the `ChunkMeshGenerationTask`, the last worker-side
//! stage. It turns a lit chunk into per-section buffers and leaves them on the
//! chunk for the presentation thread to upload.

use std::sync::Arc;

use log::debug;

use crate::{
    core::PipelineError,
    engine_state::{
        rendering::meshing::{ChunkMesher, ChunkSectionMesh},
        task_management::task::{StageContext, StageTask},
        voxels::chunk::ChunkStatus,
    },
};

/// Builds section meshes: `Mesh -> Upload`.
///
/// Faces on the chunk border sample blocks and light of the neighbors, so the
/// task waits until all eight of them are lit.
pub struct ChunkMeshGenerationTask {
    /// Shared mesher; holds only the registry and atlas
    mesher: Arc<ChunkMesher>,
}

impl ChunkMeshGenerationTask {
    /// Creates a new chunk mesh generation task.
    ///
    /// # Arguments
    /// * `mesher` - The mesher shared by all workers
    pub fn new(mesher: Arc<ChunkMesher>) -> Self {
        ChunkMeshGenerationTask { mesher }
    }
}

impl StageTask for ChunkMeshGenerationTask {
    fn name(&self) -> &'static str {
        "mesh"
    }

    fn input_status(&self) -> ChunkStatus {
        ChunkStatus::Mesh
    }

    fn output_status(&self) -> ChunkStatus {
        ChunkStatus::Upload
    }

    /// One ring inside the render radius, with all eight neighbors lit.
    fn is_ready(&self, context: &StageContext<'_>) -> bool {
        context.distance < context.render_radius - 1
            && context.neighbors_reached(ChunkStatus::Mesh)
    }

    /// Meshes every section and stores the result on the chunk.
    fn process(&self, context: &StageContext<'_>) -> Result<(), PipelineError> {
        let coordinate = context.coordinate();
        let meshes = context
            .world
            .with_neighborhood(coordinate, |hood| self.mesher.mesh_chunk(hood))
            .ok_or(PipelineError::ChunkMissing(coordinate))?;

        debug!(
            "Meshed chunk ({}, {}): {} quads",
            coordinate.x,
            coordinate.y,
            meshes.iter().map(ChunkSectionMesh::quad_count).sum::<usize>()
        );
        *context.chunk.meshes() = meshes;
        Ok(())
    }
}
