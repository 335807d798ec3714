//! # Chunk Light Task
//!
//! Second pipeline stage: drains the pending light queues of a chunk once every
//! chunk around it has terrain, since light spills over chunk borders.

use std::sync::Arc;

use log::debug;

use crate::{
    core::PipelineError,
    engine_state::{
        task_management::task::{StageContext, StageTask},
        voxels::{chunk::ChunkStatus, lighting::LightPropagator},
    },
};

/// Propagates light: `Light -> Mesh`.
pub struct ChunkLightTask {
    propagator: Arc<LightPropagator>,
}

impl ChunkLightTask {
    pub fn new(propagator: Arc<LightPropagator>) -> Self {
        ChunkLightTask { propagator }
    }
}

impl StageTask for ChunkLightTask {
    fn name(&self) -> &'static str {
        "light"
    }

    fn input_status(&self) -> ChunkStatus {
        ChunkStatus::Light
    }

    fn output_status(&self) -> ChunkStatus {
        ChunkStatus::Mesh
    }

    /// Inside the render radius, with all eight neighbors generated.
    fn is_ready(&self, context: &StageContext<'_>) -> bool {
        context.distance < context.render_radius && context.neighbors_reached(ChunkStatus::Light)
    }

    fn process(&self, context: &StageContext<'_>) -> Result<(), PipelineError> {
        let coordinate = context.coordinate();
        let writes = context
            .world
            .with_neighborhood_mut(coordinate, |hood| self.propagator.propagate(hood))
            .ok_or(PipelineError::ChunkMissing(coordinate))?;
        debug!(
            "Lit chunk ({}, {}): {} light writes",
            coordinate.x, coordinate.y, writes
        );
        Ok(())
    }
}
