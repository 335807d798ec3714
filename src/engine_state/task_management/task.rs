//! # Pipeline Stage Traits
//!
//! Every step a chunk goes through between `Empty` and `Upload` is a
//! `StageTask`. The scheduler owns one instance per stage and calls it from
//! any worker thread.
//!
//! ## Stage Lifecycle
//! 1. A sample for a chunk whose status equals `input_status()` is dequeued
//! 2. The worker takes the chunk's claim token
//! 3. `is_ready()` is asked whether the neighbors allow the stage to run;
//!    if not, the sample is parked until some chunk advances
//! 4. `process()` runs under a panic guard
//! 5. On success the status moves to `output_status()` and the chunk is routed
//!    to the next queue; on error or panic it becomes `Failed`
//!
//! ## Thread Safety
//! - Stages are shared by all workers and must be `Send + Sync`
//! - All per-chunk state lives in the chunk; a stage keeps only immutable
//!   collaborators such as the generator or the mesher

use std::sync::Arc;

use crate::core::PipelineError;
use crate::engine_state::voxels::chunk::{Chunk, ChunkCoordinate, ChunkStatus};
use crate::engine_state::voxels::world::World;

/// Everything a stage may look at while handling one sample.
pub struct StageContext<'a> {
    pub world: &'a World,
    pub chunk: &'a Arc<Chunk>,
    /// Distance to the observer in chunks, as given by the request
    pub distance: i32,
    /// Render radius at the time the sample was dequeued
    pub render_radius: i32,
}

impl StageContext<'_> {
    pub fn coordinate(&self) -> ChunkCoordinate {
        self.chunk.position
    }

    /// `true` if all eight neighbors are loaded and at or past `stage`.
    pub fn neighbors_reached(&self, stage: ChunkStatus) -> bool {
        self.world.neighbors_reached(self.coordinate(), stage)
    }
}

/// One step of the chunk state machine.
pub trait StageTask: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Status a chunk must have for this stage to pick it up.
    fn input_status(&self) -> ChunkStatus;

    /// Status the chunk moves to once `process` succeeds.
    fn output_status(&self) -> ChunkStatus;

    /// Whether the sample can be processed now.
    ///
    /// Returning `false` is not an error: the sample is parked and retried
    /// after the next chunk advances.
    fn is_ready(&self, _context: &StageContext<'_>) -> bool {
        true
    }

    /// Does the work of the stage for the claimed chunk.
    ///
    /// # Returns
    /// `Ok(())` on success. Any error (or panic) marks the chunk `Failed`.
    fn process(&self, context: &StageContext<'_>) -> Result<(), PipelineError>;
}
