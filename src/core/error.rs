use std::thread::ThreadId;

use thiserror::Error;

use crate::engine_state::config::ConfigError;
use crate::engine_state::voxels::chunk::ChunkCoordinate;
use crate::engine_state::voxels::palette::PaletteError;

/// Errors surfaced by the chunk pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("voxel store error: {0}")]
    Palette(#[from] PaletteError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Uploads belong to the first thread that polled them.
    #[error("uploads are owned by thread {owner:?}, polled from {caller:?}")]
    WrongThread { owner: ThreadId, caller: ThreadId },

    #[error("stage `{stage}` panicked: {message}")]
    StagePanicked { stage: &'static str, message: String },

    /// The chunk was unloaded while a stage was working on it.
    #[error("chunk ({}, {}) is no longer loaded", .0.x, .0.y)]
    ChunkMissing(ChunkCoordinate),

    #[error("failed to spawn pipeline worker: {0}")]
    Spawn(#[source] std::io::Error),
}

impl PipelineError {
    /// Builds a `StagePanicked` error from a `catch_unwind` payload.
    pub fn from_panic(stage: &'static str, payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|message| message.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        PipelineError::StagePanicked { stage, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_become_messages() {
        let payload = std::panic::catch_unwind(|| panic!("boom {}", 7)).unwrap_err();
        let error = PipelineError::from_panic("mesh", payload);
        assert_eq!(error.to_string(), "stage `mesh` panicked: boom 7");
    }
}
