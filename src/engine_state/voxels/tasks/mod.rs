//! # Voxel Task System
//!
//! Pipeline stages that work on voxel data: terrain generation and light
//! propagation. Both run on the worker pool.

pub mod chunk_generation_task;
pub mod chunk_light_task;

pub use chunk_generation_task::ChunkGenerationTask;
pub use chunk_light_task::ChunkLightTask;
