//! Rendering side of the pipeline.
//!
//! This module turns chunk voxels into drawable geometry and defines the
//! boundary to whatever presents it. Nothing in here talks to a graphics API:
//! the mesher fills plain vertex and index buffers, and a `MeshPresenter`
//! receives them on the presentation thread.

pub mod atlas;
pub mod meshing;
pub mod presenter;
pub mod tasks;
mod vertex;

// Re-export commonly used types
pub use vertex::ChunkVertex;
