//! # Voxel Engine Core
//!
//! This module contains the voxel data model and the algorithms that fill it:
//! representing blocks, generating terrain and spreading light.
//!
//! ## Architecture
//!
//! The voxel system is organized into several key components:
//!
//! * **Block**: Block identifiers, behaviors, models and the registry
//! * **Palette** / **Light**: Packed per-voxel block codes and 4x4-bit light words
//! * **Chunk**: A column of voxels plus its pipeline status
//! * **World**: Concurrent chunk store with global-position accessors
//! * **Generation**: Deterministic terrain synthesis from noise fields
//! * **Lighting**: Breadth-first propagation of sun and colored light
//! * **Tasks**: The generation and light stages of the pipeline
//!
//! ## Performance Considerations
//!
//! * Chunks store block codes at 1 to 16 bits each, depending on how many
//!   distinct blocks they contain
//! * Light for all four channels fits in one `u16` per voxel
//! * Stages touching several chunks lock them in ascending coordinate order
//!
//! ## Data Flow
//!
//! 1. The scheduler asks for a chunk; the world creates it `Empty`
//! 2. Generation fills the blocks and seeds sunlight at the sky
//! 3. Lighting relaxes the pending queues across the 3x3 neighborhood
//! 4. The mesher reads blocks and light to build geometry

pub mod block;
pub mod chunk;
pub mod generation;
pub mod light;
pub mod lighting;
pub mod palette;
pub mod tasks;
pub mod world;
