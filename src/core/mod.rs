//! # Core Module
//!
//! Shared concurrency primitives and the pipeline's error type.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking
//! - `PipelineError`: Everything a pipeline operation can fail with
//!
//! ## Usage
//! ```rust
//! use voxel_pipeline::core::MtResource;
//!
//! let counter = MtResource::new(0);
//! *counter.get_mut() += 1;
//! assert_eq!(*counter.get(), 1);
//! ```

pub mod error;
pub mod mt_resource;

pub use error::PipelineError;
pub use mt_resource::MtResource;
