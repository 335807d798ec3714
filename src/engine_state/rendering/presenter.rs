//! # Mesh Presenter
//!
//! The boundary between the pipeline and whatever draws the world. Finished
//! section meshes are handed over on the presentation thread, exactly once per
//! `Upload -> Done` transition of a chunk.
//!
//! `MeshBufferState` is an in-memory presenter: it keeps the latest buffers of
//! every section together with upload analytics. It backs the headless binary
//! and the tests, and is a reference for GPU-backed implementations.

use std::collections::HashMap;

use log::debug;

use super::meshing::{ChunkSectionMesh, MeshBuffers};
use crate::engine_state::voxels::chunk::ChunkCoordinate;

/// Receives finished section geometry on the presentation thread.
pub trait MeshPresenter {
    /// Publishes the buffers of one section, replacing any earlier upload of
    /// the same section.
    fn upload_section(&mut self, coordinate: ChunkCoordinate, section: usize, mesh: &ChunkSectionMesh);

    /// Forgets every section of a chunk, e.g. after it was evicted.
    fn remove_chunk(&mut self, _coordinate: ChunkCoordinate) {}
}

/// Upload analytics of a [`MeshBufferState`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadAnalytics {
    /// Number of `upload_section` calls
    pub sections_uploaded: u64,
    /// Total bytes of vertex and index data received
    pub bytes_uploaded: u64,
    /// Bytes currently held
    pub resident_bytes: u64,
}

/// In-memory presenter keyed by `(chunk, section)`.
#[derive(Debug, Default)]
pub struct MeshBufferState {
    sections: HashMap<(ChunkCoordinate, usize), ChunkSectionMesh>,
    analytics: UploadAnalytics,
}

impl MeshBufferState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(&self, coordinate: ChunkCoordinate, section: usize) -> Option<&ChunkSectionMesh> {
        self.sections.get(&(coordinate, section))
    }

    /// Number of chunks with at least one uploaded section.
    pub fn chunk_count(&self) -> usize {
        let mut chunks: Vec<_> = self.sections.keys().map(|(coordinate, _)| *coordinate).collect();
        chunks.sort_by_key(|coordinate| (coordinate.x, coordinate.y));
        chunks.dedup();
        chunks.len()
    }

    /// Total quads currently held, solid and transparent.
    pub fn quad_count(&self) -> usize {
        self.sections.values().map(ChunkSectionMesh::quad_count).sum()
    }

    pub fn analytics(&self) -> UploadAnalytics {
        self.analytics
    }

    fn section_bytes(mesh: &ChunkSectionMesh) -> u64 {
        (MeshBuffers::byte_len(&mesh.solid) + MeshBuffers::byte_len(&mesh.transparent)) as u64
    }
}

impl MeshPresenter for MeshBufferState {
    fn upload_section(&mut self, coordinate: ChunkCoordinate, section: usize, mesh: &ChunkSectionMesh) {
        let bytes = Self::section_bytes(mesh);
        self.analytics.sections_uploaded += 1;
        self.analytics.bytes_uploaded += bytes;
        self.analytics.resident_bytes += bytes;

        if let Some(previous) = self.sections.insert((coordinate, section), mesh.clone()) {
            self.analytics.resident_bytes -= Self::section_bytes(&previous);
        }
    }

    fn remove_chunk(&mut self, coordinate: ChunkCoordinate) {
        let mut freed = 0;
        self.sections.retain(|(owner, _), mesh| {
            if *owner == coordinate {
                freed += Self::section_bytes(mesh);
                false
            } else {
                true
            }
        });
        self.analytics.resident_bytes -= freed;
        debug!(
            "Released {} bytes of chunk ({}, {})",
            freed, coordinate.x, coordinate.y
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::rendering::ChunkVertex;
    use cgmath::Point2;

    fn one_quad(section: usize) -> ChunkSectionMesh {
        let mut mesh = ChunkSectionMesh::new(section);
        let vertex = ChunkVertex::new([0.0; 3], [0.0; 3], [0.0; 2], [0.0; 4]);
        mesh.solid.push_quad([vertex; 4]);
        mesh
    }

    #[test]
    fn reupload_replaces_the_section() {
        let mut state = MeshBufferState::new();
        let coordinate = Point2::new(1, 2);

        state.upload_section(coordinate, 0, &one_quad(0));
        state.upload_section(coordinate, 0, &one_quad(0));
        state.upload_section(coordinate, 1, &ChunkSectionMesh::new(1));

        let analytics = state.analytics();
        assert_eq!(analytics.sections_uploaded, 3);
        assert_eq!(analytics.bytes_uploaded, 2 * (4 * 48 + 6 * 4));
        assert_eq!(analytics.resident_bytes, 4 * 48 + 6 * 4);
        assert_eq!(state.quad_count(), 1);
        assert_eq!(state.chunk_count(), 1);
    }

    #[test]
    fn removing_a_chunk_frees_its_sections() {
        let mut state = MeshBufferState::new();
        state.upload_section(Point2::new(0, 0), 0, &one_quad(0));
        state.upload_section(Point2::new(0, 1), 0, &one_quad(0));

        state.remove_chunk(Point2::new(0, 0));

        assert!(state.section(Point2::new(0, 0), 0).is_none());
        assert!(state.section(Point2::new(0, 1), 0).is_some());
        assert_eq!(state.analytics().resident_bytes, 4 * 48 + 6 * 4);
    }
}
