//! Mesh data structures for chunk sections.
//!
//! Every section of a chunk is meshed into two independent buffer pairs:
//! opaque geometry and transparent geometry, so the presenter can draw them in
//! separate passes.

use crate::engine_state::rendering::ChunkVertex;

/// A vertex buffer and the index buffer that draws it as triangles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffers {
    pub vertices: Vec<ChunkVertex>,
    pub indices: Vec<u32>,
}

impl MeshBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one quad. Corners must be ordered top-left, bottom-left,
    /// bottom-right, top-right.
    pub fn push_quad(&mut self, corners: [ChunkVertex; 4]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&corners);
        self.indices.extend_from_slice(&Self::generate_face_indices(base));
    }

    /// Generates the two triangles of a quad whose first vertex is `base`.
    ///
    /// # Returns
    /// `(m, m+1, m+2), (m+2, m+3, m)` with `m = base`.
    pub fn generate_face_indices(base: u32) -> [u32; 6] {
        [base, base + 1, base + 2, base + 2, base + 3, base]
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Size of both buffers in bytes.
    pub fn byte_len(&self) -> usize {
        std::mem::size_of_val(self.vertices.as_slice()) + std::mem::size_of_val(self.indices.as_slice())
    }
}

/// Geometry of one cubic section of a chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkSectionMesh {
    /// Section index, counted from the bottom of the column.
    pub section: usize,
    pub solid: MeshBuffers,
    pub transparent: MeshBuffers,
}

impl ChunkSectionMesh {
    pub fn new(section: usize) -> Self {
        Self {
            section,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.solid.is_empty() && self.transparent.is_empty()
    }

    pub fn quad_count(&self) -> usize {
        self.solid.quad_count() + self.transparent.quad_count()
    }
}
