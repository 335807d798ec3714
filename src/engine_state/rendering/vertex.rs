//! Vertex data structures for voxel rendering.
//!
//! This module defines the vertex format the mesher emits and the presenter
//! uploads. The layout is `#[repr(C)]` and `Pod`, so a vertex slice can be
//! handed to a graphics API with `bytemuck::cast_slice` without copying.

/// A vertex of a chunk mesh.
///
/// # Memory Layout
/// - Position: [f32; 3] (12 bytes), world space
/// - Normal: [f32; 3] (12 bytes)
/// - Texture Coordinates: [f32; 2] (8 bytes), atlas space
/// - Light: [f32; 4] (16 bytes), `[red, green, blue, sun]` in `0.0..=1.0`
///
/// Total size: 48 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ChunkVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub light: [f32; 4],
}

impl ChunkVertex {
    /// Creates a new vertex with the given parameters.
    ///
    /// # Arguments
    /// * `position` - World-space position
    /// * `normal` - Outward face normal
    /// * `uv` - Atlas texture coordinates
    /// * `light` - Normalized `[red, green, blue, sun]` light of the face
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2], light: [f32; 4]) -> Self {
        ChunkVertex {
            position,
            normal,
            uv,
            light,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ChunkVertex;

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<ChunkVertex>(), 48);
        let vertices = [ChunkVertex::new([1.0; 3], [0.0; 3], [0.5; 2], [1.0; 4]); 2];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 96);
    }
}
