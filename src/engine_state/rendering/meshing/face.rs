use cgmath::Vector3;

use super::mesh::MeshBuffers;
use crate::engine_state::rendering::atlas::UvRect;
use crate::engine_state::rendering::ChunkVertex;
use crate::engine_state::voxels::block::{block_side::BlockSide, Cube};

/// Appends one cube face as a quad.
///
/// # Arguments
/// * `buffers` - Destination buffers (solid or transparent)
/// * `cube` - The model cube the face belongs to
/// * `side` - Which face of the cube to emit
/// * `origin` - World position of the voxel's minimum corner
/// * `uv` - Atlas rectangle for the face, already narrowed to the cube's region
/// * `light` - Normalized `[red, green, blue, sun]` light sampled in front of the face
pub fn append_face(
    buffers: &mut MeshBuffers,
    cube: &Cube,
    side: BlockSide,
    origin: Vector3<f32>,
    uv: UvRect,
    light: [f32; 4],
) {
    let [top_left, bottom_left, bottom_right, top_right] = cube.corners(side, origin);
    let normal = side.normal();

    buffers.push_quad([
        ChunkVertex::new(top_left, normal, uv.top_left(), light),
        ChunkVertex::new(bottom_left, normal, uv.bottom_left(), light),
        ChunkVertex::new(bottom_right, normal, uv.bottom_right(), light),
        ChunkVertex::new(top_right, normal, uv.top_right(), light),
    ]);
}
