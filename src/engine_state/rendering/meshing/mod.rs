//! Mesh generation for chunk columns.
//!
//! This module turns the voxels of a chunk into per-section vertex and index
//! buffers with simple face culling.
//!
//! # Architecture
//! - `ChunkMesher`: walks every voxel of a section and emits visible faces
//! - `face`: builds the four vertices of one face
//! - `mesh`: section buffers handed to the presenter
//!
//! # Face Culling
//! A face is emitted when the voxel on the other side does not hide it:
//! - a transparent voxel shows a face toward every non-solid neighbor
//! - an opaque voxel shows a face toward every neighbor that is non-solid or
//!   transparent
//! - voxels that are neither solid nor transparent (air) emit nothing
//!
//! Two adjacent glass voxels therefore share no face, while glass next to
//! stone shows the stone behind it.
//!
//! # Performance Considerations
//! - Sections are meshed independently, so an edit only needs its chunk and
//!   the neighbors redone
//! - Neighbor lookups go through the 3x3 neighborhood, which resolves the
//!   owning chunk with a couple of integer divisions

use std::ops::Deref;
use std::sync::Arc;

use cgmath::{Point3, Vector3};

use crate::engine_state::rendering::atlas::TextureAtlas;
use crate::engine_state::voxels::block::{block_side::BlockSide, BlockId, BlockRegistry};
use crate::engine_state::voxels::chunk::{ChunkNeighborhood, ChunkVolume};

pub mod face;
pub mod mesh;

pub use mesh::{ChunkSectionMesh, MeshBuffers};

/// Builds section meshes from a chunk neighborhood.
pub struct ChunkMesher {
    registry: Arc<dyn BlockRegistry>,
    atlas: Arc<dyn TextureAtlas>,
}

impl ChunkMesher {
    pub fn new(registry: Arc<dyn BlockRegistry>, atlas: Arc<dyn TextureAtlas>) -> Self {
        Self { registry, atlas }
    }

    /// Meshes every section of the center chunk.
    ///
    /// # Returns
    /// One mesh per section, bottom to top. Sections without visible faces
    /// yield empty buffers.
    pub fn mesh_chunk<G>(&self, hood: &ChunkNeighborhood<G>) -> Vec<ChunkSectionMesh>
    where
        G: Deref<Target = ChunkVolume>,
    {
        let section_count = (hood.height() / hood.chunk_size()).max(1) as usize;
        (0..section_count)
            .map(|section| self.mesh_section(hood, section))
            .collect()
    }

    /// Meshes one cubic section of the center chunk.
    pub fn mesh_section<G>(&self, hood: &ChunkNeighborhood<G>, section: usize) -> ChunkSectionMesh
    where
        G: Deref<Target = ChunkVolume>,
    {
        let mut mesh = ChunkSectionMesh::new(section);
        let center = hood.center();
        let origin = center.origin();
        let size = hood.chunk_size();
        let bottom = section as i32 * size;
        let top = (bottom + size).min(hood.height());

        for y in bottom..top {
            for z in 0..size {
                for x in 0..size {
                    let local = Point3::new(x, y, z);
                    let global = Point3::new(origin.x + x, y, origin.z + z);
                    self.mesh_voxel(hood, center.block(local), global, &mut mesh);
                }
            }
        }

        mesh
    }

    fn mesh_voxel<G>(
        &self,
        hood: &ChunkNeighborhood<G>,
        id: &BlockId,
        global: Point3<i32>,
        mesh: &mut ChunkSectionMesh,
    ) where
        G: Deref<Target = ChunkVolume>,
    {
        let Some(block) = self.registry.block(id) else {
            return;
        };
        let transparent = block.is_transparent();
        if !block.is_solid() && !transparent {
            return;
        }
        let Some(model) = block.model() else {
            return;
        };

        let origin = Vector3::new(global.x as f32, global.y as f32, global.z as f32);
        let buffers = if transparent {
            &mut mesh.transparent
        } else {
            &mut mesh.solid
        };

        for side in BlockSide::all() {
            let neighbor = global + side.offset();
            let neighbor_id = hood.block_at(neighbor);
            let neighbor_solid = self.registry.is_solid(neighbor_id);
            let visible = if transparent {
                !neighbor_solid
            } else {
                !neighbor_solid || self.registry.is_transparent(neighbor_id)
            };
            if !visible {
                continue;
            }

            let light = hood.full_light_at(neighbor);
            for cube in model.cubes() {
                let Some(texture) = cube.texture(side) else {
                    continue;
                };
                let uv = self
                    .atlas
                    .texture_coordinates(texture, cube.uv_region(side));
                face::append_face(buffers, cube, side, origin, uv, light);
            }
        }
    }
}
