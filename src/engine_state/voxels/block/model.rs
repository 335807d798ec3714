//! # Block Models
//!
//! Geometry description of a block: a list of axis-aligned cubes inside the
//! unit voxel, each with a texture name per face. Full blocks are a single
//! `0..1` cube; partial shapes (slabs, posts) use smaller cubes.
//!
//! Each cube face knows:
//! - its four corners, ordered top-left, bottom-left, bottom-right, top-right
//!   when looking at the face from outside
//! - the part of its texture it covers, derived from the cube's extent so a
//!   half-height cube samples the matching half of the texture

use std::borrow::Cow;

use cgmath::{Point3, Vector3};

use super::block_side::BlockSide;
use crate::engine_state::rendering::atlas::UvRect;

/// An axis-aligned box inside a voxel, with per-face textures.
#[derive(Debug, Clone, PartialEq)]
pub struct Cube {
    start: Point3<f32>,
    end: Point3<f32>,
    textures: [Option<Cow<'static, str>>; 6],
}

impl Cube {
    /// Creates an untextured cube spanning `start..end` in voxel-local units.
    pub fn new(start: Point3<f32>, end: Point3<f32>) -> Self {
        Self {
            start,
            end,
            textures: Default::default(),
        }
    }

    /// A cube covering the whole voxel.
    pub fn full() -> Self {
        Self::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
    }

    pub fn set_all_faces(mut self, texture: impl Into<Cow<'static, str>>) -> Self {
        let texture = texture.into();
        for side in BlockSide::all() {
            self.textures[side as usize] = Some(texture.clone());
        }
        self
    }

    /// Textures the four vertical faces.
    pub fn set_side_faces(mut self, texture: impl Into<Cow<'static, str>>) -> Self {
        let texture = texture.into();
        for side in [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::LEFT,
            BlockSide::RIGHT,
        ] {
            self.textures[side as usize] = Some(texture.clone());
        }
        self
    }

    pub fn set_face(mut self, side: BlockSide, texture: impl Into<Cow<'static, str>>) -> Self {
        self.textures[side as usize] = Some(texture.into());
        self
    }

    /// Texture of `side`, or `None` if the face is not drawn.
    pub fn texture(&self, side: BlockSide) -> Option<&str> {
        self.textures[side as usize].as_deref()
    }

    /// Corners of `side` for a voxel whose minimum corner sits at `origin`.
    ///
    /// # Returns
    /// `[top_left, bottom_left, bottom_right, top_right]` as seen from outside.
    pub fn corners(&self, side: BlockSide, origin: Vector3<f32>) -> [[f32; 3]; 4] {
        let s = self.start;
        let e = self.end;
        let local = match side {
            BlockSide::TOP => [
                Point3::new(s.x, e.y, e.z),
                Point3::new(s.x, e.y, s.z),
                Point3::new(e.x, e.y, s.z),
                e,
            ],
            BlockSide::BOTTOM => [
                s,
                Point3::new(s.x, s.y, e.z),
                Point3::new(e.x, s.y, e.z),
                Point3::new(e.x, s.y, s.z),
            ],
            BlockSide::FRONT => [
                Point3::new(s.x, e.y, s.z),
                s,
                Point3::new(e.x, s.y, s.z),
                Point3::new(e.x, e.y, s.z),
            ],
            BlockSide::BACK => [
                e,
                Point3::new(e.x, s.y, e.z),
                Point3::new(s.x, s.y, e.z),
                Point3::new(s.x, e.y, e.z),
            ],
            BlockSide::LEFT => [
                Point3::new(s.x, e.y, e.z),
                Point3::new(s.x, s.y, e.z),
                s,
                Point3::new(s.x, e.y, s.z),
            ],
            BlockSide::RIGHT => [
                Point3::new(e.x, e.y, s.z),
                Point3::new(e.x, s.y, s.z),
                Point3::new(e.x, s.y, e.z),
                Point3::new(e.x, e.y, e.z),
            ],
        };

        local.map(|corner| {
            let world = corner + origin;
            [world.x, world.y, world.z]
        })
    }

    /// The part of the face's texture this cube covers.
    pub fn uv_region(&self, side: BlockSide) -> UvRect {
        let s = self.start;
        let e = self.end;
        match side {
            BlockSide::TOP => UvRect::new(s.x, s.z, e.x - s.x, e.z - s.z),
            BlockSide::BOTTOM => UvRect::new(s.x, 1.0 - e.z, e.x - s.x, e.z - s.z),
            BlockSide::FRONT => UvRect::new(s.x, s.y, e.x - s.x, e.y - s.y),
            BlockSide::BACK => UvRect::new(1.0 - e.x, s.y, e.x - s.x, e.y - s.y),
            BlockSide::RIGHT => UvRect::new(s.z, s.y, e.z - s.z, e.y - s.y),
            BlockSide::LEFT => UvRect::new(1.0 - e.z, s.y, e.z - s.z, e.y - s.y),
        }
    }
}

/// The drawable shape of a block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockModel {
    cubes: Vec<Cube>,
}

impl BlockModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cube(mut self, cube: Cube) -> Self {
        self.cubes.push(cube);
        self
    }

    /// A full cube with one texture on every face.
    pub fn cube_all(texture: impl Into<Cow<'static, str>>) -> Self {
        Self::new().with_cube(Cube::full().set_all_faces(texture))
    }

    /// A full cube with distinct top, bottom and side textures.
    pub fn cube_top_bottom_side(
        top: impl Into<Cow<'static, str>>,
        bottom: impl Into<Cow<'static, str>>,
        side: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new().with_cube(
            Cube::full()
                .set_side_faces(side)
                .set_face(BlockSide::TOP, top)
                .set_face(BlockSide::BOTTOM, bottom),
        )
    }

    pub fn cubes(&self) -> &[Cube] {
        &self.cubes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_face_corners_sit_on_the_upper_plane() {
        let corners = Cube::full().corners(BlockSide::TOP, Vector3::new(2.0, 5.0, -1.0));
        assert!(corners.iter().all(|corner| corner[1] == 6.0));
        assert_eq!(corners[0], [2.0, 6.0, 0.0]);
        assert_eq!(corners[3], [3.0, 6.0, 0.0]);
    }

    #[test]
    fn faces_lie_on_their_own_plane() {
        let cube = Cube::full();
        let origin = Vector3::new(0.0, 0.0, 0.0);
        for side in BlockSide::all() {
            let normal = side.normal();
            let axis = normal.iter().position(|c| *c != 0.0).unwrap();
            let plane = if normal[axis] > 0.0 { 1.0 } else { 0.0 };
            for corner in cube.corners(side, origin) {
                assert_eq!(corner[axis], plane, "{side:?}");
            }
        }
    }

    #[test]
    fn builder_assigns_textures_per_face() {
        let model = BlockModel::cube_top_bottom_side("grass_top", "dirt", "grass_side");
        let cube = &model.cubes()[0];
        assert_eq!(cube.texture(BlockSide::TOP), Some("grass_top"));
        assert_eq!(cube.texture(BlockSide::BOTTOM), Some("dirt"));
        assert_eq!(cube.texture(BlockSide::LEFT), Some("grass_side"));
    }

    #[test]
    fn half_cube_covers_half_the_side_texture() {
        let slab = Cube::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.5, 1.0));
        assert_eq!(slab.uv_region(BlockSide::FRONT), UvRect::new(0.0, 0.0, 1.0, 0.5));
        assert_eq!(slab.uv_region(BlockSide::TOP), UvRect::FULL);
    }
}
