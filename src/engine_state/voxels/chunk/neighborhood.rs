//! # Chunk Neighborhood
//!
//! A 3x3 window of chunk volumes around a center chunk, addressed in world
//! coordinates. Light propagation and meshing both need to look (and, for
//! light, write) one step past the center chunk's border; the neighborhood
//! routes each world position to the volume that owns it.
//!
//! The neighborhood is generic over the guard type so the same code serves
//! read guards (meshing) and write guards (lighting), as well as plain owned
//! volumes in tests.
//!
//! Positions that fall outside the window, above or below the column, or into
//! a chunk that is not loaded read as air with full light and ignore writes.

use std::ops::{Deref, DerefMut};

use cgmath::Point3;

use super::{ChunkCoordinate, ChunkVolume};
use crate::engine_state::voxels::block::BlockId;
use crate::engine_state::voxels::light::{LightChannel, MAX_LIGHT};

static AIR: BlockId = BlockId::AIR;

const CENTER_SLOT: usize = 4;

/// Slot of a chunk offset `(dx, dz)` in `-1..=1`, row-major by `dx` then `dz`.
///
/// Iterating slots in index order visits coordinates in ascending `(x, z)`
/// order, which is the order locks must be taken in.
pub fn slot_index(dx: i32, dz: i32) -> usize {
    ((dx + 1) * 3 + (dz + 1)) as usize
}

/// Offsets of all nine slots, in slot order.
pub fn slot_offsets() -> impl Iterator<Item = (i32, i32)> {
    (-1..=1).flat_map(|dx| (-1..=1).map(move |dz| (dx, dz)))
}

pub struct ChunkNeighborhood<G> {
    center: ChunkCoordinate,
    size: i32,
    height: i32,
    slots: [Option<G>; 9],
}

impl<G: Deref<Target = ChunkVolume>> ChunkNeighborhood<G> {
    /// Builds a neighborhood from nine slots in [`slot_index`] order.
    ///
    /// # Returns
    /// `None` if the center slot is empty.
    pub fn new(center: ChunkCoordinate, slots: [Option<G>; 9]) -> Option<Self> {
        let (size, height) = {
            let volume = slots[CENTER_SLOT].as_ref()?;
            (volume.size() as i32, volume.height() as i32)
        };

        Some(Self {
            center,
            size,
            height,
            slots,
        })
    }

    pub fn center_coordinate(&self) -> ChunkCoordinate {
        self.center
    }

    pub fn chunk_size(&self) -> i32 {
        self.size
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// The volume at chunk offset `(dx, dz)` from the center, if loaded.
    pub fn volume(&self, dx: i32, dz: i32) -> Option<&ChunkVolume> {
        if !(-1..=1).contains(&dx) || !(-1..=1).contains(&dz) {
            return None;
        }
        self.slots[slot_index(dx, dz)].as_deref()
    }

    /// The center volume. Always present.
    pub fn center(&self) -> &ChunkVolume {
        // `new` rejects neighborhoods without a center.
        match self.slots[CENTER_SLOT].as_deref() {
            Some(volume) => volume,
            None => unreachable!("neighborhood without a center chunk"),
        }
    }

    /// Slot and local position owning `global`, if it lies inside the window
    /// and the vertical extent.
    fn locate(&self, global: Point3<i32>) -> Option<(usize, Point3<i32>)> {
        if global.y < 0 || global.y >= self.height {
            return None;
        }

        let dx = global.x.div_euclid(self.size) - self.center.x;
        let dz = global.z.div_euclid(self.size) - self.center.y;
        if !(-1..=1).contains(&dx) || !(-1..=1).contains(&dz) {
            return None;
        }

        let local = Point3::new(
            global.x.rem_euclid(self.size),
            global.y,
            global.z.rem_euclid(self.size),
        );
        Some((slot_index(dx, dz), local))
    }

    /// `true` if `global` maps to a loaded voxel of this neighborhood.
    pub fn contains(&self, global: Point3<i32>) -> bool {
        self.locate(global)
            .is_some_and(|(slot, _)| self.slots[slot].is_some())
    }

    pub fn block_at(&self, global: Point3<i32>) -> &BlockId {
        match self.locate(global) {
            Some((slot, local)) => match self.slots[slot].as_deref() {
                Some(volume) => volume.block(local),
                None => &AIR,
            },
            None => &AIR,
        }
    }

    pub fn light_at(&self, global: Point3<i32>, channel: LightChannel) -> u8 {
        match self.locate(global) {
            Some((slot, local)) => match self.slots[slot].as_deref() {
                Some(volume) => volume.light(local, channel),
                None => MAX_LIGHT,
            },
            None => MAX_LIGHT,
        }
    }

    /// `[red, green, blue, sun]` normalized at `global`.
    pub fn full_light_at(&self, global: Point3<i32>) -> [f32; 4] {
        match self.locate(global) {
            Some((slot, local)) => match self.slots[slot].as_deref() {
                Some(volume) => volume.full_light(local),
                None => [1.0; 4],
            },
            None => [1.0; 4],
        }
    }
}

impl<G: DerefMut<Target = ChunkVolume>> ChunkNeighborhood<G> {
    pub fn center_mut(&mut self) -> &mut ChunkVolume {
        match self.slots[CENTER_SLOT].as_deref_mut() {
            Some(volume) => volume,
            None => unreachable!("neighborhood without a center chunk"),
        }
    }

    /// Writes a light level at `global`.
    ///
    /// # Returns
    /// `false` if the position is not part of this neighborhood.
    pub fn set_light_at(&mut self, global: Point3<i32>, channel: LightChannel, value: u8) -> bool {
        let Some((slot, local)) = self.locate(global) else {
            return false;
        };
        match self.slots[slot].as_deref_mut() {
            Some(volume) => {
                volume.set_light(local, channel, value);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point2;

    fn owned_neighborhood(loaded: &[(i32, i32)]) -> ChunkNeighborhood<Box<ChunkVolume>> {
        let mut slots: [Option<Box<ChunkVolume>>; 9] = Default::default();
        for (dx, dz) in slot_offsets() {
            if loaded.contains(&(dx, dz)) {
                slots[slot_index(dx, dz)] =
                    Some(Box::new(ChunkVolume::new(Point2::new(dx, dz), 16, 16)));
            }
        }
        ChunkNeighborhood::new(Point2::new(0, 0), slots).unwrap()
    }

    #[test]
    fn slot_order_is_ascending() {
        let offsets: Vec<_> = slot_offsets().collect();
        assert_eq!(offsets.first(), Some(&(-1, -1)));
        assert_eq!(offsets.last(), Some(&(1, 1)));
        for (index, (dx, dz)) in offsets.into_iter().enumerate() {
            assert_eq!(slot_index(dx, dz), index);
        }
    }

    #[test]
    fn requires_a_center() {
        let slots: [Option<Box<ChunkVolume>>; 9] = Default::default();
        assert!(ChunkNeighborhood::new(Point2::new(0, 0), slots).is_none());
    }

    #[test]
    fn writes_cross_into_neighbors() {
        let mut hood = owned_neighborhood(&[(0, 0), (-1, 0)]);

        assert!(hood.set_light_at(Point3::new(-1, 3, 4), LightChannel::Red, 9));
        assert_eq!(hood.light_at(Point3::new(-1, 3, 4), LightChannel::Red), 9);
        assert_eq!(
            hood.volume(-1, 0)
                .unwrap()
                .light(Point3::new(15, 3, 4), LightChannel::Red),
            9
        );
    }

    #[test]
    fn missing_and_outside_positions_are_sentinels() {
        let mut hood = owned_neighborhood(&[(0, 0)]);

        assert!(!hood.set_light_at(Point3::new(16, 0, 0), LightChannel::Sun, 1));
        assert_eq!(hood.light_at(Point3::new(16, 0, 0), LightChannel::Sun), 15);
        assert!(hood.block_at(Point3::new(0, -1, 0)).is_air());
        assert_eq!(hood.light_at(Point3::new(0, 16, 0), LightChannel::Blue), 15);
        assert!(!hood.contains(Point3::new(40, 0, 0)));
        assert!(hood.contains(Point3::new(15, 15, 15)));
    }
}
