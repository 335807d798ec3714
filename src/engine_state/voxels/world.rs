//! # World Module
//!
//! This module provides the `World` struct, the concurrent chunk store the
//! whole pipeline works against.
//!
//! ## Architecture
//!
//! The world is a sparse map from chunk coordinate to chunk. Chunks are
//! created on first reference (status `Empty`) and are otherwise independent:
//! every chunk carries its own locks, so workers only contend on the map
//! itself while looking chunks up or inserting them.
//!
//! On top of the map the world offers:
//! - global-position block and light accessors that route to the owning chunk
//! - block edits with place/destroy hooks
//! - 3x3 neighborhood access with a fixed lock order
//!
//! ## Performance Considerations
//!
//! - Chunk lookup is O(1) using a hash map
//! - The map lock is never held while a chunk lock is taken
//! - Neighborhood locks are always taken in ascending `(x, z)` order, so two
//!   overlapping neighborhoods can never deadlock

use std::collections::HashMap;
use std::sync::Arc;

use cgmath::{Point2, Point3};
use log::{debug, warn};

use crate::core::MtResource;
use crate::engine_state::config::EngineConfig;
use crate::engine_state::voxels::block::{BlockId, BlockRegistry};
use crate::engine_state::voxels::chunk::neighborhood::{slot_index, slot_offsets};
use crate::engine_state::voxels::chunk::{
    Chunk, ChunkCoordinate, ChunkNeighborhood, ChunkStatus, ChunkVolume,
};
use crate::engine_state::voxels::light::{LightChannel, MAX_LIGHT};
use crate::engine_state::voxels::palette::PaletteError;

/// The chunk store shared by the scheduler, its stages and the embedding application.
pub struct World {
    config: Arc<EngineConfig>,
    registry: Arc<dyn BlockRegistry>,
    chunks: MtResource<HashMap<ChunkCoordinate, Arc<Chunk>>>,
}

impl World {
    /// Creates a new, empty world.
    ///
    /// # Arguments
    /// * `config` - Chunk dimensions and world settings
    /// * `registry` - Block behavior lookup used for solidity checks and edit hooks
    pub fn new(config: Arc<EngineConfig>, registry: Arc<dyn BlockRegistry>) -> Self {
        World {
            config,
            registry,
            chunks: MtResource::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Arc<EngineConfig> {
        &self.config
    }

    pub fn registry(&self) -> &Arc<dyn BlockRegistry> {
        &self.registry
    }

    /// Retrieves the chunk at the specified chunk coordinates, if loaded.
    pub fn get_chunk_at(&self, coordinate: ChunkCoordinate) -> Option<Arc<Chunk>> {
        self.chunks.get().get(&coordinate).cloned()
    }

    /// Returns the chunk at `coordinate`, creating an `Empty` one if needed.
    pub fn get_or_create_chunk(&self, coordinate: ChunkCoordinate) -> Arc<Chunk> {
        if let Some(chunk) = self.get_chunk_at(coordinate) {
            return chunk;
        }

        let mut chunks = self.chunks.get_mut();
        chunks
            .entry(coordinate)
            .or_insert_with(|| {
                debug!("Creating chunk ({}, {})", coordinate.x, coordinate.y);
                Arc::new(Chunk::new(
                    coordinate,
                    self.config.chunk_size,
                    self.config.chunk_height(),
                ))
            })
            .clone()
    }

    /// Drops a chunk from the store. Workers still holding it finish their stage
    /// on the detached chunk; its results are simply never seen again.
    pub fn remove_chunk(&self, coordinate: ChunkCoordinate) -> Option<Arc<Chunk>> {
        self.chunks.get_mut().remove(&coordinate)
    }

    pub fn status_of(&self, coordinate: ChunkCoordinate) -> Option<ChunkStatus> {
        self.get_chunk_at(coordinate).map(|chunk| chunk.status())
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.get().len()
    }

    /// Every loaded chunk coordinate.
    pub fn loaded_coordinates(&self) -> Vec<ChunkCoordinate> {
        self.chunks.get().keys().copied().collect()
    }

    /// An empty volume sized for `coordinate`.
    pub fn new_volume(&self, coordinate: ChunkCoordinate) -> ChunkVolume {
        ChunkVolume::new(
            coordinate,
            self.config.chunk_size,
            self.config.chunk_height(),
        )
    }

    /// Chunk coordinate of the column containing a world position.
    pub fn chunk_coordinate_of(&self, global: Point3<i32>) -> ChunkCoordinate {
        let size = self.config.chunk_size as i32;
        Point2::new(global.x.div_euclid(size), global.z.div_euclid(size))
    }

    /// Position of `global` inside its owning chunk.
    pub fn local_position(&self, global: Point3<i32>) -> Point3<i32> {
        let size = self.config.chunk_size as i32;
        Point3::new(global.x.rem_euclid(size), global.y, global.z.rem_euclid(size))
    }

    fn owning_chunk(&self, global: Point3<i32>) -> Option<Arc<Chunk>> {
        self.get_chunk_at(self.chunk_coordinate_of(global))
    }

    /// Block at a world position; air if the chunk is not loaded.
    pub fn block_at(&self, global: Point3<i32>) -> BlockId {
        match self.owning_chunk(global) {
            Some(chunk) => chunk
                .volume()
                .block(self.local_position(global))
                .clone(),
            None => BlockId::AIR,
        }
    }

    pub fn is_solid_at(&self, global: Point3<i32>) -> bool {
        self.registry.is_solid(&self.block_at(global))
    }

    pub fn is_transparent_at(&self, global: Point3<i32>) -> bool {
        self.registry.is_transparent(&self.block_at(global))
    }

    /// Replaces the block at a world position and runs the edit hooks.
    ///
    /// The old block's `on_block_destroy` runs before the write, the new
    /// block's `on_block_place` after it. No chunk lock is held while a hook
    /// runs, so hooks may freely edit the world.
    ///
    /// # Returns
    /// `Ok(false)` if the owning chunk is not loaded or the position is outside
    /// the column; nothing is changed in that case.
    pub fn set_block_at(&self, global: Point3<i32>, id: BlockId) -> Result<bool, PaletteError> {
        let Some(chunk) = self.owning_chunk(global) else {
            return Ok(false);
        };
        let local = self.local_position(global);
        if chunk.volume().index(local).is_none() {
            return Ok(false);
        }

        if self.registry.block(&id).is_none() && !id.is_air() {
            warn!("Placing unregistered block {} at {:?}; it will behave as air", id, global);
        }

        let old = chunk.volume().block(local).clone();
        if let Some(block) = self.registry.block(&old) {
            block.on_block_destroy(self, global);
        }

        chunk.volume_mut().set_block(local, id.clone())?;

        if let Some(block) = self.registry.block(&id) {
            block.on_block_place(self, global);
        }
        Ok(true)
    }

    /// Light level at a world position; full light if the chunk is not loaded.
    pub fn light_at(&self, global: Point3<i32>, channel: LightChannel) -> u8 {
        match self.owning_chunk(global) {
            Some(chunk) => chunk.volume().light(self.local_position(global), channel),
            None => MAX_LIGHT,
        }
    }

    pub fn set_light_at(&self, global: Point3<i32>, channel: LightChannel, value: u8) {
        if let Some(chunk) = self.owning_chunk(global) {
            chunk
                .volume_mut()
                .set_light(self.local_position(global), channel, value);
        }
    }

    /// `[red, green, blue, sun]` normalized; all `1.0` if the chunk is not loaded.
    pub fn full_light_at(&self, global: Point3<i32>) -> [f32; 4] {
        match self.owning_chunk(global) {
            Some(chunk) => chunk.volume().full_light(self.local_position(global)),
            None => [1.0; 4],
        }
    }

    /// Places a colored light source.
    ///
    /// Writes the given levels and queues the position on the owning chunk so
    /// the next light pass spreads it. Channels with level 0 are left as-is.
    pub fn add_light(&self, global: Point3<i32>, red: u8, green: u8, blue: u8) {
        let Some(chunk) = self.owning_chunk(global) else {
            return;
        };
        let local = self.local_position(global);

        let mut volume = chunk.volume_mut();
        if volume.index(local).is_none() {
            return;
        }
        for (channel, level) in [
            (LightChannel::Red, red),
            (LightChannel::Green, green),
            (LightChannel::Blue, blue),
        ] {
            if level == 0 {
                continue;
            }
            volume.set_light(local, channel, level);
            volume.enqueue_light(channel, global);
        }
    }

    /// `true` if all eight chunks around `coordinate` are loaded and at or past `stage`.
    pub fn neighbors_reached(&self, coordinate: ChunkCoordinate, stage: ChunkStatus) -> bool {
        let chunks = self.chunks.get();
        slot_offsets()
            .filter(|offset| *offset != (0, 0))
            .all(|(dx, dz)| {
                chunks
                    .get(&Point2::new(coordinate.x + dx, coordinate.y + dz))
                    .is_some_and(|chunk| chunk.status().has_reached(stage))
            })
    }

    fn neighborhood_chunks(&self, coordinate: ChunkCoordinate) -> [Option<Arc<Chunk>>; 9] {
        let chunks = self.chunks.get();
        let mut slots: [Option<Arc<Chunk>>; 9] = Default::default();
        for (dx, dz) in slot_offsets() {
            slots[slot_index(dx, dz)] = chunks
                .get(&Point2::new(coordinate.x + dx, coordinate.y + dz))
                .cloned();
        }
        slots
    }

    /// Runs `f` with read access to the 3x3 neighborhood around `coordinate`.
    ///
    /// # Returns
    /// `None` if the center chunk is not loaded. Missing neighbors are simply
    /// absent from the neighborhood.
    pub fn with_neighborhood<R>(
        &self,
        coordinate: ChunkCoordinate,
        f: impl FnOnce(&ChunkNeighborhood<std::sync::RwLockReadGuard<'_, ChunkVolume>>) -> R,
    ) -> Option<R> {
        let chunks = self.neighborhood_chunks(coordinate);
        // Slot order is ascending (x, z) order.
        let guards = std::array::from_fn(|slot| chunks[slot].as_ref().map(|chunk| chunk.volume()));
        let hood = ChunkNeighborhood::new(coordinate, guards)?;
        Some(f(&hood))
    }

    /// Runs `f` with write access to the 3x3 neighborhood around `coordinate`.
    pub fn with_neighborhood_mut<R>(
        &self,
        coordinate: ChunkCoordinate,
        f: impl FnOnce(&mut ChunkNeighborhood<std::sync::RwLockWriteGuard<'_, ChunkVolume>>) -> R,
    ) -> Option<R> {
        let chunks = self.neighborhood_chunks(coordinate);
        let guards =
            std::array::from_fn(|slot| chunks[slot].as_ref().map(|chunk| chunk.volume_mut()));
        let mut hood = ChunkNeighborhood::new(coordinate, guards)?;
        Some(f(&mut hood))
    }
}

/// Chebyshev distance between two chunk coordinates.
pub fn chunk_distance(a: ChunkCoordinate, b: ChunkCoordinate) -> i32 {
    (a.x - b.x).abs().max((a.y - b.y).abs())
}

/// Every coordinate within `radius` (inclusive, Chebyshev) of `center`, closest first.
///
/// # Returns
/// `(coordinate, distance)` pairs ordered by distance, ties in ascending `(x, z)`.
pub fn chunks_in_radius(center: ChunkCoordinate, radius: i32) -> Vec<(ChunkCoordinate, i32)> {
    let radius = radius.max(0);
    let mut coordinates: Vec<_> = (-radius..=radius)
        .flat_map(|dx| (-radius..=radius).map(move |dz| Point2::new(center.x + dx, center.y + dz)))
        .map(|coordinate| (coordinate, chunk_distance(center, coordinate)))
        .collect();
    coordinates.sort_by_key(|(coordinate, distance)| (*distance, coordinate.x, coordinate.y));
    coordinates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::DefaultBlockRegistry;

    fn test_world() -> World {
        let config = EngineConfig {
            chunk_size: 16,
            section_count: 2,
            sea_level: 12,
            ..EngineConfig::default()
        };
        World::new(
            Arc::new(config),
            Arc::new(DefaultBlockRegistry::with_builtin_blocks()),
        )
    }

    #[test]
    fn coordinates_use_floor_division() {
        let world = test_world();
        assert_eq!(world.chunk_coordinate_of(Point3::new(-1, 5, 16)), Point2::new(-1, 1));
        assert_eq!(world.local_position(Point3::new(-1, 5, 16)), Point3::new(15, 5, 0));
        assert_eq!(world.chunk_coordinate_of(Point3::new(15, 0, 0)), Point2::new(0, 0));
    }

    #[test]
    fn chunks_are_created_once() {
        let world = test_world();
        let a = world.get_or_create_chunk(Point2::new(2, 3));
        let b = world.get_or_create_chunk(Point2::new(2, 3));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(world.chunk_count(), 1);
        assert_eq!(world.status_of(Point2::new(2, 3)), Some(ChunkStatus::Empty));
        assert!(world.remove_chunk(Point2::new(2, 3)).is_some());
        assert_eq!(world.status_of(Point2::new(2, 3)), None);
    }

    #[test]
    fn missing_chunks_read_as_air_and_full_light() {
        let world = test_world();
        let position = Point3::new(100, 3, 100);
        assert!(world.block_at(position).is_air());
        assert_eq!(world.light_at(position, LightChannel::Sun), 15);
        assert_eq!(world.full_light_at(position), [1.0; 4]);
        assert_eq!(world.set_block_at(position, BlockId::STONE), Ok(false));
    }

    #[test]
    fn placing_sand_emits_magenta_light() {
        let world = test_world();
        world.get_or_create_chunk(Point2::new(0, 0));
        let position = Point3::new(4, 10, 4);

        assert_eq!(world.set_block_at(position, BlockId::SAND), Ok(true));

        assert_eq!(world.block_at(position), BlockId::SAND);
        assert!(world.is_solid_at(position));
        assert_eq!(world.light_at(position, LightChannel::Red), 15);
        assert_eq!(world.light_at(position, LightChannel::Green), 0);
        assert_eq!(world.light_at(position, LightChannel::Blue), 15);

        let chunk = world.get_chunk_at(Point2::new(0, 0)).unwrap();
        let volume = chunk.volume();
        assert_eq!(volume.pending_len(LightChannel::Red), 1);
        assert_eq!(volume.pending_len(LightChannel::Green), 0);
        assert_eq!(volume.pending_len(LightChannel::Blue), 1);
    }

    #[test]
    fn neighbor_readiness_needs_all_eight() {
        let world = test_world();
        let center = Point2::new(0, 0);
        for (coordinate, _) in chunks_in_radius(center, 1) {
            world
                .get_or_create_chunk(coordinate)
                .set_status(ChunkStatus::Mesh);
        }
        assert!(world.neighbors_reached(center, ChunkStatus::Light));
        assert!(world.neighbors_reached(center, ChunkStatus::Mesh));

        world
            .get_chunk_at(Point2::new(1, -1))
            .unwrap()
            .set_status(ChunkStatus::Failed);
        assert!(!world.neighbors_reached(center, ChunkStatus::Light));

        world.remove_chunk(Point2::new(1, -1));
        assert!(!world.neighbors_reached(center, ChunkStatus::Light));
    }

    #[test]
    fn neighborhood_requires_loaded_center() {
        let world = test_world();
        assert!(world.with_neighborhood(Point2::new(0, 0), |_| ()).is_none());

        world.get_or_create_chunk(Point2::new(0, 0));
        let size = world.with_neighborhood(Point2::new(0, 0), |hood| hood.chunk_size());
        assert_eq!(size, Some(16));
    }

    #[test]
    fn radius_is_ordered_by_distance() {
        let coordinates = chunks_in_radius(Point2::new(5, -5), 2);
        assert_eq!(coordinates.len(), 25);
        assert_eq!(coordinates[0], (Point2::new(5, -5), 0));
        assert!(coordinates.windows(2).all(|pair| pair[0].1 <= pair[1].1));
        assert_eq!(coordinates.iter().filter(|(_, d)| *d == 1).count(), 8);
    }
}
