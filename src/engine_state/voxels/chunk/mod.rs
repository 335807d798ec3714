//! # Chunk Module
//!
//! A chunk is one vertical column of the world: `chunk_size` voxels wide and
//! deep, `chunk_size * section_count` voxels tall. Each chunk moves through the
//! pipeline state machine on its own:
//!
//! ```text
//! Empty -> Light -> Mesh -> Upload -> Done
//!    \_______\_______\________\-----> Failed
//! ```
//!
//! ## Memory Layout
//!
//! Voxel data lives in a [`ChunkVolume`]:
//! - `blocks`: a palette-compressed block array
//! - `light`: one packed 16-bit light word per voxel
//! - `pending`: per-channel queues of positions whose light still has to spread
//!
//! Voxels are indexed `x + size * (z + size * y)`, so each horizontal layer and
//! each cubic section is a contiguous range.
//!
//! ## Thread Safety
//!
//! - `status`, `has_priority` and the claim token are atomics
//! - the volume sits behind a per-chunk `RwLock`
//! - finished section meshes sit behind a `Mutex` until the upload step takes them

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use cgmath::{Point2, Point3};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::block::BlockId;
use super::light::{LightChannel, LightStore};
use super::palette::{Palette, PaletteError};
use crate::engine_state::rendering::meshing::mesh::ChunkSectionMesh;

pub mod neighborhood;

pub use neighborhood::ChunkNeighborhood;

/// Identifies a chunk column by its horizontal position in chunk units.
pub type ChunkCoordinate = Point2<i32>;

/// Pipeline stage a chunk has reached.
///
/// The ordering of the variants is the order of the pipeline. `Failed` is
/// terminal and never counts as having reached any stage.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum ChunkStatus {
    Empty = 0,
    Light = 1,
    Mesh = 2,
    Upload = 3,
    Done = 4,
    Failed = 5,
}

impl ChunkStatus {
    /// `true` if this status is at or past `stage` in the pipeline.
    pub fn has_reached(self, stage: ChunkStatus) -> bool {
        self != ChunkStatus::Failed && self as u8 >= stage as u8
    }

    /// The status a chunk moves to once the current stage succeeds.
    pub fn next(self) -> Option<ChunkStatus> {
        match self {
            ChunkStatus::Empty => Some(ChunkStatus::Light),
            ChunkStatus::Light => Some(ChunkStatus::Mesh),
            ChunkStatus::Mesh => Some(ChunkStatus::Upload),
            ChunkStatus::Upload => Some(ChunkStatus::Done),
            ChunkStatus::Done | ChunkStatus::Failed => None,
        }
    }

    fn from_raw(raw: u8) -> ChunkStatus {
        ChunkStatus::from_u8(raw).unwrap_or(ChunkStatus::Failed)
    }
}

/// Block, light and pending-light data of one chunk column.
#[derive(Debug, Clone)]
pub struct ChunkVolume {
    position: ChunkCoordinate,
    size: usize,
    height: usize,
    blocks: Palette<BlockId>,
    light: LightStore,
    pending: [VecDeque<Point3<i32>>; 4],
}

impl ChunkVolume {
    /// An all-air, unlit volume.
    ///
    /// # Arguments
    /// * `position` - Chunk coordinate of the column
    /// * `size` - Width and depth in voxels
    /// * `height` - Height in voxels
    pub fn new(position: ChunkCoordinate, size: usize, height: usize) -> Self {
        let len = size * size * height;
        Self {
            position,
            size,
            height,
            blocks: Palette::new(len, BlockId::AIR),
            light: LightStore::new(len),
            pending: Default::default(),
        }
    }

    pub fn position(&self) -> ChunkCoordinate {
        self.position
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// World position of the voxel at local `(0, 0, 0)`.
    pub fn origin(&self) -> Point3<i32> {
        let size = self.size as i32;
        Point3::new(self.position.x * size, 0, self.position.y * size)
    }

    /// Converts a world position into this chunk's local space, without bounds checks.
    pub fn to_local(&self, global: Point3<i32>) -> Point3<i32> {
        let origin = self.origin();
        Point3::new(global.x - origin.x, global.y, global.z - origin.z)
    }

    /// Storage index of a local position, or `None` if it lies outside the column.
    pub fn index(&self, local: Point3<i32>) -> Option<usize> {
        let size = self.size as i32;
        if local.x < 0
            || local.z < 0
            || local.y < 0
            || local.x >= size
            || local.z >= size
            || local.y >= self.height as i32
        {
            return None;
        }

        let (x, y, z) = (local.x as usize, local.y as usize, local.z as usize);
        Some(x + self.size * (z + self.size * y))
    }

    /// Block at a local position; air outside the column.
    pub fn block(&self, local: Point3<i32>) -> &BlockId {
        match self.index(local) {
            Some(index) => self.blocks.get(index),
            None => self.blocks.air(),
        }
    }

    /// Writes a block at a local position. Positions outside the column are ignored.
    pub fn set_block(&mut self, local: Point3<i32>, id: BlockId) -> Result<(), PaletteError> {
        match self.index(local) {
            Some(index) => self.blocks.set(index, id),
            None => Ok(()),
        }
    }

    /// Light level at a local position; fully lit outside the column.
    pub fn light(&self, local: Point3<i32>, channel: LightChannel) -> u8 {
        match self.index(local) {
            Some(index) => self.light.get(index, channel),
            None => super::light::MAX_LIGHT,
        }
    }

    pub fn set_light(&mut self, local: Point3<i32>, channel: LightChannel, value: u8) {
        if let Some(index) = self.index(local) {
            self.light.set(index, channel, value);
        }
    }

    /// `[red, green, blue, sun]` normalized; fully lit outside the column.
    pub fn full_light(&self, local: Point3<i32>) -> [f32; 4] {
        match self.index(local) {
            Some(index) => self.light.full_normalized(index),
            None => [1.0; 4],
        }
    }

    pub fn blocks(&self) -> &Palette<BlockId> {
        &self.blocks
    }

    pub fn light_store(&self) -> &LightStore {
        &self.light
    }

    /// Queues a world position whose `channel` light has to spread to its neighbors.
    pub fn enqueue_light(&mut self, channel: LightChannel, global: Point3<i32>) {
        self.pending[channel.queue_index()].push_back(global);
    }

    /// Removes and returns every pending position of `channel`.
    pub fn take_pending(&mut self, channel: LightChannel) -> VecDeque<Point3<i32>> {
        std::mem::take(&mut self.pending[channel.queue_index()])
    }

    pub fn pending_len(&self, channel: LightChannel) -> usize {
        self.pending[channel.queue_index()].len()
    }

    pub fn has_pending_light(&self) -> bool {
        self.pending.iter().any(|queue| !queue.is_empty())
    }
}

/// One chunk column and its pipeline state.
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not block coordinates).
    pub position: ChunkCoordinate,
    size: usize,
    status: AtomicU8,
    has_priority: AtomicBool,
    claimed: AtomicBool,
    revision: AtomicU64,
    volume: RwLock<ChunkVolume>,
    meshes: Mutex<Vec<ChunkSectionMesh>>,
}

impl Chunk {
    /// Creates an `Empty` chunk with an all-air volume.
    pub fn new(position: ChunkCoordinate, size: usize, height: usize) -> Self {
        Self {
            position,
            size,
            status: AtomicU8::new(ChunkStatus::Empty as u8),
            has_priority: AtomicBool::new(false),
            claimed: AtomicBool::new(false),
            revision: AtomicU64::new(0),
            volume: RwLock::new(ChunkVolume::new(position, size, height)),
            meshes: Mutex::new(Vec::new()),
        }
    }

    pub fn status(&self) -> ChunkStatus {
        ChunkStatus::from_raw(self.status.load(Ordering::Acquire))
    }

    /// Unconditionally overwrites the status.
    ///
    /// Only edits (which rewind a chunk) and failures go through here; normal
    /// progress uses [`Chunk::advance_status`].
    pub fn set_status(&self, status: ChunkStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    /// Moves the status from `from` to `to` if nobody changed it in between.
    pub fn advance_status(&self, from: ChunkStatus, to: ChunkStatus) -> bool {
        self.status
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn has_priority(&self) -> bool {
        self.has_priority.load(Ordering::Acquire)
    }

    pub fn set_priority(&self, high_priority: bool) {
        self.has_priority.store(high_priority, Ordering::Release);
    }

    /// Takes the claim token. Only the holder may run a stage on this chunk.
    pub fn try_claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release(&self) {
        self.claimed.store(false, Ordering::Release);
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Counter bumped by every edit that touches this chunk.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Records an edit. A stage that sees the revision change while it runs
    /// does not advance the chunk.
    pub fn touch(&self) {
        self.revision.fetch_add(1, Ordering::SeqCst);
    }

    /// Shared access to the voxel data.
    ///
    /// A poisoned lock is recovered: a stage that panicked has already marked
    /// the chunk `Failed`, and the data is still structurally valid.
    pub fn volume(&self) -> RwLockReadGuard<'_, ChunkVolume> {
        self.volume.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn volume_mut(&self) -> RwLockWriteGuard<'_, ChunkVolume> {
        self.volume.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the whole volume, e.g. with freshly generated terrain.
    pub fn replace_volume(&self, volume: ChunkVolume) {
        *self.volume_mut() = volume;
    }

    /// Per-section meshes waiting for (or already past) the upload step.
    pub fn meshes(&self) -> MutexGuard<'_, Vec<ChunkSectionMesh>> {
        self.meshes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// World position of the voxel at local `(0, 0, 0)`.
    pub fn origin(&self) -> Point3<i32> {
        let size = self.size as i32;
        Point3::new(self.position.x * size, 0, self.position.y * size)
    }
}
