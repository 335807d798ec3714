//! # Block Module
//!
//! Block identifiers, block behavior and the registry the pipeline consults for
//! solidity, transparency and geometry.
//!
//! ## Architecture
//!
//! - `BlockId`: the value stored in a chunk's palette
//! - `Block`: behavior of one block type (solidity, transparency, model, hooks)
//! - `BlockRegistry`: lookup from `BlockId` to `Block`
//!
//! The pipeline never depends on a concrete registry. Unknown identifiers
//! behave exactly like air: not solid, not transparent, no geometry.

use std::borrow::Cow;
use std::fmt;

use cgmath::Point3;

use crate::engine_state::voxels::world::World;

pub mod block_side;
pub mod model;
pub mod registry;

pub use model::{BlockModel, Cube};
pub use registry::DefaultBlockRegistry;

/// Identifier of a block type, as stored in a chunk's palette.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(Cow<'static, str>);

impl BlockId {
    pub const AIR: BlockId = BlockId::from_static("air");
    pub const STONE: BlockId = BlockId::from_static("stone");
    pub const DIRT: BlockId = BlockId::from_static("dirt");
    pub const GRASS: BlockId = BlockId::from_static("grass");
    pub const SAND: BlockId = BlockId::from_static("sand");
    pub const WATER: BlockId = BlockId::from_static("water");
    pub const GLASS: BlockId = BlockId::from_static("glass");

    pub const fn from_static(id: &'static str) -> Self {
        BlockId(Cow::Borrowed(id))
    }

    pub fn new(id: impl Into<String>) -> Self {
        BlockId(Cow::Owned(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_air(&self) -> bool {
        *self == Self::AIR
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::AIR
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for BlockId {
    fn from(id: &'static str) -> Self {
        BlockId::from_static(id)
    }
}

/// Behavior of a single block type.
///
/// # Solidity and transparency
/// - Air: neither solid nor transparent; never meshed, lets light through
/// - Opaque blocks: solid, not transparent
/// - Glass, water: solid and transparent; meshed into the transparent buffer
///
/// Light only travels through non-solid voxels.
pub trait Block: Send + Sync {
    fn id(&self) -> &BlockId;

    fn is_solid(&self) -> bool;

    fn is_transparent(&self) -> bool;

    /// Geometry used by the mesher, or `None` for blocks that are never drawn.
    fn model(&self) -> Option<&BlockModel>;

    /// Called after this block has been written into the world at `position`.
    fn on_block_place(&self, _world: &World, _position: Point3<i32>) {}

    /// Called before this block is replaced at `position`.
    fn on_block_destroy(&self, _world: &World, _position: Point3<i32>) {}
}

/// Lookup from block identifier to block behavior.
pub trait BlockRegistry: Send + Sync {
    fn block(&self, id: &BlockId) -> Option<&dyn Block>;

    fn is_solid(&self, id: &BlockId) -> bool {
        self.block(id).is_some_and(|block| block.is_solid())
    }

    fn is_transparent(&self, id: &BlockId) -> bool {
        self.block(id).is_some_and(|block| block.is_transparent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_id_is_air() {
        assert!(BlockId::default().is_air());
        assert!(!BlockId::STONE.is_air());
    }

    #[test]
    fn owned_and_static_ids_compare_equal() {
        assert_eq!(BlockId::new("stone"), BlockId::STONE);
        assert_eq!(BlockId::from("glass").to_string(), "glass");
    }
}
