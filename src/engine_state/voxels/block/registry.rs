//! # Default Block Registry
//!
//! The set of blocks the terrain generator places, plus any blocks registered
//! at runtime. Built-in block properties live in a compile-time `phf` table.

use std::collections::HashMap;

use cgmath::Point3;
use log::warn;
use phf::phf_map;

use super::{Block, BlockId, BlockModel, BlockRegistry};
use crate::engine_state::voxels::world::World;

/// Static properties of a built-in block.
#[derive(Debug, Clone, Copy)]
pub struct BlockDefinition {
    pub solid: bool,
    pub transparent: bool,
    /// Top, bottom and side textures; `None` for blocks without geometry.
    pub textures: Option<(&'static str, &'static str, &'static str)>,
}

/// Built-in blocks keyed by identifier.
///
/// Water and glass are solid so that neither leaks light nor produces faces
/// between two voxels of the same kind; they are meshed as transparent.
pub static BUILTIN_BLOCKS: phf::Map<&'static str, BlockDefinition> = phf_map! {
    "air" => BlockDefinition { solid: false, transparent: false, textures: None },
    "stone" => BlockDefinition { solid: true, transparent: false, textures: Some(("stone", "stone", "stone")) },
    "dirt" => BlockDefinition { solid: true, transparent: false, textures: Some(("dirt", "dirt", "dirt")) },
    "grass" => BlockDefinition { solid: true, transparent: false, textures: Some(("grass_top", "dirt", "grass_side")) },
    "sand" => BlockDefinition { solid: true, transparent: false, textures: Some(("sand", "sand", "sand")) },
    "water" => BlockDefinition { solid: true, transparent: true, textures: Some(("water", "water", "water")) },
    "glass" => BlockDefinition { solid: true, transparent: true, textures: Some(("glass", "glass", "glass")) },
};

/// A block whose behavior is fully described by its properties.
pub struct BasicBlock {
    id: BlockId,
    solid: bool,
    transparent: bool,
    model: Option<BlockModel>,
}

impl BasicBlock {
    pub fn new(id: BlockId, solid: bool, transparent: bool, model: Option<BlockModel>) -> Self {
        Self {
            id,
            solid,
            transparent,
            model,
        }
    }

    fn from_definition(id: &'static str, definition: &BlockDefinition) -> Self {
        let model = definition
            .textures
            .map(|(top, bottom, side)| BlockModel::cube_top_bottom_side(top, bottom, side));
        Self::new(
            BlockId::from_static(id),
            definition.solid,
            definition.transparent,
            model,
        )
    }
}

impl Block for BasicBlock {
    fn id(&self) -> &BlockId {
        &self.id
    }

    fn is_solid(&self) -> bool {
        self.solid
    }

    fn is_transparent(&self) -> bool {
        self.transparent
    }

    fn model(&self) -> Option<&BlockModel> {
        self.model.as_ref()
    }
}

/// Sand glows magenta when placed by an edit.
pub struct SandBlock {
    inner: BasicBlock,
}

impl Block for SandBlock {
    fn id(&self) -> &BlockId {
        self.inner.id()
    }

    fn is_solid(&self) -> bool {
        self.inner.is_solid()
    }

    fn is_transparent(&self) -> bool {
        self.inner.is_transparent()
    }

    fn model(&self) -> Option<&BlockModel> {
        self.inner.model()
    }

    fn on_block_place(&self, world: &World, position: Point3<i32>) {
        world.add_light(position, 15, 0, 15);
    }
}

/// Registry backed by a hash map of boxed blocks.
#[derive(Default)]
pub struct DefaultBlockRegistry {
    blocks: HashMap<BlockId, Box<dyn Block>>,
}

impl DefaultBlockRegistry {
    /// An empty registry. Every lookup behaves as air until blocks are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every entry of [`BUILTIN_BLOCKS`].
    pub fn with_builtin_blocks() -> Self {
        let mut registry = Self::new();
        for (&id, definition) in BUILTIN_BLOCKS.entries() {
            let block = BasicBlock::from_definition(id, definition);
            if id == BlockId::SAND.as_str() {
                registry.register(Box::new(SandBlock { inner: block }));
            } else {
                registry.register(Box::new(block));
            }
        }
        registry
    }

    /// Adds `block` under its identifier.
    ///
    /// Returns `false` and keeps the existing block if the identifier is
    /// already taken.
    pub fn register(&mut self, block: Box<dyn Block>) -> bool {
        let id = block.id().clone();
        if self.blocks.contains_key(&id) {
            warn!("Block {} is already registered, ignoring duplicate", id);
            return false;
        }
        self.blocks.insert(id, block);
        true
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl BlockRegistry for DefaultBlockRegistry {
    fn block(&self, id: &BlockId) -> Option<&dyn Block> {
        self.blocks.get(id).map(|block| block.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_properties() {
        let registry = DefaultBlockRegistry::with_builtin_blocks();

        assert!(!registry.is_solid(&BlockId::AIR));
        assert!(!registry.is_transparent(&BlockId::AIR));
        assert!(registry.is_solid(&BlockId::STONE));
        assert!(!registry.is_transparent(&BlockId::STONE));
        assert!(registry.is_solid(&BlockId::GLASS));
        assert!(registry.is_transparent(&BlockId::WATER));
        assert!(registry.block(&BlockId::AIR).unwrap().model().is_none());
        assert!(registry.block(&BlockId::GRASS).unwrap().model().is_some());
    }

    #[test]
    fn unknown_blocks_behave_as_air() {
        let registry = DefaultBlockRegistry::with_builtin_blocks();
        let unknown = BlockId::new("mystery");

        assert!(registry.block(&unknown).is_none());
        assert!(!registry.is_solid(&unknown));
        assert!(!registry.is_transparent(&unknown));
    }

    #[test]
    fn duplicate_registration_keeps_the_first_block() {
        let mut registry = DefaultBlockRegistry::with_builtin_blocks();
        let count = registry.len();

        let replacement = BasicBlock::new(BlockId::STONE, false, false, None);
        assert!(!registry.register(Box::new(replacement)));
        assert_eq!(registry.len(), count);
        assert!(registry.is_solid(&BlockId::STONE));
    }
}
