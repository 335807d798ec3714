//! Texture atlas lookup.
//!
//! The mesher only needs one thing from the atlas: the UV rectangle for a
//! named texture, narrowed to the sub-region a cube face covers. Everything
//! about loading or uploading the atlas image belongs to the presenter.

use std::collections::HashMap;

use log::warn;

/// An axis-aligned rectangle in normalized texture space.
///
/// `(x, y)` is the top-left corner; `v` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl UvRect {
    pub const FULL: UvRect = UvRect::new(0.0, 0.0, 1.0, 1.0);

    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top_left(&self) -> [f32; 2] {
        [self.x, self.y]
    }

    pub fn bottom_left(&self) -> [f32; 2] {
        [self.x, self.y + self.height]
    }

    pub fn bottom_right(&self) -> [f32; 2] {
        [self.x + self.width, self.y + self.height]
    }

    pub fn top_right(&self) -> [f32; 2] {
        [self.x + self.width, self.y]
    }

    /// Maps `sub` (expressed relative to this rectangle) into the same space
    /// this rectangle lives in.
    pub fn sub_rect(&self, sub: UvRect) -> UvRect {
        UvRect::new(
            self.x + sub.x * self.width,
            self.y + sub.y * self.height,
            sub.width * self.width,
            sub.height * self.height,
        )
    }
}

/// Resolves texture names to atlas coordinates.
pub trait TextureAtlas: Send + Sync {
    /// The atlas region for `name`, narrowed to `sub_rect` of that texture.
    fn texture_coordinates(&self, name: &str, sub_rect: UvRect) -> UvRect;
}

/// An atlas laid out as a uniform grid of square tiles.
///
/// Tile 0 is reserved for the "missing texture" image and is returned for any
/// name that was never registered.
pub struct GridTextureAtlas {
    columns: u32,
    rows: u32,
    tiles: HashMap<String, u32>,
}

impl GridTextureAtlas {
    /// Creates an atlas of `columns` x `rows` tiles and assigns the given names
    /// to tiles 1, 2, 3... in order.
    pub fn new<I, S>(columns: u32, rows: u32, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let capacity = columns.max(1) * rows.max(1);
        let mut tiles = HashMap::new();
        for (index, name) in names.into_iter().enumerate() {
            let name: String = name.into();
            let tile = index as u32 + 1;
            if tile >= capacity {
                warn!("Texture atlas is full, dropping texture {}", name);
                continue;
            }
            tiles.insert(name, tile);
        }

        Self {
            columns: columns.max(1),
            rows: rows.max(1),
            tiles,
        }
    }

    /// The atlas the built-in blocks are drawn with.
    pub fn with_default_textures() -> Self {
        Self::new(
            4,
            4,
            [
                "stone",
                "dirt",
                "grass_top",
                "grass_side",
                "sand",
                "water",
                "glass",
            ],
        )
    }

    fn tile_rect(&self, tile: u32) -> UvRect {
        let width = 1.0 / self.columns as f32;
        let height = 1.0 / self.rows as f32;
        UvRect::new(
            (tile % self.columns) as f32 * width,
            (tile / self.columns) as f32 * height,
            width,
            height,
        )
    }
}

impl TextureAtlas for GridTextureAtlas {
    fn texture_coordinates(&self, name: &str, sub_rect: UvRect) -> UvRect {
        let tile = self.tiles.get(name).copied().unwrap_or(0);
        self.tile_rect(tile).sub_rect(sub_rect)
    }
}
