//! # Light Store
//!
//! Per-voxel light packed into one 16-bit word:
//!
//! | bits  | channel  |
//! |-------|----------|
//! | 12-15 | red      |
//! | 8-11  | green    |
//! | 4-7   | blue     |
//! | 0-3   | sunlight |
//!
//! Every channel holds a level in `0..=15`. Reads outside the store return the
//! maximum level so that geometry at the edge of the loaded world is lit.

/// Highest light level a channel can hold.
pub const MAX_LIGHT: u8 = 15;

/// One of the four independent light channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightChannel {
    Sun,
    Red,
    Green,
    Blue,
}

impl LightChannel {
    /// Every channel, in the order the propagator drains them.
    pub const ALL: [LightChannel; 4] = [
        LightChannel::Sun,
        LightChannel::Red,
        LightChannel::Green,
        LightChannel::Blue,
    ];

    fn shift(self) -> u16 {
        match self {
            LightChannel::Sun => 0,
            LightChannel::Blue => 4,
            LightChannel::Green => 8,
            LightChannel::Red => 12,
        }
    }

    /// Position of this channel's pending queue inside a chunk.
    pub fn queue_index(self) -> usize {
        match self {
            LightChannel::Sun => 0,
            LightChannel::Red => 1,
            LightChannel::Green => 2,
            LightChannel::Blue => 3,
        }
    }
}

/// Packed light levels for every voxel of a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightStore {
    words: Vec<u16>,
}

impl LightStore {
    /// Creates a store of `len` voxels with every channel dark.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Level of `channel` at `index`; [`MAX_LIGHT`] when out of range.
    pub fn get(&self, index: usize, channel: LightChannel) -> u8 {
        match self.words.get(index) {
            Some(word) => ((word >> channel.shift()) & 0xF) as u8,
            None => MAX_LIGHT,
        }
    }

    /// Writes `value` (clamped to [`MAX_LIGHT`]) into `channel` at `index`.
    /// Leaves the other channels untouched. Out-of-range writes are ignored.
    pub fn set(&mut self, index: usize, channel: LightChannel, value: u8) {
        let Some(word) = self.words.get_mut(index) else {
            return;
        };

        let shift = channel.shift();
        let value = value.min(MAX_LIGHT) as u16;
        *word = (*word & !(0xF << shift)) | (value << shift);
    }

    /// Level of `channel` at `index` scaled into `0.0..=1.0`.
    pub fn normalized(&self, index: usize, channel: LightChannel) -> f32 {
        self.get(index, channel) as f32 / MAX_LIGHT as f32
    }

    /// All four channels at `index` as `[red, green, blue, sun]`, normalized.
    pub fn full_normalized(&self, index: usize) -> [f32; 4] {
        [
            self.normalized(index, LightChannel::Red),
            self.normalized(index, LightChannel::Green),
            self.normalized(index, LightChannel::Blue),
            self.normalized(index, LightChannel::Sun),
        ]
    }

    /// The raw packed word at `index`, if in range.
    pub fn raw(&self, index: usize) -> Option<u16> {
        self.words.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_are_independent() {
        let mut store = LightStore::new(4);
        store.set(1, LightChannel::Red, 15);
        store.set(1, LightChannel::Green, 9);
        store.set(1, LightChannel::Blue, 3);
        store.set(1, LightChannel::Sun, 12);

        assert_eq!(store.get(1, LightChannel::Red), 15);
        assert_eq!(store.get(1, LightChannel::Green), 9);
        assert_eq!(store.get(1, LightChannel::Blue), 3);
        assert_eq!(store.get(1, LightChannel::Sun), 12);
        assert_eq!(store.raw(1), Some(0xF93C));

        store.set(1, LightChannel::Green, 0);
        assert_eq!(store.get(1, LightChannel::Red), 15);
        assert_eq!(store.get(1, LightChannel::Green), 0);
    }

    #[test]
    fn unset_voxels_are_dark() {
        let store = LightStore::new(8);
        for channel in LightChannel::ALL {
            assert_eq!(store.get(5, channel), 0);
        }
    }

    #[test]
    fn out_of_range_reads_are_fully_lit() {
        let mut store = LightStore::new(2);
        store.set(2, LightChannel::Sun, 3);

        assert_eq!(store.get(2, LightChannel::Sun), MAX_LIGHT);
        assert_eq!(store.full_normalized(99), [1.0; 4]);
        assert_eq!(store.raw(2), None);
    }

    #[test]
    fn values_are_clamped() {
        let mut store = LightStore::new(1);
        store.set(0, LightChannel::Blue, 200);
        assert_eq!(store.get(0, LightChannel::Blue), 15);
        assert_eq!(store.get(0, LightChannel::Green), 0);
    }

    #[test]
    fn full_normalized_orders_rgb_then_sun() {
        let mut store = LightStore::new(1);
        store.set(0, LightChannel::Red, 15);
        store.set(0, LightChannel::Sun, 0);
        store.set(0, LightChannel::Blue, 5);

        let [red, green, blue, sun] = store.full_normalized(0);
        assert_eq!(red, 1.0);
        assert_eq!(green, 0.0);
        assert!((blue - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(sun, 0.0);
    }
}
