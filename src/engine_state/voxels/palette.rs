//! # Palette Module
//!
//! Compact per-chunk block storage. Instead of storing a full block identifier
//! for every voxel, each voxel holds a small integer code that indexes into a
//! de-duplicating palette of the identifiers actually present in the chunk.
//!
//! ## Architecture
//!
//! - `entries` is an arena of distinct values; entry 0 is always "air"
//! - `lookup` maps a value back to its code
//! - `codes` is a bit-packed array, one code per voxel
//!
//! The code width starts at 1 bit and doubles (1, 2, 4, 8, 16) whenever the
//! palette outgrows it, at which point every code is repacked at the new width.
//!
//! ## Performance Considerations
//!
//! - Memory is proportional to the number of distinct values, not to the size
//!   of a value times the volume
//! - Reads are a bit-slice load plus a vector index
//! - Repacking is O(volume) but happens at most four times per chunk

use bitvec::prelude::*;
use std::collections::HashMap;
use std::hash::Hash;
use thiserror::Error;

/// Largest number of distinct values a palette can hold (16-bit codes).
pub const MAX_ENTRIES: usize = 1 << 16;

/// Code widths the store steps through as the palette grows.
const CODE_WIDTHS: [usize; 5] = [1, 2, 4, 8, 16];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaletteError {
    #[error("palette is full: at most {capacity} distinct values fit in one store")]
    CapacityExceeded { capacity: usize },
}

/// A bit-packed voxel array backed by a de-duplicating palette.
///
/// # Examples
///
/// ```
/// use voxel_pipeline::engine_state::voxels::palette::Palette;
///
/// let mut palette = Palette::new(64, "air");
/// palette.set(3, "stone").unwrap();
///
/// assert_eq!(*palette.get(3), "stone");
/// assert_eq!(*palette.get(4), "air");
/// assert_eq!(*palette.get(1000), "air");
/// ```
#[derive(Debug, Clone)]
pub struct Palette<T> {
    entries: Vec<T>,
    lookup: HashMap<T, u16>,
    codes: BitVec<u64, Lsb0>,
    bits_per_entry: usize,
    len: usize,
}

impl<T: Clone + Eq + Hash> Palette<T> {
    /// Creates a store of `len` voxels, all set to `air`.
    ///
    /// # Arguments
    /// * `len` - Number of voxels in the store
    /// * `air` - The value code 0 stands for; also returned by out-of-range reads
    pub fn new(len: usize, air: T) -> Self {
        let mut lookup = HashMap::new();
        lookup.insert(air.clone(), 0);

        Self {
            entries: vec![air],
            lookup,
            codes: bitvec![u64, Lsb0; 0; len],
            bits_per_entry: CODE_WIDTHS[0],
            len,
        }
    }

    /// Number of voxels in the store.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct values ever stored, including air.
    pub fn palette_len(&self) -> usize {
        self.entries.len()
    }

    /// Current width of a single code in bits.
    pub fn bits_per_entry(&self) -> usize {
        self.bits_per_entry
    }

    /// The air value (code 0).
    pub fn air(&self) -> &T {
        &self.entries[0]
    }

    /// Returns the value stored at `index`, or air if `index` is out of range.
    pub fn get(&self, index: usize) -> &T {
        if index >= self.len {
            return self.air();
        }

        let code = self.load_code(index);
        // Codes are only ever written from `lookup`, so they always index an entry.
        &self.entries[code as usize]
    }

    /// Stores `value` at `index`, allocating a new palette code if the value
    /// has not been seen before.
    ///
    /// Writes outside the store are ignored.
    ///
    /// # Errors
    /// Returns [`PaletteError::CapacityExceeded`] when `value` is new and the
    /// palette already holds [`MAX_ENTRIES`] distinct values. The store is left
    /// untouched in that case.
    pub fn set(&mut self, index: usize, value: T) -> Result<(), PaletteError> {
        if index >= self.len {
            return Ok(());
        }

        let code = match self.lookup.get(&value) {
            Some(&code) => code,
            None => self.allocate(value)?,
        };

        self.store_code(index, code);
        Ok(())
    }

    /// Iterates over every voxel value in index order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).map(move |index| self.get(index))
    }

    fn allocate(&mut self, value: T) -> Result<u16, PaletteError> {
        if self.entries.len() >= MAX_ENTRIES {
            return Err(PaletteError::CapacityExceeded {
                capacity: MAX_ENTRIES,
            });
        }

        let code = self.entries.len() as u16;
        self.entries.push(value.clone());
        self.lookup.insert(value, code);

        let required = Self::width_for(self.entries.len());
        if required > self.bits_per_entry {
            self.repack(required);
        }

        Ok(code)
    }

    fn width_for(entry_count: usize) -> usize {
        CODE_WIDTHS
            .into_iter()
            .find(|bits| entry_count <= 1 << bits)
            .unwrap_or(16)
    }

    fn repack(&mut self, bits_per_entry: usize) {
        let mut codes = bitvec![u64, Lsb0; 0; self.len * bits_per_entry];
        for index in 0..self.len {
            let code = self.load_code(index);
            let start = index * bits_per_entry;
            codes[start..start + bits_per_entry].store_le(code);
        }

        self.codes = codes;
        self.bits_per_entry = bits_per_entry;
    }

    fn load_code(&self, index: usize) -> u16 {
        let start = index * self.bits_per_entry;
        self.codes[start..start + self.bits_per_entry].load_le::<u16>()
    }

    fn store_code(&mut self, index: usize, code: u16) {
        let start = index * self.bits_per_entry;
        self.codes[start..start + self.bits_per_entry].store_le(code);
    }
}
