extern crate alloc;
use alloc::vec;
use alloc::vec::Vec;

use rgb::RGB8;

/// Largest palette the converter will produce.
pub const MAX_COLORS: usize = 256;

/// Strategy for ordering palette entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaletteOrder {
    /// Keep the order the colors were produced in: ascending packed value
    /// for exact palettes, box order for median-cut palettes.
    #[default]
    Selection,
    /// Sort by Rec.601 luma, ascending. Ties keep their selection order.
    Luminance,
}

/// Pack a color as `R << 16 | G << 8 | B`.
#[inline]
pub const fn pack_rgb(c: RGB8) -> u32 {
    (c.r as u32) << 16 | (c.g as u32) << 8 | c.b as u32
}

/// Inverse of [`pack_rgb`]. Bits above 23 are ignored.
#[inline]
pub const fn unpack_rgb(packed: u32) -> RGB8 {
    RGB8 {
        r: (packed >> 16) as u8,
        g: (packed >> 8) as u8,
        b: packed as u8,
    }
}

/// Integer Rec.601 luma scaled by 1000.
#[inline]
fn luma(c: RGB8) -> u32 {
    299 * c.r as u32 + 587 * c.g as u32 + 114 * c.b as u32
}

/// An ordered list of at most [`MAX_COLORS`] colors; the position of an
/// entry is the index written to the output plane.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Palette {
    entries: Vec<RGB8>,
}

impl Palette {
    /// Build a palette from entries. Anything past [`MAX_COLORS`] is dropped.
    pub fn new(mut entries: Vec<RGB8>) -> Self {
        entries.truncate(MAX_COLORS);
        Self { entries }
    }

    /// Build a palette from packed `0xRRGGBB` values.
    pub fn from_packed(packed: &[u32]) -> Self {
        Self::new(packed.iter().map(|&p| unpack_rgb(p)).collect())
    }

    pub fn entries(&self) -> &[RGB8] {
        &self.entries
    }

    pub fn get(&self, index: u8) -> Option<RGB8> {
        self.entries.get(index as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in the packed `0xRRGGBB` wire form.
    pub fn to_packed(&self) -> Vec<u32> {
        self.entries.iter().map(|&c| pack_rgb(c)).collect()
    }

    /// Reorder entries according to `order`.
    ///
    /// Returns a table mapping each old index to its new index, so index
    /// planes produced against the old order can be rewritten.
    pub fn reorder(&mut self, order: PaletteOrder) -> Vec<u8> {
        let n = self.entries.len();
        let mut perm: Vec<usize> = (0..n).collect();
        if order == PaletteOrder::Luminance {
            perm.sort_by_key(|&i| luma(self.entries[i]));
        }

        let mut remap = vec![0u8; n];
        for (new_idx, &old_idx) in perm.iter().enumerate() {
            remap[old_idx] = new_idx as u8;
        }
        self.entries = perm.iter().map(|&i| self.entries[i]).collect();
        remap
    }

    /// Expand an index plane back to interleaved colors.
    /// Out-of-range indices map to black.
    pub fn expand(&self, indices: &[u8]) -> Vec<RGB8> {
        indices
            .iter()
            .map(|&i| self.get(i).unwrap_or_default())
            .collect()
    }
}

/// Rewrite an index plane through an old→new table from [`Palette::reorder`].
pub(crate) fn apply_remap(indices: &mut [u8], remap: &[u8]) {
    for idx in indices.iter_mut() {
        *idx = remap[*idx as usize];
    }
}
