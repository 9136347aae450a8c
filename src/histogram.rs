extern crate alloc;
use alloc::vec::Vec;

use crate::RgbPlanes;
use crate::error::QuantizeError;
use crate::inverse_map::InverseColorMap;
use crate::palette::Palette;
use crate::progress::{self, Progress};

/// Bits of precision kept per axis (R, G, B). Green gets the extra bit.
pub const HIST_BITS: [u32; 3] = [5, 6, 5];

/// Right shift turning an 8-bit channel into a cell coordinate.
pub const SHIFT: [u32; 3] = [8 - HIST_BITS[0], 8 - HIST_BITS[1], 8 - HIST_BITS[2]];

/// Number of cells along each axis.
pub const ELEMS: [usize; 3] = [
    1 << HIST_BITS[0],
    1 << HIST_BITS[1],
    1 << HIST_BITS[2],
];

/// Distance weights per axis, applied to channel differences.
pub const SCALE: [i32; 3] = [2, 3, 1];

pub(crate) const CELL_COUNT: usize = ELEMS[0] * ELEMS[1] * ELEMS[2];

/// Flat offset of cell `(c0, c1, c2)`.
#[inline(always)]
pub(crate) fn cell_offset(c0: usize, c1: usize, c2: usize) -> usize {
    (c0 * ELEMS[1] + c1) * ELEMS[2] + c2
}

/// Cell coordinates of an 8-bit color.
#[inline(always)]
pub fn cell_of(r: u8, g: u8, b: u8) -> [usize; 3] {
    [
        (r >> SHIFT[0]) as usize,
        (g >> SHIFT[1]) as usize,
        (b >> SHIFT[2]) as usize,
    ]
}

/// Occupancy histogram over the 5/6/5-bit color cube.
///
/// Counters saturate at `u16::MAX` instead of wrapping. After median cut the
/// buffer is handed to [`InverseColorMap`] via [`Self::into_inverse_map`],
/// so the histogram and the cache never exist at the same time.
#[derive(Debug)]
pub struct ColorHistogram {
    cells: Vec<u16>,
}

impl ColorHistogram {
    /// Allocate an all-zero histogram.
    pub fn new() -> Result<Self, QuantizeError> {
        let mut cells = Vec::new();
        cells.try_reserve_exact(CELL_COUNT)?;
        cells.resize(CELL_COUNT, 0);
        Ok(Self { cells })
    }

    /// Count one pixel.
    #[inline]
    pub fn add(&mut self, r: u8, g: u8, b: u8) {
        let [c0, c1, c2] = cell_of(r, g, b);
        let cell = &mut self.cells[cell_offset(c0, c1, c2)];
        *cell = cell.saturating_add(1);
    }

    /// Count every pixel of the image, advancing `progress` once per row.
    pub fn fill(
        &mut self,
        width: usize,
        planes: &RgbPlanes<'_>,
        progress: &mut dyn Progress,
    ) -> Result<(), QuantizeError> {
        if width == 0 {
            return Ok(());
        }
        for (r_row, g_row, b_row) in planes.rows(width) {
            for ((&r, &g), &b) in r_row.iter().zip(g_row).zip(b_row) {
                self.add(r, g, b);
            }
            progress::row_done(progress)?;
        }
        Ok(())
    }

    #[inline]
    pub fn count(&self, c0: usize, c1: usize, c2: usize) -> u16 {
        self.cells[cell_offset(c0, c1, c2)]
    }

    /// Number of non-empty cells.
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }

    /// Zero every cell.
    pub fn reset(&mut self) {
        self.cells.fill(0);
    }

    /// Zero the buffer and reuse it as the inverse color map for `palette`.
    pub fn into_inverse_map(mut self, palette: &Palette) -> InverseColorMap<'_> {
        self.reset();
        InverseColorMap::new(self.cells, palette)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{ProgressFn, Unstoppable};
    use alloc::vec;

    #[test]
    fn axis_layout() {
        assert_eq!(ELEMS, [32, 64, 32]);
        assert_eq!(SHIFT, [3, 2, 3]);
        assert_eq!(CELL_COUNT, 65536);
        assert_eq!(cell_of(255, 255, 255), [31, 63, 31]);
        assert_eq!(cell_offset(31, 63, 31), CELL_COUNT - 1);
    }

    #[test]
    fn nearby_values_share_a_cell() {
        let mut hist = ColorHistogram::new().unwrap();
        hist.add(8, 4, 8);
        hist.add(15, 7, 15);
        assert_eq!(hist.count(1, 1, 1), 2);
        assert_eq!(hist.occupied(), 1);
    }

    #[test]
    fn counters_saturate() {
        let mut hist = ColorHistogram::new().unwrap();
        for _ in 0..(u16::MAX as u32 + 10) {
            hist.add(200, 100, 50);
        }
        let [c0, c1, c2] = cell_of(200, 100, 50);
        assert_eq!(hist.count(c0, c1, c2), u16::MAX);
    }

    #[test]
    fn fill_counts_all_pixels() {
        let red = vec![0u8, 255, 0, 255];
        let green = vec![0u8, 255, 0, 255];
        let blue = vec![0u8, 255, 0, 255];
        let planes = RgbPlanes::new(&red, &green, &blue);
        let mut hist = ColorHistogram::new().unwrap();
        hist.fill(2, &planes, &mut Unstoppable).unwrap();
        assert_eq!(hist.count(0, 0, 0), 2);
        assert_eq!(hist.count(31, 63, 31), 2);
        assert_eq!(hist.occupied(), 2);

        hist.reset();
        assert_eq!(hist.occupied(), 0);
    }

    #[test]
    fn fill_reports_rows_and_cancels() {
        let plane = vec![7u8; 12];
        let planes = RgbPlanes::new(&plane, &plane, &plane);

        let mut rows = 0;
        let mut hist = ColorHistogram::new().unwrap();
        hist.fill(4, &planes, &mut ProgressFn(|| {
            rows += 1;
            true
        }))
        .unwrap();
        assert_eq!(rows, 3);

        let mut hist = ColorHistogram::new().unwrap();
        let err = hist.fill(4, &planes, &mut ProgressFn(|| false));
        assert_eq!(err, Err(QuantizeError::Cancelled));
    }
}
