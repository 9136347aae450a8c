extern crate alloc;
use alloc::vec::Vec;

use crate::histogram::{HIST_BITS, SCALE, SHIFT, cell_offset};
use crate::palette::Palette;

/// log2 of the number of histogram cells per update box, per axis.
const BOX_LOG: [u32; 3] = [HIST_BITS[0] - 3, HIST_BITS[1] - 3, HIST_BITS[2] - 3];

/// Histogram cells per update box, per axis.
const BOX_ELEMS: [usize; 3] = [1 << BOX_LOG[0], 1 << BOX_LOG[1], 1 << BOX_LOG[2]];

const BOX_CELLS: usize = BOX_ELEMS[0] * BOX_ELEMS[1] * BOX_ELEMS[2];

/// Shift from an 8-bit channel to an update box coordinate.
const BOX_SHIFT: [u32; 3] = [
    SHIFT[0] + BOX_LOG[0],
    SHIFT[1] + BOX_LOG[1],
    SHIFT[2] + BOX_LOG[2],
];

/// Scaled distance between neighbouring cell centers.
const STEP: [i32; 3] = [
    (1 << SHIFT[0]) * SCALE[0],
    (1 << SHIFT[1]) * SCALE[1],
    (1 << SHIFT[2]) * SCALE[2],
];

/// Lazily filled map from histogram cell to nearest palette index.
///
/// Each cell holds `0` until computed and `index + 1` afterwards. A miss
/// fills the whole update box (4×8×4 cells) around the cell at once, using
/// the distance metric of median cut (R×2, G×3, B×1).
#[derive(Debug)]
pub struct InverseColorMap<'a> {
    cells: Vec<u16>,
    palette: &'a Palette,
    candidates: Vec<u8>,
    mindist: Vec<i32>,
    bestdist: [i32; BOX_CELLS],
    bestcolor: [u8; BOX_CELLS],
}

impl<'a> InverseColorMap<'a> {
    /// Wrap an all-zero cell buffer of histogram size.
    pub(crate) fn new(cells: Vec<u16>, palette: &'a Palette) -> Self {
        let n = palette.len();
        Self {
            cells,
            palette,
            candidates: Vec::with_capacity(n),
            mindist: Vec::with_capacity(n),
            bestdist: [i32::MAX; BOX_CELLS],
            bestcolor: [0; BOX_CELLS],
        }
    }

    pub fn palette(&self) -> &'a Palette {
        self.palette
    }

    /// Palette index for cell `(c0, c1, c2)`, filling its update box on a miss.
    ///
    /// The palette must not be empty.
    #[inline]
    pub fn lookup(&mut self, c0: usize, c1: usize, c2: usize) -> u8 {
        let offset = cell_offset(c0, c1, c2);
        if self.cells[offset] == 0 {
            self.fill(c0, c1, c2);
        }
        (self.cells[offset] - 1) as u8
    }

    /// Cached index for a cell, without computing it.
    pub fn cached(&self, c0: usize, c1: usize, c2: usize) -> Option<u8> {
        match self.cells[cell_offset(c0, c1, c2)] {
            0 => None,
            v => Some((v - 1) as u8),
        }
    }

    #[inline]
    fn channel(&self, index: usize, axis: usize) -> i32 {
        let c = self.palette.entries()[index];
        match axis {
            0 => c.r as i32,
            1 => c.g as i32,
            _ => c.b as i32,
        }
    }

    /// Collect into `self.candidates` every palette entry that can be the
    /// nearest for some point of the update box starting at `minc`.
    ///
    /// An entry is dropped when its minimum distance to the box exceeds the
    /// smallest maximum distance of any entry.
    fn find_nearby_colors(&mut self, minc: [i32; 3]) {
        let mut maxc = [0i32; 3];
        let mut center = [0i32; 3];
        for axis in 0..3 {
            maxc[axis] = minc[axis] + ((1 << BOX_SHIFT[axis]) - (1 << SHIFT[axis]));
            center[axis] = (minc[axis] + maxc[axis]) >> 1;
        }

        let mut minmaxdist = i32::MAX;
        self.mindist.clear();
        for i in 0..self.palette.len() {
            let mut min_dist = 0;
            let mut max_dist = 0;
            for axis in 0..3 {
                let x = self.channel(i, axis);
                let s = SCALE[axis];
                let (lo, hi) = (minc[axis], maxc[axis]);
                if x < lo {
                    min_dist += ((x - lo) * s).pow(2);
                    max_dist += ((x - hi) * s).pow(2);
                } else if x > hi {
                    min_dist += ((x - hi) * s).pow(2);
                    max_dist += ((x - lo) * s).pow(2);
                } else if x <= center[axis] {
                    max_dist += ((x - hi) * s).pow(2);
                } else {
                    max_dist += ((x - lo) * s).pow(2);
                }
            }
            self.mindist.push(min_dist);
            minmaxdist = minmaxdist.min(max_dist);
        }

        self.candidates.clear();
        for (i, &d) in self.mindist.iter().enumerate() {
            if d <= minmaxdist {
                self.candidates.push(i as u8);
            }
        }
    }

    /// For every cell of the update box, pick the nearest of the candidates.
    ///
    /// Distances are stepped incrementally across the box: moving one cell
    /// along an axis adds `xx`, and `xx` itself grows by `2 * STEP²`.
    fn find_best_colors(&mut self, minc: [i32; 3]) {
        self.bestdist.fill(i32::MAX);

        for &icolor in &self.candidates {
            let mut inc = [0i32; 3];
            let mut dist0 = 0;
            for axis in 0..3 {
                inc[axis] = (minc[axis] - self.channel(icolor as usize, axis)) * SCALE[axis];
                dist0 += inc[axis] * inc[axis];
                inc[axis] = inc[axis] * (2 * STEP[axis]) + STEP[axis] * STEP[axis];
            }

            let mut k = 0;
            let mut xx0 = inc[0];
            for _ in 0..BOX_ELEMS[0] {
                let mut dist1 = dist0;
                let mut xx1 = inc[1];
                for _ in 0..BOX_ELEMS[1] {
                    let mut dist2 = dist1;
                    let mut xx2 = inc[2];
                    for _ in 0..BOX_ELEMS[2] {
                        if dist2 < self.bestdist[k] {
                            self.bestdist[k] = dist2;
                            self.bestcolor[k] = icolor;
                        }
                        dist2 += xx2;
                        xx2 += 2 * STEP[2] * STEP[2];
                        k += 1;
                    }
                    dist1 += xx1;
                    xx1 += 2 * STEP[1] * STEP[1];
                }
                dist0 += xx0;
                xx0 += 2 * STEP[0] * STEP[0];
            }
        }
    }

    /// Compute and store the nearest index for the update box holding the cell.
    fn fill(&mut self, c0: usize, c1: usize, c2: usize) {
        let boxc = [c0 >> BOX_LOG[0], c1 >> BOX_LOG[1], c2 >> BOX_LOG[2]];

        // Center of the box's first cell, in channel units.
        let mut minc = [0i32; 3];
        for axis in 0..3 {
            minc[axis] = ((boxc[axis] as i32) << BOX_SHIFT[axis]) + ((1 << SHIFT[axis]) >> 1);
        }

        self.find_nearby_colors(minc);
        self.find_best_colors(minc);
        log::trace!(
            "inverse map fill at box {:?}: {} of {} candidates",
            boxc,
            self.candidates.len(),
            self.palette.len()
        );

        let base = [
            boxc[0] << BOX_LOG[0],
            boxc[1] << BOX_LOG[1],
            boxc[2] << BOX_LOG[2],
        ];
        let mut k = 0;
        for i0 in 0..BOX_ELEMS[0] {
            for i1 in 0..BOX_ELEMS[1] {
                let row = cell_offset(base[0] + i0, base[1] + i1, base[2]);
                for cell in &mut self.cells[row..row + BOX_ELEMS[2]] {
                    *cell = self.bestcolor[k] as u16 + 1;
                    k += 1;
                }
            }
        }
    }
}
