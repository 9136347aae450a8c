extern crate alloc;
use alloc::vec::Vec;

use rgb::RGB8;

use crate::error::QuantizeError;
use crate::histogram::{ColorHistogram, ELEMS, SCALE, SHIFT};
use crate::palette::{MAX_COLORS, Palette};

/// An axis-aligned block of histogram cells, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBox {
    pub min: [usize; 3],
    pub max: [usize; 3],
    /// Squared 2-norm of the scaled extent.
    pub volume: u32,
    /// Number of non-empty cells inside the bounds.
    pub colorcount: u32,
}

/// Extent of `max - min` on `axis`, in scaled channel units.
#[inline]
fn scaled_extent(min: usize, max: usize, axis: usize) -> u32 {
    (((max - min) as u32) << SHIFT[axis]) * SCALE[axis] as u32
}

impl CellBox {
    /// A box spanning every cell of the cube, stats not yet computed.
    pub fn whole_cube() -> Self {
        Self {
            min: [0; 3],
            max: [ELEMS[0] - 1, ELEMS[1] - 1, ELEMS[2] - 1],
            volume: 0,
            colorcount: 0,
        }
    }

    /// Whether any cell with coordinate `value` on `axis` (and inside the
    /// other two bounds) is non-empty.
    fn plane_occupied(&self, hist: &ColorHistogram, axis: usize, value: usize) -> bool {
        let (a, b) = match axis {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };
        let mut c = [0usize; 3];
        c[axis] = value;
        for i in self.min[a]..=self.max[a] {
            c[a] = i;
            for j in self.min[b]..=self.max[b] {
                c[b] = j;
                if hist.count(c[0], c[1], c[2]) != 0 {
                    return true;
                }
            }
        }
        false
    }

    /// Shrink the bounds to the smallest range holding every non-empty cell,
    /// then recompute `volume` and `colorcount`.
    ///
    /// An axis is only scanned while its extent is non-zero, and a face with
    /// no occupied plane at all is left where it was.
    pub fn update(&mut self, hist: &ColorHistogram) {
        for axis in 0..3 {
            if self.max[axis] > self.min[axis] {
                if let Some(v) =
                    (self.min[axis]..=self.max[axis]).find(|&v| self.plane_occupied(hist, axis, v))
                {
                    self.min[axis] = v;
                }
            }
            if self.max[axis] > self.min[axis] {
                if let Some(v) = (self.min[axis]..=self.max[axis])
                    .rev()
                    .find(|&v| self.plane_occupied(hist, axis, v))
                {
                    self.max[axis] = v;
                }
            }
        }

        self.volume = (0..3)
            .map(|axis| {
                let d = scaled_extent(self.min[axis], self.max[axis], axis);
                d * d
            })
            .sum();

        let mut ccount = 0;
        for c0 in self.min[0]..=self.max[0] {
            for c1 in self.min[1]..=self.max[1] {
                for c2 in self.min[2]..=self.max[2] {
                    if hist.count(c0, c1, c2) != 0 {
                        ccount += 1;
                    }
                }
            }
        }
        self.colorcount = ccount;
    }

    /// Axis to split on: the largest scaled extent, considering G first,
    /// then R, then B, each only if strictly larger than the best so far.
    pub fn split_axis(&self) -> usize {
        let ext = |axis| scaled_extent(self.min[axis], self.max[axis], axis);
        let mut best = 1;
        let mut max = ext(1);
        if ext(0) > max {
            best = 0;
            max = ext(0);
        }
        if ext(2) > max {
            best = 2;
        }
        best
    }

    /// Split at the midpoint of `split_axis()`. `self` keeps the lower half,
    /// the returned box takes the upper half. Neither box is re-tightened.
    pub fn split(&mut self) -> CellBox {
        let axis = self.split_axis();
        let mid = (self.min[axis] + self.max[axis]) / 2;
        let mut upper = *self;
        self.max[axis] = mid;
        upper.min[axis] = mid + 1;
        upper
    }

    /// Count-weighted mean of the cell centers, rounded half up.
    ///
    /// Returns `None` when the box holds no population.
    pub fn representative(&self, hist: &ColorHistogram) -> Option<RGB8> {
        let half = |axis: usize| (1u64 << SHIFT[axis]) >> 1;
        let mut total = 0u64;
        let mut sums = [0u64; 3];

        for c0 in self.min[0]..=self.max[0] {
            for c1 in self.min[1]..=self.max[1] {
                for c2 in self.min[2]..=self.max[2] {
                    let count = hist.count(c0, c1, c2) as u64;
                    if count == 0 {
                        continue;
                    }
                    total += count;
                    for (axis, c) in [c0, c1, c2].into_iter().enumerate() {
                        sums[axis] += (((c as u64) << SHIFT[axis]) + half(axis)) * count;
                    }
                }
            }
        }

        if total == 0 {
            return None;
        }
        let mean = |axis: usize| ((sums[axis] + (total >> 1)) / total) as u8;
        Some(RGB8 {
            r: mean(0),
            g: mean(1),
            b: mean(2),
        })
    }
}

/// First box with the strictly largest population among boxes that still
/// have extent.
fn biggest_population(boxes: &[CellBox]) -> Option<usize> {
    let mut which = None;
    let mut maxc = 0;
    for (i, b) in boxes.iter().enumerate() {
        if b.colorcount > maxc && b.volume > 0 {
            which = Some(i);
            maxc = b.colorcount;
        }
    }
    which
}

/// First box with the strictly largest volume.
fn biggest_volume(boxes: &[CellBox]) -> Option<usize> {
    let mut which = None;
    let mut maxv = 0;
    for (i, b) in boxes.iter().enumerate() {
        if b.volume > maxv {
            which = Some(i);
            maxv = b.volume;
        }
    }
    which
}

/// Split boxes until there are `desired` of them or none can be split.
///
/// The first half of the splits goes by population, the rest by volume.
/// New boxes are appended, so the result order is deterministic.
pub fn median_cut(hist: &ColorHistogram, boxes: &mut Vec<CellBox>, desired: usize) {
    while boxes.len() < desired {
        let pick = if boxes.len() * 2 <= desired {
            biggest_population(boxes)
        } else {
            biggest_volume(boxes)
        };
        let Some(idx) = pick else {
            break; // No more splittable boxes
        };

        let mut upper = boxes[idx].split();
        boxes[idx].update(hist);
        upper.update(hist);
        boxes.push(upper);
    }
}

/// Choose up to `desired` palette colors from a filled histogram.
pub fn select_colors(hist: &ColorHistogram, desired: usize) -> Result<Palette, QuantizeError> {
    let desired = desired.clamp(1, MAX_COLORS);

    let mut boxes = Vec::new();
    boxes.try_reserve_exact(desired)?;
    let mut whole = CellBox::whole_cube();
    whole.update(hist);
    boxes.push(whole);

    median_cut(hist, &mut boxes, desired);
    if boxes.len() < desired {
        log::warn!(
            "median cut stopped at {} of {} boxes: nothing left to split",
            boxes.len(),
            desired
        );
    }

    let mut colors = Vec::new();
    colors.try_reserve_exact(boxes.len())?;
    for (index, b) in boxes.iter().enumerate() {
        let color = b
            .representative(hist)
            .ok_or(QuantizeError::EmptyBox { index })?;
        colors.push(color);
    }
    Ok(Palette::new(colors))
}
