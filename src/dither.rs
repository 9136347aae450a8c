extern crate alloc;
use alloc::vec::Vec;

use crate::RgbPlanes;
use crate::error::QuantizeError;
use crate::histogram::{SHIFT, cell_of};
use crate::inverse_map::InverseColorMap;
use crate::progress::{self, Progress};

/// Dithering mode for the statistical path.
///
/// Exact palettes are never dithered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DitherMode {
    /// Nearest color only.
    None,
    /// Serpentine Floyd-Steinberg with a limited error carry.
    #[default]
    FloydSteinberg,
}

const MAX_ERROR: i32 = 255;
const STEPSIZE: i32 = (MAX_ERROR + 1) / 16;

/// Clamp table for propagated error, indexed by -255..=255.
///
/// Errors pass through unchanged up to ±16, at half slope up to ±48, and
/// are held at ±32 beyond that. This keeps large errors from spraying
/// isolated off-color pixels across flat areas.
#[derive(Debug, Clone)]
pub struct ErrorLimiter {
    table: [i32; (2 * MAX_ERROR + 1) as usize],
}

impl ErrorLimiter {
    pub fn new() -> Self {
        let mut table = [0i32; (2 * MAX_ERROR + 1) as usize];
        let mut set = |input: i32, out: i32| {
            table[(MAX_ERROR + input) as usize] = out;
            table[(MAX_ERROR - input) as usize] = -out;
        };

        let mut input = 0;
        let mut out = 0;
        while input < STEPSIZE {
            set(input, out);
            input += 1;
            out += 1;
        }
        while input < STEPSIZE * 3 {
            set(input, out);
            input += 1;
            if input & 1 == 0 {
                out += 1;
            }
        }
        while input <= MAX_ERROR {
            set(input, out);
            input += 1;
        }

        Self { table }
    }

    #[inline]
    pub fn limit(&self, error: i32) -> i32 {
        self.table[(error.clamp(-MAX_ERROR, MAX_ERROR) + MAX_ERROR) as usize]
    }
}

impl Default for ErrorLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Map every pixel to a palette index with serpentine Floyd-Steinberg
/// error diffusion.
///
/// Even rows run left to right, odd rows right to left. Errors are kept in
/// 1/16 units: 7/16 is carried to the next pixel in scan direction, 3/16,
/// 5/16 and 1/16 go to the row below. The row buffer has one dummy column
/// on each side so edge pixels need no special casing.
pub fn diffuse(
    width: usize,
    height: usize,
    planes: &RgbPlanes<'_>,
    map: &mut InverseColorMap<'_>,
    indices: &mut [u8],
    progress: &mut dyn Progress,
) -> Result<(), QuantizeError> {
    let limiter = ErrorLimiter::new();
    let mut errors: Vec<i32> = Vec::new();
    errors.try_reserve_exact((width + 2) * 3)?;
    errors.resize((width + 2) * 3, 0);

    let palette = map.palette();
    let mut on_odd_row = false;

    for y in 0..height {
        let row = y * width;
        let (mut x, dir, mut e) = if on_odd_row {
            (width as isize - 1, -1isize, (width + 1) * 3)
        } else {
            (0isize, 1isize, 0usize)
        };
        on_odd_row = !on_odd_row;

        // cur carries the previous pixel's error forward; belowerr and
        // bpreverr are row-below sums not yet written to the buffer.
        let mut cur = [0i32; 3];
        let mut belowerr = [0i32; 3];
        let mut bpreverr = [0i32; 3];

        for _ in 0..width {
            let px = row + x as usize;
            let input = [planes.red[px], planes.green[px], planes.blue[px]];
            let ahead = (e as isize + 3 * dir) as usize;

            for c in 0..3 {
                let carried = (cur[c] + errors[ahead + c] + 8) >> 4;
                cur[c] = (limiter.limit(carried) + input[c] as i32).clamp(0, 255);
            }

            let index = map.lookup(
                (cur[0] >> SHIFT[0]) as usize,
                (cur[1] >> SHIFT[1]) as usize,
                (cur[2] >> SHIFT[2]) as usize,
            );
            indices[px] = index;

            let chosen = palette.entries()[index as usize];
            cur[0] -= chosen.r as i32;
            cur[1] -= chosen.g as i32;
            cur[2] -= chosen.b as i32;

            for c in 0..3 {
                let bnexterr = cur[c];
                let delta = cur[c] * 2;
                cur[c] += delta; // 3x
                errors[e + c] = bpreverr[c] + cur[c];
                cur[c] += delta; // 5x
                bpreverr[c] = belowerr[c] + cur[c];
                belowerr[c] = bnexterr;
                cur[c] += delta; // 7x
            }

            x += dir;
            e = (e as isize + 3 * dir) as usize;
        }

        // belowerr belongs to the dummy column and is dropped.
        errors[e..e + 3].copy_from_slice(&bpreverr);

        progress::row_done(progress)?;
    }

    Ok(())
}

/// Map every pixel to the palette index of its histogram cell, without
/// error propagation.
pub fn remap_nearest(
    width: usize,
    planes: &RgbPlanes<'_>,
    map: &mut InverseColorMap<'_>,
    indices: &mut [u8],
    progress: &mut dyn Progress,
) -> Result<(), QuantizeError> {
    if width == 0 {
        return Ok(());
    }
    for ((r_row, g_row, b_row), out) in planes.rows(width).zip(indices.chunks_exact_mut(width)) {
        for (i, slot) in out.iter_mut().enumerate() {
            let [c0, c1, c2] = cell_of(r_row[i], g_row[i], b_row[i]);
            *slot = map.lookup(c0, c1, c2);
        }
        progress::row_done(progress)?;
    }
    Ok(())
}
