extern crate alloc;
use alloc::vec::Vec;

use rgb::RGB8;

use crate::RgbPlanes;
use crate::error::QuantizeError;
use crate::palette::{MAX_COLORS, Palette, pack_rgb, unpack_rgb};
use crate::progress::{self, Progress};

#[inline(always)]
fn key(r: u8, g: u8, b: u8) -> u32 {
    pack_rgb(RGB8 { r, g, b })
}

/// Duplicate-free, strictly increasing set of packed colors with a fixed
/// capacity.
#[derive(Debug, Clone)]
pub struct SortedColorSet {
    colors: Vec<u32>,
    capacity: usize,
}

impl SortedColorSet {
    pub fn with_capacity(capacity: usize) -> Result<Self, QuantizeError> {
        let capacity = capacity.min(MAX_COLORS);
        let mut colors = Vec::new();
        colors.try_reserve_exact(capacity)?;
        Ok(Self { colors, capacity })
    }

    /// Insert a packed color. Returns `false` if the color is new and the
    /// set is already full; the set is left unchanged in that case.
    pub fn insert(&mut self, packed: u32) -> bool {
        match self.colors.binary_search(&packed) {
            Ok(_) => true,
            Err(_) if self.colors.len() >= self.capacity => false,
            Err(pos) => {
                self.colors.insert(pos, packed);
                true
            }
        }
    }

    /// Position of a packed color in the set.
    pub fn position(&self, packed: u32) -> Option<usize> {
        self.colors.binary_search(&packed).ok()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.colors
    }

    pub fn into_palette(self) -> Palette {
        Palette::new(self.colors.into_iter().map(unpack_rgb).collect())
    }
}

/// Try to map the image losslessly onto at most `max_colors` colors.
///
/// The first pass collects the distinct colors and gives up as soon as one
/// more would not fit, returning `Ok(None)` with `indices` untouched. The
/// second pass writes each pixel's position in the sorted set. Progress is
/// advanced once per row in both passes.
pub fn exact_map(
    width: usize,
    planes: &RgbPlanes<'_>,
    max_colors: usize,
    indices: &mut [u8],
    progress: &mut dyn Progress,
) -> Result<Option<Palette>, QuantizeError> {
    if width == 0 {
        return Ok(None);
    }
    let mut set = SortedColorSet::with_capacity(max_colors)?;
    for (r_row, g_row, b_row) in planes.rows(width) {
        for ((&r, &g), &b) in r_row.iter().zip(g_row).zip(b_row) {
            if !set.insert(key(r, g, b)) {
                log::debug!("more than {} distinct colors, exact mapping rejected", set.len());
                return Ok(None);
            }
        }
        progress::row_done(progress)?;
    }

    for ((r_row, g_row, b_row), out) in planes.rows(width).zip(indices.chunks_exact_mut(width)) {
        for (i, slot) in out.iter_mut().enumerate() {
            let Some(pos) = set.position(key(r_row[i], g_row[i], b_row[i])) else {
                return Ok(None);
            };
            *slot = pos as u8;
        }
        progress::row_done(progress)?;
    }

    Ok(Some(set.into_palette()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{ProgressFn, Unstoppable};
    use alloc::vec;

    #[test]
    fn set_stays_sorted_and_unique() {
        let mut set = SortedColorSet::with_capacity(8).unwrap();
        for c in [50, 10, 30, 10, 20, 50, 40] {
            assert!(set.insert(c));
        }
        assert_eq!(set.as_slice(), &[10, 20, 30, 40, 50]);
        assert_eq!(set.position(30), Some(2));
        assert_eq!(set.position(35), None);
    }

    #[test]
    fn set_rejects_overflow_but_accepts_known_colors() {
        let mut set = SortedColorSet::with_capacity(2).unwrap();
        assert!(set.insert(1));
        assert!(set.insert(2));
        assert!(!set.insert(3));
        assert!(set.insert(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn capacity_is_capped() {
        let mut set = SortedColorSet::with_capacity(1000).unwrap();
        for c in 0..MAX_COLORS as u32 {
            assert!(set.insert(c));
        }
        assert!(!set.insert(MAX_COLORS as u32));
    }

    #[test]
    fn maps_two_colors() {
        let red = vec![255u8, 255, 0, 0];
        let green = vec![0u8, 0, 0, 0];
        let blue = vec![0u8, 0, 255, 255];
        let planes = RgbPlanes::new(&red, &green, &blue);
        let mut indices = vec![0u8; 4];
        let palette = exact_map(2, &planes, 256, &mut indices, &mut Unstoppable)
            .unwrap()
            .unwrap();
        // 0x0000FF sorts before 0xFF0000
        assert_eq!(
            palette.entries(),
            &[RGB8 { r: 0, g: 0, b: 255 }, RGB8 { r: 255, g: 0, b: 0 }]
        );
        assert_eq!(indices, vec![1, 1, 0, 0]);
    }

    #[test]
    fn rejects_too_many_colors_without_touching_indices() {
        let red: Vec<u8> = (0..16).collect();
        let zeros = vec![0u8; 16];
        let planes = RgbPlanes::new(&red, &zeros, &zeros);
        let mut indices = vec![7u8; 16];
        let result = exact_map(4, &planes, 15, &mut indices, &mut Unstoppable).unwrap();
        assert!(result.is_none());
        assert!(indices.iter().all(|&i| i == 7));
    }

    #[test]
    fn exactly_max_colors_is_accepted() {
        let red: Vec<u8> = (0..16).collect();
        let zeros = vec![0u8; 16];
        let planes = RgbPlanes::new(&red, &zeros, &zeros);
        let mut indices = vec![0u8; 16];
        let palette = exact_map(4, &planes, 16, &mut indices, &mut Unstoppable)
            .unwrap()
            .unwrap();
        assert_eq!(palette.len(), 16);
        assert_eq!(indices, (0..16).collect::<Vec<u8>>());
    }

    #[test]
    fn progress_counts_both_passes() {
        let plane = vec![3u8; 15];
        let planes = RgbPlanes::new(&plane, &plane, &plane);
        let mut indices = vec![0u8; 15];
        let mut rows = 0;
        exact_map(
            5,
            &planes,
            256,
            &mut indices,
            &mut ProgressFn(|| {
                rows += 1;
                true
            }),
        )
        .unwrap();
        assert_eq!(rows, 6);
    }

    #[test]
    fn cancel_in_second_pass() {
        let plane = vec![3u8; 15];
        let planes = RgbPlanes::new(&plane, &plane, &plane);
        let mut indices = vec![0u8; 15];
        let mut rows = 0;
        let result = exact_map(
            5,
            &planes,
            256,
            &mut indices,
            &mut ProgressFn(|| {
                rows += 1;
                rows != 5
            }),
        );
        assert_eq!(result, Err(QuantizeError::Cancelled));
    }
}
