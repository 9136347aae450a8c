#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

//! Convert 24-bit RGB images to indexed color.
//!
//! Images that already use few enough colors are mapped losslessly. Anything
//! else goes through a 5/6/5-bit histogram, median-cut color selection and
//! serpentine Floyd-Steinberg dithering against a lazily built inverse
//! color map.
//!
//! ```
//! use rgb2map::{QuantizeConfig, RgbPlanes};
//!
//! let red = [255u8, 255, 0, 0];
//! let green = [0u8; 4];
//! let blue = [0u8, 0, 255, 255];
//! let planes = RgbPlanes::new(&red, &green, &blue);
//! let result = rgb2map::quantize(2, 2, planes, &QuantizeConfig::new())?;
//! assert!(result.is_exact());
//! assert_eq!(result.palette_len(), 2);
//! assert_eq!(result.packed_palette(), vec![0x0000FF, 0xFF0000]);
//! # Ok::<(), rgb2map::QuantizeError>(())
//! ```

extern crate alloc;

pub mod dither;
pub mod error;
pub mod exact;
pub mod histogram;
pub mod inverse_map;
pub mod median_cut;
pub mod palette;
pub mod progress;

pub use dither::DitherMode;
pub use error::QuantizeError;
pub use imgref::{ImgRef, ImgVec};
pub use palette::{Palette, PaletteOrder, pack_rgb, unpack_rgb};
pub use progress::{Progress, ProgressFn, Unstoppable};

use alloc::vec::Vec;
use rgb::RGB8;

use crate::histogram::ColorHistogram;
use crate::palette::MAX_COLORS;

/// Borrowed, separated R/G/B byte planes of a `width × height` image,
/// row-major with no padding.
#[derive(Debug, Clone, Copy)]
pub struct RgbPlanes<'a> {
    pub red: &'a [u8],
    pub green: &'a [u8],
    pub blue: &'a [u8],
}

impl<'a> RgbPlanes<'a> {
    pub fn new(red: &'a [u8], green: &'a [u8], blue: &'a [u8]) -> Self {
        Self { red, green, blue }
    }

    /// Iterate rows of `width` pixels as `(red, green, blue)` slices.
    pub(crate) fn rows(
        &self,
        width: usize,
    ) -> impl Iterator<Item = (&'a [u8], &'a [u8], &'a [u8])> + 'a {
        let (red, green, blue) = (self.red, self.green, self.blue);
        red.chunks_exact(width)
            .zip(green.chunks_exact(width))
            .zip(blue.chunks_exact(width))
            .map(|((r, g), b)| (r, g, b))
    }
}

/// Configuration for RGB to indexed conversion.
#[derive(Debug, Clone)]
pub struct QuantizeConfig {
    /// Maximum number of palette colors. 0 or anything above 256 means 256.
    pub max_colors: u32,
    /// Dithering used when the image needs a reduced palette.
    pub dither: DitherMode,
    /// Order of the returned palette entries.
    pub palette_order: PaletteOrder,
}

impl Default for QuantizeConfig {
    fn default() -> Self {
        Self {
            max_colors: MAX_COLORS as u32,
            dither: DitherMode::FloydSteinberg,
            palette_order: PaletteOrder::Selection,
        }
    }
}

impl QuantizeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_colors(mut self, n: u32) -> Self {
        self.max_colors = n;
        self
    }

    pub fn dither(mut self, mode: DitherMode) -> Self {
        self.dither = mode;
        self
    }

    pub fn palette_order(mut self, order: PaletteOrder) -> Self {
        self.palette_order = order;
        self
    }

    /// Palette bound actually used: 1..=256.
    pub fn effective_max_colors(&self) -> usize {
        match self.max_colors as usize {
            n @ 1..=MAX_COLORS => n,
            _ => MAX_COLORS,
        }
    }
}

/// Conversion result.
#[derive(Debug, Clone)]
pub struct QuantizeResult {
    palette: Palette,
    indices: Vec<u8>,
    exact: bool,
}

impl QuantizeResult {
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Palette entries packed as `0xRRGGBB`.
    pub fn packed_palette(&self) -> Vec<u32> {
        self.palette.to_packed()
    }

    /// One palette index per pixel, row-major.
    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    /// Number of colors in the palette. May be below the requested bound.
    pub fn palette_len(&self) -> usize {
        self.palette.len()
    }

    /// Whether the image was mapped without loss.
    pub fn is_exact(&self) -> bool {
        self.exact
    }

    pub fn into_parts(self) -> (Palette, Vec<u8>) {
        (self.palette, self.indices)
    }
}

/// Convert separated R/G/B planes to a palette and index plane.
pub fn quantize(
    width: usize,
    height: usize,
    planes: RgbPlanes<'_>,
    config: &QuantizeConfig,
) -> Result<QuantizeResult, QuantizeError> {
    quantize_with_progress(width, height, planes, config, &mut Unstoppable)
}

/// Like [`quantize`], reporting each processed row to `progress`.
///
/// The total announced up front is `4 * height` steps. A lossless image
/// consumes two passes worth, a reduced one stops the first pass early and
/// then runs the histogram and mapping passes.
pub fn quantize_with_progress(
    width: usize,
    height: usize,
    planes: RgbPlanes<'_>,
    config: &QuantizeConfig,
    progress: &mut dyn Progress,
) -> Result<QuantizeResult, QuantizeError> {
    let pixel_count = validate_inputs(width, height, &planes)?;
    let max_colors = config.effective_max_colors();

    progress.set_total(4 * height as u64, "Converting...");

    let mut indices = Vec::new();
    indices.try_reserve_exact(pixel_count)?;
    indices.resize(pixel_count, 0);

    // 1. Lossless mapping if the image fits
    let lossless = exact::exact_map(width, &planes, max_colors, &mut indices, progress)?;
    if let Some(mut palette) = lossless {
        log::debug!("exact mapping with {} colors", palette.len());
        let remap = palette.reorder(config.palette_order);
        palette::apply_remap(&mut indices, &remap);
        return Ok(QuantizeResult {
            palette,
            indices,
            exact: true,
        });
    }

    // 2. Histogram
    let mut hist = ColorHistogram::new()?;
    hist.fill(width, &planes, progress)?;

    // 3. Median cut
    let mut palette = median_cut::select_colors(&hist, max_colors)?;
    palette.reorder(config.palette_order);
    log::debug!(
        "median cut: {} occupied cells reduced to {} colors",
        hist.occupied(),
        palette.len()
    );

    // 4. Map pixels, reusing the histogram buffer as the inverse map
    {
        let mut map = hist.into_inverse_map(&palette);
        match config.dither {
            DitherMode::FloydSteinberg => {
                dither::diffuse(width, height, &planes, &mut map, &mut indices, progress)?
            }
            DitherMode::None => {
                dither::remap_nearest(width, &planes, &mut map, &mut indices, progress)?
            }
        }
    }

    Ok(QuantizeResult {
        palette,
        indices,
        exact: false,
    })
}

/// Convert interleaved RGB pixels.
pub fn quantize_pixels(
    pixels: &[RGB8],
    width: usize,
    height: usize,
    config: &QuantizeConfig,
) -> Result<QuantizeResult, QuantizeError> {
    if width == 0 || height == 0 {
        return Err(QuantizeError::ZeroDimension);
    }
    if Some(pixels.len()) != width.checked_mul(height) {
        return Err(QuantizeError::DimensionMismatch {
            channel: "pixel",
            len: pixels.len(),
            width,
            height,
        });
    }
    let planes = SplitPlanes::from_rows(core::iter::once(pixels), pixels.len())?;
    quantize(width, height, planes.as_planes(), config)
}

/// Convert an `imgref` image. Row stride padding is skipped.
pub fn quantize_img(
    img: ImgRef<'_, RGB8>,
    config: &QuantizeConfig,
) -> Result<QuantizeResult, QuantizeError> {
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(QuantizeError::ZeroDimension);
    }
    let planes = SplitPlanes::from_rows(img.rows(), width * height)?;
    quantize(width, height, planes.as_planes(), config)
}

/// Owned planes split out of interleaved pixels.
struct SplitPlanes {
    red: Vec<u8>,
    green: Vec<u8>,
    blue: Vec<u8>,
}

impl SplitPlanes {
    fn from_rows<'p>(
        rows: impl Iterator<Item = &'p [RGB8]>,
        len: usize,
    ) -> Result<Self, QuantizeError> {
        let mut planes = Self {
            red: Vec::new(),
            green: Vec::new(),
            blue: Vec::new(),
        };
        planes.red.try_reserve_exact(len)?;
        planes.green.try_reserve_exact(len)?;
        planes.blue.try_reserve_exact(len)?;
        for row in rows {
            for p in row {
                planes.red.push(p.r);
                planes.green.push(p.g);
                planes.blue.push(p.b);
            }
        }
        Ok(planes)
    }

    fn as_planes(&self) -> RgbPlanes<'_> {
        RgbPlanes::new(&self.red, &self.green, &self.blue)
    }
}

fn validate_inputs(
    width: usize,
    height: usize,
    planes: &RgbPlanes<'_>,
) -> Result<usize, QuantizeError> {
    if width == 0 || height == 0 {
        return Err(QuantizeError::ZeroDimension);
    }
    let expected = width.checked_mul(height);
    for (channel, plane) in [
        ("red", planes.red),
        ("green", planes.green),
        ("blue", planes.blue),
    ] {
        if Some(plane.len()) != expected {
            return Err(QuantizeError::DimensionMismatch {
                channel,
                len: plane.len(),
                width,
                height,
            });
        }
    }
    Ok(width * height)
}
