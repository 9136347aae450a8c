use rgb::RGB8;
use rgb2map::{DitherMode, QuantizeConfig, QuantizeResult};

/// Mean absolute per-channel error between the image and its mapping.
fn mean_abs_error(pixels: &[RGB8], result: &QuantizeResult) -> f64 {
    let mapped = result.palette().expand(result.indices());
    let mut total = 0u64;
    for (p, q) in pixels.iter().zip(&mapped) {
        total += p.r.abs_diff(q.r) as u64 + p.g.abs_diff(q.g) as u64 + p.b.abs_diff(q.b) as u64;
    }
    total as f64 / (pixels.len() * 3) as f64
}

fn gradient_image(width: usize, height: usize) -> Vec<RGB8> {
    let mut pixels = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            let b = ((x + y) * 128 / (width + height).max(1)) as u8;
            pixels.push(RGB8 { r, g, b });
        }
    }
    pixels
}

fn noisy_image(width: usize, height: usize) -> Vec<RGB8> {
    (0..(width * height) as u32)
        .map(|i| {
            let h = i.wrapping_mul(2654435761); // Knuth's multiplicative hash
            RGB8 {
                r: (h >> 8) as u8,
                g: (h >> 16) as u8,
                b: (h >> 24) as u8,
            }
        })
        .collect()
}

fn run(pixels: &[RGB8], width: usize, height: usize, config: &QuantizeConfig) -> QuantizeResult {
    rgb2map::quantize_pixels(pixels, width, height, config).unwrap()
}

#[test]
fn gradient_produces_reasonable_quality() {
    let pixels = gradient_image(64, 64);
    let result = run(&pixels, 64, 64, &QuantizeConfig::new());
    assert!(!result.is_exact());
    let err = mean_abs_error(&pixels, &result);
    assert!(err < 12.0, "mean error too high for 256-color gradient: {err:.2}");
}

#[test]
fn exact_mapping_has_no_error() {
    let pixels = gradient_image(16, 8);
    let result = run(&pixels, 16, 8, &QuantizeConfig::new());
    assert!(result.is_exact());
    assert_eq!(mean_abs_error(&pixels, &result), 0.0);
}

#[test]
fn more_colors_lower_error() {
    let pixels = noisy_image(64, 64);
    let config = QuantizeConfig::new().dither(DitherMode::None);

    let result_16 = run(&pixels, 64, 64, &config.clone().max_colors(16));
    let result_128 = run(&pixels, 64, 64, &config.max_colors(128));
    assert_eq!(result_16.palette_len(), 16);
    assert_eq!(result_128.palette_len(), 128);

    let err_16 = mean_abs_error(&pixels, &result_16);
    let err_128 = mean_abs_error(&pixels, &result_128);
    assert!(
        err_128 < err_16,
        "128 colors should beat 16: err_16={err_16:.2}, err_128={err_128:.2}"
    );
}

#[test]
fn dithering_preserves_local_average() {
    // Horizontal gray ramp squeezed into four colors. Averaged down each
    // column, dithered output tracks the ramp far better than plain
    // nearest-color mapping.
    let (width, height) = (64, 64);
    let pixels: Vec<RGB8> = (0..width * height)
        .map(|i| {
            let v = ((i % width) * 4) as u8;
            RGB8 { r: v, g: v, b: v }
        })
        .collect();

    let column_error = |result: &QuantizeResult| {
        let palette = result.palette().entries();
        let mut total = 0.0;
        for x in 0..width {
            let sum: u32 = (0..height)
                .map(|y| palette[result.indices()[y * width + x] as usize].g as u32)
                .sum();
            let mean = sum as f64 / height as f64;
            total += (mean - (x * 4) as f64).abs();
        }
        total / width as f64
    };

    let config = QuantizeConfig::new().max_colors(4);
    let dithered = run(&pixels, width, height, &config.clone().dither(DitherMode::FloydSteinberg));
    let nearest = run(&pixels, width, height, &config.dither(DitherMode::None));

    let dithered_err = column_error(&dithered);
    let nearest_err = column_error(&nearest);
    assert!(
        dithered_err < nearest_err,
        "dithering should track the ramp: dithered={dithered_err:.2}, nearest={nearest_err:.2}"
    );
}

#[test]
fn gray_input_gives_near_gray_palette() {
    let ramp: Vec<RGB8> = (0..=255u8).map(|v| RGB8 { r: v, g: v, b: v }).collect();
    let result = run(&ramp, 256, 1, &QuantizeConfig::new().max_colors(16));
    // Cell centers differ from the true gray by at most half a cell
    for c in result.palette().entries() {
        assert!(c.r.abs_diff(c.g) <= 4, "{c:?}");
        assert!(c.b.abs_diff(c.g) <= 4, "{c:?}");
    }
}
