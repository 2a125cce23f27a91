//! Perceptual pixel diff between two RGBA rasters.
//!
//! Pixels are compared in the YIQ color space (Kotsarenko & Ramos, "Measuring
//! perceived color difference using YIQ NTSC transmission color space in
//! mobile applications"), after blending translucent pixels onto white.
//! Differences that look like edge smoothing are detected with a 3×3
//! neighbourhood heuristic (Vysniauskas, "Anti-aliased Pixel and Intensity
//! Slope Detector") and can be excluded from the count.
//!
//! Everything here is pure: the same inputs always produce the same count and
//! the same output raster.

use image::RgbaImage;

/// Largest possible squared YIQ distance between two colors.
///
/// A `threshold` of 1.0 therefore accepts every difference and 0.0 none.
pub const MAX_YIQ_DELTA: f64 = 35215.0;

/// Bytes per pixel of the RGBA8 rasters this module works on.
const CHANNELS: usize = 4;

/// Errors raised by the diff engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// The buffers disagree with each other or with `width × height × 4`.
    #[error("image sizes do not match: {width}x{height} expects {expected} bytes, got {len_a} and {len_b}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        len_a: usize,
        len_b: usize,
    },
}

/// Tuning knobs for [`diff`].
#[derive(Debug, Clone, PartialEq)]
pub struct DiffOptions {
    /// Matching threshold in `0.0..=1.0`; smaller is more sensitive.
    pub threshold: f64,
    /// Count anti-aliasing artifacts as mismatches instead of tinting them.
    pub include_anti_aliased: bool,
    /// Opacity of the grayscale ghost of the first image in the output.
    pub alpha: f64,
    /// Color of pixels classified as anti-aliasing.
    pub aa_color: [u8; 3],
    /// Color of mismatches where the second image is brighter.
    pub diff_color: [u8; 3],
    /// Color of mismatches where the second image is darker; `diff_color` when `None`.
    pub diff_color_alt: Option<[u8; 3]>,
    /// Leave unchanged pixels transparent instead of drawing the ghost.
    pub diff_mask: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            include_anti_aliased: false,
            alpha: 0.1,
            aa_color: [255, 255, 0],
            diff_color: [255, 0, 0],
            diff_color_alt: None,
            diff_mask: false,
        }
    }
}

impl DiffOptions {
    /// Options used when reviewing a recorded/actual pair: every changed pixel
    /// counts, brighter changes are red and darker ones green.
    pub fn review() -> Self {
        Self {
            threshold: 0.0,
            include_anti_aliased: true,
            diff_color: [255, 0, 0],
            diff_color_alt: Some([0, 255, 0]),
            ..Self::default()
        }
    }

    fn max_delta(&self) -> f64 {
        MAX_YIQ_DELTA * self.threshold * self.threshold
    }
}

/// Output of a diff: the mismatch count plus a `width × height` RGBA raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    pub mismatch_count: usize,
    pub width: u32,
    pub height: u32,
    pub raster: Vec<u8>,
}

impl DiffResult {
    /// Converts the raster into an `image::RgbaImage`.
    pub fn into_image(self) -> RgbaImage {
        // The raster is always width*height*4 bytes, so from_raw cannot fail;
        // fall back to an empty canvas rather than panic.
        let (w, h) = (self.width, self.height);
        RgbaImage::from_raw(w, h, self.raster).unwrap_or_else(|| RgbaImage::new(w, h))
    }
}

/// Compares `img_a` (recorded) with `img_b` (actual) and renders a diff raster.
///
/// # Errors
///
/// Returns [`DiffError::SizeMismatch`] when the buffer lengths disagree or do
/// not equal `width * height * 4`.
pub fn diff(
    img_a: &[u8],
    img_b: &[u8],
    width: u32,
    height: u32,
    options: &DiffOptions,
) -> Result<DiffResult, DiffError> {
    check_sizes(img_a, img_b, width, height)?;
    let mut raster = vec![0u8; img_a.len()];
    let mismatch_count = compare(img_a, img_b, width as usize, height as usize, options, Some(&mut raster));
    Ok(DiffResult { mismatch_count, width, height, raster })
}

/// Like [`diff`] but only counts; no output raster is allocated.
pub fn diff_count(
    img_a: &[u8],
    img_b: &[u8],
    width: u32,
    height: u32,
    options: &DiffOptions,
) -> Result<usize, DiffError> {
    check_sizes(img_a, img_b, width, height)?;
    Ok(compare(img_a, img_b, width as usize, height as usize, options, None))
}

/// Diffs two decoded images. Their dimensions must agree.
pub fn diff_images(
    recorded: &RgbaImage,
    actual: &RgbaImage,
    options: &DiffOptions,
) -> Result<DiffResult, DiffError> {
    let (width, height) = recorded.dimensions();
    if actual.dimensions() != (width, height) {
        return Err(DiffError::SizeMismatch {
            width,
            height,
            expected: expected_len(width, height).unwrap_or(usize::MAX),
            len_a: recorded.as_raw().len(),
            len_b: actual.as_raw().len(),
        });
    }
    diff(recorded.as_raw(), actual.as_raw(), width, height, options)
}

fn expected_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(CHANNELS)
}

fn check_sizes(img_a: &[u8], img_b: &[u8], width: u32, height: u32) -> Result<(), DiffError> {
    let expected = expected_len(width, height);
    if img_a.len() != img_b.len() || expected != Some(img_a.len()) {
        return Err(DiffError::SizeMismatch {
            width,
            height,
            expected: expected.unwrap_or(usize::MAX),
            len_a: img_a.len(),
            len_b: img_b.len(),
        });
    }
    Ok(())
}

fn compare(
    img_a: &[u8],
    img_b: &[u8],
    width: usize,
    height: usize,
    options: &DiffOptions,
    mut output: Option<&mut [u8]>,
) -> usize {
    if img_a == img_b {
        if let Some(out) = output.as_deref_mut() {
            if !options.diff_mask {
                for pos in (0..img_a.len()).step_by(CHANNELS) {
                    draw_gray_pixel(img_a, pos, options.alpha, out);
                }
            }
        }
        return 0;
    }

    let max_delta = options.max_delta();
    let mut mismatches = 0;

    for y in 0..height {
        for x in 0..width {
            let pos = (y * width + x) * CHANNELS;

            // Negative when the second image is darker at this position.
            let delta = color_delta(img_a, img_b, pos, pos, false);

            if delta.abs() > max_delta {
                let anti_aliased = !options.include_anti_aliased
                    && (is_anti_aliased(img_a, x, y, width, height, img_b)
                        || is_anti_aliased(img_b, x, y, width, height, img_a));

                if anti_aliased {
                    // Anti-aliased pixels are never part of a mask.
                    if let Some(out) = output.as_deref_mut() {
                        if !options.diff_mask {
                            draw_pixel(out, pos, options.aa_color);
                        }
                    }
                } else {
                    if let Some(out) = output.as_deref_mut() {
                        let color = match options.diff_color_alt {
                            Some(alt) if delta < 0.0 => alt,
                            _ => options.diff_color,
                        };
                        draw_pixel(out, pos, color);
                    }
                    mismatches += 1;
                }
            } else if let Some(out) = output.as_deref_mut() {
                if !options.diff_mask {
                    draw_gray_pixel(img_a, pos, options.alpha, out);
                }
            }
        }
    }

    mismatches
}

/// Returns `true` if the pixel at `(x1, y1)` in `img` looks like anti-aliasing.
///
/// The pixel qualifies when it has at most two identical neighbours, both a
/// strictly darker and a strictly brighter neighbour, and one of those
/// extremes sits in a flat area (3+ identical neighbours) of both images.
fn is_anti_aliased(img: &[u8], x1: usize, y1: usize, width: usize, height: usize, other: &[u8]) -> bool {
    let x0 = x1.saturating_sub(1);
    let y0 = y1.saturating_sub(1);
    let x2 = (x1 + 1).min(width - 1);
    let y2 = (y1 + 1).min(height - 1);
    let pos = (y1 * width + x1) * CHANNELS;

    // Pixels on the image border count one missing side as an equal sibling.
    let mut zeroes = usize::from(x1 == x0 || x1 == x2 || y1 == y0 || y1 == y2);
    let mut min = 0.0;
    let mut max = 0.0;
    let mut min_at = None;
    let mut max_at = None;

    for x in x0..=x2 {
        for y in y0..=y2 {
            if x == x1 && y == y1 {
                continue;
            }

            // Luma of the centre minus luma of the neighbour.
            let delta = color_delta(img, img, pos, (y * width + x) * CHANNELS, true);

            if delta == 0.0 {
                zeroes += 1;
                if zeroes > 2 {
                    return false;
                }
            } else if delta < min {
                min = delta;
                min_at = Some((x, y));
            } else if delta > max {
                max = delta;
                max_at = Some((x, y));
            }
        }
    }

    // Both a brighter and a darker neighbour are required.
    let (Some(min_at), Some(max_at)) = (min_at, max_at) else {
        return false;
    };

    let flat_in_both = |(x, y): (usize, usize)| {
        has_many_siblings(img, x, y, width, height) && has_many_siblings(other, x, y, width, height)
    };
    flat_in_both(min_at) || flat_in_both(max_at)
}

/// Returns `true` if the pixel at `(x1, y1)` has 3+ identical neighbours.
fn has_many_siblings(img: &[u8], x1: usize, y1: usize, width: usize, height: usize) -> bool {
    let x0 = x1.saturating_sub(1);
    let y0 = y1.saturating_sub(1);
    let x2 = (x1 + 1).min(width - 1);
    let y2 = (y1 + 1).min(height - 1);
    let pos = (y1 * width + x1) * CHANNELS;
    let centre = &img[pos..pos + CHANNELS];

    let mut zeroes = usize::from(x1 == x0 || x1 == x2 || y1 == y0 || y1 == y2);

    for x in x0..=x2 {
        for y in y0..=y2 {
            if x == x1 && y == y1 {
                continue;
            }
            let pos2 = (y * width + x) * CHANNELS;
            if centre == &img[pos2..pos2 + CHANNELS] {
                zeroes += 1;
            }
            if zeroes > 2 {
                return true;
            }
        }
    }

    false
}

/// Squared YIQ distance between pixel `k` of `img1` and pixel `m` of `img2`.
///
/// The sign encodes direction: negative when `img1` is brighter (the second
/// pixel darkens). With `y_only`, returns the plain luma difference.
fn color_delta(img1: &[u8], img2: &[u8], k: usize, m: usize, y_only: bool) -> f64 {
    let p1 = &img1[k..k + CHANNELS];
    let p2 = &img2[m..m + CHANNELS];
    if p1 == p2 {
        return 0.0;
    }

    let (r1, g1, b1) = blend_pixel(p1);
    let (r2, g2, b2) = blend_pixel(p2);

    let y1 = rgb2y(r1, g1, b1);
    let y2 = rgb2y(r2, g2, b2);
    let y = y1 - y2;

    if y_only {
        return y;
    }

    let i = rgb2i(r1, g1, b1) - rgb2i(r2, g2, b2);
    let q = rgb2q(r1, g1, b1) - rgb2q(r2, g2, b2);

    let delta = 0.5053 * y * y + 0.299 * i * i + 0.1957 * q * q;

    if y1 > y2 { -delta } else { delta }
}

/// Composites a translucent pixel onto white.
fn blend_pixel(p: &[u8]) -> (f64, f64, f64) {
    let (r, g, b) = (f64::from(p[0]), f64::from(p[1]), f64::from(p[2]));
    if p[3] < 255 {
        let a = f64::from(p[3]) / 255.0;
        (blend(r, a), blend(g, a), blend(b, a))
    } else {
        (r, g, b)
    }
}

fn rgb2y(r: f64, g: f64, b: f64) -> f64 {
    r * 0.29889531 + g * 0.58662247 + b * 0.11448223
}

fn rgb2i(r: f64, g: f64, b: f64) -> f64 {
    r * 0.59597799 - g * 0.27417610 - b * 0.32180189
}

fn rgb2q(r: f64, g: f64, b: f64) -> f64 {
    r * 0.21147017 - g * 0.52261711 + b * 0.31114694
}

/// Blends channel value `c` with white at opacity `a`.
fn blend(c: f64, a: f64) -> f64 {
    255.0 + (c - 255.0) * a
}

fn to_channel(v: f64) -> u8 {
    v.round_ties_even().clamp(0.0, 255.0) as u8
}

fn draw_pixel(out: &mut [u8], pos: usize, [r, g, b]: [u8; 3]) {
    out[pos] = r;
    out[pos + 1] = g;
    out[pos + 2] = b;
    out[pos + 3] = 255;
}

fn draw_gray_pixel(img: &[u8], pos: usize, alpha: f64, out: &mut [u8]) {
    let (r, g, b) = (f64::from(img[pos]), f64::from(img[pos + 1]), f64::from(img[pos + 2]));
    let val = to_channel(blend(rgb2y(r, g, b), alpha * f64::from(img[pos + 3]) / 255.0));
    draw_pixel(out, pos, [val, val, val]);
}
