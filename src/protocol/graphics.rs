//! # ESC/POS Raster Graphics
//!
//! This module converts an RGB image into the raster bit image command
//! (`GS v 0`) understood by ESC/POS receipt printers.
//!
//! ## Coordinate System
//!
//! ```text
//! (0,0) ──────────────────────► X (horizontal, up to 2040 dots)
//!   │
//!   │   ████████  ← 8 dots per byte
//!   │   ████████
//!   ▼
//!   Y (vertical, paper feed direction, up to 255 rows)
//! ```
//!
//! ## Bit Packing
//!
//! Each bit represents one dot:
//! - Bit 7 (MSB) = leftmost dot
//! - Bit 0 (LSB) = rightmost dot
//! - 1 = ink, 0 = no ink
//!
//! Rows whose width is not a multiple of 8 are padded on the right with
//! no-ink bits.
//!
//! ```text
//! 10 dots wide, all ink:  11111111 11000000
//!                         └─ 0xFF ┘└─ 0xC0 ┘
//! ```
//!
//! ## Frame Layout
//!
//! | Offset | Bytes | Meaning |
//! |--------|-------|---------|
//! | 0 | `1D 76 30 00` | `GS v 0`, normal density |
//! | 4 | xL `00` | bytes per row |
//! | 6 | yL `00` | row count |
//! | 8 | d1...dk | k = bytes per row × rows |
//!
//! The high bytes of both dimension fields are always zero: this mode only
//! accepts single-byte dimensions, so larger images are rejected rather
//! than truncated.

use image::{DynamicImage, GenericImageView, RgbImage, RgbaImage};

use super::commands::{GS, u16_le};
use crate::error::EncodeError;

/// `GS v 0 m` with `m = 0` (normal density)
pub const RASTER_OPCODE: [u8; 4] = [GS, b'v', b'0', 0x00];

/// Opcode plus the two 16-bit dimension fields
pub const HEADER_LEN: usize = 8;

/// Largest bytes-per-row value the header can carry
pub const MAX_BYTES_PER_ROW: u32 = 255;

/// Largest row count the header can carry
pub const MAX_ROWS: u32 = 255;

/// Widest printable image in dots (255 bytes × 8)
pub const MAX_WIDTH_DOTS: u32 = MAX_BYTES_PER_ROW * 8;

/// Channel value at or below which a color channel counts as dark
pub const DEFAULT_INK_THRESHOLD: u8 = 160;

// ============================================================================
// IMAGE SOURCE
// ============================================================================

/// An image that can be sampled one RGB pixel at a time.
pub trait RasterImage {
    /// Width in dots
    fn width(&self) -> u32;

    /// Height in dots
    fn height(&self) -> u32;

    /// RGB value at `(x, y)`. Callers stay within `width × height`.
    fn rgb(&self, x: u32, y: u32) -> [u8; 3];
}

impl<T: RasterImage + ?Sized> RasterImage for &T {
    fn width(&self) -> u32 {
        (**self).width()
    }

    fn height(&self) -> u32 {
        (**self).height()
    }

    fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        (**self).rgb(x, y)
    }
}

impl RasterImage for RgbImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        self.get_pixel(x, y).0
    }
}

/// Alpha is ignored; a transparent pixel prints according to its color.
impl RasterImage for RgbaImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let [r, g, b, _] = self.get_pixel(x, y).0;
        [r, g, b]
    }
}

impl RasterImage for DynamicImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let [r, g, b, _] = self.get_pixel(x, y).0;
        [r, g, b]
    }
}

/// Owned RGB pixel buffer, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 3]>,
}

impl Bitmap {
    pub const WHITE: [u8; 3] = [0xFF, 0xFF, 0xFF];
    pub const BLACK: [u8; 3] = [0x00, 0x00, 0x00];

    /// Create a bitmap filled with one color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self {
            width,
            height,
            pixels: vec![rgb; width as usize * height as usize],
        }
    }

    /// Create a bitmap by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 3]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Overwrite one pixel.
    pub fn set(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let idx = self.index(x, y);
        self.pixels[idx] = rgb;
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

impl RasterImage for Bitmap {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        self.pixels[self.index(x, y)]
    }
}

/// A band of consecutive rows from another image.
///
/// Frames carry at most [`MAX_ROWS`] rows, so taller images are printed as
/// a sequence of bands; see [`strips`].
#[derive(Debug)]
pub struct RowWindow<'a, I: ?Sized> {
    image: &'a I,
    top: u32,
    rows: u32,
}

impl<I: RasterImage + ?Sized> RasterImage for RowWindow<'_, I> {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.rows
    }

    fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        self.image.rgb(x, self.top + y)
    }
}

/// Split `image` into top-to-bottom bands of at most `max_rows` rows.
///
/// ```
/// use tintero::protocol::graphics::{strips, Bitmap, RasterImage, MAX_ROWS};
///
/// let tall = Bitmap::filled(8, 600, Bitmap::WHITE);
/// let heights: Vec<u32> = strips(&tall, MAX_ROWS).map(|s| s.height()).collect();
/// assert_eq!(heights, vec![255, 255, 90]);
/// ```
pub fn strips<I: RasterImage + ?Sized>(
    image: &I,
    max_rows: u32,
) -> impl Iterator<Item = RowWindow<'_, I>> {
    let max_rows = max_rows.max(1);
    let height = image.height();
    (0..height.div_ceil(max_rows)).map(move |i| {
        let top = i * max_rows;
        RowWindow {
            image,
            top,
            rows: max_rows.min(height - top),
        }
    })
}

// ============================================================================
// INK CLASSIFICATION
// ============================================================================

/// How a pixel's channels are compared against the ink threshold.
///
/// This is a per-channel cut-off, not a luminance formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InkRule {
    /// Ink when red, green and blue are all at or below the threshold
    #[default]
    AllChannelsDark,

    /// Ink unless red, green and blue are all above the threshold
    AnyChannelDark,
}

impl InkRule {
    #[inline]
    pub fn is_ink(self, [r, g, b]: [u8; 3], threshold: u8) -> bool {
        match self {
            InkRule::AllChannelsDark => r <= threshold && g <= threshold && b <= threshold,
            InkRule::AnyChannelDark => !(r > threshold && g > threshold && b > threshold),
        }
    }
}

// ============================================================================
// ENCODER
// ============================================================================

/// Number of bytes needed for one row of `width_dots` dots.
#[inline]
pub fn bytes_per_row(width_dots: u32) -> u32 {
    width_dots.div_ceil(8)
}

/// # Print Raster Bit Image (GS v 0 m xL xH yL yH d1...dk)
///
/// Frames already packed raster data.
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | GS v 0 m xL xH yL yH d1...dk |
/// | Hex     | 1D 76 30 00 xL 00 yL 00 d1...dk |
///
/// ## Example
///
/// ```
/// use tintero::protocol::graphics;
///
/// let data = vec![0xAA; 4 * 3];
/// let cmd = graphics::raster(4, 3, &data);
///
/// assert_eq!(&cmd[..8], &[0x1D, 0x76, 0x30, 0x00, 4, 0, 3, 0]);
/// assert_eq!(cmd.len(), 8 + 12);
/// ```
pub fn raster(bytes_per_row: u8, rows: u8, data: &[u8]) -> Vec<u8> {
    debug_assert!(
        data.len() == bytes_per_row as usize * rows as usize,
        "Raster data length mismatch. Expected {} ({} bytes × {} rows), got {}",
        bytes_per_row as usize * rows as usize,
        bytes_per_row,
        rows,
        data.len()
    );

    let mut cmd = Vec::with_capacity(HEADER_LEN + data.len());
    cmd.extend_from_slice(&RASTER_OPCODE);
    cmd.extend_from_slice(&u16_le(bytes_per_row.into()));
    cmd.extend_from_slice(&u16_le(rows.into()));
    cmd.extend_from_slice(data);
    cmd
}

/// Converts images into raster frames.
///
/// The encoder holds no state between calls; encoding the same image twice
/// yields identical bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterEncoder {
    threshold: u8,
    rule: InkRule,
}

impl Default for RasterEncoder {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_INK_THRESHOLD,
            rule: InkRule::default(),
        }
    }
}

impl RasterEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_rule(mut self, rule: InkRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn rule(&self) -> InkRule {
        self.rule
    }

    /// Encode `image` as a complete `GS v 0` frame.
    ///
    /// ## Errors
    ///
    /// - [`EncodeError::EmptyImage`] if either dimension is zero
    /// - [`EncodeError::DimensionOverflow`] if the image is wider than
    ///   2040 dots or taller than 255 rows
    pub fn encode<I: RasterImage + ?Sized>(&self, image: &I) -> Result<Vec<u8>, EncodeError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(EncodeError::EmptyImage { width, height });
        }

        let row_bytes = bytes_per_row(width);
        let (Ok(xl), Ok(yl)) = (u8::try_from(row_bytes), u8::try_from(height)) else {
            return Err(EncodeError::DimensionOverflow {
                bytes_per_row: row_bytes,
                rows: height,
            });
        };

        let mut payload = Vec::with_capacity(row_bytes as usize * height as usize);
        for y in 0..height {
            self.pack_row(image, y, &mut payload);
        }

        Ok(raster(xl, yl, &payload))
    }

    /// Pack row `y` MSB-first, padding the last byte with no-ink bits.
    fn pack_row<I: RasterImage + ?Sized>(&self, image: &I, y: u32, out: &mut Vec<u8>) {
        let width = image.width();
        for byte_x in 0..bytes_per_row(width) {
            let mut byte = 0u8;
            for bit in 0..8 {
                let x = byte_x * 8 + bit;
                if x < width && self.rule.is_ink(image.rgb(x, y), self.threshold) {
                    byte |= 0x80 >> bit;
                }
            }
            out.push(byte);
        }
    }
}

/// Encode `image` with the default threshold and rule.
pub fn encode<I: RasterImage + ?Sized>(image: &I) -> Result<Vec<u8>, EncodeError> {
    RasterEncoder::default().encode(image)
}

// ============================================================================
// TESTS
// ============================================================================
