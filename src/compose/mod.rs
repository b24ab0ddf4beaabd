//! Caption compositing.
//!
//! The caption is wrapped by character count, a white band tall enough for the
//! wrapped lines is added under the image, and each line is drawn centered in
//! black. Band height is `(line_height + 10) * lines + 20`, where
//! `line_height` is the ink height of the first line, or 0 with no lines.

mod enhance;
mod font;
mod wrap;

pub use enhance::{brightness, contrast, whiten};
pub use font::{FontAsset, FontLoadError, TextBox};
pub use wrap::wrap;

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage, imageops};
use tracing::{debug, warn};

use crate::constants::{BAND_PADDING, FONT_SIZE_DIVISOR, LINE_SPACING, WRAP_WIDTH};
use crate::fetch::RawImage;
use font::CaptionFont;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Knobs for [`compose`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CaptionOptions {
    /// Run the contrast/brightness pass on the source first.
    pub enhance: bool,
    /// Characters per caption line.
    pub wrap_width: usize,
}

impl Default for CaptionOptions {
    fn default() -> Self {
        Self {
            enhance: true,
            wrap_width: WRAP_WIDTH,
        }
    }
}

/// Where one caption line ended up.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LinePlacement {
    /// The wrapped text.
    pub text: String,
    /// Left edge of the draw origin.
    pub x: u32,
    /// Top edge of the draw origin.
    pub y: u32,
    /// Inked width used for centering.
    pub width: u32,
}

/// Source image with the caption band underneath.
#[derive(Clone, Debug)]
pub struct ComposedImage {
    /// The final canvas.
    pub image: RgbImage,
    /// Height of the source region at the top.
    pub source_height: u32,
    /// Height of the caption band, 0 when there was nothing to draw.
    pub band_height: u32,
    /// Ink height of the first line.
    pub line_height: u32,
    /// Requested font size in pixels.
    pub font_size: u32,
    /// True when the built-in font drew the caption.
    pub used_fallback_font: bool,
    /// Every line that was drawn, top to bottom.
    pub lines: Vec<LinePlacement>,
}

impl ComposedImage {
    /// Canvas width.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Canvas height.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Encodes the canvas as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut out = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
        Ok(out)
    }
}

/// Draws `caption` in a white band under `image`.
///
/// Never fails: without a usable `font` the built-in bitmap font is used.
pub fn compose(
    image: &RawImage,
    caption: &str,
    font: Option<&FontAsset>,
    options: &CaptionOptions,
) -> ComposedImage {
    let mut source = image.to_rgb8();
    if options.enhance {
        whiten(&mut source);
    }
    let (width, height) = source.dimensions();
    let font_size = width / FONT_SIZE_DIVISOR;
    let lines = wrap(caption, options.wrap_width);

    let mut face = CaptionFont::select(font, font_size);
    let line_height = match lines.first() {
        None => 0,
        Some(first) => match face.measure(first) {
            Some(ink) => ink.height(),
            None if !face.is_fallback() => {
                warn!("Font produced no ink for {:?}, using the built-in font", first);
                face = CaptionFont::fallback(font_size);
                face.measure(first).map_or(0, |ink| ink.height())
            }
            None => 0,
        },
    };

    let line_count = u32::try_from(lines.len()).unwrap_or(u32::MAX);
    let band_height = if lines.is_empty() {
        0
    } else {
        (line_height + LINE_SPACING)
            .saturating_mul(line_count)
            .saturating_add(BAND_PADDING)
    };
    debug!(
        "Caption: {} lines, font size {}, line height {}, band {}",
        lines.len(),
        font_size,
        line_height,
        band_height
    );

    let mut canvas = RgbImage::from_pixel(width, height.saturating_add(band_height), WHITE);
    imageops::replace(&mut canvas, &source, 0, 0);

    let mut placements = Vec::with_capacity(lines.len());
    let mut y = height + LINE_SPACING;
    for text in lines {
        let line_width = face.measure(&text).map_or(0, |ink| ink.width());
        let x = width.saturating_sub(line_width) / 2;
        face.draw(&mut canvas, x as i32, y as i32, &text, BLACK);
        placements.push(LinePlacement {
            text,
            x,
            y,
            width: line_width,
        });
        y = y.saturating_add(line_height + LINE_SPACING);
    }

    ComposedImage {
        image: canvas,
        source_height: height,
        band_height,
        line_height,
        font_size,
        used_fallback_font: face.is_fallback(),
        lines: placements,
    }
}
