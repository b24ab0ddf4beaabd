//! Caption fonts: an outline font from disk, or the built-in bitmap fallback.

use std::fmt;
use std::path::{Path, PathBuf};

use font8x8::{BASIC_FONTS, GREEK_FONTS, HIRAGANA_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{Rgb, RgbImage};
use rusttype::{Font, PositionedGlyph, Scale, point};
use tracing::{debug, warn};

/// Side of a bitmap glyph cell in pixels, before scaling.
const CELL: u32 = 8;

/// Drawn for characters the bitmap font doesn't cover.
const MISSING_GLYPH: [u8; 8] = [0x00, 0x7E, 0x42, 0x42, 0x42, 0x42, 0x7E, 0x00];

/// Why a font file couldn't be used.
#[derive(Debug)]
pub enum FontLoadError {
    /// The file couldn't be read.
    Io(PathBuf, std::io::Error),
    /// The file isn't a font we can parse.
    Invalid(PathBuf),
}

impl fmt::Display for FontLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(path, err) => write!(f, "Failed to read font {}: {err}", path.display()),
            Self::Invalid(path) => write!(f, "Not a usable font file: {}", path.display()),
        }
    }
}

impl std::error::Error for FontLoadError {}

/// A parsed outline font, loaded once and shared read-only.
pub struct FontAsset {
    font: Font<'static>,
    path: PathBuf,
}

impl fmt::Debug for FontAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontAsset")
            .field("path", &self.path)
            .field("glyphs", &self.font.glyph_count())
            .finish()
    }
}

impl FontAsset {
    /// Reads and parses a TrueType/OpenType file.
    pub fn load(path: &Path) -> Result<Self, FontLoadError> {
        let bytes = std::fs::read(path).map_err(|err| FontLoadError::Io(path.to_path_buf(), err))?;
        let font = Font::try_from_vec(bytes).ok_or_else(|| FontLoadError::Invalid(path.to_path_buf()))?;
        debug!("Loaded font {} ({} glyphs)", path.display(), font.glyph_count());
        Ok(Self {
            font,
            path: path.to_path_buf(),
        })
    }

    /// Best available font: the file if it loads, otherwise `None` so the
    /// compositor uses the built-in one.
    pub fn resolve(path: &Path) -> Option<Self> {
        match Self::load(path) {
            Ok(asset) => Some(asset),
            Err(err) => {
                warn!("{}, captions will use the built-in font", err);
                None
            }
        }
    }

    /// Where the font was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Ink bounding box relative to the draw origin (top-left of the line).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TextBox {
    /// Leftmost inked column.
    pub left: i32,
    /// Topmost inked row.
    pub top: i32,
    /// One past the rightmost inked column.
    pub right: i32,
    /// One past the bottom inked row.
    pub bottom: i32,
}

impl TextBox {
    /// Inked width.
    pub fn width(&self) -> u32 {
        (self.right - self.left).max(0).unsigned_abs()
    }

    /// Inked height.
    pub fn height(&self) -> u32 {
        (self.bottom - self.top).max(0).unsigned_abs()
    }

    fn union(self, other: Self) -> Self {
        Self {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// A font at a concrete size, ready to measure and draw lines.
pub(crate) enum CaptionFont<'a> {
    Outline { font: &'a Font<'static>, scale: Scale },
    Bitmap { scale: u32 },
}

impl<'a> CaptionFont<'a> {
    /// Outline font at `size` pixels when one is available.
    pub(crate) fn select(asset: Option<&'a FontAsset>, size: u32) -> Self {
        match asset {
            Some(asset) if size > 0 => Self::Outline {
                font: &asset.font,
                scale: Scale::uniform(size as f32),
            },
            _ => Self::fallback(size),
        }
    }

    /// The built-in font, scaled in whole steps towards `size`.
    pub(crate) fn fallback(size: u32) -> Self {
        Self::Bitmap {
            scale: (size / CELL).max(1),
        }
    }

    pub(crate) fn is_fallback(&self) -> bool {
        matches!(self, Self::Bitmap { .. })
    }

    /// Ink box of `text` drawn at the origin, `None` when nothing is inked.
    pub(crate) fn measure(&self, text: &str) -> Option<TextBox> {
        match self {
            Self::Outline { font, scale } => outline_glyphs(font, *scale, text, 0.0, 0.0)
                .iter()
                .filter_map(|glyph| glyph.pixel_bounding_box())
                .map(|bb| TextBox {
                    left: bb.min.x,
                    top: bb.min.y,
                    right: bb.max.x,
                    bottom: bb.max.y,
                })
                .reduce(TextBox::union),
            Self::Bitmap { scale } => bitmap_cells(text, *scale)
                .map(|(x, y, size)| TextBox {
                    left: x,
                    top: y,
                    right: x + size,
                    bottom: y + size,
                })
                .reduce(TextBox::union),
        }
    }

    /// Draws `text` with its top-left origin at (`x`, `y`), clipped to the canvas.
    pub(crate) fn draw(&self, canvas: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
        match self {
            Self::Outline { font, scale } => {
                for glyph in outline_glyphs(font, *scale, text, x as f32, y as f32) {
                    let Some(bb) = glyph.pixel_bounding_box() else {
                        continue;
                    };
                    glyph.draw(|gx, gy, coverage| {
                        let px = gx as i32 + bb.min.x;
                        let py = gy as i32 + bb.min.y;
                        blend_pixel(canvas, px, py, color, coverage);
                    });
                }
            }
            Self::Bitmap { scale } => {
                for (cx, cy, size) in bitmap_cells(text, *scale) {
                    for dy in 0..size {
                        for dx in 0..size {
                            blend_pixel(canvas, x + cx + dx, y + cy + dy, color, 1.0);
                        }
                    }
                }
            }
        }
    }
}

fn outline_glyphs<'f>(
    font: &'f Font<'static>,
    scale: Scale,
    text: &str,
    x: f32,
    y: f32,
) -> Vec<PositionedGlyph<'f>> {
    let ascent = font.v_metrics(scale).ascent;
    font.layout(text, scale, point(x, y + ascent)).collect()
}

fn bitmap_glyph(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| GREEK_FONTS.get(ch))
        .or_else(|| HIRAGANA_FONTS.get(ch))
        .unwrap_or(MISSING_GLYPH)
}

/// Inked cells of a bitmap line as (x, y, side), in reading order.
fn bitmap_cells(text: &str, scale: u32) -> impl Iterator<Item = (i32, i32, i32)> + '_ {
    let cell = (CELL * scale) as i32;
    let side = scale as i32;
    text.chars().enumerate().flat_map(move |(index, ch)| {
        let origin = index as i32 * cell;
        let rows = bitmap_glyph(ch);
        (0..CELL as i32).flat_map(move |row| {
            let bits = rows[row as usize];
            (0..CELL as i32)
                .filter(move |col| bits & (1u8 << *col) != 0)
                .map(move |col| (origin + col * side, row * side, side))
        })
    })
}

fn blend_pixel(canvas: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>, coverage: f32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x >= canvas.width() || y >= canvas.height() {
        return;
    }
    let alpha = coverage.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let inverse = 1.0 - alpha;
    let dst = canvas.get_pixel_mut(x, y);
    for (channel, source) in dst.0.iter_mut().zip(color.0) {
        *channel = (f32::from(source) * alpha + f32::from(*channel) * inverse).round() as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_font_file_resolves_to_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("NotoSansTC-Bold.otf");
        assert!(matches!(
            FontAsset::load(&path),
            Err(FontLoadError::Io(_, _))
        ));
        assert!(FontAsset::resolve(&path).is_none());
    }

    #[test]
    fn corrupt_font_file_resolves_to_none() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(b"definitely not an otf").expect("write");
        assert!(matches!(
            FontAsset::load(file.path()),
            Err(FontLoadError::Invalid(_))
        ));
        assert!(FontAsset::resolve(file.path()).is_none());
    }

    #[test]
    fn fallback_scales_with_size() {
        assert!(matches!(CaptionFont::fallback(51), CaptionFont::Bitmap { scale: 6 }));
        assert!(matches!(CaptionFont::fallback(3), CaptionFont::Bitmap { scale: 1 }));
        assert!(CaptionFont::select(None, 51).is_fallback());
    }

    #[test]
    fn missing_glyph_box() {
        let font = CaptionFont::fallback(8);
        // rows 1..=6, cols 1..=6 of the missing-glyph box
        assert_eq!(
            font.measure("尷"),
            Some(TextBox {
                left: 1,
                top: 1,
                right: 7,
                bottom: 7
            })
        );
        let wide = font.measure("尷尬").expect("inked");
        assert_eq!(wide.width(), 14);
    }

    #[test]
    fn spaces_have_no_ink() {
        assert_eq!(CaptionFont::fallback(16).measure("   "), None);
    }

    #[test]
    fn bitmap_draw_matches_measure() {
        let font = CaptionFont::fallback(16);
        let mut canvas = RgbImage::from_pixel(64, 32, Rgb([255, 255, 255]));
        font.draw(&mut canvas, 3, 4, "A", Rgb([0, 0, 0]));
        let ink = font.measure("A").expect("inked");
        for (x, y, pixel) in canvas.enumerate_pixels() {
            let (x, y) = (x as i32 - 3, y as i32 - 4);
            if pixel.0 == [0, 0, 0] {
                assert!(x >= ink.left && x < ink.right && y >= ink.top && y < ink.bottom);
            }
        }
        assert!(canvas.pixels().any(|pixel| pixel.0 == [0, 0, 0]));
    }

    #[test]
    fn drawing_is_clipped() {
        let font = CaptionFont::fallback(16);
        let mut canvas = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        font.draw(&mut canvas, -6, -6, "尷尬", Rgb([0, 0, 0]));
        font.draw(&mut canvas, 2, 2, "尷尬", Rgb([0, 0, 0]));
    }

    #[test]
    fn outline_font_measures_ink_below_origin() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/DejaVuSans-Bold.ttf");
        let asset = FontAsset::resolve(Path::new(path)).expect("fixture font");
        assert_eq!(asset.path(), Path::new(path));

        let font = CaptionFont::select(Some(&asset), 40);
        assert!(!font.is_fallback());
        assert_eq!(font.measure("   "), None);
        let x = font.measure("x").expect("inked");
        let hx = font.measure("hx").expect("inked");
        // origin is the top-left of the line, so ink sits below it
        assert!(x.top > 0 && hx.top >= 0);
        assert!(hx.top < x.top, "ascender should reach higher than x-height");
        assert_eq!(hx.bottom, x.bottom);
        assert!(hx.width() > x.width());
    }

    #[test]
    fn outline_draw_stays_inside_measure() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/DejaVuSans-Bold.ttf");
        let asset = FontAsset::load(Path::new(path)).expect("fixture font");
        let font = CaptionFont::select(Some(&asset), 32);
        let mut canvas = RgbImage::from_pixel(200, 60, Rgb([255, 255, 255]));
        font.draw(&mut canvas, 10, 5, "panda", Rgb([0, 0, 0]));
        let ink = font.measure("panda").expect("inked");
        let mut inked = 0;
        for (x, y, pixel) in canvas.enumerate_pixels() {
            if pixel.0 != [255, 255, 255] {
                inked += 1;
                let (x, y) = (x as i32 - 10, y as i32 - 5);
                assert!(x >= ink.left && x < ink.right && y >= ink.top && y < ink.bottom);
            }
        }
        assert!(inked > 100);
    }
}

