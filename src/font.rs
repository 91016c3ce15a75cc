//! Font selection and caching for overlay text.
//!
//! Overlay text needs one of three kinds of font: the icon font for `mdi:`
//! glyphs, an emoji-capable font for symbols, and a regular text font. Each
//! kind has a fallback chain over the bundled font files. Loaded fonts are
//! cached per `(point size, glyph class)` for the life of the
//! [`FontResolver`], which is meant to be created once and shared.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use image::{Rgba, RgbaImage};
use rusttype::{Font, Scale, point};

use crate::error::FontUnavailableError;
use crate::layer::raster::blend_pixel;

pub const ICON_FONT_FILE: &str = "materialdesignicons-webfont.ttf";
pub const EMOJI_FONT_FILE: &str = "NotoEmoji-Regular.ttf";
pub const UNICODE_FONT_FILE: &str = "NotoSans-Regular.ttf";
pub const ASCII_FONT_FILE: &str = "DejaVuSans.ttf";

/// Which family of font a piece of overlay text needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlyphClass {
    IconFont,
    Emoji,
    Text,
}

impl GlyphClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IconFont => "icon_font",
            Self::Emoji => "emoji",
            Self::Text => "text",
        }
    }
}

// ============================================================================
// FontCatalog
// ============================================================================

/// Locations of the font files used by the fallback chains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontCatalog {
    pub icon_font: PathBuf,
    pub emoji: PathBuf,
    pub unicode_text: PathBuf,
    pub ascii: PathBuf,
}

impl FontCatalog {
    /// Uses the standard bundled file names inside `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            icon_font: dir.join(ICON_FONT_FILE),
            emoji: dir.join(EMOJI_FONT_FILE),
            unicode_text: dir.join(UNICODE_FONT_FILE),
            ascii: dir.join(ASCII_FONT_FILE),
        }
    }

    /// Candidate files for `class`, most preferred first.
    pub fn chain(&self, class: GlyphClass) -> Vec<&Path> {
        match class {
            GlyphClass::IconFont => vec![self.icon_font.as_path()],
            GlyphClass::Emoji => vec![
                self.emoji.as_path(),
                self.unicode_text.as_path(),
                self.ascii.as_path(),
            ],
            GlyphClass::Text => vec![
                self.unicode_text.as_path(),
                self.ascii.as_path(),
                self.emoji.as_path(),
            ],
        }
    }
}

// ============================================================================
// RenderedFont
// ============================================================================

/// Horizontal and vertical extent of a laid-out string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    /// Advance width in pixels.
    pub width: f32,
    /// Distance from the baseline to the top of the line.
    pub ascent: f32,
    /// Distance from the baseline to the bottom of the line (negative).
    pub descent: f32,
}

/// Pixel-space ink box of a string, relative to its origin on the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InkBounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl InkBounds {
    pub fn width(&self) -> u32 {
        (self.max_x - self.min_x).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.max_y - self.min_y).max(0) as u32
    }
}

/// A loaded font at a fixed point size.
pub struct RenderedFont {
    font: Font<'static>,
    scale: Scale,
    point_size: u32,
    class: GlyphClass,
    source: PathBuf,
}

/// Shared handle to a cached font.
pub type FontHandle = Arc<RenderedFont>;

impl fmt::Debug for RenderedFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedFont")
            .field("point_size", &self.point_size)
            .field("class", &self.class)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl RenderedFont {
    fn load(path: &Path, point_size: u32, class: GlyphClass) -> Result<Self, String> {
        let data = std::fs::read(path).map_err(|e| e.to_string())?;
        let font = Font::try_from_vec(data).ok_or_else(|| "not a usable font file".to_string())?;
        Ok(Self {
            font,
            scale: Scale::uniform(point_size as f32),
            point_size,
            class,
            source: path.to_path_buf(),
        })
    }

    pub fn point_size(&self) -> u32 {
        self.point_size
    }

    pub fn class(&self) -> GlyphClass {
        self.class
    }

    /// The file this font was loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Measures `text` laid out on a single line.
    pub fn measure(&self, text: &str) -> TextMetrics {
        let v_metrics = self.font.v_metrics(self.scale);
        let width = self
            .font
            .layout(text, self.scale, point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0);

        TextMetrics {
            width,
            ascent: v_metrics.ascent,
            descent: v_metrics.descent,
        }
    }

    /// Returns the union of the glyph pixel boxes, or `None` for blank text.
    pub fn ink_bounds(&self, text: &str) -> Option<InkBounds> {
        self.font
            .layout(text, self.scale, point(0.0, 0.0))
            .filter_map(|g| g.pixel_bounding_box())
            .fold(None, |acc: Option<InkBounds>, bb| {
                Some(match acc {
                    None => InkBounds {
                        min_x: bb.min.x,
                        min_y: bb.min.y,
                        max_x: bb.max.x,
                        max_y: bb.max.y,
                    },
                    Some(ink) => InkBounds {
                        min_x: ink.min_x.min(bb.min.x),
                        min_y: ink.min_y.min(bb.min.y),
                        max_x: ink.max_x.max(bb.max.x),
                        max_y: ink.max_y.max(bb.max.y),
                    },
                })
            })
    }

    /// Draws `text` with its origin at `(x, baseline)`.
    pub fn draw(&self, canvas: &mut RgbaImage, text: &str, x: f32, baseline: f32, color: Rgba<u8>) {
        for glyph in self.font.layout(text, self.scale, point(x, baseline)) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, coverage| {
                blend_pixel(
                    canvas,
                    bb.min.x + gx as i32,
                    bb.min.y + gy as i32,
                    color,
                    coverage,
                );
            });
        }
    }
}

// ============================================================================
// FontResolver
// ============================================================================

type CacheKey = (u32, GlyphClass);
type CacheEntry = Result<FontHandle, FontUnavailableError>;

/// Thread-safe, process-lifetime font cache with per-class fallback.
///
/// Concurrent misses for the same key may both load the file; the first
/// insert wins and every caller gets that handle. Failed lookups are cached
/// as well, so a missing font is reported once per `(size, class)` and font
/// files added afterwards need a new resolver.
#[derive(Debug)]
pub struct FontResolver {
    catalog: FontCatalog,
    cache: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl FontResolver {
    pub fn new(catalog: FontCatalog) -> Self {
        Self {
            catalog,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a font for `class` at `point_size`, loading it on first use.
    pub fn resolve(
        &self,
        point_size: u32,
        class: GlyphClass,
    ) -> Result<FontHandle, FontUnavailableError> {
        let key = (point_size, class);

        if let Some(entry) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return entry.clone();
        }

        let loaded = self.load_first(point_size, class).map(Arc::new);
        if let Err(err) = &loaded {
            tracing::warn!(error = %err, "no usable font, overlays of this size and class are skipped");
        }

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.entry(key).or_insert(loaded).clone()
    }

    /// Number of successfully loaded `(size, class)` entries.
    pub fn cached_len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|entry| entry.is_ok())
            .count()
    }

    fn load_first(
        &self,
        point_size: u32,
        class: GlyphClass,
    ) -> Result<RenderedFont, FontUnavailableError> {
        let chain = self.catalog.chain(class);

        for path in &chain {
            if !path.exists() {
                tracing::debug!(path = %path.display(), class = class.as_str(), "font file not found");
                continue;
            }
            match RenderedFont::load(path, point_size, class) {
                Ok(font) => {
                    tracing::debug!(
                        path = %path.display(),
                        point_size,
                        class = class.as_str(),
                        "loaded font"
                    );
                    return Ok(font);
                }
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        class = class.as_str(),
                        error = %err,
                        "could not load font, trying next candidate"
                    );
                }
            }
        }

        Err(FontUnavailableError {
            class: class.as_str(),
            point_size,
            tried: chain.len(),
        })
    }
}
