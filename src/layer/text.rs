//! Datetime and static text overlays.

use std::fmt::Write as _;

use chrono::NaiveDateTime;
use chrono::format::{Item, StrftimeItems};
use image::Rgba;

use super::{Corner, LayerEffect, RenderContext, Segment, ShadowConfig, TextRun};
use crate::font::GlyphClass;

/// Format used when the configured datetime format is unusable.
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// TextOverlayConfig
// ============================================================================

/// A single line of text anchored at a corner.
///
/// For the datetime overlay `format_or_value` is a strftime format; for the
/// text overlay it is drawn verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlayConfig {
    pub format_or_value: String,
    pub position: Corner,
    pub font_size: u32,
    pub color: Rgba<u8>,
    pub background: Rgba<u8>,
    pub shadow: Option<ShadowConfig>,
}

// ============================================================================
// TextLayer
// ============================================================================

/// A text overlay with its final string.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayer {
    pub text: String,
    pub position: Corner,
    pub font_size: u32,
    pub color: Rgba<u8>,
    pub background: Rgba<u8>,
    pub shadow: Option<ShadowConfig>,
}

impl TextLayer {
    fn from_config(config: &TextOverlayConfig, text: String) -> Self {
        Self {
            text,
            position: config.position,
            font_size: config.font_size,
            color: config.color,
            background: config.background,
            shadow: config.shadow,
        }
    }

    /// Formats `now` with the configured strftime format.
    pub fn datetime(config: &TextOverlayConfig, now: NaiveDateTime) -> Self {
        Self::from_config(config, format_datetime(&config.format_or_value, now))
    }

    /// The static text overlay, or `None` when there is nothing to draw.
    pub fn static_text(config: &TextOverlayConfig) -> Option<Self> {
        if config.format_or_value.is_empty() {
            return None;
        }
        Some(Self::from_config(config, config.format_or_value.clone()))
    }
}

impl LayerEffect for TextLayer {
    fn transform(&self, ctx: &mut RenderContext<'_>) {
        let font = match ctx.fonts.resolve(self.font_size, GlyphClass::Text) {
            Ok(font) => font,
            Err(err) => {
                tracing::warn!(error = %err, "skipping text overlay");
                return;
            }
        };

        let run = TextRun {
            segments: vec![Segment {
                text: self.text.clone(),
                color: self.color,
                font,
                disc: None,
            }],
            corner: self.position,
            background: self.background,
            shadow: self.shadow,
        };
        run.draw(&mut ctx.image);
    }
}

/// Formats `now`, falling back to [`DEFAULT_DATETIME_FORMAT`] for bad formats.
pub fn format_datetime(format: &str, now: NaiveDateTime) -> String {
    try_format(format, now).unwrap_or_else(|| {
        tracing::warn!(format, "invalid datetime format, using default");
        try_format(DEFAULT_DATETIME_FORMAT, now).unwrap_or_default()
    })
}

fn try_format(format: &str, now: NaiveDateTime) -> Option<String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return None;
    }

    // Offset specifiers fail at write time on a naive timestamp.
    let mut out = String::new();
    write!(out, "{}", now.format_with_items(items.iter())).ok()?;
    Some(out)
}
