//! Color values as they appear in persisted camera settings.
//!
//! Colors arrive either as `[r, g, b]` channel lists (what the color picker
//! stores) or as `#RRGGBB` / `#RRGGBBAA` hex strings. Everything is resolved to
//! `image::Rgba<u8>` before rendering.

use std::str::FromStr;

use image::Rgba;
use palette::{Srgb, Srgba};
use serde::{Deserialize, Serialize};

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Color used for text that replaces a failed template.
pub const ERROR_MARKER: Rgba<u8> = Rgba([255, 64, 64, 255]);

/// A color as written in a camera profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorValue {
    /// `[r, g, b]` channel list; extra entries are ignored.
    Channels(Vec<f64>),
    /// Hex string with or without a leading `#`.
    Hex(String),
}

impl ColorValue {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::Channels(vec![r as f64, g as f64, b as f64])
    }

    pub fn hex(value: impl Into<String>) -> Self {
        Self::Hex(value.into())
    }

    /// Resolves to an RGBA pixel, or `None` if the value is malformed.
    pub fn to_rgba(&self) -> Option<Rgba<u8>> {
        match self {
            Self::Channels(channels) if channels.len() >= 3 => Some(Rgba([
                channel(channels[0]),
                channel(channels[1]),
                channel(channels[2]),
                255,
            ])),
            Self::Channels(_) => None,
            Self::Hex(hex) => parse_hex(hex),
        }
    }

    /// Resolves to an RGBA pixel, logging and substituting `fallback` on failure.
    pub fn to_rgba_or(&self, fallback: Rgba<u8>) -> Rgba<u8> {
        self.to_rgba().unwrap_or_else(|| {
            tracing::warn!(color = ?self, "unparseable color, using fallback");
            fallback
        })
    }
}

fn channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Parses `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA`.
pub fn parse_hex(hex: &str) -> Option<Rgba<u8>> {
    let trimmed = hex.trim();
    let digits = trimmed.trim_start_matches('#');
    match digits.len() {
        4 | 8 => {
            let color = Srgba::<u8>::from_str(trimmed).ok()?;
            Some(Rgba([color.red, color.green, color.blue, color.alpha]))
        }
        3 | 6 => {
            let color = Srgb::<u8>::from_str(trimmed).ok()?;
            Some(Rgba([color.red, color.green, color.blue, 255]))
        }
        _ => None,
    }
}

/// Replaces the alpha channel with an opacity percentage in `0..=100`.
pub fn with_opacity(color: Rgba<u8>, percent: f64) -> Rgba<u8> {
    let alpha = (percent.clamp(0.0, 100.0) / 100.0 * 255.0).round() as u8;
    Rgba([color[0], color[1], color[2], alpha])
}
