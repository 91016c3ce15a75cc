//! Overlay layers drawn on top of a snapshot.
//!
//! Every overlay is reduced to a [`TextRun`]: an ordered list of colored
//! segments, each with its own font, anchored at one corner of the frame.
//! The datetime and text overlays are single-segment runs; state icons
//! combine a label, an icon glyph and a status text.
//!
//! # Architecture
//!
//! Each layer implements [`LayerEffect`] and draws itself into the image held
//! by a [`RenderContext`]. Anything asynchronous (template rendering) happens
//! in [`OverlayCompositor::apply`] before drawing starts, so layers themselves
//! are plain synchronous pixel work.

pub mod raster;
pub mod state_icon;
pub mod text;

pub use state_icon::{StateIconConfig, StateIconLayer};
pub use text::{TextLayer, TextOverlayConfig};

use std::time::Duration;

use chrono::NaiveDateTime;
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::color::WHITE;
use crate::config::CameraRenderConfig;
use crate::font::{FontHandle, FontResolver};
use crate::host::{StateProvider, TemplateRenderer};

/// Smallest padding around a run, in pixels.
pub const MIN_PADDING: i32 = 8;

/// Run padding as a fraction of the run height.
pub const PADDING_RATIO: f32 = 0.4;

/// Disc diameter as a multiple of the glyph's larger side.
pub const DISC_SCALE: f32 = 1.3;

// ============================================================================
// Corner
// ============================================================================

/// Corner of the frame an overlay is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub fn is_left(&self) -> bool {
        matches!(self, Self::TopLeft | Self::BottomLeft)
    }

    pub fn is_top(&self) -> bool {
        matches!(self, Self::TopLeft | Self::TopRight)
    }
}

// ============================================================================
// ShadowConfig
// ============================================================================

/// Drop shadow drawn underneath a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowConfig {
    pub color: Rgba<u8>,
    pub offset_x: i32,
    pub offset_y: i32,
}

// ============================================================================
// Render Context
// ============================================================================

/// State passed to each layer while drawing.
pub struct RenderContext<'a> {
    /// The frame being annotated.
    pub image: RgbaImage,
    pub fonts: &'a FontResolver,
}

impl<'a> RenderContext<'a> {
    pub fn new(image: RgbaImage, fonts: &'a FontResolver) -> Self {
        Self { image, fonts }
    }
}

/// A layer that knows how to draw itself.
///
/// Drawing never fails: a layer that cannot get its fonts logs a warning and
/// leaves the image as it was.
pub trait LayerEffect {
    fn transform(&self, ctx: &mut RenderContext<'_>);
}

// ============================================================================
// Text runs
// ============================================================================

/// One colored piece of a run.
#[derive(Debug, Clone)]
pub struct Segment {
    pub text: String,
    pub color: Rgba<u8>,
    pub font: FontHandle,
    /// Fill of a disc drawn behind this segment; the glyph turns white.
    pub disc: Option<Rgba<u8>>,
}

/// Resolved placement of a run on a particular canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct RunLayout {
    /// Left edge of the first segment.
    pub x: i32,
    /// Top of the line box.
    pub y: i32,
    /// Horizontal advance of each segment, separating space included.
    pub widths: Vec<f32>,
    pub total_width: f32,
    /// Shared distance from the line top to the baseline.
    pub ascent: f32,
    pub height: f32,
    pub padding: i32,
}

impl RunLayout {
    pub fn baseline(&self) -> f32 {
        self.y as f32 + self.ascent
    }

    /// The background rectangle as `(x, y, width, height)`.
    pub fn background_rect(&self) -> (i32, i32, u32, u32) {
        (
            self.x - self.padding,
            self.y - self.padding,
            (self.total_width.ceil() as i32 + 2 * self.padding).max(0) as u32,
            (self.height.ceil() as i32 + 2 * self.padding).max(0) as u32,
        )
    }
}

/// A horizontal sequence of segments anchored at a corner.
#[derive(Debug, Clone)]
pub struct TextRun {
    pub segments: Vec<Segment>,
    pub corner: Corner,
    pub background: Rgba<u8>,
    pub shadow: Option<ShadowConfig>,
}

impl TextRun {
    /// Measures every segment and places the run inside a canvas.
    ///
    /// Returns `None` for a run without segments.
    pub fn layout(&self, canvas_width: u32, canvas_height: u32) -> Option<RunLayout> {
        let last = self.segments.len().checked_sub(1)?;

        let mut widths = Vec::with_capacity(self.segments.len());
        let mut ascent = 0.0f32;
        let mut descent = 0.0f32;
        for (i, segment) in self.segments.iter().enumerate() {
            let metrics = if i < last {
                segment.font.measure(&format!("{} ", segment.text))
            } else {
                segment.font.measure(&segment.text)
            };
            widths.push(metrics.width);
            ascent = ascent.max(metrics.ascent);
            descent = descent.min(metrics.descent);
        }

        let total_width: f32 = widths.iter().sum();
        let height = ascent - descent;
        let padding = MIN_PADDING.max((height * PADDING_RATIO) as i32);
        let margin = padding;
        let run_width = total_width.ceil() as i32;
        let run_height = height.ceil() as i32;

        let x = if self.corner.is_left() {
            margin + padding
        } else {
            canvas_width as i32 - run_width - margin - padding
        };
        let y = if self.corner.is_top() {
            margin + padding
        } else {
            canvas_height as i32 - run_height - margin - padding * 2
        };

        Some(RunLayout {
            x,
            y,
            widths,
            total_width,
            ascent,
            height,
            padding,
        })
    }

    /// Draws background, shadow and segments, in that order.
    pub fn draw(&self, canvas: &mut RgbaImage) {
        let Some(layout) = self.layout(canvas.width(), canvas.height()) else {
            return;
        };

        let (bx, by, bw, bh) = layout.background_rect();
        raster::fill_rect(canvas, bx, by, bw, bh, self.background);

        let baseline = layout.baseline();

        if let Some(shadow) = self.shadow {
            let mut x = layout.x as f32 + shadow.offset_x as f32;
            for (segment, width) in self.segments.iter().zip(&layout.widths) {
                segment.font.draw(
                    canvas,
                    &segment.text,
                    x,
                    baseline + shadow.offset_y as f32,
                    shadow.color,
                );
                x += width;
            }
        }

        let mut x = layout.x as f32;
        for (segment, width) in self.segments.iter().zip(&layout.widths) {
            let color = match segment.disc {
                Some(fill) => {
                    draw_disc(canvas, segment, x, baseline, fill);
                    WHITE
                }
                None => segment.color,
            };
            segment.font.draw(canvas, &segment.text, x, baseline, color);
            x += width;
        }
    }
}

fn draw_disc(canvas: &mut RgbaImage, segment: &Segment, x: f32, baseline: f32, fill: Rgba<u8>) {
    let Some(ink) = segment.font.ink_bounds(&segment.text) else {
        return;
    };
    let glyph_w = ink.width() as f32;
    let glyph_h = ink.height() as f32;
    let cx = x + ink.min_x as f32 + glyph_w / 2.0;
    let cy = baseline + ink.min_y as f32 + glyph_h / 2.0;
    raster::fill_circle(canvas, cx, cy, glyph_w.max(glyph_h) * DISC_SCALE, fill);
}

// ============================================================================
// OverlayCompositor
// ============================================================================

/// Draws all overlays of a camera onto a frame.
///
/// Order is fixed: datetime, then static text, then each state icon in
/// configuration order. Overlays sharing a corner are not moved apart, so the
/// one drawn last ends up on top.
#[derive(Debug)]
pub struct OverlayCompositor<'a> {
    fonts: &'a FontResolver,
    template_timeout: Option<Duration>,
}

impl<'a> OverlayCompositor<'a> {
    pub fn new(fonts: &'a FontResolver) -> Self {
        Self {
            fonts,
            template_timeout: None,
        }
    }

    /// Bounds every template render; expiry draws the error marker.
    pub fn with_template_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.template_timeout = timeout;
        self
    }

    /// Annotates `image`. Never fails; broken layers are skipped or degraded.
    pub async fn apply<T: TemplateRenderer>(
        &self,
        image: RgbaImage,
        config: &CameraRenderConfig,
        states: &dyn StateProvider,
        templates: &T,
        now: NaiveDateTime,
    ) -> RgbaImage {
        let datetime = config
            .datetime_overlay
            .as_ref()
            .map(|overlay| TextLayer::datetime(overlay, now));
        let text = config
            .text_overlay
            .as_ref()
            .and_then(TextLayer::static_text);

        let mut icons = Vec::with_capacity(config.state_icons.len());
        for icon in &config.state_icons {
            let layer = StateIconLayer::resolve(
                icon,
                &config.state_icon_style,
                states,
                templates,
                self.template_timeout,
            )
            .await;
            icons.extend(layer);
        }

        let mut ctx = RenderContext::new(image, self.fonts);
        for layer in datetime.iter().chain(text.iter()) {
            layer.transform(&mut ctx);
        }
        for layer in &icons {
            layer.transform(&mut ctx);
        }

        tracing::debug!(
            camera = %config.camera_id,
            state_icons = icons.len(),
            "overlays applied"
        );
        ctx.image
    }
}

// ============================================================================
// Tests
// ============================================================================
