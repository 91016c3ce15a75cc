//! snapshot-overlay: annotated camera snapshots
//!
//! This crate fetches a still frame from a camera-like source, crops and
//! resizes it, draws a timestamp, a static caption and entity-state driven
//! icons on top, and re-encodes the result as JPEG.
//!
//! The host supplies three services: an [`ImageSource`] for frames, a
//! [`StateProvider`] for entity states and a [`TemplateRenderer`] for
//! template text. Fonts are shared through a single [`FontResolver`].
//!
//! # Example
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use snapshot_overlay::{
//!     CameraProfile, FontCatalog, FontResolver, SnapshotRenderer, StatesTemplate, StaticSource,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let fonts = Arc::new(FontResolver::new(FontCatalog::from_dir("fonts")));
//! let renderer = SnapshotRenderer::new(fonts);
//!
//! let config = CameraProfile::from_json(r#"{
//!     "width": 1280,
//!     "height": 720,
//!     "datetime_enabled": true,
//!     "state_icons": [{
//!         "entity": "binary_sensor.front_door",
//!         "label": "Door",
//!         "state_rules": [
//!             { "condition": "equals", "value": "on", "icon": "mdi:door-open", "text": "Open" },
//!             { "condition": "any_state", "is_default": true, "icon": "mdi:door-closed" }
//!         ]
//!     }]
//! }"#)?
//! .into_config();
//!
//! let states = HashMap::from([("binary_sensor.front_door".to_string(), "on".to_string())]);
//! let source = StaticSource(std::fs::read("frame.jpg")?);
//!
//! let snapshot = renderer.render(&source, &config, &states, &StatesTemplate).await?;
//! std::fs::write("annotated.jpg", &snapshot.bytes)?;
//! # Ok(())
//! # }
//! ```

mod color;
mod config;
mod error;
mod font;
mod geometry;
mod host;
mod icons;
mod layer;
mod pipeline;
mod profile;
mod rules;
mod template;

pub use color::{BLACK, ColorValue, ERROR_MARKER, TRANSPARENT, WHITE, parse_hex, with_opacity};
pub use config::{CameraRenderConfig, ResizeFilter, StateIconStyle};
pub use error::{
    EncodingError, ErrorKind, FontUnavailableError, GeometryError, RenderError, RenderResult,
    SourceUnavailableError, TemplateError,
};
pub use font::{
    FontCatalog, FontHandle, FontResolver, GlyphClass, InkBounds, RenderedFont, TextMetrics,
};
pub use geometry::{GeometryPlan, RectPx, SizePx, plan_geometry};
pub use host::{ImageSource, StateProvider, StaticSource, TemplateRenderer};
pub use icons::{ICON_PREFIX, MISSING_ICON, icon_codepoint, parse_codepoint};
pub use layer::{
    Corner, LayerEffect, OverlayCompositor, RenderContext, RunLayout, Segment, ShadowConfig,
    StateIconConfig, StateIconLayer, TextLayer, TextOverlayConfig, TextRun,
};
pub use pipeline::{
    RenderStage, RenderTimeouts, RenderedSnapshot, SnapshotRenderer, encode_jpeg,
};
pub use profile::{CameraProfile, StateIconProfile, StateRuleProfile, legacy_rules};
pub use rules::{Condition, DisplayOrder, IconGlyph, StateRule, evaluate};
pub use template::StatesTemplate;
