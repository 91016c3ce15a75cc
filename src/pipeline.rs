//! The fetch, crop, resize, overlay and encode pipeline.
//!
//! [`SnapshotRenderer`] is the entry point for a host. It is cheap to clone
//! its font resolver into many renderers, and every call to
//! [`SnapshotRenderer::render`] is independent of every other call.
//!
//! # Stages
//!
//! ```text
//! Idle -> Fetching -> Cropping -> Resizing -> Overlaying -> Encoding -> Done
//!            \___________\___________\_____________________\_______-> Failed
//! ```
//!
//! Overlaying never fails. A geometry failure is retried once with cropping
//! disabled before it is reported.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::{RgbImage, RgbaImage, imageops};

use crate::config::CameraRenderConfig;
use crate::error::{EncodingError, RenderResult, SourceUnavailableError};
use crate::font::FontResolver;
use crate::geometry::{GeometryPlan, plan_geometry};
use crate::host::{ImageSource, StateProvider, TemplateRenderer};
use crate::layer::OverlayCompositor;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_TEMPLATE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// RenderStage
// ============================================================================

/// Where a render currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderStage {
    #[default]
    Idle,
    Fetching,
    Cropping,
    Resizing,
    Overlaying,
    Encoding,
    Done,
    Failed,
}

impl RenderStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Cropping => "cropping",
            Self::Resizing => "resizing",
            Self::Overlaying => "overlaying",
            Self::Encoding => "encoding",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records stage transitions of one render.
#[derive(Debug, Default)]
struct StageTracker {
    current: RenderStage,
}

impl StageTracker {
    fn enter(&mut self, next: RenderStage) {
        tracing::debug!(from = %self.current, to = %next, "render stage");
        self.current = next;
    }
}

// ============================================================================
// Options and output
// ============================================================================

/// Time limits for the two suspension points of a render.
///
/// Off by default. Limits are enforced with `tokio::time`, so enabling them
/// requires a Tokio runtime with the time driver enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderTimeouts {
    pub fetch: Option<Duration>,
    pub template: Option<Duration>,
}

impl RenderTimeouts {
    /// 10 s for the fetch and 5 s per template.
    pub fn recommended() -> Self {
        Self {
            fetch: Some(DEFAULT_FETCH_TIMEOUT),
            template: Some(DEFAULT_TEMPLATE_TIMEOUT),
        }
    }
}

/// A finished snapshot.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedSnapshot {
    /// JPEG bytes.
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl fmt::Debug for RenderedSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedSnapshot")
            .field("bytes", &self.bytes.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

// ============================================================================
// SnapshotRenderer
// ============================================================================

/// Renders annotated snapshots.
///
/// Renders run on any executor. Only [`SnapshotRenderer::with_timeouts`]
/// ties them to a Tokio runtime with `enable_time`.
///
/// # Example
///
/// ```no_run
/// use std::collections::HashMap;
/// use std::sync::Arc;
///
/// use snapshot_overlay::{
///     CameraProfile, FontCatalog, FontResolver, SnapshotRenderer, StatesTemplate, StaticSource,
/// };
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let fonts = Arc::new(FontResolver::new(FontCatalog::from_dir("fonts")));
/// let renderer = SnapshotRenderer::new(fonts);
///
/// let config = CameraProfile::from_json(r#"{"width": 640, "height": 360}"#)?.into_config();
/// let source = StaticSource(std::fs::read("frame.jpg")?);
/// let states: HashMap<String, String> = HashMap::new();
///
/// let snapshot = renderer.render(&source, &config, &states, &StatesTemplate).await?;
/// std::fs::write("out.jpg", &snapshot.bytes)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SnapshotRenderer {
    fonts: Arc<FontResolver>,
    timeouts: RenderTimeouts,
}

impl SnapshotRenderer {
    pub fn new(fonts: Arc<FontResolver>) -> Self {
        Self {
            fonts,
            timeouts: RenderTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: RenderTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn fonts(&self) -> &Arc<FontResolver> {
        &self.fonts
    }

    /// Renders one snapshot, stamping it with the local wall-clock time.
    pub async fn render<S: ImageSource, T: TemplateRenderer>(
        &self,
        source: &S,
        config: &CameraRenderConfig,
        states: &dyn StateProvider,
        templates: &T,
    ) -> RenderResult<RenderedSnapshot> {
        self.render_at(source, config, states, templates, Local::now().naive_local())
            .await
    }

    /// Renders one snapshot as if the current time were `now`.
    #[tracing::instrument(skip_all, fields(camera = %config.camera_id))]
    pub async fn render_at<S: ImageSource, T: TemplateRenderer>(
        &self,
        source: &S,
        config: &CameraRenderConfig,
        states: &dyn StateProvider,
        templates: &T,
        now: NaiveDateTime,
    ) -> RenderResult<RenderedSnapshot> {
        let mut stages = StageTracker::default();
        let result = self
            .run(&mut stages, source, config, states, templates, now)
            .await;

        match &result {
            Ok(snapshot) => {
                stages.enter(RenderStage::Done);
                tracing::debug!(
                    width = snapshot.width,
                    height = snapshot.height,
                    bytes = snapshot.bytes.len(),
                    "snapshot rendered"
                );
            }
            Err(err) => {
                let stage = stages.current;
                stages.enter(RenderStage::Failed);
                tracing::error!(stage = %stage, kind = %err.kind(), error = %err, "snapshot render failed");
            }
        }
        result
    }

    async fn run<S: ImageSource, T: TemplateRenderer>(
        &self,
        stages: &mut StageTracker,
        source: &S,
        config: &CameraRenderConfig,
        states: &dyn StateProvider,
        templates: &T,
        now: NaiveDateTime,
    ) -> RenderResult<RenderedSnapshot> {
        stages.enter(RenderStage::Fetching);
        let mut image = self.fetch(source).await?;

        stages.enter(RenderStage::Cropping);
        let plan = plan_with_fallback(image.width(), image.height(), config)?;
        if let Some(rect) = plan.crop {
            image = imageops::crop_imm(&image, rect.x, rect.y, rect.width, rect.height).to_image();
        }

        stages.enter(RenderStage::Resizing);
        if plan.needs_resize() {
            image = imageops::resize(
                &image,
                plan.output.width,
                plan.output.height,
                config.resize_filter.filter_type(),
            );
        }

        stages.enter(RenderStage::Overlaying);
        if config.has_overlays() {
            image = OverlayCompositor::new(&self.fonts)
                .with_template_timeout(self.timeouts.template)
                .apply(image, config, states, templates, now)
                .await;
        }

        stages.enter(RenderStage::Encoding);
        let bytes = encode_jpeg(&image, config.quality)?;

        Ok(RenderedSnapshot {
            bytes,
            width: image.width(),
            height: image.height(),
        })
    }

    async fn fetch<S: ImageSource>(&self, source: &S) -> Result<RgbaImage, SourceUnavailableError> {
        let bytes = match self.timeouts.fetch {
            Some(limit) => tokio::time::timeout(limit, source.fetch())
                .await
                .map_err(|_| {
                    SourceUnavailableError::new(format!("fetch timed out after {limit:?}"))
                })??,
            None => source.fetch().await?,
        };

        let decoded = image::load_from_memory(&bytes)
            .map_err(|err| SourceUnavailableError::new(format!("undecodable image: {err}")))?;
        Ok(decoded.into_rgba8())
    }
}

/// Plans geometry, retrying once without the crop if the crop is unusable.
fn plan_with_fallback(
    width: u32,
    height: u32,
    config: &CameraRenderConfig,
) -> RenderResult<GeometryPlan> {
    match plan_geometry(width, height, config) {
        Ok(plan) => Ok(plan),
        Err(err) if config.crop.is_some() => {
            tracing::warn!(error = %err, "crop unusable, retrying with the full frame");
            Ok(plan_geometry(width, height, &config.without_crop())?)
        }
        Err(err) => Err(err.into()),
    }
}

/// Encodes `image` as a baseline JPEG, dropping alpha.
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, EncodingError> {
    if !(1..=100).contains(&quality) {
        return Err(EncodingError::UnsupportedQuality(quality));
    }

    let rgb: RgbImage = image.convert();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode_image(&rgb)
        .map_err(|err| EncodingError::Encoder(err.to_string()))?;
    Ok(bytes)
}

// ============================================================================
// Tests
// ============================================================================
