//! The immutable per-render view of one camera's settings.
//!
//! A [`CameraRenderConfig`] is built from the persisted profile right before a
//! render (see [`crate::profile::CameraProfile::into_config`]) and is never
//! mutated afterwards.

use image::Rgba;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::color::TRANSPARENT;
use crate::geometry::RectPx;
use crate::layer::{ShadowConfig, StateIconConfig, TextOverlayConfig};

pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;
pub const DEFAULT_QUALITY: u8 = 85;

/// Resampling filter used when the output size differs from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    #[default]
    Lanczos,
    Bilinear,
}

impl ResizeFilter {
    pub fn filter_type(&self) -> FilterType {
        match self {
            Self::Lanczos => FilterType::Lanczos3,
            Self::Bilinear => FilterType::Triangle,
        }
    }
}

/// Appearance shared by every state icon of a camera.
#[derive(Debug, Clone, PartialEq)]
pub struct StateIconStyle {
    /// Backdrop behind each icon run.
    pub run_background: Rgba<u8>,
    /// Fill of icon discs; fully transparent means the icon color is used.
    pub disc_background: Rgba<u8>,
    pub shadow: Option<ShadowConfig>,
}

impl Default for StateIconStyle {
    fn default() -> Self {
        Self {
            run_background: TRANSPARENT,
            disc_background: TRANSPARENT,
            shadow: None,
        }
    }
}

/// Everything needed to render one snapshot of one camera.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraRenderConfig {
    /// Identifier used in log fields only.
    pub camera_id: String,
    pub width: u32,
    pub height: u32,
    pub keep_aspect_ratio: bool,
    /// JPEG quality; must be within `1..=100` at encode time.
    pub quality: u8,
    pub crop: Option<RectPx>,
    pub resize_filter: ResizeFilter,
    pub datetime_overlay: Option<TextOverlayConfig>,
    pub text_overlay: Option<TextOverlayConfig>,
    pub state_icons: Vec<StateIconConfig>,
    pub state_icon_style: StateIconStyle,
}

impl Default for CameraRenderConfig {
    fn default() -> Self {
        Self {
            camera_id: String::new(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            keep_aspect_ratio: true,
            quality: DEFAULT_QUALITY,
            crop: None,
            resize_filter: ResizeFilter::default(),
            datetime_overlay: None,
            text_overlay: None,
            state_icons: Vec::new(),
            state_icon_style: StateIconStyle::default(),
        }
    }
}

impl CameraRenderConfig {
    /// A copy of this config with cropping disabled.
    pub fn without_crop(&self) -> Self {
        Self {
            crop: None,
            ..self.clone()
        }
    }

    /// Returns true if at least one overlay would be drawn.
    pub fn has_overlays(&self) -> bool {
        self.datetime_overlay.is_some() || self.text_overlay.is_some() || !self.state_icons.is_empty()
    }
}
