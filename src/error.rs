//! Error taxonomy for snapshot rendering.
//!
//! A render fails with exactly one of five kinds, so operators can tell an
//! unreachable camera apart from a bad configuration or a missing font.
//! Only [`SourceUnavailableError`], [`GeometryError`] and [`EncodingError`]
//! ever escape a render; font and template failures are degraded in place by
//! the overlay layers.

use std::fmt;

/// Result alias used throughout the crate.
pub type RenderResult<T> = Result<T, RenderError>;

/// The stage-tagged kind of a render failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SourceUnavailable,
    Geometry,
    FontUnavailable,
    Template,
    Encoding,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceUnavailable => "source_unavailable",
            Self::Geometry => "geometry",
            Self::FontUnavailable => "font_unavailable",
            Self::Template => "template",
            Self::Encoding => "encoding",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The image source could not deliver a decodable still image.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct SourceUnavailableError {
    reason: String,
}

impl SourceUnavailableError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Crop or resize inputs that cannot produce a non-empty image.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    #[error("source image has no pixels ({width}x{height})")]
    EmptySource { width: u32, height: u32 },

    #[error("crop rectangle collapses to {width}x{height} after clamping")]
    EmptyCrop { width: u32, height: u32 },

    #[error("target size must be positive, got {width}x{height}")]
    EmptyTarget { width: u32, height: u32 },
}

/// No candidate in a font fallback chain could be loaded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no usable {class} font at {point_size}pt (tried {tried} candidates)")]
pub struct FontUnavailableError {
    pub class: &'static str,
    pub point_size: u32,
    pub tried: usize,
}

/// A template failed to parse, evaluate, or finish in time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template syntax error: {0}")]
    Syntax(String),

    #[error("template evaluation failed: {0}")]
    Evaluation(String),

    #[error("template rendering timed out")]
    Timeout,
}

/// The final re-encode failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("quality {0} is outside 1..=100")]
    UnsupportedQuality(u8),

    #[error("encoder failed: {0}")]
    Encoder(String),
}

/// Overall failure of a single render.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(#[from] SourceUnavailableError),

    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("font unavailable: {0}")]
    FontUnavailable(#[from] FontUnavailableError),

    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
}

impl RenderError {
    /// Returns which of the five failure kinds this is.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceUnavailable(_) => ErrorKind::SourceUnavailable,
            Self::Geometry(_) => ErrorKind::Geometry,
            Self::FontUnavailable(_) => ErrorKind::FontUnavailable,
            Self::Template(_) => ErrorKind::Template,
            Self::Encoding(_) => ErrorKind::Encoding,
        }
    }
}
