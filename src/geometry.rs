//! Crop and resize planning for snapshot frames.
//!
//! [`plan_geometry`] turns the source frame size and a camera's settings into
//! the rectangle to crop and the final output size. All math happens here so
//! the pipeline itself only executes the plan.

use crate::config::CameraRenderConfig;
use crate::error::GeometryError;

/// Relative difference under which two aspect ratios are treated as equal.
pub const RATIO_EPSILON: f64 = 0.01;

/// A rectangle defined in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RectPx {
    /// X offset from the left edge of the image
    pub x: u32,
    /// Y offset from the top edge of the image
    pub y: u32,
    /// Width of the rectangle
    pub width: u32,
    /// Height of the rectangle
    pub height: u32,
}

impl RectPx {
    /// Creates a new rectangle with the given position and dimensions.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle starting at origin (0, 0) with the given dimensions.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Returns the right edge coordinate (x + width).
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Returns the bottom edge coordinate (y + height).
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn size(&self) -> SizePx {
        SizePx::new(self.width, self.height)
    }

    /// Clamps this rectangle into a `source_width x source_height` frame.
    ///
    /// The origin is pulled into `[0, dim)` and the extent is cut so the
    /// rectangle never crosses the right or bottom edge.
    pub fn clamp_to(&self, source_width: u32, source_height: u32) -> Result<Self, GeometryError> {
        if source_width == 0 || source_height == 0 {
            return Err(GeometryError::EmptySource {
                width: source_width,
                height: source_height,
            });
        }

        let x = self.x.min(source_width - 1);
        let y = self.y.min(source_height - 1);
        let width = self.width.min(source_width - x);
        let height = self.height.min(source_height - y);

        if width == 0 || height == 0 {
            return Err(GeometryError::EmptyCrop { width, height });
        }

        Ok(Self::new(x, y, width, height))
    }
}

/// A 2D size in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizePx {
    pub width: u32,
    pub height: u32,
}

impl SizePx {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height.
    pub fn ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// The executed form of a camera's crop/resize settings for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryPlan {
    /// Clamped crop rectangle, or `None` for the full frame.
    pub crop: Option<RectPx>,
    /// Crop-adjusted source size used for ratio math.
    pub effective: SizePx,
    /// Final output size, never smaller than 1x1.
    pub output: SizePx,
}

impl GeometryPlan {
    /// Returns true when the pipeline has to resample the (cropped) frame.
    pub fn needs_resize(&self) -> bool {
        self.effective != self.output
    }
}

/// Plans crop and output size for a `source_width x source_height` frame.
pub fn plan_geometry(
    source_width: u32,
    source_height: u32,
    config: &CameraRenderConfig,
) -> Result<GeometryPlan, GeometryError> {
    if source_width == 0 || source_height == 0 {
        return Err(GeometryError::EmptySource {
            width: source_width,
            height: source_height,
        });
    }
    if config.width == 0 || config.height == 0 {
        return Err(GeometryError::EmptyTarget {
            width: config.width,
            height: config.height,
        });
    }

    let crop = config
        .crop
        .map(|rect| rect.clamp_to(source_width, source_height))
        .transpose()?;

    let effective = crop
        .map(|rect| rect.size())
        .unwrap_or_else(|| SizePx::new(source_width, source_height));

    let target = SizePx::new(config.width, config.height);
    let output = if config.keep_aspect_ratio {
        fit_within(effective, target)
    } else {
        target
    };

    Ok(GeometryPlan {
        crop,
        effective,
        output,
    })
}

/// Shrinks one side of `target` so the result keeps the ratio of `source`.
fn fit_within(source: SizePx, target: SizePx) -> SizePx {
    let source_ratio = source.ratio();
    let target_ratio = target.ratio();

    if ((source_ratio - target_ratio) / target_ratio).abs() <= RATIO_EPSILON {
        return target;
    }

    if source_ratio > target_ratio {
        let height = (target.width as f64 / source_ratio).round() as u32;
        SizePx::new(target.width, height.max(1))
    } else {
        let width = (target.height as f64 * source_ratio).round() as u32;
        SizePx::new(width.max(1), target.height)
    }
}
