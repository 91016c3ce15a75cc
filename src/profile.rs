//! Persisted per-camera settings.
//!
//! A [`CameraProfile`] mirrors the flat JSON object a host stores for each
//! processed camera, key for key. Older saves carry a few legacy shapes
//! (on/off state icons, a single shared font size, numbers written as
//! floats); they are all accepted here and normalized away by
//! [`CameraProfile::into_config`], so the renderer only ever sees the
//! canonical [`CameraRenderConfig`].
//!
//! # Example
//!
//! ```
//! use snapshot_overlay::CameraProfile;
//!
//! let profile = CameraProfile::from_json(r#"{
//!     "width": 640,
//!     "height": 480,
//!     "datetime_enabled": true,
//!     "state_icons": [{ "entity": "light.porch", "label": "Porch" }]
//! }"#).unwrap();
//!
//! let config = profile.into_config();
//! assert_eq!(config.width, 640);
//! assert_eq!(config.state_icons[0].rules.len(), 2);
//! ```

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::color::{BLACK, ColorValue, TRANSPARENT, WHITE, with_opacity};
use crate::config::{
    CameraRenderConfig, DEFAULT_HEIGHT, DEFAULT_QUALITY, DEFAULT_WIDTH, ResizeFilter,
    StateIconStyle,
};
use crate::geometry::RectPx;
use crate::layer::text::DEFAULT_DATETIME_FORMAT;
use crate::layer::{Corner, ShadowConfig, StateIconConfig, TextOverlayConfig};
use crate::rules::{self, Condition, DisplayOrder, IconGlyph, StateRule};

pub const DEFAULT_DATETIME_FONT_SIZE: u32 = 24;
pub const DEFAULT_TEXT_FONT_SIZE: u32 = 20;
pub const DEFAULT_STATE_ICON_FONT_SIZE: u32 = 18;
pub const DEFAULT_SHADOW_OFFSET: i32 = 2;

// ============================================================================
// Lenient numbers
// ============================================================================

/// Deserializers that never reject a whole profile over one field.
///
/// Numbers accept `24`, `24.0` and `"24"` alike. Enums and strings fall back
/// to a default on `null` or an unknown value.
mod lenient {
    use serde::de::{DeserializeOwned, Error};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use crate::layer::Corner;

    fn number<E: Error>(value: Value) -> Result<f64, E> {
        match value {
            Value::Number(n) => n.as_f64().ok_or_else(|| E::custom("number out of range")),
            Value::String(s) => s.trim().parse().map_err(E::custom),
            other => Err(E::custom(format!("expected a number, got {other}"))),
        }
    }

    fn to_u32<E: Error>(value: f64) -> Result<u32, E> {
        if !value.is_finite() || value < 0.0 || value > u32::MAX as f64 {
            return Err(E::custom(format!("{value} is not a valid size")));
        }
        Ok(value.trunc() as u32)
    }

    pub fn u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        to_u32(number(Value::deserialize(deserializer)?)?)
    }

    pub fn i32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
        let value = number::<D::Error>(Value::deserialize(deserializer)?)?;
        if !value.is_finite() || value.abs() > i32::MAX as f64 {
            return Err(D::Error::custom(format!("{value} is not a valid offset")));
        }
        Ok(value.trunc() as i32)
    }

    pub fn opt_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            value => to_u32(number(value)?).map(Some),
        }
    }

    pub fn opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            value => number(value).map(Some),
        }
    }

    fn or_fallback<T: DeserializeOwned>(value: Value, fallback: T) -> T {
        if value.is_null() {
            return fallback;
        }
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(
                    value = %value,
                    expected = std::any::type_name::<T>(),
                    error = %err,
                    "unrecognized setting, using the default"
                );
                fallback
            }
        }
    }

    pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        Ok(or_fallback(Value::deserialize(deserializer)?, T::default()))
    }

    pub fn top_left<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Corner, D::Error> {
        Ok(or_fallback(Value::deserialize(deserializer)?, Corner::TopLeft))
    }

    pub fn top_right<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Corner, D::Error> {
        Ok(or_fallback(Value::deserialize(deserializer)?, Corner::TopRight))
    }

    pub fn bottom_right<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Corner, D::Error> {
        Ok(or_fallback(Value::deserialize(deserializer)?, Corner::BottomRight))
    }

    /// Strings, with `null` read as empty and scalars stringified.
    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(String::new()),
            Value::String(s) => Ok(s),
            value @ (Value::Number(_) | Value::Bool(_)) => Ok(value.to_string()),
            other => Err(D::Error::custom(format!("expected a string, got {other}"))),
        }
    }
}

// ============================================================================
// StateRuleProfile
// ============================================================================

/// One persisted entry of `state_icons[].state_rules`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateRuleProfile {
    #[serde(deserialize_with = "lenient::or_default")]
    pub condition: Condition,
    /// Comparison operand as stored; numbers and booleans are stringified.
    pub value: serde_json::Value,
    #[serde(deserialize_with = "lenient::string")]
    pub icon: String,
    /// Codepoint resolved by the editor when the rule was saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_codepoint: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub text: String,
    pub text_template: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_color: Option<ColorValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<ColorValue>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub display_order: DisplayOrder,
    pub icon_background: bool,
    pub is_default: bool,
}

impl Default for StateRuleProfile {
    fn default() -> Self {
        Self {
            condition: Condition::default(),
            value: serde_json::Value::String(String::new()),
            icon: String::new(),
            icon_codepoint: None,
            text: String::new(),
            text_template: false,
            icon_color: None,
            text_color: None,
            display_order: DisplayOrder::default(),
            icon_background: false,
            is_default: false,
        }
    }
}

impl StateRuleProfile {
    /// The operand the way the evaluator compares it.
    pub fn value_string(&self) -> String {
        match &self.value {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn to_rule(&self) -> StateRule {
        let value = self.value_string();
        if self.condition == Condition::Unsupported {
            tracing::warn!(value = %self.value, "state rule has an unsupported condition and will never match");
        } else if self.condition.is_numeric() && value.trim().parse::<f64>().is_err() {
            tracing::warn!(value = %value, "numeric state rule has a non-numeric operand and will never match");
        }

        StateRule {
            condition: self.condition,
            value,
            icon: IconGlyph::from_config(&self.icon, self.icon_codepoint.as_deref()),
            text: self.text.clone(),
            is_template: self.text_template,
            icon_color: resolve_color(self.icon_color.as_ref(), WHITE),
            text_color: resolve_color(self.text_color.as_ref(), WHITE),
            display_order: self.display_order,
            icon_filled_background: self.icon_background,
            is_default: self.is_default,
        }
    }
}

// ============================================================================
// StateIconProfile
// ============================================================================

/// One persisted entry of `state_icons`.
///
/// Icons saved before rule lists existed only have the `*_on` / `*_off`
/// fields; see [`legacy_rules`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateIconProfile {
    #[serde(deserialize_with = "lenient::string")]
    pub entity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub show_label: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_color: Option<ColorValue>,
    #[serde(deserialize_with = "lenient::bottom_right")]
    pub position: Corner,
    #[serde(deserialize_with = "lenient::opt_u32", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    pub state_rules: Vec<StateRuleProfile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_off: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_off: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_off: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_color_on: Option<ColorValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_color_off: Option<ColorValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_on: Option<ColorValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_off: Option<ColorValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color_on: Option<ColorValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color_off: Option<ColorValue>,
}

impl Default for StateIconProfile {
    fn default() -> Self {
        Self {
            entity: String::new(),
            label: None,
            show_label: true,
            label_color: None,
            position: Corner::BottomRight,
            font_size: None,
            state_rules: Vec::new(),
            state_on: None,
            state_off: None,
            icon_on: None,
            icon_off: None,
            text_on: None,
            text_off: None,
            icon_color_on: None,
            icon_color_off: None,
            color_on: None,
            color_off: None,
            text_color_on: None,
            text_color_off: None,
        }
    }
}

/// Builds the two rules implied by a legacy on/off icon.
///
/// The result is `[equals state_on, equals state_off]` with no default rule,
/// so any other state draws nothing.
pub fn legacy_rules(icon: &StateIconProfile) -> Vec<StateRule> {
    let on = StateRule {
        icon: IconGlyph::from_config(icon.icon_on.as_deref().unwrap_or("\u{1F4A1}"), None),
        text: icon.text_on.clone().unwrap_or_else(|| "ON".to_string()),
        icon_color: resolve_color(
            icon.icon_color_on.as_ref().or(icon.color_on.as_ref()),
            Rgba([255, 215, 0, 255]),
        ),
        text_color: resolve_color(icon.text_color_on.as_ref(), WHITE),
        ..StateRule::new(Condition::Equals, icon.state_on.as_deref().unwrap_or("on"))
    };
    let off = StateRule {
        icon: IconGlyph::from_config(icon.icon_off.as_deref().unwrap_or("\u{1F311}"), None),
        text: icon.text_off.clone().unwrap_or_else(|| "OFF".to_string()),
        icon_color: resolve_color(
            icon.icon_color_off.as_ref().or(icon.color_off.as_ref()),
            Rgba([100, 100, 100, 255]),
        ),
        text_color: resolve_color(icon.text_color_off.as_ref(), Rgba([150, 150, 150, 255])),
        ..StateRule::new(Condition::Equals, icon.state_off.as_deref().unwrap_or("off"))
    };
    vec![on, off]
}

impl StateIconProfile {
    /// Canonical rule list: explicit rules, or the legacy pair.
    pub fn rules(&self) -> Vec<StateRule> {
        if self.state_rules.is_empty() {
            return legacy_rules(self);
        }
        let mut rules: Vec<StateRule> = self.state_rules.iter().map(StateRuleProfile::to_rule).collect();
        rules::enforce_single_default(&mut rules);
        rules
    }

    fn to_config(&self, fallback_font_size: u32) -> StateIconConfig {
        StateIconConfig {
            entity_ref: self.entity.clone(),
            label: self.label.clone(),
            show_label: self.show_label,
            label_color: self
                .label_color
                .as_ref()
                .and_then(|color| color.to_rgba().or_else(|| {
                    tracing::warn!(color = ?color, "unparseable label color, using text color");
                    None
                })),
            position: self.position,
            font_size: self.font_size.unwrap_or(fallback_font_size),
            rules: self.rules(),
        }
    }
}

fn resolve_color(color: Option<&ColorValue>, fallback: Rgba<u8>) -> Rgba<u8> {
    color.map_or(fallback, |color| color.to_rgba_or(fallback))
}

fn background(color: &ColorValue, opacity: Option<f64>) -> Rgba<u8> {
    let color = color.to_rgba_or(TRANSPARENT);
    opacity.map_or(color, |percent| with_opacity(color, percent))
}

// ============================================================================
// CameraProfile
// ============================================================================

/// The persisted settings of one processed camera.
///
/// Missing keys take the same defaults the settings editor shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,

    #[serde(deserialize_with = "lenient::u32")]
    pub width: u32,
    #[serde(deserialize_with = "lenient::u32")]
    pub height: u32,
    pub keep_ratio: bool,
    #[serde(deserialize_with = "lenient::u32")]
    pub quality: u32,
    #[serde(deserialize_with = "lenient::or_default")]
    pub resize_algorithm: ResizeFilter,

    pub crop_enabled: bool,
    #[serde(deserialize_with = "lenient::u32")]
    pub crop_x: u32,
    #[serde(deserialize_with = "lenient::u32")]
    pub crop_y: u32,
    #[serde(deserialize_with = "lenient::u32")]
    pub crop_width: u32,
    #[serde(deserialize_with = "lenient::u32")]
    pub crop_height: u32,

    pub datetime_enabled: bool,
    pub datetime_format: String,
    #[serde(deserialize_with = "lenient::top_left")]
    pub datetime_position: Corner,
    #[serde(deserialize_with = "lenient::opt_u32", skip_serializing_if = "Option::is_none")]
    pub datetime_font_size: Option<u32>,

    pub text_enabled: bool,
    pub text_value: String,
    #[serde(deserialize_with = "lenient::top_right")]
    pub text_position: Corner,
    #[serde(deserialize_with = "lenient::opt_u32", skip_serializing_if = "Option::is_none")]
    pub text_font_size: Option<u32>,

    /// Shared font size written by older versions.
    #[serde(deserialize_with = "lenient::opt_u32", skip_serializing_if = "Option::is_none")]
    pub overlay_font_size: Option<u32>,
    pub overlay_color: ColorValue,
    pub overlay_background: ColorValue,
    #[serde(deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub overlay_background_opacity: Option<f64>,

    pub text_shadow_enabled: bool,
    pub text_shadow_color: ColorValue,
    #[serde(deserialize_with = "lenient::i32")]
    pub text_shadow_offset_x: i32,
    #[serde(deserialize_with = "lenient::i32")]
    pub text_shadow_offset_y: i32,

    #[serde(deserialize_with = "lenient::opt_u32", skip_serializing_if = "Option::is_none")]
    pub state_icon_font_size: Option<u32>,
    pub state_icon_background: ColorValue,
    #[serde(deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub state_icon_background_opacity: Option<f64>,
    pub state_icon_shadow_enabled: bool,
    pub state_icon_shadow_color: ColorValue,
    #[serde(deserialize_with = "lenient::i32")]
    pub state_icon_shadow_offset_x: i32,
    #[serde(deserialize_with = "lenient::i32")]
    pub state_icon_shadow_offset_y: i32,

    pub state_icons: Vec<StateIconProfile>,
}

impl Default for CameraProfile {
    fn default() -> Self {
        Self {
            entity_name: None,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            keep_ratio: true,
            quality: DEFAULT_QUALITY as u32,
            resize_algorithm: ResizeFilter::default(),
            crop_enabled: false,
            crop_x: 0,
            crop_y: 0,
            crop_width: 0,
            crop_height: 0,
            datetime_enabled: false,
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
            datetime_position: Corner::TopLeft,
            datetime_font_size: None,
            text_enabled: false,
            text_value: String::new(),
            text_position: Corner::TopRight,
            text_font_size: None,
            overlay_font_size: None,
            overlay_color: ColorValue::rgb(255, 255, 255),
            overlay_background: ColorValue::hex("#00000000"),
            overlay_background_opacity: None,
            text_shadow_enabled: false,
            text_shadow_color: ColorValue::hex("#000000"),
            text_shadow_offset_x: DEFAULT_SHADOW_OFFSET,
            text_shadow_offset_y: DEFAULT_SHADOW_OFFSET,
            state_icon_font_size: None,
            state_icon_background: ColorValue::hex("#00000000"),
            state_icon_background_opacity: None,
            state_icon_shadow_enabled: false,
            state_icon_shadow_color: ColorValue::hex("#000000"),
            state_icon_shadow_offset_x: DEFAULT_SHADOW_OFFSET,
            state_icon_shadow_offset_y: DEFAULT_SHADOW_OFFSET,
            state_icons: Vec::new(),
        }
    }
}

impl CameraProfile {
    /// Serializes the profile to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes the profile to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes a profile from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Normalizes the stored settings into a render config.
    ///
    /// Quality values that do not fit in a byte are kept out of range so the
    /// encoder rejects them instead of silently clamping.
    pub fn into_config(self) -> CameraRenderConfig {
        let text_color = self.overlay_color.to_rgba_or(WHITE);
        let overlay_background = background(&self.overlay_background, self.overlay_background_opacity);
        let text_shadow = self.text_shadow_enabled.then(|| ShadowConfig {
            color: self.text_shadow_color.to_rgba_or(BLACK),
            offset_x: self.text_shadow_offset_x,
            offset_y: self.text_shadow_offset_y,
        });

        let text_overlay = |value: String, position: Corner, font_size: u32| TextOverlayConfig {
            format_or_value: value,
            position,
            font_size,
            color: text_color,
            background: overlay_background,
            shadow: text_shadow,
        };

        let datetime_overlay = self.datetime_enabled.then(|| {
            text_overlay(
                self.datetime_format.clone(),
                self.datetime_position,
                self.datetime_font_size
                    .or(self.overlay_font_size)
                    .unwrap_or(DEFAULT_DATETIME_FONT_SIZE),
            )
        });
        let static_overlay = (self.text_enabled && !self.text_value.is_empty()).then(|| {
            text_overlay(
                self.text_value.clone(),
                self.text_position,
                self.text_font_size
                    .or(self.overlay_font_size)
                    .unwrap_or(DEFAULT_TEXT_FONT_SIZE),
            )
        });

        let icon_font_size = self
            .state_icon_font_size
            .or(self.overlay_font_size)
            .unwrap_or(DEFAULT_STATE_ICON_FONT_SIZE);
        let state_icons = self
            .state_icons
            .iter()
            .filter(|icon| {
                if icon.entity.is_empty() {
                    tracing::warn!("skipping state icon without an entity");
                }
                !icon.entity.is_empty()
            })
            .map(|icon| icon.to_config(icon_font_size))
            .collect();

        let state_icon_style = StateIconStyle {
            run_background: overlay_background,
            disc_background: background(
                &self.state_icon_background,
                self.state_icon_background_opacity,
            ),
            shadow: self.state_icon_shadow_enabled.then(|| ShadowConfig {
                color: self.state_icon_shadow_color.to_rgba_or(BLACK),
                offset_x: self.state_icon_shadow_offset_x,
                offset_y: self.state_icon_shadow_offset_y,
            }),
        };

        CameraRenderConfig {
            camera_id: self.entity_name.unwrap_or_default(),
            width: self.width,
            height: self.height,
            keep_aspect_ratio: self.keep_ratio,
            quality: u8::try_from(self.quality).unwrap_or(u8::MAX),
            crop: self.crop_enabled.then(|| {
                RectPx::new(self.crop_x, self.crop_y, self.crop_width, self.crop_height)
            }),
            resize_filter: self.resize_algorithm,
            datetime_overlay,
            text_overlay: static_overlay,
            state_icons,
            state_icon_style,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_profile_uses_defaults() {
        let config = CameraProfile::from_json("{}").unwrap().into_config();

        assert_eq!((config.width, config.height), (1920, 1080));
        assert!(config.keep_aspect_ratio);
        assert_eq!(config.quality, 85);
        assert_eq!(config.crop, None);
        assert!(config.datetime_overlay.is_none());
        assert!(config.text_overlay.is_none());
        assert!(config.state_icons.is_empty());
        assert_eq!(config.state_icon_style.run_background, TRANSPARENT);
    }

    #[test]
    fn float_numbers_are_accepted() {
        let profile = CameraProfile::from_json(
            r#"{"width": 640.0, "height": "480", "quality": 70.0, "datetime_font_size": 30.0,
                "text_shadow_offset_x": -3.0}"#,
        )
        .unwrap();
        assert_eq!((profile.width, profile.height, profile.quality), (640, 480, 70));
        assert_eq!(profile.datetime_font_size, Some(30));
        assert_eq!(profile.text_shadow_offset_x, -3);

        assert!(CameraProfile::from_json(r#"{"width": -5}"#).is_err());
    }

    #[test]
    fn crop_only_when_enabled() {
        let json = r#"{"crop_x": 10, "crop_y": 20, "crop_width": 300, "crop_height": 200}"#;
        assert_eq!(CameraProfile::from_json(json).unwrap().into_config().crop, None);

        let json = r#"{"crop_enabled": true, "crop_x": 10, "crop_y": 20, "crop_width": 300, "crop_height": 200}"#;
        assert_eq!(
            CameraProfile::from_json(json).unwrap().into_config().crop,
            Some(RectPx::new(10, 20, 300, 200))
        );
    }

    #[test]
    fn overlay_font_size_is_the_fallback() {
        let config = CameraProfile::from_json(
            r#"{"datetime_enabled": true, "text_enabled": true, "text_value": "Gate",
                "overlay_font_size": 32, "text_font_size": 14,
                "state_icons": [{"entity": "a"}, {"entity": "b", "font_size": 40}]}"#,
        )
        .unwrap()
        .into_config();

        assert_eq!(config.datetime_overlay.unwrap().font_size, 32);
        assert_eq!(config.text_overlay.unwrap().font_size, 14);
        assert_eq!(config.state_icons[0].font_size, 32);
        assert_eq!(config.state_icons[1].font_size, 40);
    }

    #[test]
    fn overlay_defaults() {
        let config = CameraProfile::from_json(r#"{"datetime_enabled": true, "text_enabled": true}"#)
            .unwrap()
            .into_config();

        let datetime = config.datetime_overlay.unwrap();
        assert_eq!(datetime.format_or_value, DEFAULT_DATETIME_FORMAT);
        assert_eq!(datetime.position, Corner::TopLeft);
        assert_eq!(datetime.font_size, 24);
        assert_eq!(datetime.color, WHITE);
        assert_eq!(datetime.shadow, None);
        // empty text value means no text overlay
        assert!(config.text_overlay.is_none());
    }

    #[test]
    fn background_opacity_and_shadow() {
        let config = CameraProfile::from_json(
            r##"{"datetime_enabled": true, "overlay_background": "#102030",
                 "overlay_background_opacity": 50, "text_shadow_enabled": true,
                 "text_shadow_color": [255, 0, 0], "state_icon_background": "#0000ff80",
                 "state_icon_shadow_enabled": true}"##,
        )
        .unwrap()
        .into_config();

        let datetime = config.datetime_overlay.unwrap();
        assert_eq!(datetime.background, Rgba([16, 32, 48, 128]));
        assert_eq!(
            datetime.shadow,
            Some(ShadowConfig {
                color: Rgba([255, 0, 0, 255]),
                offset_x: 2,
                offset_y: 2
            })
        );
        assert_eq!(config.state_icon_style.disc_background, Rgba([0, 0, 255, 128]));
        assert_eq!(config.state_icon_style.run_background, Rgba([16, 32, 48, 128]));
        assert!(config.state_icon_style.shadow.is_some());
    }

    #[test]
    fn legacy_icons_become_two_rules() {
        let icon: StateIconProfile = serde_json::from_str(
            r#"{"entity": "switch.fan", "state_on": "Running", "text_on": "Fan",
                "color_on": [0, 255, 0]}"#,
        )
        .unwrap();
        let rules = legacy_rules(&icon);

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].condition, Condition::Equals);
        assert_eq!(rules[0].value, "Running");
        assert_eq!(rules[0].text, "Fan");
        assert_eq!(rules[0].icon_color, Rgba([0, 255, 0, 255]));
        assert_eq!(rules[0].icon, IconGlyph::Literal("\u{1F4A1}".into()));
        assert_eq!(rules[1].value, "off");
        assert_eq!(rules[1].text, "OFF");
        assert_eq!(rules[1].icon_color, Rgba([100, 100, 100, 255]));
        assert_eq!(rules[1].text_color, Rgba([150, 150, 150, 255]));
        assert!(rules.iter().all(|r| !r.is_default));

        assert!(rules::evaluate(&rules, "running").is_some());
        assert!(rules::evaluate(&rules, "idle").is_none());
    }

    #[test]
    fn explicit_rules_are_converted() {
        let icon: StateIconProfile = serde_json::from_str(
            r##"{"entity": "sensor.temp", "label": "Temp", "label_color": "#ff0000",
                "position": "top_left",
                "state_rules": [
                    {"condition": "gt", "value": 25, "icon": "mdi:fire", "text": "hot",
                     "icon_color": [255, 0, 0], "icon_background": true},
                    {"condition": "lt", "value": 15.5, "icon": "mdi:snowflake",
                     "icon_codepoint": "F0717", "display_order": "text_first"},
                    {"condition": "regex", "value": ".*"},
                    {"condition": "any_state", "is_default": true, "text": "{{ states('sensor.temp') }}",
                     "text_template": true},
                    {"condition": "equals", "value": true, "is_default": true}
                ]}"##,
        )
        .unwrap();
        let config = icon.to_config(18);

        assert_eq!(config.position, Corner::TopLeft);
        assert_eq!(config.label_color, Some(Rgba([255, 0, 0, 255])));

        let rules = &config.rules;
        assert_eq!(rules[0].value, "25");
        assert!(rules[0].icon_filled_background);
        assert!(matches!(rules[0].icon, IconGlyph::IconRef { .. }));
        assert_eq!(rules[1].value, "15.5");
        assert_eq!(
            rules[1].icon,
            IconGlyph::IconRef {
                name: "snowflake".into(),
                codepoint: Some('\u{F0717}')
            }
        );
        assert_eq!(rules[1].display_order, DisplayOrder::TextFirst);
        assert_eq!(rules[2].condition, Condition::Unsupported);
        assert!(rules[3].is_default && rules[3].is_template);
        assert_eq!(rules[4].value, "true");
        assert!(!rules[4].is_default);

        assert_eq!(rules::evaluate(rules, "30").map(|r| r.text.as_str()), Some("hot"));
        assert!(rules::evaluate(rules, "20").unwrap().is_default);
    }

    #[test]
    fn icons_without_entity_are_dropped() {
        let config = CameraProfile::from_json(r#"{"state_icons": [{"label": "x"}, {"entity": "a"}]}"#)
            .unwrap()
            .into_config();
        assert_eq!(config.state_icons.len(), 1);
        assert_eq!(config.state_icons[0].entity_ref, "a");
    }

    #[test]
    fn oversized_quality_is_not_clamped() {
        let config = CameraProfile::from_json(r#"{"quality": 300}"#).unwrap().into_config();
        assert_eq!(config.quality, u8::MAX);

        let config = CameraProfile::from_json(r#"{"quality": 0}"#).unwrap().into_config();
        assert_eq!(config.quality, 0);
    }

    #[test]
    fn profile_serialization_roundtrip() {
        let profile = CameraProfile {
            entity_name: Some("camera.porch_processed".into()),
            width: 800,
            datetime_enabled: true,
            resize_algorithm: ResizeFilter::Bilinear,
            ..CameraProfile::default()
        };

        let json = profile.to_json_pretty().unwrap();
        assert!(json.contains("\"keep_ratio\""));
        assert!(json.contains("\"bilinear\""));
        assert!(json.contains("\"top_left\""));

        let restored = CameraProfile::from_json(&json).unwrap();
        assert_eq!(restored.width, 800);
        assert_eq!(restored.entity_name.as_deref(), Some("camera.porch_processed"));
        assert_eq!(restored.into_config().camera_id, "camera.porch_processed");
    }

    #[test]
    fn unknown_resize_algorithm_falls_back_to_lanczos() {
        for json in [r#"{"resize_algorithm": "bicubic"}"#, r#"{"resize_algorithm": null}"#] {
            let config = CameraProfile::from_json(json).unwrap().into_config();
            assert_eq!(config.resize_filter, ResizeFilter::Lanczos, "{json}");
        }
    }

    #[test]
    fn unknown_positions_use_each_field_default() {
        let config = CameraProfile::from_json(
            r#"{"datetime_enabled": true, "datetime_position": "center",
                "text_enabled": true, "text_value": "Gate", "text_position": 7,
                "state_icons": [{"entity": "light.porch", "position": "middle"}]}"#,
        )
        .unwrap()
        .into_config();

        assert_eq!(config.datetime_overlay.unwrap().position, Corner::TopLeft);
        assert_eq!(config.text_overlay.unwrap().position, Corner::TopRight);
        assert_eq!(config.state_icons[0].position, Corner::BottomRight);
    }

    #[test]
    fn unknown_display_order_is_icon_first() {
        let config = CameraProfile::from_json(
            r#"{"state_icons": [{"entity": "light.porch", "state_rules": [
                {"value": "on", "text": "ON", "display_order": "icon_only"},
                {"value": "off", "text": "OFF", "display_order": null}
            ]}]}"#,
        )
        .unwrap()
        .into_config();

        let rules = &config.state_icons[0].rules;
        assert_eq!(rules[0].display_order, DisplayOrder::IconFirst);
        assert_eq!(rules[1].display_order, DisplayOrder::IconFirst);
        assert_eq!(rules[0].text, "ON");
    }

    #[test]
    fn null_icon_and_text_read_as_empty() {
        let config = CameraProfile::from_json(
            r#"{"state_icons": [{"entity": "light.porch", "state_rules": [
                {"condition": null, "value": 21, "icon": null, "text": null}
            ]}]}"#,
        )
        .unwrap()
        .into_config();

        let rule = &config.state_icons[0].rules[0];
        assert_eq!(rule.condition, Condition::Equals);
        assert_eq!(rule.value, "21");
        assert!(rule.icon.is_empty());
        assert_eq!(rule.text, "");
    }

    #[test]
    fn numeric_rule_with_text_operand_loads_but_never_matches() {
        let rule = StateRuleProfile {
            condition: Condition::Gt,
            value: serde_json::Value::String("warm".into()),
            ..StateRuleProfile::default()
        }
        .to_rule();
        assert_eq!(rule.value, "warm");
        assert!(!rule.matches("30"));
    }
}
