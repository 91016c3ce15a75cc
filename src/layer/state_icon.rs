//! Entity-state driven icon overlays.
//!
//! A state icon looks up its entity's state, picks a rule with
//! [`crate::rules::evaluate`], and draws up to three segments: an optional
//! `label:` prefix, the rule's icon glyph and the rule's status text.

use std::time::Duration;

use image::Rgba;

use super::{Corner, LayerEffect, RenderContext, Segment, ShadowConfig, TextRun};
use crate::color::ERROR_MARKER;
use crate::config::StateIconStyle;
use crate::error::TemplateError;
use crate::font::GlyphClass;
use crate::host::{StateProvider, TemplateRenderer};
use crate::icons::MISSING_ICON;
use crate::rules::{self, DisplayOrder, IconGlyph, StateRule};

/// State used when the provider has nothing for an entity.
pub const UNAVAILABLE_STATE: &str = "unavailable";

/// Text drawn in place of a template that failed to render.
pub const TEMPLATE_ERROR_TEXT: &str = "<error>";

/// One configured state icon.
#[derive(Debug, Clone, PartialEq)]
pub struct StateIconConfig {
    pub entity_ref: String,
    pub label: Option<String>,
    pub show_label: bool,
    /// Label color; the matched rule's text color when unset.
    pub label_color: Option<Rgba<u8>>,
    pub position: Corner,
    pub font_size: u32,
    /// Ordered rules, at most one of them flagged default.
    pub rules: Vec<StateRule>,
}

/// One piece of a resolved state icon.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub text: String,
    pub class: GlyphClass,
    pub color: Rgba<u8>,
    pub disc: Option<Rgba<u8>>,
}

impl Part {
    fn text(text: String, color: Rgba<u8>) -> Self {
        Self {
            text,
            class: GlyphClass::Text,
            color,
            disc: None,
        }
    }
}

/// A state icon after its rule, template and glyph have been resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct StateIconLayer {
    pub entity_ref: String,
    pub label: Option<Part>,
    pub icon: Option<Part>,
    pub text: Option<Part>,
    pub display_order: DisplayOrder,
    pub position: Corner,
    pub font_size: u32,
    pub background: Rgba<u8>,
    pub shadow: Option<ShadowConfig>,
}

impl StateIconLayer {
    /// Resolves `config` against the live state.
    ///
    /// Returns `None` when no rule matches, in which case nothing is drawn.
    pub async fn resolve<T: TemplateRenderer>(
        config: &StateIconConfig,
        style: &StateIconStyle,
        states: &dyn StateProvider,
        templates: &T,
        template_timeout: Option<Duration>,
    ) -> Option<Self> {
        let state = states.get_state(&config.entity_ref).unwrap_or_else(|| {
            tracing::warn!(entity = %config.entity_ref, "entity has no state, treating as unavailable");
            UNAVAILABLE_STATE.to_string()
        });

        let Some(rule) = rules::evaluate(&config.rules, &state) else {
            tracing::debug!(entity = %config.entity_ref, state = %state, "no state rule matched");
            return None;
        };

        let text = if rule.is_template && !rule.text.is_empty() {
            match render_template(&rule.text, states, templates, template_timeout).await {
                Ok(rendered) => Part::text(rendered, rule.text_color),
                Err(err) => {
                    tracing::warn!(entity = %config.entity_ref, error = %err, "state icon template failed");
                    Part::text(TEMPLATE_ERROR_TEXT.to_string(), ERROR_MARKER)
                }
            }
        } else {
            Part::text(rule.text.clone(), rule.text_color)
        };

        let label = config
            .label
            .as_deref()
            .filter(|label| config.show_label && !label.is_empty())
            .map(|label| {
                Part::text(
                    format!("{label}:"),
                    config.label_color.unwrap_or(rule.text_color),
                )
            });

        Some(Self {
            entity_ref: config.entity_ref.clone(),
            label,
            icon: icon_part(rule, style),
            text: Some(text).filter(|part| !part.text.is_empty()),
            display_order: rule.display_order,
            position: config.position,
            font_size: config.font_size,
            background: style.run_background,
            shadow: style.shadow,
        })
    }

    /// Parts in drawing order.
    pub fn parts(&self) -> Vec<&Part> {
        let (first, second) = match self.display_order {
            DisplayOrder::IconFirst => (&self.icon, &self.text),
            DisplayOrder::TextFirst => (&self.text, &self.icon),
        };
        [&self.label, first, second]
            .into_iter()
            .filter_map(Option::as_ref)
            .collect()
    }
}

impl LayerEffect for StateIconLayer {
    fn transform(&self, ctx: &mut RenderContext<'_>) {
        let segments: Vec<Segment> = self
            .parts()
            .into_iter()
            .filter_map(|part| match ctx.fonts.resolve(self.font_size, part.class) {
                Ok(font) => Some(Segment {
                    text: part.text.clone(),
                    color: part.color,
                    font,
                    disc: part.disc,
                }),
                Err(err) => {
                    tracing::warn!(entity = %self.entity_ref, error = %err, "skipping state icon segment");
                    None
                }
            })
            .collect();

        if segments.is_empty() {
            return;
        }

        TextRun {
            segments,
            corner: self.position,
            background: self.background,
            shadow: self.shadow,
        }
        .draw(&mut ctx.image);
    }
}

async fn render_template<T: TemplateRenderer>(
    template: &str,
    states: &dyn StateProvider,
    templates: &T,
    limit: Option<Duration>,
) -> Result<String, TemplateError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, templates.render(template, states))
            .await
            .unwrap_or(Err(TemplateError::Timeout)),
        None => templates.render(template, states).await,
    }
}

fn icon_part(rule: &StateRule, style: &StateIconStyle) -> Option<Part> {
    let (glyph, class) = match &rule.icon {
        IconGlyph::Literal(text) if text.is_empty() => return None,
        IconGlyph::Literal(text) => (text.clone(), GlyphClass::Emoji),
        IconGlyph::IconRef {
            codepoint: Some(codepoint),
            ..
        } => (codepoint.to_string(), GlyphClass::IconFont),
        IconGlyph::IconRef {
            name,
            codepoint: None,
        } => {
            tracing::warn!(icon = %name, "icon not found in codepoint table, drawing placeholder");
            (MISSING_ICON.to_string(), GlyphClass::Emoji)
        }
    };

    let disc = rule.icon_filled_background.then(|| {
        if style.disc_background[3] > 0 {
            style.disc_background
        } else {
            rule.icon_color
        }
    });

    Some(Part {
        text: glyph,
        class,
        color: rule.icon_color,
        disc,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::color::WHITE;
    use crate::font::tests::system_catalog;
    use crate::font::{FontCatalog, FontResolver};
    use crate::rules::Condition;
    use crate::template::StatesTemplate;

    const GOLD: Rgba<u8> = Rgba([255, 215, 0, 255]);
    const GREY: Rgba<u8> = Rgba([150, 150, 150, 255]);

    struct SlowTemplate;

    impl TemplateRenderer for SlowTemplate {
        async fn render(
            &self,
            _template: &str,
            _states: &dyn StateProvider,
        ) -> Result<String, TemplateError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".into())
        }
    }

    fn states(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn light(rules: Vec<StateRule>) -> StateIconConfig {
        StateIconConfig {
            entity_ref: "light.porch".into(),
            label: Some("Porch".into()),
            show_label: true,
            label_color: None,
            position: Corner::BottomRight,
            font_size: 18,
            rules,
        }
    }

    fn on_off_rules() -> Vec<StateRule> {
        vec![
            StateRule {
                icon_color: GOLD,
                ..StateRule::new(Condition::Equals, "on")
                    .with_literal_icon("\u{1F4A1}")
                    .with_text("ON")
            },
            StateRule {
                text_color: GREY,
                ..StateRule::new(Condition::Equals, "off").with_text("OFF")
            },
        ]
    }

    async fn resolve(config: &StateIconConfig, states: &HashMap<String, String>) -> Option<StateIconLayer> {
        StateIconLayer::resolve(config, &StateIconStyle::default(), states, &StatesTemplate, None).await
    }

    #[tokio::test]
    async fn matched_rule_builds_label_icon_and_text() {
        let layer = resolve(&light(on_off_rules()), &states(&[("light.porch", "ON")]))
            .await
            .unwrap();

        let parts = layer.parts();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].text, "Porch:");
        assert_eq!(parts[0].color, WHITE);
        assert_eq!(parts[1].text, "\u{1F4A1}");
        assert_eq!(parts[1].class, GlyphClass::Emoji);
        assert_eq!(parts[1].color, GOLD);
        assert_eq!(parts[2].text, "ON");
        assert_eq!(parts[2].class, GlyphClass::Text);
    }

    #[tokio::test]
    async fn empty_icon_is_omitted_and_label_follows_text_color() {
        let layer = resolve(&light(on_off_rules()), &states(&[("light.porch", "off")]))
            .await
            .unwrap();

        let parts = layer.parts();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].color, GREY);
        assert_eq!(parts[1].text, "OFF");
    }

    #[tokio::test]
    async fn no_match_skips_the_icon() {
        let layer = resolve(&light(on_off_rules()), &states(&[("light.porch", "dimmed")])).await;
        assert!(layer.is_none());
    }

    #[tokio::test]
    async fn missing_entity_is_unavailable() {
        let rules = vec![StateRule::new(Condition::Equals, "unavailable").with_text("offline")];
        let layer = resolve(&light(rules), &states(&[])).await.unwrap();
        assert_eq!(layer.text.unwrap().text, "offline");
    }

    #[tokio::test]
    async fn text_first_order_and_hidden_label() {
        let rules = vec![StateRule {
            display_order: DisplayOrder::TextFirst,
            ..StateRule::fallback().with_literal_icon("!").with_text("open")
        }];
        let mut config = light(rules);
        config.show_label = false;

        let layer = resolve(&config, &states(&[("light.porch", "x")])).await.unwrap();
        let texts: Vec<&str> = layer.parts().iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["open", "!"]);
    }

    #[tokio::test]
    async fn templates_are_rendered() {
        let rules = vec![StateRule::fallback().with_template("{{ states('sensor.temp') }}°C")];
        let layer = resolve(
            &light(rules),
            &states(&[("light.porch", "on"), ("sensor.temp", "21.5")]),
        )
        .await
        .unwrap();
        assert_eq!(layer.text.unwrap().text, "21.5°C");
    }

    #[tokio::test]
    async fn template_failure_draws_error_marker() {
        let rules = vec![StateRule::fallback().with_literal_icon("x").with_template("{{ now() }}")];
        let layer = resolve(&light(rules), &states(&[("light.porch", "on")]))
            .await
            .unwrap();

        let text = layer.text.unwrap();
        assert_eq!(text.text, TEMPLATE_ERROR_TEXT);
        assert_eq!(text.color, ERROR_MARKER);
        assert_eq!(layer.icon.unwrap().text, "x");
    }

    #[tokio::test]
    async fn template_timeout_draws_error_marker() {
        let rules = vec![StateRule::fallback().with_template("{{ slow }}")];
        let layer = StateIconLayer::resolve(
            &light(rules),
            &StateIconStyle::default(),
            &states(&[("light.porch", "on")]),
            &SlowTemplate,
            Some(Duration::from_millis(20)),
        )
        .await
        .unwrap();
        assert_eq!(layer.text.unwrap().text, TEMPLATE_ERROR_TEXT);
    }

    #[tokio::test]
    async fn icon_references_pick_the_icon_font() {
        let rules = vec![
            StateRule::new(Condition::Equals, "known").with_icon(IconGlyph::from_config("mdi:cctv", None)),
            StateRule::new(Condition::Equals, "unknown")
                .with_icon(IconGlyph::from_config("mdi:not-a-real-icon", None)),
        ];
        let config = light(rules);

        let known = resolve(&config, &states(&[("light.porch", "known")])).await.unwrap();
        let icon = known.icon.unwrap();
        assert_eq!(icon.class, GlyphClass::IconFont);
        assert_eq!(icon.text, "\u{F07AE}");

        let unknown = resolve(&config, &states(&[("light.porch", "unknown")])).await.unwrap();
        let icon = unknown.icon.unwrap();
        assert_eq!(icon.class, GlyphClass::Emoji);
        assert_eq!(icon.text, MISSING_ICON);
    }

    #[tokio::test]
    async fn disc_uses_global_background_then_icon_color() {
        let rules = vec![StateRule {
            icon_color: GOLD,
            icon_filled_background: true,
            ..StateRule::fallback().with_literal_icon("*")
        }];
        let config = light(rules);
        let current = states(&[("light.porch", "on")]);

        let plain = resolve(&config, &current).await.unwrap();
        assert_eq!(plain.icon.unwrap().disc, Some(GOLD));

        let style = StateIconStyle {
            disc_background: Rgba([0, 0, 255, 200]),
            ..StateIconStyle::default()
        };
        let styled = StateIconLayer::resolve(&config, &style, &current, &StatesTemplate, None)
            .await
            .unwrap();
        assert_eq!(styled.icon.unwrap().disc, Some(Rgba([0, 0, 255, 200])));
    }

    #[tokio::test]
    async fn missing_fonts_draw_nothing() {
        let layer = resolve(&light(on_off_rules()), &states(&[("light.porch", "on")]))
            .await
            .unwrap();
        let fonts = FontResolver::new(FontCatalog::from_dir("/nonexistent"));
        let original = image::RgbaImage::from_pixel(64, 64, Rgba([1, 2, 3, 255]));
        let mut ctx = RenderContext::new(original.clone(), &fonts);

        layer.transform(&mut ctx);
        assert_eq!(ctx.image, original);
    }

    #[tokio::test]
    async fn draws_when_fonts_exist() {
        let Some(catalog) = system_catalog() else {
            eprintln!("no system font found, skipping");
            return;
        };
        let layer = resolve(&light(on_off_rules()), &states(&[("light.porch", "on")]))
            .await
            .unwrap();
        let fonts = FontResolver::new(catalog);
        let original = image::RgbaImage::from_pixel(320, 120, Rgba([1, 2, 3, 255]));
        let mut ctx = RenderContext::new(original.clone(), &fonts);

        layer.transform(&mut ctx);
        assert_ne!(ctx.image, original);
    }
}
