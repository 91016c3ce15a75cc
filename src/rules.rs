//! State rules and the first-match rule evaluator.
//!
//! A state icon carries an ordered list of [`StateRule`]s. For every render the
//! entity's live state is tested against the rules in order and the first
//! match decides what gets drawn. Specific rules must therefore come before
//! broad ones; the single default rule is only consulted when nothing else
//! matched.

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::color::WHITE;
use crate::icons;

/// How a rule compares the live state against its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    AnyState,
    #[default]
    Equals,
    NotEquals,
    In,
    NotIn,
    Contains,
    NotContains,
    Gt,
    Gte,
    Lt,
    Lte,
    /// A condition name this build does not know. Never matches.
    #[serde(other)]
    Unsupported,
}

impl Condition {
    /// Tests an already lower-cased state against a lower-cased operand.
    pub fn matches(&self, state: &str, operand: &str) -> bool {
        match self {
            Self::AnyState => true,
            Self::Equals => state == operand,
            Self::NotEquals => state != operand,
            Self::In => split_list(operand).any(|item| item == state),
            Self::NotIn => !split_list(operand).any(|item| item == state),
            Self::Contains => state.contains(operand),
            Self::NotContains => !state.contains(operand),
            Self::Gt | Self::Gte | Self::Lt | Self::Lte => {
                let (Some(current), Some(target)) = (parse_number(state), parse_number(operand))
                else {
                    return false;
                };
                match self {
                    Self::Gt => current > target,
                    Self::Gte => current >= target,
                    Self::Lt => current < target,
                    _ => current <= target,
                }
            }
            Self::Unsupported => false,
        }
    }

    /// Returns true for the four numeric comparisons.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Gt | Self::Gte | Self::Lt | Self::Lte)
    }
}

fn split_list(operand: &str) -> impl Iterator<Item = &str> {
    operand.split(',').map(str::trim)
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}

/// Relative order of the icon and the text within a drawn unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayOrder {
    #[default]
    IconFirst,
    TextFirst,
}

/// What a rule draws as its icon.
///
/// Decided once when the configuration is loaded, so rendering never has to
/// sniff the icon string again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconGlyph {
    /// Plain text or emoji drawn with the emoji font chain.
    Literal(String),
    /// An icon-font reference and its codepoint, if one could be resolved.
    IconRef {
        name: String,
        codepoint: Option<char>,
    },
}

impl IconGlyph {
    /// Tags a configured icon string.
    ///
    /// A pre-resolved `codepoint` always wins. Otherwise `mdi:` names are
    /// looked up in the built-in table and anything else is literal text.
    pub fn from_config(icon: &str, codepoint: Option<&str>) -> Self {
        if let Some(glyph) = codepoint.and_then(icons::parse_codepoint) {
            return Self::IconRef {
                name: icon.strip_prefix(icons::ICON_PREFIX).unwrap_or(icon).to_string(),
                codepoint: Some(glyph),
            };
        }

        match icon.strip_prefix(icons::ICON_PREFIX) {
            Some(name) => Self::IconRef {
                name: name.to_string(),
                codepoint: icons::icon_codepoint(name),
            },
            None => Self::Literal(icon.to_string()),
        }
    }

    /// Returns true if nothing would be drawn for this icon.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Literal(text) if text.is_empty())
    }
}

impl Default for IconGlyph {
    fn default() -> Self {
        Self::Literal(String::new())
    }
}

/// One condition plus the appearance used when it matches.
#[derive(Debug, Clone, PartialEq)]
pub struct StateRule {
    pub condition: Condition,
    /// Raw comparison operand; comma-separated for `in` / `not_in`.
    pub value: String,
    pub icon: IconGlyph,
    pub text: String,
    /// `text` is a template to be rendered by the host.
    pub is_template: bool,
    pub icon_color: Rgba<u8>,
    pub text_color: Rgba<u8>,
    pub display_order: DisplayOrder,
    pub icon_filled_background: bool,
    pub is_default: bool,
}

impl Default for StateRule {
    fn default() -> Self {
        Self {
            condition: Condition::default(),
            value: String::new(),
            icon: IconGlyph::default(),
            text: String::new(),
            is_template: false,
            icon_color: WHITE,
            text_color: WHITE,
            display_order: DisplayOrder::default(),
            icon_filled_background: false,
            is_default: false,
        }
    }
}

impl StateRule {
    pub fn new(condition: Condition, value: impl Into<String>) -> Self {
        Self {
            condition,
            value: value.into(),
            ..Self::default()
        }
    }

    /// A catch-all rule consulted after every other rule failed.
    pub fn fallback() -> Self {
        Self {
            condition: Condition::AnyState,
            is_default: true,
            ..Self::default()
        }
    }

    pub fn with_icon(mut self, icon: IconGlyph) -> Self {
        self.icon = icon;
        self
    }

    pub fn with_literal_icon(self, icon: impl Into<String>) -> Self {
        self.with_icon(IconGlyph::Literal(icon.into()))
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.text = template.into();
        self.is_template = true;
        self
    }

    /// Tests this rule's condition against a live state, ignoring `is_default`.
    pub fn matches(&self, state: &str) -> bool {
        self.condition
            .matches(&state.to_lowercase(), &self.value.to_lowercase())
    }
}

/// Picks the rule to draw for `current_state`.
///
/// Non-default rules are tested in order and the first match wins. If none
/// matches, the default rule is returned when there is one.
pub fn evaluate<'a>(rules: &'a [StateRule], current_state: &str) -> Option<&'a StateRule> {
    let state = current_state.to_lowercase();

    let matched = rules.iter().filter(|rule| !rule.is_default).find(|rule| {
        let hit = rule.condition.matches(&state, &rule.value.to_lowercase());
        if rule.condition == Condition::Unsupported {
            tracing::debug!(value = %rule.value, "skipping rule with unsupported condition");
        }
        hit
    });

    matched.or_else(|| rules.iter().find(|rule| rule.is_default))
}

/// Enforces the single-default invariant on a rule list.
///
/// The first rule flagged `is_default` keeps the flag; later ones become
/// ordinary rules evaluated with their own condition.
pub fn enforce_single_default(rules: &mut [StateRule]) {
    let mut seen_default = false;
    for rule in rules.iter_mut().filter(|rule| rule.is_default) {
        if seen_default {
            tracing::warn!(value = %rule.value, "dropping extra default flag from state rule");
            rule.is_default = false;
        }
        seen_default = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temperature_rules() -> Vec<StateRule> {
        vec![
            StateRule::new(Condition::Gt, "25").with_literal_icon("hot"),
            StateRule::new(Condition::Lt, "15").with_literal_icon("cold"),
            StateRule::fallback().with_literal_icon("neutral"),
        ]
    }

    fn icon_of(rule: Option<&StateRule>) -> Option<&str> {
        match rule.map(|r| &r.icon) {
            Some(IconGlyph::Literal(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    #[test]
    fn thresholds_then_default() {
        let rules = temperature_rules();
        assert_eq!(icon_of(evaluate(&rules, "30")), Some("hot"));
        assert_eq!(icon_of(evaluate(&rules, "10")), Some("cold"));
        assert_eq!(icon_of(evaluate(&rules, "20")), Some("neutral"));
        assert_eq!(icon_of(evaluate(&rules, "abc")), Some("neutral"));
    }

    #[test]
    fn specific_rule_beats_default_placed_first() {
        let rules = vec![
            StateRule::fallback().with_literal_icon("default"),
            StateRule::new(Condition::Equals, "on").with_literal_icon("on"),
        ];
        assert_eq!(icon_of(evaluate(&rules, "ON")), Some("on"));
        assert_eq!(icon_of(evaluate(&rules, "off")), Some("default"));
    }

    #[test]
    fn first_match_wins() {
        let rules = vec![
            StateRule::new(Condition::Gte, "10").with_literal_icon("warm"),
            StateRule::new(Condition::Gte, "20").with_literal_icon("hot"),
        ];
        assert_eq!(icon_of(evaluate(&rules, "25")), Some("warm"));
    }

    #[test]
    fn numeric_rules_never_match_non_numbers() {
        for condition in [Condition::Gt, Condition::Gte, Condition::Lt, Condition::Lte] {
            let rules = vec![StateRule::new(condition, "5")];
            assert!(evaluate(&rules, "unavailable").is_none());
            assert!(evaluate(&rules, "").is_none());

            let rules = vec![StateRule::new(condition, "five")];
            assert!(evaluate(&rules, "5").is_none());
        }
    }

    #[test]
    fn numeric_boundaries() {
        assert!(Condition::Gte.matches("25", "25"));
        assert!(!Condition::Gt.matches("25", "25"));
        assert!(Condition::Lte.matches(" 25.0 ", "25"));
        assert!(Condition::Lt.matches("-3.5", "0"));
    }

    #[test]
    fn in_and_not_in_lists() {
        let rules = vec![StateRule::new(Condition::In, "armed_home, armed_away")];
        assert!(evaluate(&rules, "armed_away").is_some());
        assert!(evaluate(&rules, "disarmed").is_none());

        let rules = vec![StateRule::new(Condition::NotIn, "armed_home,armed_away")];
        assert!(evaluate(&rules, "disarmed").is_some());
        assert!(evaluate(&rules, "Armed_Home").is_none());
    }

    #[test]
    fn string_conditions_are_case_insensitive() {
        assert!(StateRule::new(Condition::Equals, "ON").matches("on"));
        assert!(StateRule::new(Condition::NotEquals, "on").matches("off"));
        assert!(StateRule::new(Condition::Contains, "Motion").matches("motion_detected"));
        assert!(StateRule::new(Condition::NotContains, "door").matches("window_open"));
        assert!(StateRule::new(Condition::AnyState, "").matches("whatever"));
    }

    #[test]
    fn no_match_without_default_is_none() {
        let rules = vec![StateRule::new(Condition::Equals, "on")];
        assert!(evaluate(&rules, "off").is_none());
        assert!(evaluate(&[], "on").is_none());
    }

    #[test]
    fn evaluation_is_deterministic() {
        let rules = temperature_rules();
        for state in ["30", "10", "20", "abc"] {
            let first = evaluate(&rules, state).map(|r| r as *const StateRule);
            let second = evaluate(&rules, state).map(|r| r as *const StateRule);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn unsupported_condition_never_matches() {
        let condition: Condition = serde_json::from_str("\"regex\"").unwrap();
        assert_eq!(condition, Condition::Unsupported);
        assert!(evaluate(&[StateRule::new(condition, ".*")], "on").is_none());
    }

    #[test]
    fn numeric_conditions() {
        assert!(Condition::Gte.is_numeric());
        assert!(!Condition::Contains.is_numeric());
        assert!(!Condition::Unsupported.is_numeric());
    }

    #[test]
    fn extra_defaults_are_demoted() {
        let mut rules = vec![
            StateRule::fallback().with_literal_icon("first"),
            StateRule {
                condition: Condition::Equals,
                value: "x".into(),
                is_default: true,
                ..StateRule::default()
            },
        ];
        enforce_single_default(&mut rules);
        assert!(rules[0].is_default);
        assert!(!rules[1].is_default);
    }

    #[test]
    fn icon_tagging() {
        assert_eq!(
            IconGlyph::from_config("mdi:cctv", None),
            IconGlyph::IconRef {
                name: "cctv".into(),
                codepoint: Some('\u{F07AE}')
            }
        );
        assert_eq!(
            IconGlyph::from_config("mdi:brand-new-icon", Some("\u{F1234}")),
            IconGlyph::IconRef {
                name: "brand-new-icon".into(),
                codepoint: Some('\u{F1234}')
            }
        );
        assert_eq!(
            IconGlyph::from_config("mdi:brand-new-icon", None),
            IconGlyph::IconRef {
                name: "brand-new-icon".into(),
                codepoint: None
            }
        );
        assert_eq!(
            IconGlyph::from_config("\u{1F4A1}", None),
            IconGlyph::Literal("\u{1F4A1}".into())
        );
        assert!(IconGlyph::from_config("", None).is_empty());
    }
}
