//! A tiny stand-in template renderer.
//!
//! Real hosts bring their own template engine. [`StatesTemplate`] understands
//! just enough of the common syntax to be useful from the CLI and in tests:
//! `{{ states('entity.id') }}` is replaced by the entity's state and every
//! other expression is an evaluation error.

use crate::error::TemplateError;
use crate::host::{StateProvider, TemplateRenderer};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const UNKNOWN_STATE: &str = "unknown";

/// Substitutes `{{ states('…') }}` expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatesTemplate;

impl StatesTemplate {
    /// Renders `template` synchronously.
    pub fn render_now(
        &self,
        template: &str,
        states: &dyn StateProvider,
    ) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find(OPEN) {
            out.push_str(&rest[..start]);
            let after_open = &rest[start + OPEN.len()..];
            let end = after_open.find(CLOSE).ok_or_else(|| {
                TemplateError::Syntax(format!("unclosed expression at byte {start}"))
            })?;

            let expression = after_open[..end].trim();
            let entity = parse_states_call(expression).ok_or_else(|| {
                TemplateError::Evaluation(format!("unsupported expression `{expression}`"))
            })?;
            let state = states
                .get_state(entity)
                .unwrap_or_else(|| UNKNOWN_STATE.to_string());
            out.push_str(&state);

            rest = &after_open[end + CLOSE.len()..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

impl TemplateRenderer for StatesTemplate {
    async fn render(
        &self,
        template: &str,
        states: &dyn StateProvider,
    ) -> Result<String, TemplateError> {
        self.render_now(template, states)
    }
}

/// Extracts `id` from `states('id')` or `states("id")`.
fn parse_states_call(expression: &str) -> Option<&str> {
    let args = expression
        .strip_prefix("states")?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')?
        .trim();

    let quote = args.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let inner = args.strip_prefix(quote)?.strip_suffix(quote)?;
    (!inner.is_empty() && !inner.contains(quote)).then_some(inner)
}
