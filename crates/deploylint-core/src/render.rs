//! Explanation and recommendation template rendering.
//!
//! Templates reference populated fields as `{{.FieldMap.key}}` or
//! `{{index .FieldMap "key"}}`. A key the populator did not provide is left
//! in place verbatim so the reader sees what is missing.

use crate::context::LintInput;
use crate::engine::RuleError;
use crate::rule::{FieldMap, Populator};

use thiserror::Error;

/// Malformed template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// A `{{` without a matching `}}`.
    #[error("unclosed `{{{{` at byte {offset}")]
    Unclosed {
        /// Byte offset of the opening braces.
        offset: usize,
    },

    /// A placeholder that is not a field reference.
    #[error("unsupported template action `{action}`")]
    UnknownAction {
        /// The placeholder body.
        action: String,
    },
}

/// Runs the populator, if any. No populator yields an empty map.
///
/// # Errors
///
/// Returns the populator's error.
pub fn populate(populator: Option<&Populator>, input: &LintInput) -> Result<FieldMap, RuleError> {
    populator.map_or_else(|| Ok(FieldMap::new()), |p| p(input))
}

/// Renders `template` with the populator's fields.
///
/// # Errors
///
/// Returns an error if the populator fails or the template is malformed.
pub fn render(
    template: &str,
    populator: Option<&Populator>,
    input: &LintInput,
) -> Result<String, RuleError> {
    let fields = populate(populator, input)?;
    Ok(render_template(template, &fields)?)
}

/// Substitutes field placeholders in `template`.
///
/// An empty field map returns the template unchanged.
///
/// # Errors
///
/// Returns an error on an unclosed placeholder or an unknown action.
pub fn render_template(template: &str, fields: &FieldMap) -> Result<String, RenderError> {
    if fields.is_empty() {
        return Ok(template.to_string());
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut consumed = 0;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let body_start = open + 2;
        let close = rest[body_start..]
            .find("}}")
            .ok_or(RenderError::Unclosed {
                offset: consumed + open,
            })?;
        let placeholder = &rest[open..body_start + close + 2];
        let key = field_key(rest[body_start..body_start + close].trim())?;
        match fields.get(key) {
            Some(value) => out.push_str(value),
            None => out.push_str(placeholder),
        }
        let advance = body_start + close + 2;
        consumed += advance;
        rest = &rest[advance..];
    }
    out.push_str(rest);
    Ok(out)
}

fn field_key(action: &str) -> Result<&str, RenderError> {
    if let Some(key) = action.strip_prefix(".FieldMap.") {
        if is_ident(key) {
            return Ok(key);
        }
    }
    if let Some(args) = action.strip_prefix("index") {
        let mut parts = args.split_whitespace();
        if let (Some(".FieldMap"), Some(quoted), None) = (parts.next(), parts.next(), parts.next()) {
            if let Some(key) = quoted.strip_prefix('"').and_then(|q| q.strip_suffix('"')) {
                return Ok(key);
            }
        }
    }
    Err(RenderError::UnknownAction {
        action: action.to_string(),
    })
}

fn is_ident(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
