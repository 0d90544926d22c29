//! Matcher engine: applies one rule to one artifact.
//!
//! Evaluation order is fixed: gate, match, populate, render, diff. A rule
//! that errors fails on its own; the caller decides how to record it.

use crate::context::{ArtifactKind, LintInput};
use crate::diff::{self, DiffError};
use crate::gate;
use crate::render::{self, RenderError};
use crate::rule::{FieldFilter, Filter, RegexFilter, Rule, RuleType, StringFilter};
use crate::types::{Action, ConfigOpt, Recommendation};
use crate::utils::yaml::{self, Step};

use std::ops::Range;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Errors raised while evaluating a single rule.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The filter cannot be applied to this kind of artifact.
    #[error("{strategy} filter cannot be applied to {kind} artifact {}", .path.display())]
    UnsupportedInput {
        /// Matching strategy of the rule.
        strategy: RuleType,
        /// Kind of the artifact under test.
        kind: ArtifactKind,
        /// Artifact path.
        path: PathBuf,
    },

    /// A string-equals filter with an empty phrase.
    #[error("string-equals filter has an empty phrase")]
    EmptyPattern,

    /// The rule's populator failed.
    #[error("populator failed: {0}")]
    Populate(String),

    /// The explanation or recommendation template is malformed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The diff could not be synthesized.
    #[error(transparent)]
    Diff(#[from] DiffError),

    /// A matched field has no block-style text position to edit.
    #[error("cannot locate the matched field in {} for a {action:?} edit", .path.display())]
    Unlocatable {
        /// Artifact path.
        path: PathBuf,
        /// Action that needed the position.
        action: Action,
    },
}

/// A matched region of an artifact's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Byte span of the match.
    pub span: Range<usize>,
    /// `false` for a field node written in flow style; `span` is then the
    /// empty start of its document.
    pub located: bool,
}

impl Match {
    fn at(span: Range<usize>) -> Self {
        Self { span, located: true }
    }

    fn unlocated(at: usize) -> Self {
        Self {
            span: at..at,
            located: false,
        }
    }
}

/// Evaluates `rule` against `input`.
///
/// Returns one recommendation per match, in text order. A failed gate
/// yields no recommendations and never runs the matcher.
///
/// # Errors
///
/// Returns an error if the filter does not apply to the input, or if
/// populating, rendering or diffing fails.
pub fn evaluate(rule: &Rule, input: &LintInput) -> Result<Vec<Recommendation>, RuleError> {
    if !gate::all_pass(rule.conditions(), input) {
        return Ok(Vec::new());
    }

    let matches = find_matches(rule.filter(), input)?;
    if matches.is_empty() {
        return Ok(Vec::new());
    }
    debug!(
        "{} matched {} time(s) in {}",
        rule.id().code,
        matches.len(),
        input.rel_path().display()
    );

    let action = rule.recommended().action();
    if action != Action::Noop && matches.iter().any(|m| !m.located) {
        return Err(RuleError::Unlocatable {
            path: input.rel_path().to_path_buf(),
            action,
        });
    }

    let fields = render::populate(rule.populator(), input)?;
    let explanation = render::render_template(rule.explanation_template(), &fields)?;
    let replacement = render::render_template(rule.recommended().template(), &fields)?;

    matches
        .into_iter()
        .map(|m| recommend(rule, input, m.span, &explanation, &replacement))
        .collect()
}

/// Returns the regions `filter` matches in `input`, in text order.
///
/// # Errors
///
/// Returns an error if the filter does not apply to the input.
pub fn find_matches(filter: &Filter, input: &LintInput) -> Result<Vec<Match>, RuleError> {
    match filter {
        Filter::Field(f) => match_field(f, input),
        Filter::Regex(f) => Ok(match_regex(f, input.text())),
        Filter::StringEquals(f) => match_string(f, input.text()),
        Filter::Graph => {
            debug!(
                "graph rules are not implemented; skipping {}",
                input.rel_path().display()
            );
            Ok(Vec::new())
        }
    }
}

fn match_field(filter: &FieldFilter, input: &LintInput) -> Result<Vec<Match>, RuleError> {
    if input.kind() != ArtifactKind::Pipeline {
        return Err(RuleError::UnsupportedInput {
            strategy: RuleType::Field,
            kind: input.kind(),
            path: input.rel_path().to_path_buf(),
        });
    }

    let text = input.text();
    let mut matches = Vec::new();
    for doc in input.documents() {
        let hits: Vec<Vec<Step>> = yaml::lookup_paths(&doc.value, filter.path())
            .into_iter()
            .filter(|(_, node)| match filter.value() {
                Some(predicate) => yaml::scalar_string(node).is_some_and(|v| predicate.test(&v)),
                None => true,
            })
            .map(|(steps, _)| steps)
            .collect();

        if filter.invert_match() {
            if hits.is_empty() {
                matches.push(Match::at(doc.range.end..doc.range.end));
            }
            continue;
        }

        for steps in hits {
            let Some(node) = yaml::locate_path(text, doc.range.clone(), &steps) else {
                debug!("no block-style position for {:?} in {}", steps, input.rel_path().display());
                matches.push(Match::unlocated(doc.range.start));
                continue;
            };
            let value = match steps.last() {
                Some(Step::Key(_)) if filter.value().is_some() => {
                    yaml::locate_value(text, node.end, doc.range.end)
                }
                _ => None,
            };
            matches.push(Match::at(value.unwrap_or(node)));
        }
    }
    Ok(matches)
}

fn match_regex(filter: &RegexFilter, text: &str) -> Vec<Match> {
    filter
        .pattern()
        .find_iter(text)
        .map(|m| Match::at(m.range()))
        .collect()
}

fn match_string(filter: &StringFilter, text: &str) -> Result<Vec<Match>, RuleError> {
    let needle = filter.needle();
    if needle.is_empty() {
        return Err(RuleError::EmptyPattern);
    }
    // ASCII folding keeps byte offsets aligned with the original text.
    let haystack = text.to_ascii_uppercase();
    let needle = needle.to_ascii_uppercase();
    Ok(haystack
        .find(&needle)
        .map(|start| vec![Match::at(start..start + needle.len())])
        .unwrap_or_default())
}

fn recommend(
    rule: &Rule,
    input: &LintInput,
    span: Range<usize>,
    explanation: &str,
    replacement: &str,
) -> Result<Recommendation, RuleError> {
    let text = input.text();
    let path = input.rel_path();
    let action = rule.recommended().action();

    let flagged = ConfigOpt::new(action, path, &text[span.clone()])
        .with_span(span.start, span.end)
        .with_explanation(explanation);

    let (target, inserted) = match action {
        Action::Add => {
            let at = insertion_point(text, span.end);
            (at..at, with_leading_newline(text, at, replacement))
        }
        Action::Delete => (span.clone(), String::new()),
        Action::Replace | Action::Noop => (span.clone(), replacement.to_string()),
    };

    let recommended = ConfigOpt::new(action, path, replacement)
        .with_span(target.start, target.end)
        .with_explanation(explanation);

    let diff = match action {
        Action::Noop => None,
        _ => Some(diff::synthesize(
            text,
            target.start,
            target.end,
            &inserted,
            path,
        )?),
    };

    Ok(Recommendation {
        rule: rule.id(),
        severity: rule.severity(),
        flagged_config: flagged,
        recommended_config: recommended,
        diff,
    })
}

/// Start of the line following `pos`, or `pos` itself at a line start.
fn insertion_point(text: &str, pos: usize) -> usize {
    if pos == 0 || text[..pos].ends_with('\n') {
        return pos;
    }
    text[pos..].find('\n').map_or(text.len(), |i| pos + i + 1)
}

fn with_leading_newline(text: &str, at: usize, replacement: &str) -> String {
    if at > 0 && !text[..at].ends_with('\n') {
        format!("\n{replacement}")
    } else {
        replacement.to_string()
    }
}
