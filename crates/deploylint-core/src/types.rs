//! Core types for recommendations and lint reports.

use crate::rule::RuleId;
use miette::{Diagnostic, SourceSpan};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Severity level for recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message, does not fail lint.
    Info,
    /// Warning that should be addressed.
    Warning,
    /// Error that must be fixed.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unknown severity `{other}`, expected: error, warning, info"
            )),
        }
    }
}

/// What a recommendation proposes to do with a span of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Replace the flagged span with the recommended text.
    Replace,
    /// Insert the recommended text at the flagged position.
    Add,
    /// Remove the flagged span.
    Delete,
    /// Flag only; no replacement is offered.
    Noop,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Replace => "Replace",
            Self::Add => "Add",
            Self::Delete => "Delete",
            Self::Noop => "Noop",
        };
        f.write_str(s)
    }
}

/// A located span of configuration text.
///
/// `text_start_index` and `text_end_index` are byte offsets into the exact
/// text snapshot the recommendation was computed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOpt {
    /// What to do with this span.
    pub action: Action,
    /// Path of the artifact the span belongs to.
    pub path: PathBuf,
    /// Text content (the flagged snippet or the proposed replacement).
    pub config_template: String,
    /// Start byte offset (inclusive).
    pub text_start_index: usize,
    /// End byte offset (exclusive).
    pub text_end_index: usize,
    /// Rendered explanation.
    pub explanation: String,
}

impl ConfigOpt {
    /// Creates a config option with an empty span.
    #[must_use]
    pub fn new(action: Action, path: impl Into<PathBuf>, config_template: impl Into<String>) -> Self {
        Self {
            action,
            path: path.into(),
            config_template: config_template.into(),
            text_start_index: 0,
            text_end_index: 0,
            explanation: String::new(),
        }
    }

    /// Sets the byte span of this option.
    #[must_use]
    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.text_start_index = start;
        self.text_end_index = end;
        self
    }

    /// Sets the explanation text.
    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    /// Length of the span in bytes.
    #[must_use]
    pub fn span_len(&self) -> usize {
        self.text_end_index.saturating_sub(self.text_start_index)
    }
}

/// A flagged location paired with the suggested change.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    /// Rule that produced this recommendation.
    pub rule: RuleId,
    /// Severity of this recommendation.
    pub severity: Severity,
    /// What was found.
    pub flagged_config: ConfigOpt,
    /// What to do instead.
    pub recommended_config: ConfigOpt,
    /// Unified diff against the original text; `None` for `Noop`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl Recommendation {
    /// Formats the recommendation for terminal output.
    #[must_use]
    pub fn format(&self) -> String {
        use std::fmt::Write;
        let mut output = format!(
            "{} {} at {}:{}..{}\n",
            self.rule.code,
            self.rule.name,
            self.flagged_config.path.display(),
            self.flagged_config.text_start_index,
            self.flagged_config.text_end_index,
        );
        let _ = writeln!(
            output,
            "  {}: {}",
            self.severity, self.recommended_config.explanation
        );
        if let Some(diff) = &self.diff {
            for line in diff.lines() {
                let _ = writeln!(output, "  | {line}");
            }
        }
        output
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {} [{}] {}",
            self.flagged_config.path.display(),
            self.flagged_config.text_start_index,
            self.severity,
            self.rule.code,
            first_line(&self.recommended_config.explanation),
        )
    }
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or_default()
}

/// Converts a Recommendation to a miette Diagnostic for rich error display.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("{message}")]
pub struct RecommendationDiagnostic {
    message: String,
    #[help]
    help: Option<String>,
    #[label("{label_message}")]
    span: SourceSpan,
    label_message: String,
}

impl From<&Recommendation> for RecommendationDiagnostic {
    fn from(r: &Recommendation) -> Self {
        let help = match r.recommended_config.action {
            Action::Noop => None,
            _ if r.recommended_config.config_template.is_empty() => None,
            action => Some(format!(
                "{action}: {}",
                r.recommended_config.config_template.trim_end()
            )),
        };
        Self {
            message: format!("[{}] {}", r.rule.code, r.recommended_config.explanation),
            help,
            span: SourceSpan::from((
                r.flagged_config.text_start_index,
                r.flagged_config.span_len(),
            )),
            label_message: r.rule.name.to_string(),
        }
    }
}

/// A rule that failed on one artifact without stopping the run.
#[derive(Debug, Clone, Serialize)]
pub struct RuleFailure {
    /// Rule that failed.
    pub rule: RuleId,
    /// Artifact the rule was evaluated against.
    pub path: PathBuf,
    /// Error message.
    pub message: String,
}

impl std::fmt::Display for RuleFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} failed on {}: {}",
            self.rule.code,
            self.rule.name,
            self.path.display(),
            self.message
        )
    }
}

/// Result of a lint run.
#[derive(Debug, Default, Serialize)]
pub struct LintReport {
    /// All recommendations, in catalog order per artifact and discovery order across artifacts.
    pub recommendations: Vec<Recommendation>,
    /// Rules that errored; their recommendations are missing from the list above.
    pub failures: Vec<RuleFailure>,
    /// Number of pipeline configuration units checked.
    pub units_checked: usize,
    /// Number of distinct Dockerfiles checked.
    pub dockerfiles_checked: usize,
    /// Text snapshots the recommendation offsets refer to.
    #[serde(skip)]
    pub sources: BTreeMap<PathBuf, Arc<str>>,
}

impl LintReport {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if any recommendation is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.recommendations
            .iter()
            .any(|r| r.severity == Severity::Error)
    }

    /// Returns true if any rule failed during the run.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Checks if any recommendation meets or exceeds the given severity threshold.
    #[must_use]
    pub fn has_recommendations_at(&self, severity: Severity) -> bool {
        self.recommendations.iter().any(|r| r.severity >= severity)
    }

    /// Counts recommendations by severity as `(errors, warnings, infos)`.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize, usize) {
        self.recommendations
            .iter()
            .fold((0, 0, 0), |(e, w, i), r| match r.severity {
                Severity::Error => (e + 1, w, i),
                Severity::Warning => (e, w + 1, i),
                Severity::Info => (e, w, i + 1),
            })
    }

    /// Returns the text snapshot a recommendation's offsets refer to.
    #[must_use]
    pub fn source_for(&self, recommendation: &Recommendation) -> Option<&Arc<str>> {
        self.sources.get(&recommendation.flagged_config.path)
    }

    /// Adds recommendations and failures from another report.
    pub fn extend(&mut self, other: Self) {
        self.recommendations.extend(other.recommendations);
        self.failures.extend(other.failures);
        self.units_checked += other.units_checked;
        self.dockerfiles_checked += other.dockerfiles_checked;
        self.sources.extend(other.sources);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULE: RuleId = RuleId::new("DL101", "copy-whole-context");

    fn make_recommendation(severity: Severity, action: Action) -> Recommendation {
        Recommendation {
            rule: RULE,
            severity,
            flagged_config: ConfigOpt::new(Action::Replace, "Dockerfile", "Copy . .").with_span(7, 16),
            recommended_config: ConfigOpt::new(action, "Dockerfile", "Copy src .")
                .with_explanation("Found 'COPY . .'\nsecond line"),
            diff: None,
        }
    }

    #[test]
    fn severity_parses_aliases() {
        assert_eq!("warn".parse::<Severity>(), Ok(Severity::Warning));
        assert_eq!("ERROR".parse::<Severity>(), Ok(Severity::Error));
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn display_uses_first_explanation_line() {
        let r = make_recommendation(Severity::Warning, Action::Replace);
        assert_eq!(
            r.to_string(),
            "Dockerfile:7: warning [DL101] Found 'COPY . .'"
        );
    }

    #[test]
    fn diagnostic_span_covers_flagged_bytes() {
        let r = make_recommendation(Severity::Warning, Action::Replace);
        let diag = RecommendationDiagnostic::from(&r);
        assert_eq!(diag.span.offset(), 7);
        assert_eq!(diag.span.len(), 9);
        assert_eq!(diag.help.as_deref(), Some("Replace: Copy src ."));
    }

    #[test]
    fn diagnostic_has_no_help_for_noop() {
        let r = make_recommendation(Severity::Info, Action::Noop);
        assert!(RecommendationDiagnostic::from(&r).help.is_none());
    }

    #[test]
    fn count_by_severity_and_threshold() {
        let mut report = LintReport::new();
        report
            .recommendations
            .push(make_recommendation(Severity::Warning, Action::Replace));
        report
            .recommendations
            .push(make_recommendation(Severity::Info, Action::Noop));

        assert_eq!(report.count_by_severity(), (0, 1, 1));
        assert!(!report.has_errors());
        assert!(report.has_recommendations_at(Severity::Warning));
        assert!(!report.has_recommendations_at(Severity::Error));
    }

    #[test]
    fn report_is_partial_when_rules_failed() {
        let mut report = LintReport::new();
        assert!(!report.is_partial());
        report.failures.push(RuleFailure {
            rule: RULE,
            path: PathBuf::from("Dockerfile"),
            message: "boom".into(),
        });
        assert!(report.is_partial());
    }
}
