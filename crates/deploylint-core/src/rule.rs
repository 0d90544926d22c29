//! Declarative rule records and their matching filters.
//!
//! A [`Rule`] pairs a [`Filter`] (what to look for) with gating
//! [`Condition`]s, an explanation template and the replacement it proposes.
//! The filter variant selects the matching strategy; evaluation lives in
//! [`crate::engine`].

use crate::context::{ArtifactKind, LintInput};
use crate::engine::RuleError;
use crate::gate::Condition;
use crate::types::{Action, Severity};

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Field values produced by a [`Populator`] for explanation templates.
pub type FieldMap = BTreeMap<String, String>;

/// Computes template fields from the artifact under test.
pub type Populator = Box<dyn Fn(&LintInput) -> Result<FieldMap, RuleError> + Send + Sync>;

/// Stable identity of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RuleId {
    /// Rule code (e.g., "DL001").
    pub code: &'static str,
    /// Kebab-case rule name (e.g., "api-version-out-of-date").
    pub name: &'static str,
}

impl RuleId {
    /// Creates a rule id.
    #[must_use]
    pub const fn new(code: &'static str, name: &'static str) -> Self {
        Self { code, name }
    }

    /// Returns true if `key` is this rule's code or name.
    #[must_use]
    pub fn is(&self, key: &str) -> bool {
        self.code.eq_ignore_ascii_case(key) || self.name == key
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.name)
    }
}

/// Matching strategy tag, derived from the [`Filter`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleType {
    /// Field lookup in structured YAML documents.
    Field,
    /// Regular expression over the raw text.
    Regex,
    /// Case-insensitive substring search over the raw text.
    StringEquals,
    /// Dependency-graph analysis. Not implemented; always yields nothing.
    Graph,
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Field => "field",
            Self::Regex => "regex",
            Self::StringEquals => "string-equals",
            Self::Graph => "graph",
        };
        f.write_str(s)
    }
}

/// Strategy-specific predicate of a rule.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Field presence (or absence) in YAML documents.
    Field(FieldFilter),
    /// Regex over the raw text; every match is a candidate.
    Regex(RegexFilter),
    /// First case-insensitive occurrence of a phrase.
    StringEquals(StringFilter),
    /// Reserved for dependency-graph rules.
    Graph,
}

impl Filter {
    /// Returns the matching strategy of this filter.
    #[must_use]
    pub fn rule_type(&self) -> RuleType {
        match self {
            Self::Field(_) => RuleType::Field,
            Self::Regex(_) => RuleType::Regex,
            Self::StringEquals(_) => RuleType::StringEquals,
            Self::Graph => RuleType::Graph,
        }
    }
}

/// Predicate over a scalar field value.
#[derive(Debug, Clone)]
pub enum ValuePredicate {
    /// Value equals the given text.
    Equals(String),
    /// Value differs from the given text.
    NotEquals(String),
    /// Value matches the pattern.
    Matches(Regex),
}

impl ValuePredicate {
    /// Tests a scalar value.
    #[must_use]
    pub fn test(&self, value: &str) -> bool {
        match self {
            Self::Equals(expected) => value == expected,
            Self::NotEquals(expected) => value != expected,
            Self::Matches(re) => re.is_match(value),
        }
    }
}

/// Looks up a `.`-separated field path in each YAML document.
///
/// `*` matches every entry of a mapping or sequence. With `invert_match`
/// the filter matches documents where the field is absent.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    path: Vec<String>,
    value: Option<ValuePredicate>,
    invert_match: bool,
}

impl FieldFilter {
    /// Creates a filter for the given field path (e.g. `build.artifacts.*.sync`).
    ///
    /// # Errors
    ///
    /// Returns an error if the path has no segments.
    pub fn new(path: &str) -> Result<Self, CatalogError> {
        let segments: Vec<String> = path
            .split('.')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        if segments.is_empty() {
            return Err(CatalogError::EmptyFieldPath);
        }
        Ok(Self {
            path: segments,
            value: None,
            invert_match: false,
        })
    }

    /// Requires the field's scalar value to satisfy `predicate`.
    #[must_use]
    pub fn with_value(mut self, predicate: ValuePredicate) -> Self {
        self.value = Some(predicate);
        self
    }

    /// Matches when the field is absent instead of present.
    #[must_use]
    pub fn inverted(mut self) -> Self {
        self.invert_match = true;
        self
    }

    /// Path segments.
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Optional value predicate.
    #[must_use]
    pub fn value(&self) -> Option<&ValuePredicate> {
        self.value.as_ref()
    }

    /// Whether absence is a match.
    #[must_use]
    pub fn invert_match(&self) -> bool {
        self.invert_match
    }
}

/// Compiled regular expression filter.
#[derive(Debug, Clone)]
pub struct RegexFilter {
    pattern: Regex,
}

impl RegexFilter {
    /// Compiles a regex filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile.
    pub fn new(pattern: &str) -> Result<Self, CatalogError> {
        let pattern = Regex::new(pattern).map_err(|e| CatalogError::InvalidRegex {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { pattern })
    }

    /// The compiled pattern.
    #[must_use]
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

/// Case-insensitive phrase filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringFilter {
    needle: String,
}

impl StringFilter {
    /// Creates a phrase filter.
    #[must_use]
    pub fn new(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
        }
    }

    /// The phrase to look for.
    #[must_use]
    pub fn needle(&self) -> &str {
        &self.needle
    }
}

/// The change a rule proposes for each match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendedTemplate {
    action: Action,
    template: String,
}

impl RecommendedTemplate {
    /// Creates a recommended change. `Noop` always carries an empty template.
    #[must_use]
    pub fn new(action: Action, template: impl Into<String>) -> Self {
        let template = match action {
            Action::Noop => String::new(),
            _ => template.into(),
        };
        Self { action, template }
    }

    /// Flag-only recommendation.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Action::Noop, "")
    }

    /// Proposed action.
    #[must_use]
    pub fn action(&self) -> Action {
        self.action
    }

    /// Replacement text template.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }
}

/// An immutable, declarative lint rule.
pub struct Rule {
    id: RuleId,
    target: ArtifactKind,
    filter: Filter,
    severity: Severity,
    description: &'static str,
    explanation_template: String,
    populator: Option<Populator>,
    conditions: Vec<Condition>,
    recommended: RecommendedTemplate,
}

impl Rule {
    /// Creates a rule with a flag-only recommendation and no conditions.
    #[must_use]
    pub fn new(id: RuleId, target: ArtifactKind, filter: Filter) -> Self {
        Self {
            id,
            target,
            filter,
            severity: Severity::Warning,
            description: "",
            explanation_template: String::new(),
            populator: None,
            conditions: Vec::new(),
            recommended: RecommendedTemplate::noop(),
        }
    }

    /// Sets the default severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the one-line description shown by `list-rules`.
    #[must_use]
    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the explanation template.
    #[must_use]
    pub fn with_explanation(mut self, template: impl Into<String>) -> Self {
        self.explanation_template = template.into();
        self
    }

    /// Sets the populator that fills template fields.
    #[must_use]
    pub fn with_populator<F>(mut self, populator: F) -> Self
    where
        F: Fn(&LintInput) -> Result<FieldMap, RuleError> + Send + Sync + 'static,
    {
        self.populator = Some(Box::new(populator));
        self
    }

    /// Appends a precondition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Sets the proposed change.
    #[must_use]
    pub fn with_recommendation(mut self, recommended: RecommendedTemplate) -> Self {
        self.recommended = recommended;
        self
    }

    /// Rule identity.
    #[must_use]
    pub fn id(&self) -> RuleId {
        self.id
    }

    /// Artifact kind this rule applies to.
    #[must_use]
    pub fn target(&self) -> ArtifactKind {
        self.target
    }

    /// Matching filter.
    #[must_use]
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Matching strategy.
    #[must_use]
    pub fn rule_type(&self) -> RuleType {
        self.filter.rule_type()
    }

    /// Default severity.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// One-line description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Explanation template.
    #[must_use]
    pub fn explanation_template(&self) -> &str {
        &self.explanation_template
    }

    /// Optional populator.
    #[must_use]
    pub fn populator(&self) -> Option<&Populator> {
        self.populator.as_ref()
    }

    /// Ordered preconditions.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Proposed change.
    #[must_use]
    pub fn recommended(&self) -> &RecommendedTemplate {
        &self.recommended
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("filter", &self.filter)
            .field("severity", &self.severity)
            .field("populator", &self.populator.is_some())
            .field("conditions", &self.conditions)
            .field("recommended", &self.recommended)
            .finish_non_exhaustive()
    }
}

/// Errors building rules or a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A regex filter failed to compile.
    #[error("invalid regex `{pattern}`: {reason}")]
    InvalidRegex {
        /// The pattern as written.
        pattern: String,
        /// Compiler message.
        reason: String,
    },

    /// A field filter had no path segments.
    #[error("field path must not be empty")]
    EmptyFieldPath,

    /// Two rules share a code or name.
    #[error("duplicate rule id {0}")]
    DuplicateRule(RuleId),
}
