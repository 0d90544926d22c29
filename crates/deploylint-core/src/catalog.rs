//! Immutable rule catalog.

use crate::context::ArtifactKind;
use crate::rule::{CatalogError, Rule};

use std::collections::HashSet;
use std::sync::Arc;

/// An ordered, read-only set of rules with unique codes and names.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    rules: Vec<Arc<Rule>>,
}

impl Catalog {
    /// Builds a catalog, keeping the given order.
    ///
    /// # Errors
    ///
    /// Returns an error if two rules share a code or a name.
    pub fn new(rules: Vec<Rule>) -> Result<Self, CatalogError> {
        let mut codes = HashSet::new();
        let mut names = HashSet::new();
        for rule in &rules {
            let id = rule.id();
            if !codes.insert(id.code.to_ascii_uppercase()) || !names.insert(id.name) {
                return Err(CatalogError::DuplicateRule(id));
            }
        }
        Ok(Self {
            rules: rules.into_iter().map(Arc::new).collect(),
        })
    }

    /// Looks up a rule by code (case-insensitive) or name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Arc<Rule>> {
        self.rules.iter().find(|r| r.id().is(key))
    }

    /// Rules targeting `kind`, in catalog order.
    pub fn rules_for(&self, kind: ArtifactKind) -> impl Iterator<Item = &Arc<Rule>> {
        self.rules.iter().filter(move |r| r.target() == kind)
    }

    /// Keeps only the rules for which `keep` returns true.
    #[must_use]
    pub fn filtered(&self, mut keep: impl FnMut(&Rule) -> bool) -> Self {
        Self {
            rules: self.rules.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// All rules in order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Rule>> {
        self.rules.iter()
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Filter, RuleId};

    fn rule(code: &'static str, name: &'static str, kind: ArtifactKind) -> Rule {
        Rule::new(RuleId::new(code, name), kind, Filter::Graph)
    }

    #[test]
    fn lookup_by_code_or_name() {
        let catalog = Catalog::new(vec![
            rule("X001", "first", ArtifactKind::Pipeline),
            rule("X101", "second", ArtifactKind::Dockerfile),
        ])
        .unwrap();
        assert_eq!(catalog.get("x101").map(|r| r.id().name), Some("second"));
        assert_eq!(catalog.get("first").map(|r| r.id().code), Some("X001"));
        assert!(catalog.get("third").is_none());
    }

    #[test]
    fn rules_for_keeps_order() {
        let catalog = Catalog::new(vec![
            rule("X001", "a", ArtifactKind::Pipeline),
            rule("X101", "b", ArtifactKind::Dockerfile),
            rule("X002", "c", ArtifactKind::Pipeline),
        ])
        .unwrap();
        let codes: Vec<_> = catalog
            .rules_for(ArtifactKind::Pipeline)
            .map(|r| r.id().code)
            .collect();
        assert_eq!(codes, ["X001", "X002"]);
    }

    #[test]
    fn duplicates_are_rejected() {
        let err = Catalog::new(vec![
            rule("X001", "a", ArtifactKind::Pipeline),
            rule("x001", "b", ArtifactKind::Pipeline),
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateRule(id) if id.name == "b"));

        assert!(Catalog::new(vec![
            rule("X001", "a", ArtifactKind::Pipeline),
            rule("X002", "a", ArtifactKind::Pipeline),
        ])
        .is_err());
    }

    #[test]
    fn filtered_catalog() {
        let catalog = Catalog::new(vec![
            rule("X001", "a", ArtifactKind::Pipeline),
            rule("X002", "b", ArtifactKind::Pipeline),
        ])
        .unwrap();
        let only_b = catalog.filtered(|r| r.id().name == "b");
        assert_eq!(only_b.len(), 1);
        assert_eq!(catalog.len(), 2);
    }
}
