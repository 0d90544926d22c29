//! Rule flagging descriptors that are not on the current schema version.
//!
//! # Rationale
//!
//! Older `apiVersion`s keep working through automatic upgrades, but new
//! fields and fixes only land in the current schema.
//!
//! # Detected Patterns
//!
//! ```yaml
//! apiVersion: skaffold/v2beta26   # anything but the current version
//! ```

use deploylint_core::{
    Action, ArtifactKind, CatalogError, FieldFilter, Filter, RecommendedTemplate, Rule, RuleId,
    ValuePredicate,
};

/// Rule id for api-version-out-of-date.
pub const ID: RuleId = RuleId::new("DL001", "api-version-out-of-date");

/// Builds the rule against the `current` schema version.
///
/// # Errors
///
/// Returns an error if the field filter cannot be built.
pub fn rule(current: &str) -> Result<Rule, CatalogError> {
    let filter = FieldFilter::new("apiVersion")?
        .with_value(ValuePredicate::NotEquals(current.to_string()));

    Ok(Rule::new(ID, ArtifactKind::Pipeline, Filter::Field(filter))
        .with_description("Flags an apiVersion older than the current schema version")
        .with_explanation(format!(
            "Found 'apiVersion' field with value that is not the latest apiVersion. \
             Modify the apiVersion to the latest version: `apiVersion: {current}` \
             or run the 'skaffold fix' command to have it upgraded for you."
        ))
        .with_recommendation(RecommendedTemplate::new(Action::Replace, current)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploylint_core::{engine, LintInput};

    const CURRENT: &str = "skaffold/v4beta11";

    #[test]
    fn test_flags_old_version() {
        let text = "apiVersion: skaffold/v2beta26\nkind: Config\n";
        let input = LintInput::pipeline_text("skaffold.yaml", text).unwrap();
        let recs = engine::evaluate(&rule(CURRENT).unwrap(), &input).unwrap();

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].flagged_config.config_template, "skaffold/v2beta26");
        assert_eq!(recs[0].recommended_config.config_template, CURRENT);
        assert!(recs[0]
            .diff
            .as_deref()
            .unwrap()
            .contains("-apiVersion: skaffold/v2beta26\n+apiVersion: skaffold/v4beta11\n"));
    }

    #[test]
    fn test_current_version_passes() {
        let input =
            LintInput::pipeline_text("skaffold.yaml", "apiVersion: skaffold/v4beta11\n").unwrap();
        assert!(engine::evaluate(&rule(CURRENT).unwrap(), &input)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_each_document_is_checked() {
        let text = "apiVersion: skaffold/v4beta11\n---\napiVersion: skaffold/v3\n";
        let input = LintInput::pipeline_text("skaffold.yaml", text).unwrap();
        let recs = engine::evaluate(&rule(CURRENT).unwrap(), &input).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(
            recs[0].flagged_config.text_start_index,
            text.find("skaffold/v3").unwrap()
        );
    }
}
