//! Rule flagging base images without a pinned tag.
//!
//! # Detected Patterns
//!
//! ```dockerfile
//! FROM python          # no tag
//! FROM python:latest   # floating tag
//! ```
//!
//! Tagged (`python:3.12`), digest-pinned and `$ARG` base images pass.
//! Stage references such as `FROM builder` are flagged too; the rule is
//! informational.

use deploylint_core::{ArtifactKind, CatalogError, Filter, RegexFilter, Rule, RuleId, Severity};

/// Rule id for unpinned-base-image.
pub const ID: RuleId = RuleId::new("DL102", "unpinned-base-image");

const PATTERN: &str =
    r"(?mi)^[ \t]*FROM[ \t]+(?:--\S+[ \t]+)*[^\s:@$]+(?::latest)?(?:[ \t]+AS[ \t]+\S+)?[ \t]*$";

/// Builds the rule.
///
/// # Errors
///
/// Returns an error if the pattern does not compile.
pub fn rule() -> Result<Rule, CatalogError> {
    Ok(Rule::new(
        ID,
        ArtifactKind::Dockerfile,
        Filter::Regex(RegexFilter::new(PATTERN)?),
    )
    .with_severity(Severity::Info)
    .with_description("Flags base images without a pinned tag")
    .with_explanation(
        "Found a base image without a version tag (or with `:latest`). Pin the base image \
         to a specific tag or digest so builds are reproducible.",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploylint_core::{engine, Action, LintInput};

    fn flagged(text: &str) -> Vec<String> {
        let input = LintInput::dockerfile_text("Dockerfile", text);
        engine::evaluate(&rule().unwrap(), &input)
            .unwrap()
            .into_iter()
            .map(|r| r.flagged_config.config_template)
            .collect()
    }

    #[test]
    fn test_flags_untagged_and_latest() {
        let text = "FROM python AS build\nRUN x\nfrom node:latest\nFROM --platform=linux/amd64 alpine\n";
        assert_eq!(
            flagged(text),
            [
                "FROM python AS build",
                "from node:latest",
                "FROM --platform=linux/amd64 alpine"
            ]
        );
    }

    #[test]
    fn test_pinned_images_pass() {
        let text = "FROM python:3.12-slim\nFROM alpine@sha256:abcd\nFROM $BASE\nFROM registry:5000/app:1.0\n";
        assert!(flagged(text).is_empty());
    }

    #[test]
    fn test_flag_only() {
        let input = LintInput::dockerfile_text("Dockerfile", "FROM ubuntu\n");
        let recs = engine::evaluate(&rule().unwrap(), &input).unwrap();
        assert_eq!(recs[0].recommended_config.action, Action::Noop);
        assert!(recs[0].recommended_config.config_template.is_empty());
        assert!(recs[0].diff.is_none());
        assert_eq!(recs[0].severity, Severity::Info);
    }
}
