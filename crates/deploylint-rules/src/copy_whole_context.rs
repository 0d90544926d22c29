//! Rule flagging `COPY . .` in Dockerfiles.
//!
//! # Rationale
//!
//! Copying the whole build context makes every file in it an image input:
//! any change, even to files the image never uses, triggers a rebuild.
//!
//! # Good Patterns
//!
//! ```dockerfile
//! COPY requirements.txt app/ .
//! ```

use deploylint_core::{
    Action, ArtifactKind, Filter, RecommendedTemplate, Rule, RuleId, StringFilter,
};

/// Rule id for copy-whole-context.
pub const ID: RuleId = RuleId::new("DL101", "copy-whole-context");

/// Builds the rule.
#[must_use]
pub fn rule() -> Rule {
    Rule::new(
        ID,
        ArtifactKind::Dockerfile,
        Filter::StringEquals(StringFilter::new("Copy . .")),
    )
    .with_description("Flags copying the whole build context into the image")
    .with_explanation(
        "Found 'COPY . .', this is possibly a docker anti-pattern and has the potential to \
         dramatically slow down iterative development by having every file in the directory \
         watched for changes. If you notice images rebuilding unnecessarily when \
         non-image-critical files are modified, consider changing this to \
         `COPY $MIN_SET_OF_NECESSARY_SOURCE_FILES_FOR_IMAGE .` for each required source file \
         instead of using 'COPY . .'.",
    )
    .with_recommendation(RecommendedTemplate::new(
        Action::Replace,
        "Copy $MIN_SET_OF_NECESSARY_SOURCE_FILES_FOR_IMAGE .",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploylint_core::{engine, LintInput};

    #[test]
    fn test_flags_copy_all_case_insensitively() {
        for text in ["FROM x\nCOPY . .\n", "FROM x\ncopy . .\n"] {
            let input = LintInput::dockerfile_text("Dockerfile", text);
            let recs = engine::evaluate(&rule(), &input).unwrap();
            assert_eq!(recs.len(), 1);
            let flagged = &recs[0].flagged_config;
            assert_eq!((flagged.text_start_index, flagged.text_end_index), (7, 15));
            assert_eq!(flagged.span_len(), "Copy . .".len());
        }
    }

    #[test]
    fn test_replacement_diff() {
        let input = LintInput::dockerfile_text("app/Dockerfile", "FROM x\nCOPY . .\n");
        let recs = engine::evaluate(&rule(), &input).unwrap();
        let diff = recs[0].diff.as_deref().unwrap();
        assert!(diff.starts_with("--- app/Dockerfile.orig\n+++ app/Dockerfile\n"));
        assert!(diff.contains("\n-COPY . .\n+Copy $MIN_SET_OF_NECESSARY_SOURCE_FILES_FOR_IMAGE .\n"));
    }

    #[test]
    fn test_specific_copy_passes() {
        let input = LintInput::dockerfile_text("Dockerfile", "FROM x\nCOPY src/ ./src/\n");
        assert!(engine::evaluate(&rule(), &input).unwrap().is_empty());
    }
}
