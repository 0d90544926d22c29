//! Rule recommending file sync for Python sources.
//!
//! # Rationale
//!
//! Python sources copied into an image do not need an image rebuild when
//! they change; syncing them into the running container is much faster.
//!
//! # Detected Patterns
//!
//! A `build` section whose artifacts declare no `sync` stanza, when any
//! Dockerfile of the unit depends on a `*.py` file.

use deploylint_core::{
    ArtifactKind, CatalogError, Condition, FieldFilter, FieldMap, Filter, LintInput, Rule,
    RuleError, RuleId,
};

/// Rule id for sync-python.
pub const ID: RuleId = RuleId::new("DL003", "sync-python");

const NO_SYNC: RuleId = RuleId::new("DL003-no-sync", "sync-python-no-sync-stanza");

/// Builds the rule.
///
/// # Errors
///
/// Returns an error if a field filter cannot be built.
pub fn rule() -> Result<Rule, CatalogError> {
    let no_sync = Rule::new(
        NO_SYNC,
        ArtifactKind::Pipeline,
        Filter::Field(FieldFilter::new("build.artifacts.*.sync")?.inverted()),
    );

    Ok(Rule::new(
        ID,
        ArtifactKind::Pipeline,
        Filter::Field(FieldFilter::new("build")?),
    )
    .with_description("Recommends syncing *.py files instead of rebuilding the image")
    .with_condition(Condition::matches("no-sync-stanza", no_sync))
    .with_condition(Condition::new("python-dependency", |input| {
        first_python_dependency(input).is_some()
    }))
    .with_populator(populate)
    .with_explanation(
        "Found files with extension *.py in docker build container image that should be \
         synced (via container rsync) vs fully rebuilding the image when modified. It is \
         recommended to put the following stanza in the `build` section of the flagged \
         skaffold.yaml:\n    \
         sync:\n      \
         manual:\n      \
         # Syncs the local *.py files beneath the {{index .FieldMap \"src\"}} folder to the identical folder in the container\n      \
         - src: {{index .FieldMap \"src\"}}\n        \
         dest: . # verify this folder exists in the container\n",
    ))
}

fn first_python_dependency(input: &LintInput) -> Option<&str> {
    input.dependency_paths().find(|d| d.ends_with(".py"))
}

fn populate(input: &LintInput) -> Result<FieldMap, RuleError> {
    Ok(first_python_dependency(input)
        .map(|dep| FieldMap::from([("src".to_string(), sync_glob(dep))]))
        .unwrap_or_default())
}

/// `app/src/main.py` → `app/src/**/*.py`.
fn sync_glob(dep: &str) -> String {
    match dep.rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => format!("{dir}/**/*.py"),
        _ => "**/*.py".to_string(),
    }
}
