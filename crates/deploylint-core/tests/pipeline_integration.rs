//! Integration test: pipeline runs end-to-end over a temporary project.
//!
//! Each test writes descriptors and Dockerfiles into a temp dir, builds a
//! small catalog by hand and checks the aggregated report.

use deploylint_core::{
    Action, ArtifactKind, Catalog, Condition, Config, ConfigUnit, DependencyExtractor,
    ExtractionError, FieldFilter, FieldMap, Filter, Pipeline, PipelineError, RecommendedTemplate, Rule,
    RuleError, RuleId, Severity, StringFilter,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const STATIC_PORT: RuleId = RuleId::new("T001", "use-static-port");
const SYNC_PYTHON: RuleId = RuleId::new("T002", "sync-python");
const COPY_ALL: RuleId = RuleId::new("T101", "copy-whole-context");
const BROKEN: RuleId = RuleId::new("T102", "broken");

/// Extractor that counts calls and reports a single Python source per Dockerfile.
#[derive(Clone, Default)]
struct CountingExtractor {
    calls: Arc<AtomicUsize>,
}

impl DependencyExtractor for CountingExtractor {
    fn dependencies(&self, workspace: &Path, dockerfile: &Path) -> Result<Vec<String>, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !dockerfile.exists() {
            return Err(ExtractionError::new(dockerfile, "no such Dockerfile"));
        }
        let name = workspace
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        Ok(vec![format!("{name}/main.py")])
    }
}

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().expect("fixture path has a parent")).expect("create fixture dir");
    std::fs::write(path, text).expect("write fixture");
}

fn units(root: &Path, rel: &str) -> Vec<ConfigUnit> {
    let text = std::fs::read_to_string(root.join(rel)).expect("read descriptor");
    ConfigUnit::from_yaml_documents(&text, rel).expect("fixture descriptor parses")
}

fn catalog() -> Catalog {
    Catalog::new(vec![
        Rule::new(
            STATIC_PORT,
            ArtifactKind::Pipeline,
            Filter::Field(FieldFilter::new("portForward").unwrap().inverted()),
        )
        .with_explanation("add a static port")
        .with_recommendation(RecommendedTemplate::new(Action::Add, "portForward: []\n")),
        Rule::new(
            SYNC_PYTHON,
            ArtifactKind::Pipeline,
            Filter::Field(FieldFilter::new("build").unwrap()),
        )
        .with_condition(Condition::new("python-dependency", |input| {
            input.dependency_paths().any(|d| d.ends_with(".py"))
        }))
        .with_populator(|input| {
            Ok(input
                .dependency_paths()
                .find(|d| d.ends_with(".py"))
                .map(|d| FieldMap::from([("src".to_string(), d.to_string())]))
                .unwrap_or_default())
        })
        .with_explanation("sync {{.FieldMap.src}}"),
        Rule::new(
            COPY_ALL,
            ArtifactKind::Dockerfile,
            Filter::StringEquals(StringFilter::new("Copy . .")),
        )
        .with_recommendation(RecommendedTemplate::new(Action::Replace, "Copy $SRC .")),
    ])
    .expect("catalog is valid")
}

fn project() -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    write(
        dir.path(),
        "skaffold.yaml",
        "apiVersion: v1\nbuild:\n  artifacts:\n  - image: web\n    context: app\n    docker: {}\n\
         ---\napiVersion: v1\nportForward: []\nbuild:\n  artifacts:\n  - image: web-debug\n    context: ./app/\n    docker:\n      dockerfile: Dockerfile\n",
    );
    write(dir.path(), "app/Dockerfile", "FROM x\nCOPY . .\n");
    dir
}

fn pipeline(root: &Path, extractor: CountingExtractor, config: Config) -> Pipeline {
    Pipeline::builder()
        .workdir(root)
        .catalog(catalog())
        .extractor(extractor)
        .config(config)
        .build()
        .expect("pipeline should build")
}

#[test]
fn shared_dockerfile_is_extracted_and_linted_once() {
    let dir = project();
    let extractor = CountingExtractor::default();
    let report = pipeline(dir.path(), extractor.clone(), Config::default())
        .run(&units(dir.path(), "skaffold.yaml"))
        .expect("run should succeed");

    assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.units_checked, 2);
    assert_eq!(report.dockerfiles_checked, 1);
    assert!(report.failures.is_empty());

    let codes: Vec<&str> = report.recommendations.iter().map(|r| r.rule.code).collect();
    // unit 1: no portForward, python dependency; its Dockerfile; unit 2: python dependency only
    assert_eq!(codes, ["T001", "T002", "T101", "T002"]);
}

#[test]
fn recommendations_carry_offsets_into_the_stored_snapshot() {
    let dir = project();
    let report = pipeline(dir.path(), CountingExtractor::default(), Config::default())
        .run(&units(dir.path(), "skaffold.yaml"))
        .expect("run should succeed");

    let copy = report
        .recommendations
        .iter()
        .find(|r| r.rule == COPY_ALL)
        .expect("copy recommendation");
    assert_eq!(copy.flagged_config.path, PathBuf::from("app/Dockerfile"));
    assert_eq!(copy.flagged_config.text_start_index, 7);
    assert_eq!(copy.flagged_config.text_end_index, 15);

    let snapshot = report.source_for(copy).expect("snapshot stored");
    let flagged = &snapshot[copy.flagged_config.text_start_index..copy.flagged_config.text_end_index];
    assert_eq!(flagged, "COPY . .");

    let diff = copy.diff.as_deref().expect("replace has a diff");
    assert!(diff.starts_with("--- app/Dockerfile.orig\n+++ app/Dockerfile\n"));
    assert!(diff.contains("-COPY . .\n+Copy $SRC .\n"));

    let sync = report
        .recommendations
        .iter()
        .find(|r| r.rule == SYNC_PYTHON)
        .expect("sync recommendation");
    assert_eq!(sync.recommended_config.explanation, "sync app/main.py");
    assert!(sync.diff.is_none());
}

#[test]
fn config_disables_and_overrides_rules() {
    let dir = project();
    let config = Config::parse(
        r#"
[rules.copy-whole-context]
enabled = false

[rules.T002]
severity = "error"
"#,
    )
    .expect("config parses");
    let report = pipeline(dir.path(), CountingExtractor::default(), config)
        .run(&units(dir.path(), "skaffold.yaml"))
        .expect("run should succeed");

    assert!(report.recommendations.iter().all(|r| r.rule != COPY_ALL));
    assert!(report
        .recommendations
        .iter()
        .filter(|r| r.rule == SYNC_PYTHON)
        .all(|r| r.severity == Severity::Error));
    assert!(report.has_errors());
}

#[test]
fn rule_errors_are_isolated() {
    let dir = project();
    let mut rules = vec![Rule::new(
        BROKEN,
        ArtifactKind::Dockerfile,
        Filter::StringEquals(StringFilter::new("COPY")),
    )
    .with_populator(|_| Err(RuleError::Populate("lookup failed".into())))];
    rules.push(
        Rule::new(
            COPY_ALL,
            ArtifactKind::Dockerfile,
            Filter::StringEquals(StringFilter::new("copy . .")),
        )
        .with_severity(Severity::Info),
    );
    let report = Pipeline::builder()
        .workdir(dir.path())
        .catalog(Catalog::new(rules).expect("catalog is valid"))
        .extractor(CountingExtractor::default())
        .build()
        .expect("pipeline should build")
        .run(&units(dir.path(), "skaffold.yaml"))
        .expect("run should succeed");

    assert!(report.is_partial());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].rule, BROKEN);
    assert_eq!(report.failures[0].path, PathBuf::from("app/Dockerfile"));
    assert_eq!(report.recommendations.len(), 1);
    assert_eq!(report.recommendations[0].rule, COPY_ALL);
}

#[test]
fn extraction_failure_aborts_before_any_rule_runs() {
    let dir = project();
    std::fs::remove_file(dir.path().join("app/Dockerfile")).expect("remove fixture");
    let result = pipeline(dir.path(), CountingExtractor::default(), Config::default())
        .run(&units(dir.path(), "skaffold.yaml"));
    assert!(matches!(result, Err(PipelineError::Extraction(_))));
}

#[test]
fn invalid_descriptor_yaml_is_fatal() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write(dir.path(), "skaffold.yaml", "apiVersion: [unclosed\n");
    let unit = ConfigUnit {
        source_file: PathBuf::from("skaffold.yaml"),
        ..ConfigUnit::default()
    };
    let result = pipeline(dir.path(), CountingExtractor::default(), Config::default()).run(&[unit]);
    assert!(matches!(result, Err(PipelineError::Parse { .. })));
}
