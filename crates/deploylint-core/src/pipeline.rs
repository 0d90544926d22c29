//! Pipeline orchestrator: drives every rule over every artifact of a run.

use crate::catalog::Catalog;
use crate::config::Config;
use crate::context::{ArtifactFile, ArtifactKind, LintInput};
use crate::deps::{ContextBuilder, DependencyExtractor, DependencyTable, ExtractionError};
use crate::engine;
use crate::rule::Rule;
use crate::types::{LintReport, Recommendation, RuleFailure};
use crate::unit::{ConfigSetLoader, ConfigUnit, LoadError};

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort a lint run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An artifact could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// Artifact path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A pipeline descriptor is not valid YAML.
    #[error("Parse error in {}: {message}", .path.display())]
    Parse {
        /// Descriptor path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Building the dependency side-table failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Loading the configuration set failed.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// IO error resolving the working directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Builder for configuring a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    workdir: Option<PathBuf>,
    catalog: Option<Catalog>,
    extractor: Option<Box<dyn DependencyExtractor>>,
    config: Option<Config>,
}

impl PipelineBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the working directory relative paths resolve against.
    #[must_use]
    pub fn workdir(mut self, path: impl Into<PathBuf>) -> Self {
        self.workdir = Some(path.into());
        self
    }

    /// Sets the rule catalog.
    #[must_use]
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Sets the Dockerfile dependency extractor.
    #[must_use]
    pub fn extractor<E: DependencyExtractor + 'static>(mut self, extractor: E) -> Self {
        self.extractor = Some(Box::new(extractor));
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be resolved.
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let workdir = self.workdir.unwrap_or_else(|| PathBuf::from("."));
        let workdir = if workdir.is_absolute() {
            workdir
        } else {
            std::env::current_dir()?.join(&workdir)
        };

        Ok(Pipeline {
            workdir: crate::utils::normalize(&workdir),
            catalog: self.catalog.unwrap_or_default(),
            extractor: self.extractor.unwrap_or_else(|| Box::new(NoDependencies)),
            config: self.config.unwrap_or_default(),
        })
    }
}

/// Extractor used when none is configured: every Dockerfile has no dependencies.
struct NoDependencies;

impl DependencyExtractor for NoDependencies {
    fn dependencies(&self, _workspace: &Path, _dockerfile: &Path) -> Result<Vec<String>, ExtractionError> {
        Ok(Vec::new())
    }
}

/// Runs a rule catalog over a set of configuration units.
///
/// Use [`Pipeline::builder()`] to construct an instance.
pub struct Pipeline {
    workdir: PathBuf,
    catalog: Catalog,
    extractor: Box<dyn DependencyExtractor>,
    config: Config,
}

impl Pipeline {
    /// Creates a new builder for configuring a pipeline.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Returns the working directory.
    #[must_use]
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Returns the number of enabled rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.catalog
            .iter()
            .filter(|r| self.config.is_rule_enabled(r.id()))
            .count()
    }

    /// Loads units with `loader` and lints them.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the run aborts.
    pub fn run_with(&self, loader: &dyn ConfigSetLoader) -> Result<LintReport, PipelineError> {
        let units = loader.load()?;
        self.run(&units)
    }

    /// Lints every unit in order and returns the aggregated report.
    ///
    /// The dependency side-table is built once before any rule runs. Rule
    /// errors are recorded in [`LintReport::failures`]; unreadable or
    /// unparsable artifacts abort the run.
    ///
    /// # Errors
    ///
    /// Returns an error if dependency extraction fails or an artifact
    /// cannot be read or parsed.
    pub fn run(&self, units: &[ConfigUnit]) -> Result<LintReport, PipelineError> {
        info!("Starting lint of {} configuration unit(s)", units.len());

        let refs: Vec<_> = units
            .iter()
            .flat_map(|u| u.docker_artifacts(&self.workdir))
            .collect();
        let table = Arc::new(ContextBuilder::new(self.extractor.as_ref()).build(&refs)?);
        info!("Extracted dependencies of {} Dockerfile(s)", table.len());

        let mut report = LintReport::new();
        let mut linted_dockerfiles = HashSet::new();
        for unit in units {
            let unit_report = self.lint_unit(unit, &table, &mut linted_dockerfiles)?;
            report.extend(unit_report);
        }

        info!(
            "Lint complete: {} recommendation(s), {} rule failure(s)",
            report.recommendations.len(),
            report.failures.len()
        );
        Ok(report)
    }

    fn lint_unit(
        &self,
        unit: &ConfigUnit,
        table: &Arc<DependencyTable>,
        linted_dockerfiles: &mut HashSet<PathBuf>,
    ) -> Result<LintReport, PipelineError> {
        let mut report = LintReport::new();
        let source = self.workdir.join(&unit.source_file);
        debug!("Linting {}", source.display());

        let file = self.read_artifact(&source)?;
        let dockerfiles: Vec<PathBuf> = unit
            .docker_artifacts(&self.workdir)
            .into_iter()
            .map(|r| r.dockerfile)
            .collect();
        let input = LintInput::pipeline(
            file,
            Arc::new(unit.clone()),
            Arc::clone(table),
            dockerfiles.clone(),
        )
        .map_err(|e| PipelineError::Parse {
            path: source.clone(),
            message: e.to_string(),
        })?;

        self.apply_rules(ArtifactKind::Pipeline, &input, &mut report);
        report.units_checked += 1;

        for dockerfile in dockerfiles {
            if !linted_dockerfiles.insert(dockerfile.clone()) {
                continue;
            }
            debug!("Linting {}", dockerfile.display());
            let file = self.read_artifact(&dockerfile)?;
            let input = LintInput::dockerfile(file, Arc::clone(table));
            self.apply_rules(ArtifactKind::Dockerfile, &input, &mut report);
            report.dockerfiles_checked += 1;
        }

        Ok(report)
    }

    fn read_artifact(&self, path: &Path) -> Result<ArtifactFile, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|e| PipelineError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(ArtifactFile::new(path, &self.workdir, text))
    }

    fn apply_rules(&self, kind: ArtifactKind, input: &LintInput, report: &mut LintReport) {
        let mut matched = false;
        for rule in self.catalog.rules_for(kind) {
            if !self.config.is_rule_enabled(rule.id()) {
                debug!("Skipping disabled rule: {}", rule.id().name);
                continue;
            }

            match engine::evaluate(rule, input) {
                Ok(recs) => {
                    matched |= !recs.is_empty();
                    report.recommendations.extend(self.apply_severity_override(rule, recs));
                }
                Err(e) => {
                    warn!(
                        "Rule {} failed on {}: {}",
                        rule.id().code,
                        input.rel_path().display(),
                        e
                    );
                    report.failures.push(RuleFailure {
                        rule: rule.id(),
                        path: input.rel_path().to_path_buf(),
                        message: e.to_string(),
                    });
                }
            }
        }
        if matched {
            report
                .sources
                .insert(input.rel_path().to_path_buf(), input.snapshot());
        }
    }

    /// Applies severity overrides from configuration.
    fn apply_severity_override(&self, rule: &Rule, mut recs: Vec<Recommendation>) -> Vec<Recommendation> {
        if let Some(severity) = self.config.rule_severity(rule.id()) {
            for r in &mut recs {
                r.severity = severity;
            }
        }
        recs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_resolves_workdir() {
        let pipeline = Pipeline::builder()
            .workdir(".")
            .build()
            .expect("Failed to build pipeline");

        assert!(pipeline.workdir().is_absolute());
        assert_eq!(pipeline.rule_count(), 0);
    }

    #[test]
    fn test_empty_run() {
        let pipeline = Pipeline::builder().workdir("/").build().unwrap();
        let report = pipeline.run(&[]).unwrap();
        assert!(report.recommendations.is_empty());
        assert_eq!(report.units_checked, 0);
    }

    #[test]
    fn test_missing_descriptor_is_fatal() {
        let pipeline = Pipeline::builder()
            .workdir("/nonexistent-deploylint-dir")
            .build()
            .unwrap();
        let unit = ConfigUnit {
            source_file: PathBuf::from("skaffold.yaml"),
            ..ConfigUnit::default()
        };
        assert!(matches!(
            pipeline.run(&[unit]),
            Err(PipelineError::Read { .. })
        ));
    }
}
