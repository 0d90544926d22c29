//! Lint command implementation.

use anyhow::{Context, Result};
use deploylint_core::{Catalog, Pipeline};
use deploylint_rules::Preset;
use std::path::{Path, PathBuf};

use crate::adapters::{DockerfileExtractor, YamlConfigSetLoader};
use crate::config_resolver::ConfigSource;
use crate::OutputFormat;

/// Options of the lint command.
pub struct LintArgs {
    /// Descriptor override.
    pub filename: Option<PathBuf>,
    /// Module filter.
    pub modules: Vec<String>,
    /// Output format.
    pub format: OutputFormat,
    /// Comma-separated rule filter.
    pub rules: Option<String>,
}

/// Runs the lint command.
pub fn run(path: &Path, args: LintArgs, source: &ConfigSource) -> Result<()> {
    let config = source.load()?;
    let threshold = config.fail_threshold().context("Invalid fail_on")?;

    let full = deploylint_rules::catalog(&config.lint.schema_version)
        .context("Failed to build rule catalog")?;
    let catalog = match &args.rules {
        Some(filter) => {
            let names: Vec<&str> = filter.split(',').map(str::trim).collect();
            filter_rules(&full, &names)
        }
        None => {
            let preset: Preset = config
                .preset
                .as_deref()
                .map(str::parse)
                .transpose()?
                .unwrap_or_default();
            tracing::debug!("Using preset: {}", preset);
            preset.apply(&full)
        }
    };

    let filename = args
        .filename
        .unwrap_or_else(|| config.lint.filename.clone());

    let pipeline = Pipeline::builder()
        .workdir(path)
        .catalog(catalog)
        .extractor(DockerfileExtractor::new())
        .config(config)
        .build()
        .context("Failed to build pipeline")?;

    tracing::info!(
        "Linting {} in {} with {} rules",
        filename.display(),
        pipeline.workdir().display(),
        pipeline.rule_count()
    );

    let loader =
        YamlConfigSetLoader::new(pipeline.workdir(), filename).with_modules(args.modules);
    let report = pipeline.run_with(&loader).context("Lint failed")?;

    super::output::print(&report, args.format)?;

    if report.has_recommendations_at(threshold) || report.is_partial() {
        std::process::exit(1);
    }

    Ok(())
}

fn filter_rules(catalog: &Catalog, names: &[&str]) -> Catalog {
    for name in names {
        if catalog.get(name).is_none() {
            tracing::warn!("Unknown rule: {}", name);
        }
    }
    catalog.filtered(|rule| names.iter().any(|n| rule.id().is(n)))
}
