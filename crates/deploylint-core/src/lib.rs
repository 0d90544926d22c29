//! # deploylint-core
//!
//! Rule engine for linting build and deploy configuration: pipeline
//! descriptors (`skaffold.yaml`) and the Dockerfiles they reference.
//!
//! This crate provides:
//!
//! - [`Rule`] records with a closed set of matching [`Filter`]s
//! - [`engine::evaluate`] to apply one rule to one artifact
//! - [`Condition`] gating, template rendering and diff synthesis
//! - [`ContextBuilder`] for the shared Dockerfile dependency side-table
//! - [`Pipeline`] for orchestrating a full run into a [`LintReport`]
//!
//! ## Example
//!
//! ```ignore
//! use deploylint_core::{Catalog, Pipeline};
//!
//! let pipeline = Pipeline::builder()
//!     .workdir(".")
//!     .catalog(catalog)
//!     .extractor(my_extractor)
//!     .build()?;
//!
//! let report = pipeline.run_with(&loader)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod config;
mod context;
mod deps;
mod gate;
mod pipeline;
mod rule;
mod types;
mod unit;

/// Diff synthesis for single-span edits.
pub mod diff;
/// Rule evaluation.
pub mod engine;
/// Template rendering.
pub mod render;
/// Utility modules for rule implementations.
pub mod utils;

pub use catalog::Catalog;
pub use config::{Config, ConfigError, LintConfig, RuleConfig, DEFAULT_SCHEMA_VERSION};
pub use context::{ArtifactFile, ArtifactKind, LintInput, YamlDocument};
pub use deps::{ArtifactRef, ContextBuilder, DependencyExtractor, DependencyTable, ExtractionError};
pub use engine::{Match, RuleError};
pub use gate::{all_pass, Condition};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineError};
pub use render::RenderError;
pub use rule::{
    CatalogError, FieldFilter, FieldMap, Filter, Populator, RecommendedTemplate, RegexFilter, Rule,
    RuleId, RuleType, StringFilter, ValuePredicate,
};
pub use types::{
    Action, ConfigOpt, LintReport, Recommendation, RecommendationDiagnostic, RuleFailure, Severity,
};
pub use unit::{
    Artifact, BuildConfig, ConfigDependency, ConfigSetLoader, ConfigUnit, DeployConfig,
    DockerArtifact, KubectlDeploy, LoadError, Metadata,
};
pub use diff::DiffError;
