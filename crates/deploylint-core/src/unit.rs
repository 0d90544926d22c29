//! Pipeline configuration units and the loader seam.
//!
//! A [`ConfigUnit`] is one YAML document of a pipeline descriptor, reduced
//! to the fields the linter needs. Unknown fields are ignored.

use crate::deps::ArtifactRef;
use crate::utils::yaml;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Supplies the ordered configuration units of a run.
pub trait ConfigSetLoader {
    /// Loads every unit in discovery order.
    ///
    /// # Errors
    ///
    /// Returns an error if a descriptor cannot be read or parsed.
    fn load(&self) -> Result<Vec<ConfigUnit>, LoadError>;
}

/// Configuration set loading failure.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A descriptor could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// Descriptor path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A descriptor is not valid YAML for a pipeline configuration.
    #[error("failed to parse {}: {message}", .path.display())]
    Parse {
        /// Descriptor path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A requested module name matched no unit.
    #[error("no configuration named `{0}`")]
    UnknownModule(String),
}

/// One pipeline configuration document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigUnit {
    /// Descriptor file this unit was read from.
    #[serde(skip)]
    pub source_file: PathBuf,
    /// Index of this unit's document within the source file, if known.
    #[serde(skip)]
    pub document: Option<usize>,
    /// Descriptor schema version.
    pub api_version: String,
    /// Unit metadata.
    pub metadata: Metadata,
    /// Other descriptors this unit depends on.
    pub requires: Vec<ConfigDependency>,
    /// Build section.
    pub build: BuildConfig,
    /// Deploy section.
    pub deploy: DeployConfig,
}

/// Unit metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Metadata {
    /// Module name, used for `--module` filtering.
    pub name: Option<String>,
}

/// A `requires` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigDependency {
    /// Path to the required descriptor, relative to the requiring file.
    pub path: Option<String>,
    /// Module names to import from it; empty imports every unit.
    pub configs: Vec<String>,
}

/// `build` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Images to build.
    pub artifacts: Vec<Artifact>,
}

/// One image artifact.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Artifact {
    /// Image name.
    pub image: String,
    /// Build context directory, relative to the descriptor.
    #[serde(rename = "context")]
    pub workspace: Option<String>,
    /// Docker builder settings.
    pub docker: Option<DockerArtifact>,
    /// Ko builder settings, kept opaque.
    pub ko: Option<serde_yaml::Value>,
    /// Jib builder settings, kept opaque.
    pub jib: Option<serde_yaml::Value>,
    /// Cloud Native Buildpacks settings, kept opaque.
    pub buildpacks: Option<serde_yaml::Value>,
    /// Custom build script settings, kept opaque.
    pub custom: Option<serde_yaml::Value>,
    /// Bazel builder settings, kept opaque.
    pub bazel: Option<serde_yaml::Value>,
    /// File sync settings, kept opaque.
    pub sync: Option<serde_yaml::Value>,
}

impl Artifact {
    /// Docker settings of this artifact.
    ///
    /// An artifact that names no builder is built with Docker using the
    /// default `Dockerfile`.
    #[must_use]
    pub fn docker_settings(&self) -> Option<DockerArtifact> {
        if let Some(docker) = &self.docker {
            return Some(docker.clone());
        }
        let other_builder = self.ko.is_some()
            || self.jib.is_some()
            || self.buildpacks.is_some()
            || self.custom.is_some()
            || self.bazel.is_some();
        (!other_builder).then(DockerArtifact::default)
    }
}

/// Docker builder settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DockerArtifact {
    /// Dockerfile path, relative to the workspace.
    pub dockerfile: String,
}

impl Default for DockerArtifact {
    fn default() -> Self {
        Self {
            dockerfile: "Dockerfile".to_string(),
        }
    }
}

/// `deploy` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Raw manifest deployer.
    pub kubectl: Option<KubectlDeploy>,
}

/// kubectl deployer settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KubectlDeploy {
    /// Manifest paths or glob patterns, relative to the descriptor.
    pub manifests: Vec<String>,
}

impl ConfigUnit {
    /// Parses a single YAML document into a unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not match the unit schema.
    pub fn from_yaml(text: &str, source_file: impl Into<PathBuf>) -> Result<Self, serde_yaml::Error> {
        let mut unit: Self = serde_yaml::from_str(text)?;
        unit.source_file = source_file.into();
        Ok(unit)
    }

    /// Parses every document of a descriptor, one unit per document.
    ///
    /// # Errors
    ///
    /// Returns the first document that does not match the unit schema.
    pub fn from_yaml_documents(
        text: &str,
        source_file: impl Into<PathBuf>,
    ) -> Result<Vec<Self>, serde_yaml::Error> {
        let source_file = source_file.into();
        yaml::document_ranges(text)
            .into_iter()
            .enumerate()
            .map(|(index, range)| {
                let mut unit = Self::from_yaml(&text[range], source_file.clone())?;
                unit.document = Some(index);
                Ok(unit)
            })
            .collect()
    }

    /// Module name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref()
    }

    /// Directory relative paths in this unit resolve against.
    ///
    /// The descriptor's parent directory, or `workdir` when the unit has no
    /// source file.
    #[must_use]
    pub fn base_dir(&self, workdir: &Path) -> PathBuf {
        match self.source_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => workdir.join(parent),
            _ => workdir.to_path_buf(),
        }
    }

    /// Dockerfiles referenced by this unit's Docker artifacts, in order.
    #[must_use]
    pub fn docker_artifacts(&self, workdir: &Path) -> Vec<ArtifactRef> {
        let base = self.base_dir(workdir);
        self.build
            .artifacts
            .iter()
            .filter_map(|a| {
                let docker = a.docker_settings()?;
                let workspace = a.workspace.as_deref().unwrap_or(".");
                Some(ArtifactRef::resolve(&base, workspace, &docker.dockerfile))
            })
            .collect()
    }

    /// Manifest patterns of the kubectl deployer.
    #[must_use]
    pub fn manifests(&self) -> &[String] {
        self.deploy
            .kubectl
            .as_ref()
            .map(|k| k.manifests.as_slice())
            .unwrap_or_default()
    }
}
