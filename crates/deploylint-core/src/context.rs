//! The artifact under test and the context handed to every rule.

use crate::deps::DependencyTable;
use crate::unit::ConfigUnit;
use crate::utils::yaml;

use serde::Serialize;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Kind of artifact a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Pipeline descriptor (structured YAML).
    Pipeline,
    /// Dockerfile (raw text).
    Dockerfile,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pipeline => write!(f, "pipeline"),
            Self::Dockerfile => write!(f, "dockerfile"),
        }
    }
}

/// An artifact's text and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    /// Absolute path.
    pub abs_path: PathBuf,
    /// Path relative to the working directory, used in diff headers.
    pub rel_path: PathBuf,
    /// Text snapshot all offsets refer to.
    pub text: Arc<str>,
}

impl ArtifactFile {
    /// Creates an artifact file, deriving the relative path from `workdir`.
    #[must_use]
    pub fn new(abs_path: impl Into<PathBuf>, workdir: &Path, text: impl Into<Arc<str>>) -> Self {
        let abs_path = abs_path.into();
        let rel_path = abs_path
            .strip_prefix(workdir)
            .map_or_else(|_| abs_path.clone(), Path::to_path_buf);
        Self {
            abs_path,
            rel_path,
            text: text.into(),
        }
    }
}

/// One YAML document of a pipeline descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct YamlDocument {
    /// Parsed value.
    pub value: serde_yaml::Value,
    /// Byte range of the document in the artifact text.
    pub range: Range<usize>,
}

/// Read-only input presented to every rule.
#[derive(Debug, Clone)]
pub struct LintInput {
    file: ArtifactFile,
    kind: ArtifactKind,
    documents: Vec<YamlDocument>,
    dependencies: Arc<DependencyTable>,
    scope: Vec<PathBuf>,
    unit: Option<Arc<ConfigUnit>>,
}

impl LintInput {
    /// Builds the input for a pipeline descriptor.
    ///
    /// `scope` lists the Dockerfiles this unit references; only their
    /// entries of the shared side-table are visible through
    /// [`LintInput::dependencies`]. When the unit knows its document index,
    /// only that document of the file is matched against.
    ///
    /// # Errors
    ///
    /// Returns an error if a YAML document fails to parse.
    pub fn pipeline(
        file: ArtifactFile,
        unit: Arc<ConfigUnit>,
        dependencies: Arc<DependencyTable>,
        scope: Vec<PathBuf>,
    ) -> Result<Self, serde_yaml::Error> {
        let mut documents = yaml::parse_documents(&file.text)?;
        if let Some(index) = unit.document {
            documents = documents.into_iter().nth(index).into_iter().collect();
        }
        Ok(Self {
            file,
            kind: ArtifactKind::Pipeline,
            documents,
            dependencies,
            scope,
            unit: Some(unit),
        })
    }

    /// Builds the input for a Dockerfile.
    #[must_use]
    pub fn dockerfile(file: ArtifactFile, dependencies: Arc<DependencyTable>) -> Self {
        let scope = vec![file.abs_path.clone()];
        Self {
            file,
            kind: ArtifactKind::Dockerfile,
            documents: Vec::new(),
            dependencies,
            scope,
            unit: None,
        }
    }

    /// Builds a pipeline input from text alone, with an empty side-table.
    ///
    /// # Errors
    ///
    /// Returns an error if a YAML document fails to parse.
    pub fn pipeline_text(path: impl Into<PathBuf>, text: &str) -> Result<Self, serde_yaml::Error> {
        let path = path.into();
        let file = ArtifactFile {
            abs_path: path.clone(),
            rel_path: path,
            text: text.into(),
        };
        Self::pipeline(
            file,
            Arc::new(ConfigUnit::default()),
            Arc::new(DependencyTable::default()),
            Vec::new(),
        )
    }

    /// Builds a Dockerfile input from text alone, with an empty side-table.
    #[must_use]
    pub fn dockerfile_text(path: impl Into<PathBuf>, text: &str) -> Self {
        let path = path.into();
        let file = ArtifactFile {
            abs_path: path.clone(),
            rel_path: path,
            text: text.into(),
        };
        Self::dockerfile(file, Arc::new(DependencyTable::default()))
    }

    /// Artifact text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.file.text
    }

    /// Shared handle to the artifact text.
    #[must_use]
    pub fn snapshot(&self) -> Arc<str> {
        Arc::clone(&self.file.text)
    }

    /// Absolute artifact path.
    #[must_use]
    pub fn abs_path(&self) -> &Path {
        &self.file.abs_path
    }

    /// Relative artifact path.
    #[must_use]
    pub fn rel_path(&self) -> &Path {
        &self.file.rel_path
    }

    /// Artifact kind.
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Parsed YAML documents; empty for Dockerfiles.
    #[must_use]
    pub fn documents(&self) -> &[YamlDocument] {
        &self.documents
    }

    /// Structured configuration unit, for pipeline inputs.
    #[must_use]
    pub fn unit(&self) -> Option<&ConfigUnit> {
        self.unit.as_deref()
    }

    /// Side-table entries in scope for this input, in table order.
    pub fn dependencies(&self) -> impl Iterator<Item = (&Path, &[String])> {
        self.dependencies
            .iter()
            .filter(|(path, _)| self.scope.iter().any(|s| s.as_path() == *path))
    }

    /// Every dependency path in scope, flattened.
    pub fn dependency_paths(&self) -> impl Iterator<Item = &str> {
        self.dependencies()
            .flat_map(|(_, deps)| deps.iter().map(String::as_str))
    }

    /// The full shared side-table.
    #[must_use]
    pub fn dependency_table(&self) -> &DependencyTable {
        &self.dependencies
    }
}
