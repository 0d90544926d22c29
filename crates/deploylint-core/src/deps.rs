//! Dockerfile dependency side-table.
//!
//! The side-table maps each referenced Dockerfile to the files its image
//! build depends on. It is built once per run, before any rule is
//! evaluated, and shared read-only afterwards.

use crate::utils::paths;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extracts the files an image build depends on.
pub trait DependencyExtractor {
    /// Returns the ordered dependency paths of `dockerfile`, relative to `workspace`.
    ///
    /// # Errors
    ///
    /// Returns an error if the Dockerfile cannot be read or resolved.
    fn dependencies(&self, workspace: &Path, dockerfile: &Path) -> Result<Vec<String>, ExtractionError>;
}

impl<T: DependencyExtractor + ?Sized> DependencyExtractor for &T {
    fn dependencies(&self, workspace: &Path, dockerfile: &Path) -> Result<Vec<String>, ExtractionError> {
        (**self).dependencies(workspace, dockerfile)
    }
}

/// Dependency extraction failure.
#[derive(Debug, thiserror::Error)]
#[error("failed to extract dependencies of {}: {message}", .dockerfile.display())]
pub struct ExtractionError {
    /// Dockerfile that failed.
    pub dockerfile: PathBuf,
    /// What went wrong.
    pub message: String,
}

impl ExtractionError {
    /// Creates an extraction error.
    #[must_use]
    pub fn new(dockerfile: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            dockerfile: dockerfile.into(),
            message: message.into(),
        }
    }
}

/// A Dockerfile referenced by a build artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactRef {
    /// Absolute, normalized build workspace.
    pub workspace: PathBuf,
    /// Absolute, normalized Dockerfile path.
    pub dockerfile: PathBuf,
}

impl ArtifactRef {
    /// Resolves a workspace and Dockerfile path against `base`.
    ///
    /// The Dockerfile path is relative to the workspace unless absolute.
    #[must_use]
    pub fn resolve(base: &Path, workspace: &str, dockerfile: &str) -> Self {
        let workspace = paths::normalize(&base.join(workspace));
        let dockerfile = paths::normalize(&workspace.join(dockerfile));
        Self {
            workspace,
            dockerfile,
        }
    }
}

/// Ordered mapping Dockerfile path → dependency paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyTable {
    entries: Vec<(PathBuf, Vec<String>)>,
}

impl DependencyTable {
    /// Inserts an entry; returns false and leaves the table unchanged if the path is present.
    pub fn insert(&mut self, dockerfile: PathBuf, dependencies: Vec<String>) -> bool {
        if self.contains(&dockerfile) {
            return false;
        }
        self.entries.push((dockerfile, dependencies));
        true
    }

    /// Dependencies of a Dockerfile.
    #[must_use]
    pub fn get(&self, dockerfile: &Path) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(p, _)| p == dockerfile)
            .map(|(_, deps)| deps.as_slice())
    }

    /// Whether the Dockerfile has an entry.
    #[must_use]
    pub fn contains(&self, dockerfile: &Path) -> bool {
        self.entries.iter().any(|(p, _)| p == dockerfile)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &[String])> {
        self.entries
            .iter()
            .map(|(p, deps)| (p.as_path(), deps.as_slice()))
    }

    /// Number of Dockerfiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(PathBuf, Vec<String>)> for DependencyTable {
    fn from_iter<I: IntoIterator<Item = (PathBuf, Vec<String>)>>(iter: I) -> Self {
        let mut table = Self::default();
        for (path, deps) in iter {
            table.insert(path, deps);
        }
        table
    }
}

/// Builds a [`DependencyTable`], extracting each distinct Dockerfile once.
pub struct ContextBuilder<'a> {
    extractor: &'a dyn DependencyExtractor,
    seen: HashSet<PathBuf>,
    table: DependencyTable,
}

impl<'a> ContextBuilder<'a> {
    /// Creates a builder backed by `extractor`.
    #[must_use]
    pub fn new(extractor: &'a dyn DependencyExtractor) -> Self {
        Self {
            extractor,
            seen: HashSet::new(),
            table: DependencyTable::default(),
        }
    }

    /// Extracts one artifact unless its Dockerfile was already seen.
    ///
    /// Returns whether extraction ran.
    ///
    /// # Errors
    ///
    /// Returns the extractor's error.
    pub fn add(&mut self, artifact: &ArtifactRef) -> Result<bool, ExtractionError> {
        let key = paths::normalize(&artifact.dockerfile);
        if !self.seen.insert(key.clone()) {
            debug!("Dockerfile already extracted: {}", key.display());
            return Ok(false);
        }
        let deps = self.extractor.dependencies(&artifact.workspace, &key)?;
        info!("dockerfile: {}, deps: {:?}", key.display(), deps);
        self.table.insert(key, deps);
        Ok(true)
    }

    /// Extracts every artifact in order and returns the finished table.
    ///
    /// Any extraction failure aborts the build; a partial table is never returned.
    ///
    /// # Errors
    ///
    /// Returns the first extraction error.
    pub fn build(mut self, artifacts: &[ArtifactRef]) -> Result<DependencyTable, ExtractionError> {
        for artifact in artifacts {
            self.add(artifact)?;
        }
        Ok(self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingExtractor {
        calls: RefCell<Vec<PathBuf>>,
        fail_on: Option<PathBuf>,
    }

    impl DependencyExtractor for RecordingExtractor {
        fn dependencies(&self, _workspace: &Path, dockerfile: &Path) -> Result<Vec<String>, ExtractionError> {
            self.calls.borrow_mut().push(dockerfile.to_path_buf());
            if self.fail_on.as_deref() == Some(dockerfile) {
                return Err(ExtractionError::new(dockerfile, "unreadable"));
            }
            let name = dockerfile.parent().and_then(Path::file_name).map_or_else(String::new, |n| n.to_string_lossy().into_owned());
            Ok(vec![format!("{name}/main.py"), format!("{name}/requirements.txt")])
        }
    }

    fn refs() -> Vec<ArtifactRef> {
        vec![
            ArtifactRef::resolve(Path::new("/w"), "app", "Dockerfile"),
            ArtifactRef::resolve(Path::new("/w"), "worker", "Dockerfile"),
            ArtifactRef::resolve(Path::new("/w"), "./app/", "./Dockerfile"),
        ]
    }

    #[test]
    fn resolve_normalizes_paths() {
        let r = ArtifactRef::resolve(Path::new("/w"), "./app/../app", "docker/Dockerfile");
        assert_eq!(r.workspace, PathBuf::from("/w/app"));
        assert_eq!(r.dockerfile, PathBuf::from("/w/app/docker/Dockerfile"));
    }

    #[test]
    fn shared_dockerfile_is_extracted_once() {
        let extractor = RecordingExtractor::default();
        let table = ContextBuilder::new(&extractor).build(&refs()).unwrap();

        assert_eq!(extractor.calls.borrow().len(), 2);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get(Path::new("/w/app/Dockerfile")),
            Some(["app/main.py".to_string(), "app/requirements.txt".to_string()].as_slice())
        );
    }

    #[test]
    fn first_encounter_order_is_kept() {
        let extractor = RecordingExtractor::default();
        let table = ContextBuilder::new(&extractor).build(&refs()).unwrap();
        let order: Vec<&Path> = table.iter().map(|(p, _)| p).collect();
        assert_eq!(order, [Path::new("/w/app/Dockerfile"), Path::new("/w/worker/Dockerfile")]);
    }

    #[test]
    fn rebuilding_yields_identical_table() {
        let extractor = RecordingExtractor::default();
        let first = ContextBuilder::new(&extractor).build(&refs()).unwrap();
        let second = ContextBuilder::new(&extractor).build(&refs()).unwrap();
        assert_eq!(first, second);

        let mut builder = ContextBuilder::new(&extractor);
        for r in refs().iter().chain(refs().iter()) {
            builder.add(r).unwrap();
        }
        assert_eq!(builder.table, first);
    }

    #[test]
    fn extraction_failure_aborts_the_build() {
        let extractor = RecordingExtractor {
            fail_on: Some(PathBuf::from("/w/app/Dockerfile")),
            ..RecordingExtractor::default()
        };
        let err = ContextBuilder::new(&extractor).build(&refs()).unwrap_err();
        assert_eq!(err.dockerfile, PathBuf::from("/w/app/Dockerfile"));
        assert_eq!(extractor.calls.borrow().len(), 1);
    }

    #[test]
    fn insert_keeps_first_entry() {
        let mut table = DependencyTable::default();
        assert!(table.insert(PathBuf::from("/a"), vec!["x".into()]));
        assert!(!table.insert(PathBuf::from("/a"), vec!["y".into()]));
        assert_eq!(table.get(Path::new("/a")), Some(["x".to_string()].as_slice()));
    }
}
