//! Loads configuration units from descriptor files on disk.

use deploylint_core::utils;
use deploylint_core::{ConfigSetLoader, ConfigUnit, LoadError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name looked up when a `requires` path names a directory.
const DEFAULT_DESCRIPTOR: &str = "skaffold.yaml";

/// Reads a descriptor and every descriptor it `requires`.
///
/// Each YAML document is one unit. Required descriptors are loaded before
/// the unit that requires them, relative to the requiring file. A file is
/// read at most once per run.
#[derive(Debug, Clone)]
pub struct YamlConfigSetLoader {
    workdir: PathBuf,
    filename: PathBuf,
    modules: Vec<String>,
}

impl YamlConfigSetLoader {
    /// Creates a loader for `filename`, relative to `workdir`.
    pub fn new(workdir: impl Into<PathBuf>, filename: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            filename: filename.into(),
            modules: Vec::new(),
        }
    }

    /// Keeps only the units whose `metadata.name` is listed.
    #[must_use]
    pub fn with_modules(mut self, modules: Vec<String>) -> Self {
        self.modules = modules;
        self
    }

    fn visit(
        &self,
        file: &Path,
        configs: &[String],
        seen: &mut HashSet<PathBuf>,
        units: &mut Vec<ConfigUnit>,
    ) -> Result<(), LoadError> {
        let file = utils::normalize(file);
        if !seen.insert(file.clone()) {
            debug!("Descriptor already loaded: {}", file.display());
            return Ok(());
        }

        let path = self.workdir.join(&file);
        let text = std::fs::read_to_string(&path).map_err(|e| LoadError::Read {
            path: path.clone(),
            source: e,
        })?;
        let parsed =
            ConfigUnit::from_yaml_documents(&text, &file).map_err(|e| LoadError::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?;
        debug!("Loaded {} unit(s) from {}", parsed.len(), path.display());

        let base = file.parent().map(Path::to_path_buf).unwrap_or_default();
        for unit in parsed {
            if !configs.is_empty() && !unit.name().is_some_and(|n| configs.iter().any(|c| c == n)) {
                continue;
            }
            for dependency in &unit.requires {
                let Some(required) = dependency.path.as_deref() else {
                    continue;
                };
                if utils::is_url(required) {
                    info!("Skipping remote required config: {}", required);
                    continue;
                }
                let mut child = base.join(required);
                if self.workdir.join(&child).is_dir() {
                    child.push(DEFAULT_DESCRIPTOR);
                }
                self.visit(&child, &dependency.configs, seen, units)?;
            }
            units.push(unit);
        }
        Ok(())
    }
}

impl ConfigSetLoader for YamlConfigSetLoader {
    fn load(&self) -> Result<Vec<ConfigUnit>, LoadError> {
        let mut seen = HashSet::new();
        let mut units = Vec::new();
        self.visit(&self.filename, &[], &mut seen, &mut units)?;

        if self.modules.is_empty() {
            return Ok(units);
        }
        if let Some(missing) = self
            .modules
            .iter()
            .find(|m| !units.iter().any(|u| u.name() == Some(m.as_str())))
        {
            return Err(LoadError::UnknownModule(missing.clone()));
        }
        units.retain(|u| u.name().is_some_and(|n| self.modules.iter().any(|m| m == n)));
        Ok(units)
    }
}
