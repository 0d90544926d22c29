//! Locates the `deploylint.toml` that governs a lint run.
//!
//! Lookup order:
//!
//! 1. `--config` flag (explicit path)
//! 2. `deploylint.toml` or `.deploylint.toml` next to the descriptor given
//!    with `--filename`, then in each parent directory up to the workdir
//! 3. the same names in the workdir
//! 4. `$DEPLOYLINT_CONFIG_DIR/config.toml` or `~/.deploylint/config.toml`
//! 5. built-in defaults

use anyhow::{Context, Result};
use deploylint_core::{utils, Config};
use std::path::{Path, PathBuf};

/// Local config file names, checked in order within each directory.
const LOCAL_CONFIG_NAMES: &[&str] = &["deploylint.toml", ".deploylint.toml"];

/// Config file name within the global config directory.
const GLOBAL_CONFIG_NAME: &str = "config.toml";

/// Where the configuration was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given with `--config`.
    Explicit(PathBuf),
    /// Found beside the descriptor or in one of its parents inside the workdir.
    Local(PathBuf),
    /// Found in the global config directory.
    Global(PathBuf),
    /// Nothing found; built-in defaults apply.
    Default,
}

impl ConfigSource {
    /// Returns the resolved path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Local(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }

    /// Loads the configuration, or the defaults when none was found.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(&self) -> Result<Config> {
        match self {
            Self::Default => {
                tracing::debug!("No config file found, using defaults");
                Ok(Config::default())
            }
            Self::Global(path) => {
                tracing::info!("Using global config: {}", path.display());
                read(path)
            }
            Self::Explicit(path) | Self::Local(path) => read(path),
        }
    }
}

fn read(path: &Path) -> Result<Config> {
    Config::from_file(path).with_context(|| format!("Failed to load config: {}", path.display()))
}

/// Resolves the config for linting `descriptor` (relative to `workdir`).
#[must_use]
pub fn resolve(workdir: &Path, descriptor: Option<&Path>, explicit: Option<&Path>) -> ConfigSource {
    resolve_inner(workdir, descriptor, explicit, global_config_dir())
}

fn resolve_inner(
    workdir: &Path,
    descriptor: Option<&Path>,
    explicit: Option<&Path>,
    global_dir: Option<PathBuf>,
) -> ConfigSource {
    if let Some(p) = explicit {
        return ConfigSource::Explicit(p.to_path_buf());
    }

    let found = search_dirs(workdir, descriptor)
        .iter()
        .flat_map(|dir| LOCAL_CONFIG_NAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file());
    if let Some(candidate) = found {
        tracing::debug!("Found config: {}", candidate.display());
        return ConfigSource::Local(candidate);
    }

    global_dir
        .map(|dir| dir.join(GLOBAL_CONFIG_NAME))
        .filter(|candidate| candidate.is_file())
        .map_or(ConfigSource::Default, ConfigSource::Global)
}

/// Directories searched for a local config, nearest to the descriptor first.
///
/// A descriptor outside the workdir only contributes its own directory.
fn search_dirs(workdir: &Path, descriptor: Option<&Path>) -> Vec<PathBuf> {
    let workdir = utils::normalize(workdir);
    let Some(parent) = descriptor
        .map(|d| utils::normalize(&workdir.join(d)))
        .and_then(|d| d.parent().map(Path::to_path_buf))
    else {
        return vec![workdir];
    };

    if !parent.starts_with(&workdir) {
        return vec![parent, workdir];
    }
    parent
        .ancestors()
        .take_while(|dir| dir.starts_with(&workdir))
        .map(Path::to_path_buf)
        .collect()
}

/// Returns the global config directory.
///
/// `$DEPLOYLINT_CONFIG_DIR` when set, otherwise `~/.deploylint/`.
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("DEPLOYLINT_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }
    home::home_dir().map(|h| h.join(".deploylint"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn explicit_wins_without_existence_check() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("deploylint.toml"));

        let result = resolve_inner(tmp.path(), None, Some(Path::new("/nonexistent.toml")), None);
        assert_eq!(result, ConfigSource::Explicit(PathBuf::from("/nonexistent.toml")));
    }

    #[test]
    fn config_beside_the_descriptor_wins_over_workdir() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("deploylint.toml"));
        touch(&tmp.path().join("services/api/.deploylint.toml"));

        let result = resolve_inner(
            tmp.path(),
            Some(Path::new("services/api/skaffold.yaml")),
            None,
            None,
        );
        assert_eq!(
            result,
            ConfigSource::Local(tmp.path().join("services/api/.deploylint.toml"))
        );
    }

    #[test]
    fn parent_directories_are_searched_up_to_the_workdir() {
        let tmp = TempDir::new().unwrap();
        let workdir = tmp.path().join("repo");
        touch(&tmp.path().join("deploylint.toml"));
        touch(&workdir.join("services/deploylint.toml"));

        let result = resolve_inner(&workdir, Some(Path::new("services/api/skaffold.yaml")), None, None);
        assert_eq!(result, ConfigSource::Local(workdir.join("services/deploylint.toml")));

        let dirs = search_dirs(&workdir, Some(Path::new("services/api/skaffold.yaml")));
        assert_eq!(dirs.last(), Some(&utils::normalize(&workdir)));
        assert!(!dirs.contains(&utils::normalize(tmp.path())));
    }

    #[test]
    fn plain_name_preferred_over_dotted() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("deploylint.toml"));
        touch(&tmp.path().join(".deploylint.toml"));

        let result = resolve_inner(tmp.path(), Some(Path::new("skaffold.yaml")), None, None);
        assert_eq!(result, ConfigSource::Local(tmp.path().join("deploylint.toml")));
    }

    #[test]
    fn descriptor_outside_the_workdir_checks_its_dir_then_workdir() {
        let workdir = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let descriptor = elsewhere.path().join("skaffold.yaml");
        touch(&workdir.path().join("deploylint.toml"));

        let result = resolve_inner(workdir.path(), Some(&descriptor), None, None);
        assert_eq!(result, ConfigSource::Local(workdir.path().join("deploylint.toml")));

        touch(&elsewhere.path().join("deploylint.toml"));
        let result = resolve_inner(workdir.path(), Some(&descriptor), None, None);
        assert_eq!(result, ConfigSource::Local(elsewhere.path().join("deploylint.toml")));
    }

    #[test]
    fn directory_named_like_a_config_is_ignored() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("deploylint.toml")).unwrap();

        assert_eq!(resolve_inner(tmp.path(), None, None, None), ConfigSource::Default);
    }

    #[test]
    fn global_fallback_only_without_local_config() {
        let workdir = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        touch(&global.path().join("config.toml"));

        let result = resolve_inner(workdir.path(), None, None, Some(global.path().to_path_buf()));
        assert_eq!(result, ConfigSource::Global(global.path().join("config.toml")));

        touch(&workdir.path().join("deploylint.toml"));
        let result = resolve_inner(workdir.path(), None, None, Some(global.path().to_path_buf()));
        assert!(matches!(result, ConfigSource::Local(_)));
    }

    #[test]
    fn empty_global_dir_returns_default() {
        let workdir = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();

        let result = resolve_inner(workdir.path(), None, None, Some(global.path().to_path_buf()));
        assert_eq!(result, ConfigSource::Default);
        assert!(result.path().is_none());
    }

    #[test]
    fn load_defaults_without_file() {
        let config = ConfigSource::Default.load().unwrap();
        assert_eq!(config.lint.filename, PathBuf::from("skaffold.yaml"));
    }

    #[test]
    fn load_reads_resolved_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("deploylint.toml");
        fs::write(&path, "preset = \"minimal\"\n[lint]\nfilename = \"k8s.yaml\"\n").unwrap();

        let config = ConfigSource::Local(path).load().unwrap();
        assert_eq!(config.preset.as_deref(), Some("minimal"));
        assert_eq!(config.lint.filename, PathBuf::from("k8s.yaml"));
    }

    #[test]
    fn load_reports_missing_explicit_file() {
        let err = ConfigSource::Explicit(PathBuf::from("/nonexistent/deploylint.toml"))
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/deploylint.toml"));
    }
}
