//! Configuration types for deploylint.

use crate::rule::RuleId;
use crate::types::Severity;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Top-level configuration for deploylint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Preset to use ("recommended", "all" or "minimal").
    #[serde(default)]
    pub preset: Option<String>,

    /// Severity threshold for a failing exit code (default: "error").
    #[serde(default)]
    pub fail_on: Option<String>,

    /// Lint run settings.
    #[serde(default)]
    pub lint: LintConfig,

    /// Per-rule configurations, keyed by rule name or code.
    #[serde(default)]
    pub rules: HashMap<String, RuleConfig>,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    fn rule_entry(&self, id: RuleId) -> Option<&RuleConfig> {
        self.rules
            .get(id.name)
            .or_else(|| self.rules.get(id.code))
    }

    /// Checks if a rule is enabled.
    #[must_use]
    pub fn is_rule_enabled(&self, id: RuleId) -> bool {
        self.rule_entry(id)
            .map_or(true, |c| c.enabled.unwrap_or(true))
    }

    /// Gets the severity override for a rule.
    #[must_use]
    pub fn rule_severity(&self, id: RuleId) -> Option<Severity> {
        self.rule_entry(id).and_then(|c| c.severity)
    }

    /// Parsed `fail_on` threshold; defaults to [`Severity::Error`].
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a severity.
    pub fn fail_threshold(&self) -> Result<Severity, ConfigError> {
        self.fail_on
            .as_deref()
            .map_or(Ok(Severity::Error), |s| {
                s.parse().map_err(|message| ConfigError::Parse { message })
            })
    }
}

/// Lint run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintConfig {
    /// Pipeline descriptor to lint (default: `skaffold.yaml`).
    #[serde(default = "default_filename")]
    pub filename: PathBuf,

    /// Current descriptor schema version; older `apiVersion`s are flagged.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            filename: default_filename(),
            schema_version: default_schema_version(),
        }
    }
}

fn default_filename() -> PathBuf {
    PathBuf::from("skaffold.yaml")
}

/// Descriptor schema version used when none is configured.
pub const DEFAULT_SCHEMA_VERSION: &str = "skaffold/v4beta11";

fn default_schema_version() -> String {
    DEFAULT_SCHEMA_VERSION.to_string()
}

/// Per-rule configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Whether this rule is enabled.
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Severity override for this rule.
    #[serde(default)]
    pub severity: Option<Severity>,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const PORT: RuleId = RuleId::new("DL002", "use-static-port");

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.lint.filename, PathBuf::from("skaffold.yaml"));
        assert_eq!(config.lint.schema_version, DEFAULT_SCHEMA_VERSION);
        assert!(config.rules.is_empty());
        assert_eq!(config.fail_threshold().unwrap(), Severity::Error);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
preset = "all"
fail_on = "warning"

[lint]
filename = "deploy/skaffold.yaml"
schema_version = "skaffold/v4beta6"

[rules.use-static-port]
enabled = true
severity = "info"

[rules.DL101]
enabled = false
"#;

        let config = Config::parse(toml).expect("Failed to parse");
        assert_eq!(config.preset.as_deref(), Some("all"));
        assert_eq!(config.lint.filename, PathBuf::from("deploy/skaffold.yaml"));
        assert_eq!(config.fail_threshold().unwrap(), Severity::Warning);
        assert!(config.is_rule_enabled(PORT));
        assert_eq!(config.rule_severity(PORT), Some(Severity::Info));
        assert!(!config.is_rule_enabled(RuleId::new("DL101", "copy-whole-context")));
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            Config::parse("rules = 3"),
            Err(ConfigError::Parse { .. })
        ));
        let config = Config {
            fail_on: Some("fatal".into()),
            ..Config::default()
        };
        assert!(config.fail_threshold().is_err());
    }
}
