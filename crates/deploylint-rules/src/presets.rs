//! Rule presets for common configurations.

use crate::{api_version, copy_whole_context, unpinned_base_image};
use deploylint_core::{Catalog, RuleId};
use std::fmt;
use std::str::FromStr;

/// Preset configurations for deploylint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Preset {
    /// Every rule except the informational ones.
    #[default]
    Recommended,
    /// Every built-in rule.
    All,
    /// Minimal rules for gradual adoption.
    Minimal,
}

impl Preset {
    /// Returns true if the preset enables the rule.
    ///
    /// - `recommended`: everything but `unpinned-base-image` (DL102)
    /// - `all`: everything
    /// - `minimal`: `api-version-out-of-date` (DL001) and
    ///   `copy-whole-context` (DL101)
    #[must_use]
    pub fn includes(self, id: RuleId) -> bool {
        match self {
            Self::Recommended => id != unpinned_base_image::ID,
            Self::All => true,
            Self::Minimal => id == api_version::ID || id == copy_whole_context::ID,
        }
    }

    /// Narrows `catalog` to the rules of this preset.
    #[must_use]
    pub fn apply(self, catalog: &Catalog) -> Catalog {
        catalog.filtered(|rule| self.includes(rule.id()))
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Recommended => "recommended",
            Self::All => "all",
            Self::Minimal => "minimal",
        };
        f.write_str(s)
    }
}

/// Error for an unknown preset name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown preset `{0}` (expected recommended, all or minimal)")]
pub struct UnknownPreset(pub String);

impl FromStr for Preset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "recommended" => Ok(Self::Recommended),
            "all" => Ok(Self::All),
            "minimal" => Ok(Self::Minimal),
            _ => Err(UnknownPreset(s.to_string())),
        }
    }
}
