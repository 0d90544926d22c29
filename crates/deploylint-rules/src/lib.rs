//! # deploylint-rules
//!
//! Built-in rules for deploylint.
//!
//! Pipeline rules run against each configuration unit of a descriptor;
//! Dockerfile rules run against every Dockerfile a unit builds.
//!
//! ## Available Rules
//!
//! | Code | Name | Target | Description |
//! |------|------|--------|-------------|
//! | DL001 | `api-version-out-of-date` | pipeline | Flags an `apiVersion` older than the current schema |
//! | DL002 | `use-static-port` | pipeline | Recommends a static `portForward` stanza |
//! | DL003 | `sync-python` | pipeline | Recommends syncing `*.py` files instead of rebuilding |
//! | DL101 | `copy-whole-context` | dockerfile | Flags `COPY . .` |
//! | DL102 | `unpinned-base-image` | dockerfile | Flags untagged or `:latest` base images |
//!
//! ## Usage
//!
//! ```ignore
//! use deploylint_core::Pipeline;
//! use deploylint_rules::{catalog, Preset};
//!
//! let catalog = Preset::Recommended.apply(&catalog("skaffold/v4beta11")?);
//! let pipeline = Pipeline::builder()
//!     .workdir(".")
//!     .catalog(catalog)
//!     .extractor(extractor)
//!     .build()?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api_version;
pub mod copy_whole_context;
mod presets;
pub mod static_port;
pub mod sync_python;
pub mod unpinned_base_image;

pub use presets::{Preset, UnknownPreset};

/// Re-export core types for convenience.
pub use deploylint_core::{Catalog, CatalogError, Rule, RuleId, Severity};

/// Builds the full built-in catalog, pipeline rules first.
///
/// `schema_version` is the current descriptor `apiVersion`.
///
/// # Errors
///
/// Returns an error if a rule fails to build or two rules share an id.
pub fn catalog(schema_version: &str) -> Result<Catalog, CatalogError> {
    Catalog::new(vec![
        api_version::rule(schema_version)?,
        static_port::rule()?,
        sync_python::rule()?,
        copy_whole_context::rule(),
        unpinned_base_image::rule()?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploylint_core::ArtifactKind;

    #[test]
    fn test_catalog_targets() {
        let catalog = catalog("skaffold/v4beta11").unwrap();
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.rules_for(ArtifactKind::Pipeline).count(), 3);
        assert_eq!(catalog.rules_for(ArtifactKind::Dockerfile).count(), 2);
    }

    #[test]
    fn test_lookup_by_code_or_name() {
        let catalog = catalog("skaffold/v4beta11").unwrap();
        assert_eq!(catalog.get("dl101").unwrap().id(), copy_whole_context::ID);
        assert_eq!(catalog.get("use-static-port").unwrap().id(), static_port::ID);
        assert!(catalog.get("DL999").is_none());
    }
}
