//! Init command implementation.

use anyhow::{bail, Result};
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# deploylint configuration

# Rule preset: "recommended", "all" or "minimal"
preset = "recommended"

# Exit non-zero when a recommendation reaches this severity
fail_on = "error"

[lint]
# Pipeline descriptor, relative to the working directory
filename = "skaffold.yaml"

# Current descriptor schema; older apiVersions are flagged
schema_version = "skaffold/v4beta11"

# Rule configurations
# Each rule can be enabled/disabled and have its severity overridden,
# keyed by rule name or code

[rules.use-static-port]
enabled = true
# severity = "info"

# [rules.unpinned-base-image]
# enabled = true
# severity = "warning"
"#;

/// Runs the init command.
pub fn run(force: bool) -> Result<()> {
    let config_path = Path::new("deploylint.toml");

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(config_path, DEFAULT_CONFIG)?;

    println!("Created deploylint.toml");
    println!("\nNext steps:");
    println!("  1. Edit deploylint.toml to configure rules");
    println!("  2. Run: deploylint lint");

    Ok(())
}
