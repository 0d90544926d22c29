//! List rules command implementation.

use anyhow::{Context, Result};
use deploylint_core::DEFAULT_SCHEMA_VERSION;
use deploylint_rules::{catalog, Preset};

/// Runs the list-rules command.
pub fn run() -> Result<()> {
    let catalog = catalog(DEFAULT_SCHEMA_VERSION).context("Failed to build rule catalog")?;

    println!("Available rules:\n");
    println!(
        "{:<8} {:<26} {:<11} {:<8} Description",
        "Code", "Name", "Target", "Severity"
    );
    println!("{}", "-".repeat(100));

    for rule in catalog.iter() {
        let id = rule.id();
        println!(
            "{:<8} {:<26} {:<11} {:<8} {}",
            id.code,
            id.name,
            rule.target().to_string(),
            rule.severity().to_string(),
            rule.description()
        );
    }

    println!("\nPresets:");
    for preset in [Preset::Recommended, Preset::All, Preset::Minimal] {
        let codes: Vec<_> = preset.apply(&catalog).iter().map(|r| r.id().code).collect();
        let default = if preset == Preset::default() {
            " (default)"
        } else {
            ""
        };
        println!("  {:<12} - {}{}", preset.to_string(), codes.join(", "), default);
    }

    println!("\nUse --rules to filter specific rules, e.g.:");
    println!("  deploylint lint --rules copy-whole-context,use-static-port");
    println!("  deploylint lint --rules DL001,DL101");

    Ok(())
}
