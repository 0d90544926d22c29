//! deploylint CLI tool.
//!
//! Usage:
//! ```bash
//! deploylint lint [OPTIONS] [PATH]
//! deploylint list-rules
//! deploylint init
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod adapters;
mod commands;
mod config_resolver;

/// Linter for skaffold pipeline descriptors and the Dockerfiles they build
#[derive(Parser)]
#[command(name = "deploylint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "DEPLOYLINT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint a pipeline descriptor and its Dockerfiles
    Lint {
        /// Working directory (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Pipeline descriptor, relative to the working directory
        #[arg(short = 'f', long)]
        filename: Option<PathBuf>,

        /// Only lint the named modules (can be specified multiple times)
        #[arg(short, long = "module")]
        modules: Vec<String>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Only run specific rules (comma-separated codes or names)
        #[arg(long)]
        rules: Option<String>,
    },

    /// List available rules
    ListRules,

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Output format for lint results.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable diagnostics with diffs.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-recommendation compact format.
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Lint {
            path,
            filename,
            modules,
            format,
            rules,
        } => {
            let source =
                config_resolver::resolve(&path, filename.as_deref(), cli.config.as_deref());
            let args = commands::lint::LintArgs {
                filename,
                modules,
                format,
                rules,
            };
            commands::lint::run(&path, args, &source)
        }
        Commands::ListRules => commands::list_rules::run(),
        Commands::Init { force } => commands::init::run(force),
    }
}
