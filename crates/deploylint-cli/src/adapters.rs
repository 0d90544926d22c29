//! Filesystem-backed implementations of the core loader and extractor seams.

mod config_set;
mod dockerfile;

pub use config_set::YamlConfigSetLoader;
pub use dockerfile::DockerfileExtractor;
