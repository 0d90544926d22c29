//! Utility functions shared by the engine and rule implementations.

pub mod paths;
pub mod yaml;

#[doc(inline)]
pub use paths::{is_url, normalize, to_slash};
