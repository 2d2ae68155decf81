//! Crate-wide error type for configuration and CLI-facing failures.
//!
//! The analysis pipeline itself never fails: fetch problems degrade to empty
//! content and missing verifiers degrade to the null verifier. Errors here are
//! limited to loading and resolving configuration before a run starts.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in '{}': {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid YAML in '{}': {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid exclusion pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown preset '{0}' (expected strict|none)")]
    UnknownPreset(String),

    #[error("page is not configured. Pass --page or set `page` in pagesweep.toml.")]
    PageNotConfigured,
}

pub type Result<T> = std::result::Result<T, Error>;
