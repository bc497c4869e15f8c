//! # Error Types
//!
//! Value and registry operations never fail. Errors only come from loading
//! configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while setting up a commit domain.
#[derive(Error, Debug)]
pub enum TickstateError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration parsed but holds an unusable value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for tickstate setup operations.
pub type TickstateResult<T> = Result<T, TickstateError>;
