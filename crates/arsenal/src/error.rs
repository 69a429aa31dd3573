//! # Session Error Types

use std::path::PathBuf;

use arsenal_loadout::ConfigError;
use thiserror::Error;

/// Errors raised while setting up a deathmatch session.
#[derive(Error, Debug)]
pub enum ArenaError {
    /// The settings file is not valid.
    #[error("invalid session settings: {0}")]
    Config(#[from] toml::de::Error),

    /// A data file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The weapon catalog or host registry failed to load.
    #[error(transparent)]
    Catalog(#[from] ConfigError),
}

/// Result type for session setup.
pub type ArenaResult<T> = Result<T, ArenaError>;
