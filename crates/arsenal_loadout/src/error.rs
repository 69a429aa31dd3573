//! # Loadout Error Types
//!
//! Load-time configuration failures and caller mistakes.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors raised while building a catalog or host registry.
///
/// Any of these aborts startup; no partial catalog is ever produced.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The source is not valid TOML.
    #[error("failed to parse weapon table: {0}")]
    Parse(#[from] toml::de::Error),

    /// The source file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A tag is not a table, or a display name is not a string.
    #[error("malformed entry in tag '{tag}': {basename}")]
    MalformedEntry {
        /// Tag the entry was found under.
        tag: String,
        /// Offending key (or the tag itself when the tag is not a table).
        basename: String,
    },

    /// The host registry has no weapon with this basename.
    #[error("weapon ({basename} => {display_name}) does not exist in game {game}")]
    UnknownWeapon {
        /// Configured basename.
        basename: String,
        /// Configured display name.
        display_name: String,
        /// Host game the registry describes.
        game: String,
    },

    /// The same basename was listed under two tags.
    #[error("weapon {basename} listed under both '{first_tag}' and '{second_tag}'")]
    DuplicateBasename {
        /// Repeated basename.
        basename: String,
        /// Tag of the first occurrence.
        first_tag: String,
        /// Tag of the repeated occurrence.
        second_tag: String,
    },

    /// The source declares no weapons at all.
    #[error("weapon table declares no weapons")]
    EmptyCatalog,
}

/// Errors returned to callers that ask for something the catalog rejects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadoutError {
    /// The basename is not in the catalog.
    #[error("unknown weapon: {0}")]
    UnknownWeapon(String),
}

/// Result type for catalog and registry loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for loadout operations.
pub type LoadoutResult<T> = Result<T, LoadoutError>;
