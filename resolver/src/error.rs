//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving a validator configuration.
///
/// Every variant is fatal: resolution stops before any node is launched.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required configuration file was not found in any search directory.
    #[error("Unable to locate configuration file {name} (search path: {})", display_paths(.search_path))]
    MissingFile {
        name: String,
        search_path: Vec<PathBuf>,
    },

    /// A configuration file could not be read.
    #[error("Error reading configuration file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be decoded.
    #[error("Error parsing configuration file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<figment::Error>,
    },

    /// A value references a substitution token that cannot be resolved.
    #[error("Unable to resolve {{{token}}} in configuration key {key}")]
    UnresolvedVariable { key: String, token: String },

    /// A value could not be converted into a configuration entry.
    #[error("Invalid configuration value for {key}: {source}")]
    InvalidValue {
        key: String,
        #[source]
        source: Box<figment::Error>,
    },

    /// The merged configuration does not match the typed schema.
    #[error("Configuration extraction failed: {0}")]
    Extract(#[from] Box<figment::Error>),

    /// The typed configuration failed validation.
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, ConfigError>;
