//! Node supervisor error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while preparing or launching a validator process.
///
/// Probe, shutdown and artifact retrieval never fail; only launch-time work
/// and explicit waits do.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The validator process has already been spawned.
    #[error("Validator {name} has already been launched")]
    AlreadyLaunched { name: String },

    /// The operation needs a spawned process.
    #[error("Validator {name} has not been launched")]
    NotLaunched { name: String },

    /// A node artifact could not be written or read.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The validator process could not be started.
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The effective configuration could not be serialized.
    #[error("Config serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Key material could not be written or loaded.
    #[error("Key error: {0}")]
    Key(#[from] sdk::Error),

    /// The search-path variable could not be assembled.
    #[error("Invalid search path: {0}")]
    SearchPath(#[from] std::env::JoinPathsError),
}

impl SupervisorError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| SupervisorError::Io { path, source }
    }
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
