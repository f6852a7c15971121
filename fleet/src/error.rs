//! Fleet orchestration error types.

use std::path::PathBuf;

use resolver::ConfigError;
use supervisor::SupervisorError;
use thiserror::Error;

/// Errors that abort a fleet operation.
///
/// Per-node join failures are not errors; they are reported in
/// [`crate::LaunchReport`].
#[derive(Debug, Error)]
pub enum FleetError {
    /// A node configuration could not be resolved. Nothing has been spawned.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A node could not be prepared or started.
    #[error("Failed to launch {node}: {source}")]
    Launch {
        node: String,
        #[source]
        source: SupervisorError,
    },

    /// Packing or restoring an archive failed.
    #[error("Archive error on {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The fleet data directory could not be created.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Node id does not fit the configured port range.
    #[error("No port available for node {id}")]
    PortRange { id: u32 },

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// The operation needs at least one node.
    #[error("Fleet has no nodes")]
    EmptyFleet,

    #[error("Fleet is already running")]
    AlreadyLaunched,
}

pub type Result<T> = std::result::Result<T, FleetError>;
