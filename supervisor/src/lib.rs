//! Supervision of a single validator process.
//!
//! A [`NodeSupervisor`] materializes a node's key and configuration into its
//! private directory, spawns the validator, classifies its health and stops
//! it either gracefully (signed shutdown message) or by force.

pub mod error;
pub mod identity;
pub mod logscan;
pub mod status;
pub mod supervisor;

pub use error::{Result, SupervisorError};
pub use identity::NodeIdentity;
pub use logscan::{ERROR_THRESHOLD, line_severity, log_has_error};
pub use status::{NodeState, NodeStatus, ShutdownKind, human_bytes};
pub use supervisor::{DEFAULT_SEARCH_PATH_VAR, LaunchSettings, NodeSupervisor, ShutdownOutcome};
