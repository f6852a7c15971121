//! Orchestration of a local validator fleet.
//!
//! The fleet allocates node identities, resolves each node's configuration,
//! launches the validators through [`supervisor::NodeSupervisor`], waits for
//! them to register and admits quorum peers to one another. Ledger state can
//! be saved to, and restored from, a gzip tar archive.

pub mod archive;
pub mod config;
pub mod error;
pub mod fleet;
pub mod quorum;

pub use archive::{ArchiveContents, pack_directory, unpack_archive};
pub use config::{FleetConfig, RetryPolicy};
pub use error::{FleetError, Result};
pub use fleet::{Fleet, JoinFailure, JoinOutcome, LaunchReport, NodeLaunch};
pub use quorum::{AdmissionTarget, HttpQuorumMembership, QuorumMembership};
