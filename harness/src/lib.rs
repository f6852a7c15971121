//! Load and consistency harness for a validator fleet.
//!
//! The harness submits integer-key operations through several clients,
//! keeps a shadow model of the expected state, waits for every transaction
//! to commit and finally checks the replicated state against the model.

pub mod client;
pub mod config;
pub mod error;
pub mod harness;
pub mod state;

pub use client::LedgerClient;
pub use config::HarnessConfig;
pub use error::{HarnessError, Mismatch, Result};
pub use harness::LoadHarness;
pub use state::{PendingTransactions, ShadowState};
