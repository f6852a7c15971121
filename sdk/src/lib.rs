//! Client side of a validator's web API.
//!
//! Covers what a fleet operator needs from a running validator: signed
//! control messages, integer-key transactions, commit status and store
//! queries.
//!
//! ```ignore
//! use sdk::{IntegerKeyClient, LedgerWebClient, Wallet};
//!
//! #[tokio::main]
//! async fn main() -> sdk::Result<()> {
//!     let web = LedgerWebClient::connect("http://localhost:8800")?;
//!     let client = IntegerKeyClient::new(web, Wallet::generate());
//!
//!     let id = client.set("1", 42).await?;
//!     println!("{id} committed: {}", client.is_committed(&id).await?);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod intkey;
pub mod message;
pub mod transaction;
pub mod types;
pub mod wallet;

// Re-exports for convenience
pub use client::{ClientConfig, ENDPOINT_REGISTRY_STORE, LedgerWebClient, Probe};
pub use error::{Error, Result};
pub use intkey::{INTKEY_STORE, IntegerKeyClient};
pub use message::{ControlMessage, PeerEndpoint, SignedEnvelope};
pub use transaction::{IntKeyTransaction, IntKeyUpdate, SignedTransaction, TxBuilder, TxStatus, Verb};
pub use types::{Address, TransactionId};
pub use wallet::Wallet;
