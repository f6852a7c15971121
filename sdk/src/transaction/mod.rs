//! Integer-key transactions.

pub mod builder;
pub mod types;

pub use builder::TxBuilder;
pub use types::{IntKeyTransaction, IntKeyUpdate, SignedTransaction, TxStatus, Verb};
