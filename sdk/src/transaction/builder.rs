//! Transaction builder with fluent API

use crate::error::{Error, Result};
use crate::message::SignedEnvelope;
use crate::transaction::types::{IntKeyTransaction, IntKeyUpdate, SignedTransaction, Verb};
use crate::wallet::Wallet;

/// Builder for constructing integer-key transactions.
///
/// # Example
/// ```
/// use sdk::{TxBuilder, Wallet};
///
/// let wallet = Wallet::generate();
/// let tx = TxBuilder::set("1", 42)
///     .and_inc("2", 1)
///     .sign(&wallet, 0)
///     .unwrap();
/// assert_eq!(tx.envelope.payload.updates.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TxBuilder {
    updates: Vec<IntKeyUpdate>,
}

impl TxBuilder {
    /// Create a transaction setting `name` to `value`.
    pub fn set(name: impl Into<String>, value: i64) -> Self {
        Self::default().and(Verb::Set, name, value)
    }

    /// Create a transaction incrementing `name` by `value`.
    pub fn inc(name: impl Into<String>, value: i64) -> Self {
        Self::default().and(Verb::Inc, name, value)
    }

    /// Create a transaction decrementing `name` by `value`.
    pub fn dec(name: impl Into<String>, value: i64) -> Self {
        Self::default().and(Verb::Dec, name, value)
    }

    pub fn and_set(self, name: impl Into<String>, value: i64) -> Self {
        self.and(Verb::Set, name, value)
    }

    pub fn and_inc(self, name: impl Into<String>, value: i64) -> Self {
        self.and(Verb::Inc, name, value)
    }

    pub fn and_dec(self, name: impl Into<String>, value: i64) -> Self {
        self.and(Verb::Dec, name, value)
    }

    fn and(mut self, verb: Verb, name: impl Into<String>, value: i64) -> Self {
        self.updates.push(IntKeyUpdate {
            verb,
            name: name.into(),
            value,
        });
        self
    }

    /// Sign the transaction.
    ///
    /// # Arguments
    /// * `wallet` - Signing wallet
    /// * `nonce` - Distinguishes otherwise identical transactions
    pub fn sign(self, wallet: &Wallet, nonce: u64) -> Result<SignedTransaction> {
        if self.updates.is_empty() {
            return Err(Error::InvalidArgument("Transaction has no updates".into()));
        }
        let payload = IntKeyTransaction {
            updates: self.updates,
            nonce,
        };
        SignedTransaction::new(SignedEnvelope::sign(payload, wallet)?)
    }
}
