//! Ledger access used by the harness.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sdk::{IntegerKeyClient, TransactionId};

/// Integer-key operations the harness drives against one validator.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn set(&self, key: &str, value: i64) -> sdk::Result<TransactionId>;

    async fn inc(&self, key: &str, value: i64) -> sdk::Result<TransactionId>;

    async fn dec(&self, key: &str, value: i64) -> sdk::Result<TransactionId>;

    /// Whether `id` has been committed. Anything but a positive answer
    /// counts as still pending.
    async fn is_committed(&self, id: &TransactionId) -> sdk::Result<bool>;

    /// Authoritative key/value state.
    async fn fetch_state(&self) -> sdk::Result<BTreeMap<String, i64>>;
}

#[async_trait]
impl LedgerClient for IntegerKeyClient {
    async fn set(&self, key: &str, value: i64) -> sdk::Result<TransactionId> {
        IntegerKeyClient::set(self, key, value).await
    }

    async fn inc(&self, key: &str, value: i64) -> sdk::Result<TransactionId> {
        IntegerKeyClient::inc(self, key, value).await
    }

    async fn dec(&self, key: &str, value: i64) -> sdk::Result<TransactionId> {
        IntegerKeyClient::dec(self, key, value).await
    }

    async fn is_committed(&self, id: &TransactionId) -> sdk::Result<bool> {
        IntegerKeyClient::is_committed(self, id).await
    }

    async fn fetch_state(&self) -> sdk::Result<BTreeMap<String, i64>> {
        IntegerKeyClient::fetch_state(self).await
    }
}
