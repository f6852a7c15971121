//! Integer-key transaction payloads.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::SignedEnvelope;
use crate::types::TransactionId;

/// Operation applied to a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Set,
    Inc,
    Dec,
}

/// One update within an integer-key transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IntKeyUpdate {
    pub verb: Verb,
    pub name: String,
    pub value: i64,
}

impl IntKeyUpdate {
    /// Applies this update to a local value, `None` meaning the key is absent.
    ///
    /// Returns `None` when the update is not applicable (increment or
    /// decrement of an absent key).
    pub fn apply(&self, current: Option<i64>) -> Option<i64> {
        match self.verb {
            Verb::Set => Some(self.value),
            Verb::Inc => current.map(|v| v + self.value),
            Verb::Dec => current.map(|v| v - self.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IntKeyTransaction {
    pub updates: Vec<IntKeyUpdate>,
    pub nonce: u64,
}

/// A signed transaction ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub envelope: SignedEnvelope<IntKeyTransaction>,
    pub id: TransactionId,
}

impl SignedTransaction {
    pub(crate) fn new(envelope: SignedEnvelope<IntKeyTransaction>) -> Result<Self> {
        let id = TransactionId::from_signature(&envelope.signature()?);
        Ok(Self { envelope, id })
    }
}

/// Commit status of a submitted transaction as reported by one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// The node has the transaction in a committed block.
    Committed,
    /// The node does not (yet) report the transaction as committed.
    Pending,
}
