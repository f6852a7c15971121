//! Harness error types.

use std::time::Duration;

use sdk::TransactionId;
use thiserror::Error;

/// One key whose ledger value differs from the shadow model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    pub key: String,
    pub expected: i64,
    /// `None` when the key is absent from the ledger.
    pub actual: Option<i64>,
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.actual {
            Some(actual) => write!(f, "key {:?}: expected {}, found {}", self.key, self.expected, actual),
            None => write!(f, "key {:?}: expected {}, key missing", self.key, self.expected),
        }
    }
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Harness has no ledger clients")]
    NoClients,

    #[error("Failed to create ledger client: {0}")]
    Connect(#[source] sdk::Error),

    #[error("Submitting {op} on key {key:?} failed: {source}")]
    SubmissionFailed {
        key: String,
        op: &'static str,
        #[source]
        source: sdk::Error,
    },

    #[error("{count} transactions not committed after {waited:?}")]
    UncommittedTransactions {
        count: usize,
        ids: Vec<TransactionId>,
        waited: Duration,
    },

    #[error("Ledger state differs from expected state: {}", format_mismatches(.mismatches))]
    StateMismatch { mismatches: Vec<Mismatch> },

    #[error("Failed to fetch ledger state: {0}")]
    StateFetch(#[source] sdk::Error),
}

fn format_mismatches(mismatches: &[Mismatch]) -> String {
    mismatches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, HarnessError>;
