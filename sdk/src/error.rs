//! SDK error types.

use thiserror::Error;

/// Errors returned by the ledger SDK.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level HTTP failure (connection refused, timeout, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The node answered with a non-success status.
    #[error("Request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The node answered with something other than JSON.
    #[error("Unexpected content type: {0:?}")]
    UnexpectedContentType(String),

    /// Payload serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Key file I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed key material.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Hex decoding error.
    #[error("Hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Signature did not verify.
    #[error("Signature error: {0}")]
    Signature(#[from] ed25519_dalek::SignatureError),

    /// Invalid argument provided.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;
