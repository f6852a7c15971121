//! Typed validator configuration.
//!
//! The effective configuration written for a validator process. Keys are
//! serialized in the `PascalCase` form the validator binary reads
//! (`NodeName`, `HttpPort`, ...); keys this crate does not model are carried
//! through untouched in [`ValidatorConfig::extensions`].
//!
//! # Example JSON
//!
//! ```json
//! {
//!     "NodeName": "validator-0",
//!     "Host": "localhost",
//!     "HttpPort": 8800,
//!     "Port": 5500,
//!     "LedgerType": "quorum",
//!     "DataDirectory": "/tmp/fleet/validator-0",
//!     "GenesisLedger": true
//! }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Consensus flavour a validator runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerType {
    /// Voting validator that must be told its quorum peers.
    #[default]
    Quorum,
    /// Lottery-based validator.
    Lottery,
    /// Single-node development ledger.
    Dev,
}

impl LedgerType {
    /// Whether a validator of this type needs quorum admission before it can
    /// participate in consensus.
    pub fn requires_quorum(self) -> bool {
        matches!(self, LedgerType::Quorum)
    }
}

/// Effective configuration for one validator process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct ValidatorConfig {
    /// Fleet-local node id.
    #[serde(default)]
    pub id: Option<u32>,

    /// Node name, unique within a fleet.
    #[serde(default)]
    #[validate(length(min = 1))]
    pub node_name: Option<String>,

    /// Host the validator binds to.
    #[serde(default = "default_host")]
    #[validate(length(min = 1))]
    pub host: String,

    /// Client (HTTP) port.
    #[serde(default = "default_http_port")]
    #[validate(range(min = 1))]
    pub http_port: u16,

    /// Consensus (gossip) port.
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    #[serde(default)]
    pub log_file: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub key_file: Option<PathBuf>,

    /// Address of the fleet's administrative node.
    #[serde(default)]
    pub administration_node: Option<String>,

    /// Client endpoint of a node to bootstrap the ledger from.
    #[serde(default)]
    pub ledger_url: Option<String>,

    /// Whether this node creates the genesis block.
    #[serde(default)]
    pub genesis_ledger: bool,

    #[serde(default)]
    pub ledger_type: LedgerType,

    #[serde(default)]
    pub validator_home: Option<String>,

    #[serde(default = "default_host")]
    pub validator_host: String,

    pub base_directory: PathBuf,
    pub config_directory: PathBuf,
    pub data_directory: PathBuf,
    pub log_directory: PathBuf,
    pub key_directory: PathBuf,

    /// Keys not modeled above, preserved verbatim.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_http_port() -> u16 {
    8800
}

fn default_port() -> u16 {
    5500
}

fn default_log_level() -> String {
    "WARNING".to_string()
}

impl ValidatorConfig {
    /// Client endpoint URL derived from `Host` and `HttpPort`.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.http_port)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
