//! Fleet configuration.

use std::path::PathBuf;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Bounded retry with exponential backoff.
///
/// Both `attempts` and `deadline` bound the loop; the deadline is re-checked
/// on every iteration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 30,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(4),
            deadline: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Backoff to use after `current`.
    pub fn next_backoff(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_backoff)
    }
}

/// Configuration of a validator fleet.
///
/// # Example TOML
///
/// ```toml
/// validator_binary = "/usr/local/bin/validator"
/// data_dir = "/tmp/fleet"
/// base_http_port = 8800
/// base_consensus_port = 5500
/// log_level = "INFO"
/// http_timeout = { secs = 5, nanos = 0 }
///
/// [registration]
/// attempts = 20
/// deadline = { secs = 30, nanos = 0 }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Validator executable, or script when `interpreter` is set.
    pub validator_binary: PathBuf,

    pub interpreter: Option<PathBuf>,

    /// Root of every node's private data directory.
    pub data_dir: PathBuf,

    /// Host every node binds to.
    pub host: String,

    /// Client port of node 0; node `i` uses `base_http_port + i`.
    pub base_http_port: u16,

    /// Consensus port of node 0; node `i` uses `base_consensus_port + i`.
    pub base_consensus_port: u16,

    pub log_level: String,

    /// Configuration files resolved for every node, in order.
    pub config_files: Vec<String>,

    /// Directories searched for `config_files`. Empty means the resolver's
    /// default search path.
    pub config_search_path: Vec<PathBuf>,

    /// Directories prepended to the validator's module search path.
    pub module_search_path: Vec<PathBuf>,

    /// Archive to restore node data from before launch.
    pub blockchain_archive: Option<PathBuf>,

    /// Per-request timeout for calls to node web APIs.
    pub http_timeout: Duration,

    /// How long teardown waits for graceful exit before killing.
    pub shutdown_grace: Duration,

    /// Registration discovery policy.
    pub registration: RetryPolicy,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            validator_binary: PathBuf::from("validator"),
            interpreter: None,
            data_dir: PathBuf::from("./fleet-data"),
            host: "localhost".to_string(),
            base_http_port: 8800,
            base_consensus_port: 5500,
            log_level: "WARNING".to_string(),
            config_files: Vec::new(),
            config_search_path: Vec::new(),
            module_search_path: Vec::new(),
            blockchain_archive: None,
            http_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(10),
            registration: RetryPolicy::default(),
        }
    }
}

impl FleetConfig {
    /// Load configuration from a TOML file with `FLEET_` env overrides.
    ///
    /// Nested fields use double underscore: `FLEET_REGISTRATION__ATTEMPTS=5`.
    pub fn load(path: &str) -> Result<Self, Box<figment::Error>> {
        Figment::from(Serialized::defaults(FleetConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("FLEET_").split("__"))
            .extract()
            .map_err(Box::new)
    }
}
