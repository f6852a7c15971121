//! Layered validator configuration.
//!
//! Merges platform defaults, configuration files, environment variables and
//! explicit options into one effective [`ValidatorConfig`] per node.

pub mod config;
pub mod error;
pub mod layer;
pub mod platform;
pub mod resolve;
pub mod substitute;

pub use config::{LedgerType, ValidatorConfig};
pub use error::{ConfigError, Result};
pub use layer::{ConfigLayer, FLEET_MANAGED_KEYS, parse_configuration_file, strip_comments};
pub use platform::{ENV_MAPPING, HOME_ENV, Platform, env_layer, process_env};
pub use resolve::{ConfigFile, ConfigResolver};
pub use substitute::{SUBSTITUTIONS, substitute};
