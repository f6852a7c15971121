//! Built-in defaults and environment-derived overrides.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::layer::ConfigLayer;

/// Environment variable holding the validator installation root.
pub const HOME_ENV: &str = "VALIDATOR_HOME";

/// Fixed mapping from environment variable to configuration key.
pub const ENV_MAPPING: &[(&str, &str)] = &[
    (HOME_ENV, "ValidatorHome"),
    ("VALIDATOR_CONF_DIR", "ConfigDirectory"),
    ("VALIDATOR_LOG_DIR", "LogDirectory"),
    ("VALIDATOR_DATA_DIR", "DataDirectory"),
    ("HOSTNAME", "ValidatorHost"),
];

const WINDOWS_BASE_DIR: &str = "C:\\Program Files (x86)\\Validator\\";

/// Target operating system family for the built-in defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    /// The platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    /// Built-in defaults, the lowest-precedence layer.
    ///
    /// When the environment names a validator home, directories are laid out
    /// under it using `{home}` placeholders that are expanded after all layers
    /// have been merged.
    pub fn defaults(self, env: &BTreeMap<String, String>) -> ConfigLayer {
        let layer = ConfigLayer::new("default");

        let layer = if env.contains_key(HOME_ENV) {
            layer
                .set("ConfigDirectory", "{home}/etc")
                .set("LogDirectory", "{home}/logs")
                .set("DataDirectory", "{home}/data")
                .set("KeyDirectory", "{home}/keys")
        } else {
            match self {
                Platform::Windows => layer
                    .set("ConfigDirectory", format!("{WINDOWS_BASE_DIR}conf"))
                    .set("LogDirectory", format!("{WINDOWS_BASE_DIR}logs"))
                    .set("DataDirectory", format!("{WINDOWS_BASE_DIR}data"))
                    .set("KeyDirectory", format!("{WINDOWS_BASE_DIR}conf\\keys")),
                Platform::Unix => layer
                    .set("ConfigDirectory", "/etc/validator")
                    .set("LogDirectory", "/var/log/validator")
                    .set("DataDirectory", "/var/lib/validator")
                    .set("KeyDirectory", "/etc/validator/keys"),
            }
        };

        let base = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        layer
            .set("BaseDirectory", base.display().to_string())
            .set("ValidatorHost", "localhost")
    }
}

/// Builds the environment layer from a snapshot of environment variables.
///
/// Only the variables listed in [`ENV_MAPPING`] are consulted; values are kept
/// as strings.
pub fn env_layer(env: &BTreeMap<String, String>) -> ConfigLayer {
    let mut layer = ConfigLayer::new("environment");
    for (var, key) in ENV_MAPPING {
        if let Some(value) = env.get(*var) {
            layer.insert(*key, value.clone());
        }
    }
    layer
}

/// Snapshot of the process environment restricted to [`ENV_MAPPING`].
pub fn process_env() -> BTreeMap<String, String> {
    ENV_MAPPING
        .iter()
        .filter_map(|(var, _)| std::env::var(var).ok().map(|v| (var.to_string(), v)))
        .collect()
}
