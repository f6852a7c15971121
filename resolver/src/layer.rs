//! Flat configuration layers.
//!
//! A layer is a named, flat mapping from configuration key to value. Layers
//! are figment providers so they can be inspected and extracted with the same
//! tooling as any other figment source, but they are folded by the resolver
//! with top-level overwrite rather than figment's recursive merge.

use std::path::Path;

use figment::providers::{Format, Json};
use figment::value::{Dict, Map, Value};
use figment::{Figment, Metadata, Profile, Provider};
use serde::Serialize;

use crate::error::{ConfigError, Result};

/// Keys the fleet orchestrator assigns per node. A shared base configuration
/// must not carry them.
pub const FLEET_MANAGED_KEYS: &[&str] = &[
    "NodeName",
    "Host",
    "HttpPort",
    "Port",
    "LogFile",
    "LogLevel",
    "KeyFile",
    "AdministrationNode",
    "DataDirectory",
    "GenesisLedger",
];

/// A named flat configuration mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigLayer {
    name: String,
    values: Dict,
}

impl ConfigLayer {
    /// Creates an empty layer.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Dict::new(),
        }
    }

    /// Creates a layer from an existing mapping.
    pub fn from_dict(name: impl Into<String>, values: Dict) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Sets `key` to any serializable value.
    pub fn set_serialized<T: Serialize>(mut self, key: &str, value: &T) -> Result<Self> {
        let value = Value::serialize(value).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            source: Box::new(e),
        })?;
        self.values.insert(key.to_string(), value);
        Ok(self)
    }

    /// Inserts `key` in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns the string value of `key`, if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &Dict {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut Dict {
        &mut self.values
    }

    pub fn into_values(self) -> Dict {
        self.values
    }

    /// Overwrites this layer's keys with every key of `other`.
    ///
    /// Values are replaced wholesale; nested mappings are not merged.
    pub fn overlay(&mut self, other: &ConfigLayer) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Removes the keys listed in [`FLEET_MANAGED_KEYS`], returning the names
    /// that were present.
    pub fn strip_fleet_managed_keys(&mut self) -> Vec<&'static str> {
        FLEET_MANAGED_KEYS
            .iter()
            .copied()
            .filter(|key| self.values.remove(*key).is_some())
            .collect()
    }
}

impl Provider for ConfigLayer {
    fn metadata(&self) -> Metadata {
        Metadata::named(self.name.clone())
    }

    fn data(&self) -> std::result::Result<Map<Profile, Dict>, figment::Error> {
        Ok(Profile::Default.collect(self.values.clone()))
    }
}

/// Removes `##` comments from configuration text.
///
/// Everything from `##` to the end of the line is dropped.
pub fn strip_comments(text: &str) -> String {
    text.lines()
        .map(|line| match line.find("##") {
            Some(idx) => &line[..idx],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses a JSON configuration file with `##` comments into a layer.
///
/// The file must contain a single JSON object.
pub fn parse_configuration_file(path: &Path) -> Result<ConfigLayer> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_configuration_str(&path.display().to_string(), &text).map_err(|source| {
        ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })
}

pub(crate) fn parse_configuration_str(
    name: &str,
    text: &str,
) -> std::result::Result<ConfigLayer, Box<figment::Error>> {
    let stripped = strip_comments(text);
    let values: Dict = Figment::from(Json::string(&stripped))
        .extract()
        .map_err(Box::new)?;
    Ok(ConfigLayer::from_dict(name, values))
}
