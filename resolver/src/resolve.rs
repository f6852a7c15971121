//! Layered configuration resolution.
//!
//! Precedence, lowest to highest:
//!
//! ```text
//! 1. Platform defaults   ─── directories, host
//! 2. Files               ─── each named file, in the order given
//! 3. Environment         ─── fixed variable → key table
//! 4. Explicit options    ─── caller-supplied, per node
//! ```
//!
//! Layers are folded flat: a later layer replaces an earlier layer's value for
//! the same key wholesale. `{token}` placeholders are expanded once all layers
//! are merged, and the result is extracted into a [`ValidatorConfig`] and
//! validated.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::Figment;
use slog::{Logger, o};
use validator::Validate;

use crate::config::ValidatorConfig;
use crate::error::{ConfigError, Result};
use crate::layer::{ConfigLayer, parse_configuration_file};
use crate::platform::{Platform, env_layer};
use crate::substitute::substitute;

/// A configuration file to look up on the search path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub name: String,
    pub required: bool,
}

impl ConfigFile {
    /// A file that must exist in some search-path directory.
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
        }
    }

    /// A file that is skipped when absent.
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }
}

/// Resolves effective validator configurations.
///
/// The resolver holds no global state; calling [`ConfigResolver::resolve`]
/// repeatedly with different options yields independent configurations.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    platform: Platform,
    env: BTreeMap<String, String>,
    search_path: Vec<PathBuf>,
    logger: Logger,
}

impl ConfigResolver {
    /// Creates a resolver for `platform` with an explicit environment snapshot.
    pub fn new(platform: Platform, env: BTreeMap<String, String>) -> Self {
        Self {
            platform,
            env,
            search_path: Vec::new(),
            logger: Logger::root(slog::Discard, o!()),
        }
    }

    /// Sets the directories scanned for configuration files, in order.
    pub fn with_search_path(mut self, search_path: Vec<PathBuf>) -> Self {
        self.search_path = search_path;
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Default search path: the configuration directory resolved from
    /// defaults, environment and `options`, then `.`, then `{base}/etc`.
    pub fn default_search_path(&self, options: &ConfigLayer) -> Result<Vec<PathBuf>> {
        let mut merged = self.platform.defaults(&self.env);
        merged.overlay(&env_layer(&self.env));
        merged.overlay(options);
        substitute(merged.values_mut())?;

        let mut search_path = Vec::new();
        if let Some(conf_dir) = merged.get_str("ConfigDirectory") {
            search_path.push(PathBuf::from(conf_dir));
        }
        search_path.push(PathBuf::from("."));
        if let Some(base) = merged.get_str("BaseDirectory") {
            search_path.push(Path::new(base).join("etc"));
        }
        Ok(search_path)
    }

    /// Finds `name` in the first search-path directory that contains it.
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        self.search_path
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    /// Loads the file layers in the order given.
    ///
    /// Every missing required file is reported before any file is parsed.
    fn file_layers(&self, files: &[ConfigFile]) -> Result<Vec<ConfigLayer>> {
        let mut found = Vec::with_capacity(files.len());
        for file in files {
            match self.locate(&file.name) {
                Some(path) => found.push(path),
                None if file.required => {
                    return Err(ConfigError::MissingFile {
                        name: file.name.clone(),
                        search_path: self.search_path.clone(),
                    });
                }
                None => {
                    slog::debug!(self.logger, "Skipping optional configuration file"; "file" => &file.name);
                }
            }
        }

        found
            .iter()
            .map(|path| {
                slog::debug!(self.logger, "Loading configuration file"; "path" => %path.display());
                parse_configuration_file(path)
            })
            .collect()
    }

    /// Resolves the flat effective mapping.
    pub fn resolve_layer(&self, files: &[ConfigFile], options: &ConfigLayer) -> Result<ConfigLayer> {
        let mut layers = vec![self.platform.defaults(&self.env)];
        layers.extend(self.file_layers(files)?);
        layers.push(env_layer(&self.env));
        layers.push(options.clone());

        let mut effective = ConfigLayer::new("effective");
        for layer in &layers {
            slog::debug!(
                self.logger,
                "Applying configuration layer";
                "layer" => layer.name(),
                "keys" => layer.values().len()
            );
            effective.overlay(layer);
        }

        substitute(effective.values_mut())?;
        Ok(effective)
    }

    /// Resolves and validates the typed effective configuration.
    pub fn resolve(&self, files: &[ConfigFile], options: &ConfigLayer) -> Result<ValidatorConfig> {
        let effective = self.resolve_layer(files, options)?;
        let config: ValidatorConfig = Figment::from(effective).extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }
}
