//! Validator Fleet Launcher
//!
//! Launches a local fleet of validators, bootstraps their quorum and offers
//! an interactive console until `exit`, end of input or Ctrl-C.
//!
//! # Usage
//!
//! ```bash
//! fleet-launcher --validator ./bin/validator --config base.js --count 4
//! ```
//!
//! Save the ledger on exit and restore it on a later run:
//! ```bash
//! fleet-launcher --validator ./bin/validator --count 4 --save-blockchain ledger.tar.gz
//! fleet-launcher --validator ./bin/validator --count 4 --load-blockchain ledger.tar.gz
//! ```

mod console;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use clap::Parser;
use fleet::{Fleet, FleetConfig};
use resolver::{ConfigLayer, ConfigResolver, Platform, parse_configuration_file, process_env};
use slog::{Drain, Logger, o};

#[derive(Parser, Debug)]
#[command(name = "fleet-launcher")]
#[command(about = "Launches and supervises a local validator fleet")]
#[command(version)]
struct Args {
    /// Validator executable, or script when --interpreter is given
    #[arg(long, env = "VALIDATOR_BINARY")]
    validator: Option<PathBuf>,

    /// Interpreter the validator script runs under (e.g. python3)
    #[arg(long)]
    interpreter: Option<PathBuf>,

    /// Base validator configuration (JSON, `##` comments allowed)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fleet settings file (TOML); FLEET_* environment variables override it
    #[arg(long, default_value = "fleet.toml")]
    fleet_config: PathBuf,

    /// Number of validators to launch
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,

    /// Archive the ledger data to this file on exit
    #[arg(long)]
    save_blockchain: Option<PathBuf>,

    /// Restore ledger data from this archive before launching
    #[arg(long)]
    load_blockchain: Option<PathBuf>,

    /// Fleet data directory; a temporary directory is used when absent
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Validator log level (e.g. DEBUG, INFO, WARNING)
    #[arg(long)]
    log_level: Option<String>,

    /// Client port of the first validator
    #[arg(long)]
    http_port: Option<u16>,

    /// Consensus port of the first validator
    #[arg(long)]
    consensus_port: Option<u16>,

    /// Launcher log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    verbosity: String,
}

impl Args {
    /// Fleet settings from the settings file and environment, overridden by
    /// command-line flags.
    fn fleet_config(&self) -> Result<FleetConfig> {
        let mut config = FleetConfig::load(&self.fleet_config.display().to_string())
            .with_context(|| format!("Failed to load {}", self.fleet_config.display()))?;
        if let Some(validator) = &self.validator {
            config.validator_binary = validator.clone();
        }
        if let Some(interpreter) = &self.interpreter {
            config.interpreter = Some(interpreter.clone());
        }
        if let Some(archive) = &self.load_blockchain {
            config.blockchain_archive = Some(archive.clone());
        }
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(port) = self.http_port {
            config.base_http_port = port;
        }
        if let Some(port) = self.consensus_port {
            config.base_consensus_port = port;
        }
        Ok(config)
    }

    /// Checks every input path before anything is written.
    fn validate(&self, config: &FleetConfig) -> Result<()> {
        ensure!(self.count > 0, "--count must be at least 1");
        ensure!(
            config.validator_binary.is_file(),
            "Validator binary not found: {}",
            config.validator_binary.display()
        );
        if let Some(config_file) = &self.config {
            ensure!(config_file.is_file(), "Config file not found: {}", config_file.display());
        }
        if let Some(archive) = &config.blockchain_archive {
            ensure!(archive.is_file(), "Blockchain archive not found: {}", archive.display());
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let logger = create_logger(&args.verbosity);

    let mut config = args.fleet_config()?;
    args.validate(&config)?;

    let temp_dir = match &args.data_dir {
        Some(_) => None,
        None => {
            let dir = tempfile::Builder::new()
                .prefix("fleet-")
                .tempdir()
                .context("Failed to create temporary data directory")?;
            config.data_dir = dir.path().to_path_buf();
            Some(dir)
        }
    };
    slog::info!(logger, "Using data directory"; "path" => %config.data_dir.display());

    let result = run(config, &args, &logger).await;
    if result.is_err()
        && let Some(dir) = temp_dir
    {
        let kept = dir.keep();
        eprintln!("Fleet data kept at {}", kept.display());
    }
    result
}

async fn run(config: FleetConfig, args: &Args, logger: &Logger) -> Result<()> {
    let base = match &args.config {
        Some(path) => parse_configuration_file(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => ConfigLayer::new("base"),
    };

    let resolver = ConfigResolver::new(Platform::current(), process_env())
        .with_logger(logger.new(o!("component" => "resolver")));
    let search_path = if config.config_search_path.is_empty() {
        resolver.default_search_path(&base)?
    } else {
        config.config_search_path.clone()
    };
    let resolver = resolver.with_search_path(search_path);

    let grace = config.shutdown_grace;
    let mut fleet = Fleet::new(config, base, resolver, logger);
    let report = fleet
        .launch_network(args.count)
        .await
        .context("Failed to launch fleet")?;
    for failure in &report.failed {
        println!("{} failed: {}", failure.name, failure.reason);
    }
    println!(
        "{} of {} validators joined: {}",
        report.joined.len(),
        args.count,
        fleet.urls().join(" ")
    );

    let console = console::run(&mut fleet).await;

    slog::info!(logger, "Shutting down fleet");
    fleet.terminate(grace).await;
    if let Some(path) = &args.save_blockchain {
        save_blockchain(&fleet, path)?;
        slog::info!(logger, "Saved blockchain"; "path" => %path.display());
    }
    console
}

fn save_blockchain(fleet: &Fleet, path: &Path) -> Result<()> {
    fleet
        .pack_blockchain(path)
        .with_context(|| format!("Failed to save blockchain to {}", path.display()))
}

fn create_logger(level: &str) -> Logger {
    use slog::Level;
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::Trace,
        "debug" => Level::Debug,
        "info" => Level::Info,
        "warn" => Level::Warning,
        "error" => Level::Error,
        _ => Level::Info,
    };

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog::LevelFilter::new(drain, level).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("fleet-launcher").chain(line.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_fleet_settings() {
        let args = args(&[
            "--validator",
            "/bin/sh",
            "--count",
            "3",
            "--log-level",
            "DEBUG",
            "--http-port",
            "9800",
            "--consensus-port",
            "6500",
            "--data-dir",
            "/tmp/fleet-test",
            "--fleet-config",
            "/nonexistent/fleet.toml",
        ]);
        let config = args.fleet_config().unwrap();

        assert_eq!(config.validator_binary, PathBuf::from("/bin/sh"));
        assert_eq!(config.log_level, "DEBUG");
        assert_eq!(config.base_http_port, 9800);
        assert_eq!(config.base_consensus_port, 6500);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/fleet-test"));
        assert_eq!(args.count, 3);
    }

    #[test]
    fn missing_inputs_fail_validation() {
        let missing_binary = args(&["--validator", "/nonexistent/validator"]);
        let config = missing_binary.fleet_config().unwrap();
        assert!(missing_binary.validate(&config).is_err());

        let missing_archive = args(&["--validator", "/bin/sh", "--load-blockchain", "/nonexistent.tar.gz"]);
        let config = missing_archive.fleet_config().unwrap();
        let err = missing_archive.validate(&config).unwrap_err();
        assert!(err.to_string().contains("archive"));

        let zero = args(&["--validator", "/bin/sh", "--count", "0"]);
        let config = zero.fleet_config().unwrap();
        assert!(zero.validate(&config).is_err());
    }
}
