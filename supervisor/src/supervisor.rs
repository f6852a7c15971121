//! Lifecycle of one validator process.

use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use resolver::ValidatorConfig;
use sdk::{ClientConfig, ControlMessage, LedgerWebClient, Probe, SignedEnvelope, Wallet};
use slog::{Logger, o};
use tokio::process::{Child, Command};

use crate::error::{Result, SupervisorError};
use crate::identity::NodeIdentity;
use crate::logscan::{ERROR_THRESHOLD, log_has_error};
use crate::status::{NodeState, NodeStatus, ShutdownKind, file_size};

/// Environment variable the validator reads its module search path from.
pub const DEFAULT_SEARCH_PATH_VAR: &str = "VALIDATOR_PATH";

/// How to start a validator process.
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    /// Validator executable or script.
    pub binary: PathBuf,
    /// Program that runs `binary`, when it is a script.
    pub interpreter: Option<PathBuf>,
    /// Private directory holding every artifact of this node.
    pub node_dir: PathBuf,
    pub search_path_var: String,
    /// Directories prepended to `search_path_var` in the child environment.
    pub search_path: Vec<PathBuf>,
    /// Per-request timeout for calls to the node's web API.
    pub http_timeout: Duration,
}

impl LaunchSettings {
    pub fn new(binary: impl Into<PathBuf>, node_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            interpreter: None,
            node_dir: node_dir.into(),
            search_path_var: DEFAULT_SEARCH_PATH_VAR.to_string(),
            search_path: Vec::new(),
            http_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<PathBuf>) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }

    pub fn with_search_path(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_path = dirs;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

/// What a call to [`NodeSupervisor::shutdown`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// No live process to stop.
    NotRunning,
    /// Graceful path; `delivered` tells whether the node accepted the message.
    Requested { delivered: bool },
    /// Termination signal sent (or the process was already gone).
    Signalled,
}

struct NodeProcess {
    child: Child,
    pid: u32,
    stdout: Option<File>,
    stderr: Option<File>,
    exit: Option<ExitStatus>,
}

impl NodeProcess {
    fn poll_exit(&mut self) -> Option<ExitStatus> {
        if self.exit.is_none() {
            self.exit = self.child.try_wait().ok().flatten();
        }
        self.exit
    }

    /// Releases the output handles. Later calls are no-ops.
    fn close_outputs(&mut self, logger: &Logger) {
        for file in [self.stdout.take(), self.stderr.take()].into_iter().flatten() {
            if let Err(e) = file.sync_all() {
                slog::debug!(logger, "Failed to flush output file"; "error" => %e);
            }
        }
    }
}

/// Owns one validator's identity, configuration artifacts and process.
///
/// The process may be spawned at most once. A crashed or stopped node is not
/// restarted; a new supervisor is needed.
pub struct NodeSupervisor {
    identity: NodeIdentity,
    config: ValidatorConfig,
    settings: LaunchSettings,
    logger: Logger,
    prepared: bool,
    process: Option<NodeProcess>,
    /// Last shutdown requested, if any.
    shutdown: Option<ShutdownKind>,
}

impl NodeSupervisor {
    /// Creates a supervisor. The identity's name, host and ports, and the
    /// artifact locations inside `settings.node_dir`, are written into
    /// `config`.
    pub fn new(
        identity: NodeIdentity,
        mut config: ValidatorConfig,
        settings: LaunchSettings,
        logger: &Logger,
    ) -> Self {
        let logger = logger.new(o!("node" => identity.name.clone()));
        config.id = Some(identity.id);
        config.node_name = Some(identity.name.clone());
        config.host = identity.host.clone();
        config.http_port = identity.client_port;
        config.port = identity.consensus_port;
        config.log_file = Some(artifact(&settings.node_dir, &identity.name, "log"));
        config.key_file = Some(artifact(&settings.node_dir, &identity.name, "wif"));

        Self {
            identity,
            config,
            settings,
            logger,
            prepared: false,
            process: None,
            shutdown: None,
        }
    }

    pub fn id(&self) -> u32 {
        self.identity.id
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn url(&self) -> String {
        self.config.url()
    }

    pub fn node_dir(&self) -> &Path {
        &self.settings.node_dir
    }

    pub fn config_path(&self) -> PathBuf {
        artifact(&self.settings.node_dir, &self.identity.name, "json")
    }

    pub fn key_path(&self) -> PathBuf {
        artifact(&self.settings.node_dir, &self.identity.name, "wif")
    }

    pub fn log_path(&self) -> PathBuf {
        self.config
            .log_file
            .clone()
            .unwrap_or_else(|| artifact(&self.settings.node_dir, &self.identity.name, "log"))
    }

    pub fn stdout_path(&self) -> PathBuf {
        artifact(&self.settings.node_dir, &self.identity.name, "out")
    }

    pub fn stderr_path(&self) -> PathBuf {
        artifact(&self.settings.node_dir, &self.identity.name, "err")
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().map(|p| p.pid)
    }

    fn client_for(&self, url: &str) -> sdk::Result<LedgerWebClient> {
        LedgerWebClient::with_config(
            ClientConfig::new(url)
                .with_timeout(self.settings.http_timeout)
                .with_retries(1, Duration::ZERO),
        )
    }

    /// The program and arguments used to start the validator.
    pub fn command_line(&self) -> Vec<String> {
        let mut line: Vec<String> = self
            .settings
            .interpreter
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        line.push(self.settings.binary.display().to_string());
        line.push("--conf-dir".into());
        line.push(self.settings.node_dir.display().to_string());
        line.push("--config".into());
        line.push(format!("{}.json", self.identity.name));
        line
    }

    fn search_path_env(&self) -> Result<Option<OsString>> {
        if self.settings.search_path.is_empty() {
            return Ok(None);
        }
        let mut dirs = self.settings.search_path.clone();
        if let Some(existing) = std::env::var_os(&self.settings.search_path_var) {
            dirs.extend(std::env::split_paths(&existing));
        }
        Ok(Some(std::env::join_paths(dirs)?))
    }

    fn build_command(&self) -> Result<Command> {
        let (program, leading) = match &self.settings.interpreter {
            Some(interpreter) => (interpreter.clone(), vec![self.settings.binary.clone()]),
            None => (self.settings.binary.clone(), Vec::new()),
        };
        let mut cmd = Command::new(program);
        cmd.args(leading)
            .arg("--conf-dir")
            .arg(&self.settings.node_dir)
            .arg("--config")
            .arg(format!("{}.json", self.identity.name));
        if let Some(search_path) = self.search_path_env()? {
            cmd.env(&self.settings.search_path_var, search_path);
        }
        Ok(cmd)
    }

    /// Writes the key and config artifacts and, when `spawn` is set, starts
    /// the validator with its output redirected to the node's `.out` and
    /// `.err` files.
    ///
    /// The key file is only written if absent. Once a process has been
    /// spawned, further calls fail without touching anything.
    pub fn launch(&mut self, spawn: bool) -> Result<()> {
        if self.process.is_some() || self.shutdown.is_some() {
            return Err(SupervisorError::AlreadyLaunched {
                name: self.identity.name.clone(),
            });
        }

        let node_dir = self.settings.node_dir.clone();
        std::fs::create_dir_all(&node_dir).map_err(SupervisorError::io(&node_dir))?;

        let key_path = self.key_path();
        if self.identity.wallet().write_key_file_if_absent(&key_path)? {
            slog::debug!(self.logger, "Wrote key file"; "path" => %key_path.display());
        }

        let config_path = self.config_path();
        std::fs::write(&config_path, self.config.to_json()?)
            .map_err(SupervisorError::io(&config_path))?;
        self.prepared = true;

        let command = self.command_line().join(" ");
        if !spawn {
            slog::info!(self.logger, "Prepared validator"; "command" => &command);
            return Ok(());
        }

        let stdout_path = self.stdout_path();
        let stderr_path = self.stderr_path();
        let stdout = File::create(&stdout_path).map_err(SupervisorError::io(&stdout_path))?;
        let stderr = File::create(&stderr_path).map_err(SupervisorError::io(&stderr_path))?;
        let child_stdout = stdout.try_clone().map_err(SupervisorError::io(&stdout_path))?;
        let child_stderr = stderr.try_clone().map_err(SupervisorError::io(&stderr_path))?;

        let mut cmd = self.build_command()?;
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(child_stdout))
            .stderr(Stdio::from(child_stderr))
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| SupervisorError::Spawn {
            command: command.clone(),
            source,
        })?;
        let pid = child.id().ok_or_else(|| SupervisorError::Spawn {
            command: command.clone(),
            source: std::io::Error::other("process exited before its id was read"),
        })?;

        slog::info!(self.logger, "Launched validator"; "pid" => pid, "command" => &command);
        self.process = Some(NodeProcess {
            child,
            pid,
            stdout: Some(stdout),
            stderr: Some(stderr),
            exit: None,
        });
        Ok(())
    }

    /// Current lifecycle state.
    ///
    /// A node stays `Running` after a shutdown request until its process
    /// has actually exited.
    pub fn state(&mut self) -> NodeState {
        match self.process.as_mut() {
            Some(process) => match (process.poll_exit(), self.shutdown) {
                (None, _) => NodeState::Running { pid: process.pid },
                (Some(_), Some(kind)) => NodeState::Shutdown(kind),
                (Some(status), None) => NodeState::Exited {
                    code: status.code(),
                },
            },
            None if self.prepared => NodeState::Prepared,
            None => NodeState::Created,
        }
    }

    /// True iff the process exists and has not exited.
    pub fn is_running(&mut self) -> bool {
        self.process
            .as_mut()
            .is_some_and(|process| process.poll_exit().is_none())
    }

    /// Probes the endpoint registry served at `url`.
    pub async fn registration_probe(&self, url: &str) -> Probe {
        match self.client_for(url) {
            Ok(web) => web.registry_probe().await,
            Err(e) => Probe {
                available: false,
                detail: Some(e.to_string()),
            },
        }
    }

    /// Whether this node's address appears in the endpoint registry served
    /// at `url`. Transport failures and non-JSON answers count as not
    /// registered.
    pub async fn is_registered(&self, url: &str) -> bool {
        let result = match self.client_for(url) {
            Ok(web) => web.registered_addresses().await,
            Err(e) => Err(e),
        };
        match result {
            Ok(addresses) => {
                let ours = self.identity.address().to_hex();
                addresses.iter().any(|a| a.eq_ignore_ascii_case(&ours))
            }
            Err(e) => {
                slog::debug!(self.logger, "Registry query failed"; "url" => url, "error" => %e);
                false
            }
        }
    }

    /// Whether the node is unusable: never spawned, exited with failure,
    /// wrote to stderr, or logged at error severity.
    pub fn has_error(&mut self) -> bool {
        let Some(process) = self.process.as_mut() else {
            return true;
        };
        if process.poll_exit().is_some_and(|status| !status.success()) {
            return true;
        }
        if file_size(&self.stderr_path()) > 0 {
            return true;
        }
        log_has_error(&self.log_path(), ERROR_THRESHOLD)
    }

    /// Stops the node.
    ///
    /// Graceful shutdown posts a shutdown message signed by `admin` to the
    /// node; forced shutdown signals the process. Neither path fails: delivery
    /// and signalling problems are logged. Output handles are closed on every
    /// path.
    pub async fn shutdown(&mut self, force: bool, admin: &Wallet) -> ShutdownOutcome {
        let running = self.is_running();
        let outcome = if !running {
            ShutdownOutcome::NotRunning
        } else if force {
            if let Some(process) = self.process.as_mut()
                && let Err(e) = process.child.start_kill()
            {
                slog::debug!(self.logger, "Kill failed"; "error" => %e);
            }
            slog::info!(self.logger, "Killed validator");
            self.shutdown = Some(ShutdownKind::Forced);
            ShutdownOutcome::Signalled
        } else {
            let delivered = self.send_shutdown(admin).await;
            self.shutdown = Some(ShutdownKind::Graceful);
            ShutdownOutcome::Requested { delivered }
        };

        if let Some(process) = self.process.as_mut() {
            process.close_outputs(&self.logger);
        }
        outcome
    }

    async fn send_shutdown(&self, admin: &Wallet) -> bool {
        let result = match SignedEnvelope::sign(ControlMessage::shutdown(admin), admin) {
            Ok(envelope) => match self.client_for(&self.url()) {
                Ok(web) => web.post_message(&envelope).await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                slog::info!(self.logger, "Sent shutdown message");
                true
            }
            Err(e) => {
                slog::warn!(self.logger, "Failed to deliver shutdown message"; "error" => %e);
                false
            }
        }
    }

    /// Waits up to `timeout` for the process to exit. `Ok(None)` means it is
    /// still running.
    pub async fn wait_for_exit(&mut self, timeout: Duration) -> Result<Option<ExitStatus>> {
        let Some(process) = self.process.as_mut() else {
            return Err(SupervisorError::NotLaunched {
                name: self.identity.name.clone(),
            });
        };
        if let Some(status) = process.exit {
            return Ok(Some(status));
        }
        match tokio::time::timeout(timeout, process.child.wait()).await {
            Ok(Ok(status)) => {
                process.exit = Some(status);
                Ok(Some(status))
            }
            Ok(Err(e)) => Err(SupervisorError::io(self.settings.node_dir.clone())(e)),
            Err(_) => Ok(None),
        }
    }

    /// Point-in-time status report.
    pub fn status(&mut self) -> NodeStatus {
        let state = self.state();
        let has_error = self.has_error();
        NodeStatus {
            id: self.identity.id,
            name: self.identity.name.clone(),
            state,
            stdout_bytes: file_size(&self.stdout_path()),
            stderr_bytes: file_size(&self.stderr_path()),
            log_bytes: file_size(&self.log_path()),
            has_error,
        }
    }

    pub fn dump_config(&self) -> Option<String> {
        read_artifact(&self.config_path())
    }

    pub fn dump_log(&self) -> Option<String> {
        read_artifact(&self.log_path())
    }

    pub fn dump_stdout(&self) -> Option<String> {
        read_artifact(&self.stdout_path())
    }

    pub fn dump_stderr(&self) -> Option<String> {
        read_artifact(&self.stderr_path())
    }
}

impl std::fmt::Debug for NodeSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSupervisor")
            .field("id", &self.identity.id)
            .field("name", &self.identity.name)
            .field("pid", &self.pid())
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}

fn artifact(dir: &Path, name: &str, extension: &str) -> PathBuf {
    dir.join(format!("{name}.{extension}"))
}

fn read_artifact(path: &Path) -> Option<String> {
    std::fs::read(path)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}
