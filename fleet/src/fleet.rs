//! Fleet orchestration.
//!
//! A [`Fleet`] owns an ordered set of [`NodeSupervisor`]s. Bring-up runs in
//! three phases:
//!
//! ```text
//! 1. Prepare     ─── allocate identities, resolve every config (no process yet)
//! 2. Launch      ─── spawn each node; failures are recorded, the rest go on
//! 3. Bootstrap   ─── discover every new node, then deliver quorum admissions
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use resolver::{ConfigFile, ConfigLayer, ConfigResolver};
use sdk::{Address, ClientConfig, LedgerWebClient, PeerEndpoint, Wallet};
use slog::{Logger, o};
use supervisor::{
    LaunchSettings, NodeIdentity, NodeStatus, NodeSupervisor, ShutdownOutcome, SupervisorError,
};

use crate::archive::{ArchiveContents, pack_directory, unpack_archive};
use crate::config::{FleetConfig, RetryPolicy};
use crate::error::{FleetError, Result};
use crate::quorum::{AdmissionTarget, HttpQuorumMembership, QuorumMembership};

/// A node that was started but did not join the fleet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinFailure {
    pub id: u32,
    pub name: String,
    pub reason: String,
}

/// Outcome of [`Fleet::launch_network`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LaunchReport {
    /// Nodes whose process was spawned.
    pub launched: Vec<u32>,
    /// Nodes discovered in the endpoint registry.
    pub joined: Vec<u32>,
    pub failed: Vec<JoinFailure>,
}

impl LaunchReport {
    /// Whether every node launched and joined.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// How a single added node ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Artifacts written, no process spawned.
    Prepared,
    Joined,
    Failed(String),
}

/// Outcome of [`Fleet::launch_node`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeLaunch {
    pub id: u32,
    pub name: String,
    pub command: Vec<String>,
    pub outcome: JoinOutcome,
}

/// An ordered collection of supervised validators with one admin node.
///
/// The first node created is the admin node: its key authorizes control
/// messages (shutdown, quorum admission) for the whole fleet.
pub struct Fleet<Q: QuorumMembership = HttpQuorumMembership> {
    config: FleetConfig,
    base: ConfigLayer,
    resolver: ConfigResolver,
    membership: Q,
    nodes: Vec<NodeSupervisor>,
    endpoints: BTreeMap<u32, PeerEndpoint>,
    admitted: HashSet<(u32, Address)>,
    next_id: u32,
    restored: bool,
    logger: Logger,
}

impl Fleet<HttpQuorumMembership> {
    /// Creates an empty fleet that admits quorum peers over HTTP.
    pub fn new(config: FleetConfig, base: ConfigLayer, resolver: ConfigResolver, logger: &Logger) -> Self {
        let membership = HttpQuorumMembership::new(config.http_timeout);
        Self::with_membership(config, base, resolver, membership, logger)
    }
}

impl<Q: QuorumMembership> Fleet<Q> {
    /// Creates an empty fleet.
    ///
    /// Keys the fleet assigns per node are removed from `base`.
    pub fn with_membership(
        config: FleetConfig,
        mut base: ConfigLayer,
        resolver: ConfigResolver,
        membership: Q,
        logger: &Logger,
    ) -> Self {
        let logger = logger.new(o!("component" => "fleet"));
        let removed = base.strip_fleet_managed_keys();
        if !removed.is_empty() {
            slog::info!(logger, "Ignoring fleet-managed keys in base configuration"; "keys" => removed.join(","));
        }
        Self {
            config,
            base,
            resolver,
            membership,
            nodes: Vec::new(),
            endpoints: BTreeMap::new(),
            admitted: HashSet::new(),
            next_id: 0,
            restored: false,
            logger,
        }
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    pub fn membership(&self) -> &Q {
        &self.membership
    }

    pub fn nodes(&self) -> &[NodeSupervisor] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Signing wallet of the admin node.
    pub fn admin(&self) -> Option<&Wallet> {
        self.nodes.first().map(|node| node.identity().wallet())
    }

    /// Endpoint advertised by node `id`, once discovered.
    pub fn endpoint(&self, id: u32) -> Option<&PeerEndpoint> {
        self.endpoints.get(&id)
    }

    /// Whether an admission of `peer` has been delivered to node `id`.
    pub fn is_admitted(&self, id: u32, peer: &Address) -> bool {
        self.admitted.contains(&(id, *peer))
    }

    fn node_dir(&self, name: &str) -> PathBuf {
        self.config.data_dir.join(name)
    }

    fn port(base: u16, id: u32) -> Option<u16> {
        u16::try_from(id).ok().and_then(|offset| base.checked_add(offset))
    }

    /// Allocates the next identity and resolves its configuration.
    fn prepare_node(&mut self) -> Result<NodeSupervisor> {
        let id = self.next_id;
        let name = format!("validator-{id}");
        let http_port =
            Self::port(self.config.base_http_port, id).ok_or(FleetError::PortRange { id })?;
        let consensus_port =
            Self::port(self.config.base_consensus_port, id).ok_or(FleetError::PortRange { id })?;
        let node_dir = self.node_dir(&name);

        let identity = NodeIdentity::generate(id, &name, &self.config.host, http_port, consensus_port)
            .adopt_key_file(&node_dir.join(format!("{name}.wif")))
            .map_err(|e| FleetError::Launch {
                node: name.clone(),
                source: SupervisorError::Key(e),
            })?;

        let (admin_address, admin_url) = match self.nodes.first() {
            Some(admin) => (*admin.identity().address(), Some(admin.url())),
            None => (*identity.address(), None),
        };

        let mut options = self.base.clone();
        options.overlay(
            &ConfigLayer::new(format!("options:{name}"))
                .set("Id", id)
                .set("NodeName", name.as_str())
                .set("Host", self.config.host.as_str())
                .set("HttpPort", http_port)
                .set("Port", consensus_port)
                .set("DataDirectory", node_dir.display().to_string())
                .set("LogLevel", self.config.log_level.as_str())
                .set("AdministrationNode", admin_address.to_hex())
                .set("GenesisLedger", id == 0 && !self.restored),
        );
        if let Some(url) = admin_url {
            options.insert("LedgerUrl", url);
        }

        let files: Vec<ConfigFile> = self
            .config
            .config_files
            .iter()
            .map(|name| ConfigFile::required(name.as_str()))
            .collect();
        let config = self.resolver.resolve(&files, &options)?;

        let mut settings = LaunchSettings::new(&self.config.validator_binary, node_dir)
            .with_search_path(self.config.module_search_path.clone())
            .with_http_timeout(self.config.http_timeout);
        settings.interpreter = self.config.interpreter.clone();

        self.next_id += 1;
        Ok(NodeSupervisor::new(identity, config, settings, &self.logger))
    }

    /// Brings up `count` nodes and bootstraps their quorum membership.
    ///
    /// Every configuration is resolved before any process is spawned, so a
    /// configuration error leaves nothing running. Nodes that fail to launch
    /// or to register are reported, not fatal.
    pub async fn launch_network(&mut self, count: usize) -> Result<LaunchReport> {
        if count == 0 {
            return Err(FleetError::EmptyFleet);
        }
        if !self.nodes.is_empty() {
            return Err(FleetError::AlreadyLaunched);
        }

        let data_dir = self.config.data_dir.clone();
        std::fs::create_dir_all(&data_dir).map_err(|source| FleetError::Io {
            path: data_dir.clone(),
            source,
        })?;
        if let Some(archive) = self.config.blockchain_archive.clone() {
            slog::info!(self.logger, "Restoring ledger archive"; "archive" => %archive.display());
            unpack_archive(&archive, &data_dir).map_err(|source| FleetError::Archive {
                path: archive.clone(),
                source,
            })?;
            self.restored = true;
        }

        let mut prepared = Vec::with_capacity(count);
        for _ in 0..count {
            prepared.push(self.prepare_node()?);
        }

        let mut report = LaunchReport::default();
        for mut node in prepared {
            match node.launch(true) {
                Ok(()) => report.launched.push(node.id()),
                Err(e) => {
                    slog::warn!(self.logger, "Failed to launch validator"; "node" => node.name(), "error" => %e);
                    report.failed.push(JoinFailure {
                        id: node.id(),
                        name: node.name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
            self.nodes.push(node);
        }

        let (joined, failed) = self.bootstrap(&report.launched).await;
        report.joined = joined;
        report.failed.extend(failed);
        slog::info!(
            self.logger,
            "Fleet launched";
            "launched" => report.launched.len(),
            "joined" => report.joined.len(),
            "failed" => report.failed.len()
        );
        Ok(report)
    }

    /// Adds one node to the running fleet.
    ///
    /// With `spawn` unset only the node's artifacts and command line are
    /// produced.
    pub async fn launch_node(&mut self, spawn: bool) -> Result<NodeLaunch> {
        if self.nodes.is_empty() {
            return Err(FleetError::EmptyFleet);
        }
        let mut node = self.prepare_node()?;
        let id = node.id();
        let name = node.name().to_string();
        node.launch(spawn).map_err(|source| FleetError::Launch {
            node: name.clone(),
            source,
        })?;
        let command = node.command_line();
        self.nodes.push(node);

        let outcome = if spawn {
            let (_, failed) = self.bootstrap(&[id]).await;
            match failed.into_iter().next() {
                Some(failure) => JoinOutcome::Failed(failure.reason),
                None => JoinOutcome::Joined,
            }
        } else {
            JoinOutcome::Prepared
        };
        Ok(NodeLaunch {
            id,
            name,
            command,
            outcome,
        })
    }

    /// Discovers every node in `ids`, then admits each joined quorum node's
    /// peers. All discovery completes before the first admission.
    async fn bootstrap(&mut self, ids: &[u32]) -> (Vec<u32>, Vec<JoinFailure>) {
        let mut joined = Vec::new();
        let mut failed = Vec::new();

        for &id in ids {
            let Some(node) = self.nodes.iter_mut().find(|n| n.id() == id) else {
                continue;
            };
            match discover(node, &self.config.registration, self.config.http_timeout).await {
                Ok(endpoint) => {
                    slog::info!(self.logger, "Validator joined"; "node" => node.name(), "url" => endpoint.url());
                    self.endpoints.insert(id, endpoint);
                    joined.push(id);
                }
                Err(reason) => {
                    slog::warn!(self.logger, "Validator failed to join"; "node" => node.name(), "reason" => &reason);
                    failed.push(JoinFailure {
                        id,
                        name: node.name().to_string(),
                        reason,
                    });
                }
            }
        }

        self.admit_quorum_peers().await;
        (joined, failed)
    }

    /// Delivers every admission not yet delivered between joined nodes.
    async fn admit_quorum_peers(&mut self) {
        let Some(admin) = self.admin().cloned() else {
            return;
        };

        let mut pending = Vec::new();
        for node in &self.nodes {
            if !node.config().ledger_type.requires_quorum() || !self.endpoints.contains_key(&node.id()) {
                continue;
            }
            let target = AdmissionTarget {
                id: node.id(),
                name: node.name().to_string(),
                url: node.url(),
            };
            for (&peer_id, peer) in &self.endpoints {
                if peer_id != node.id() && !self.admitted.contains(&(node.id(), peer.address)) {
                    pending.push((target.clone(), peer.clone()));
                }
            }
        }

        for (target, peer) in pending {
            match self.membership.add_quorum_node(&admin, &target, &peer).await {
                Ok(()) => {
                    slog::debug!(self.logger, "Admitted quorum peer"; "node" => &target.name, "peer" => &peer.name);
                    self.admitted.insert((target.id, peer.address));
                }
                Err(e) => {
                    slog::warn!(
                        self.logger,
                        "Quorum admission failed";
                        "node" => &target.name,
                        "peer" => &peer.name,
                        "error" => %e
                    );
                }
            }
        }
    }

    /// Looks a node up by numeric id or by name.
    pub fn validator(&self, key: &str) -> Option<&NodeSupervisor> {
        let id = key.parse::<u32>().ok();
        self.nodes
            .iter()
            .find(|n| Some(n.id()) == id || n.name() == key)
    }

    pub fn validator_mut(&mut self, key: &str) -> Option<&mut NodeSupervisor> {
        let id = key.parse::<u32>().ok();
        self.nodes
            .iter_mut()
            .find(|n| Some(n.id()) == id || n.name() == key)
    }

    /// Status of every node, in fleet order.
    pub fn status(&mut self) -> Vec<NodeStatus> {
        self.nodes.iter_mut().map(|n| n.status()).collect()
    }

    /// Client endpoints of every node, in fleet order.
    pub fn urls(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.url()).collect()
    }

    /// Graceful shutdown of every node, in fleet order.
    pub async fn shutdown(&mut self) -> Vec<(u32, ShutdownOutcome)> {
        self.stop_all(false).await
    }

    /// Forced shutdown of every node.
    pub async fn kill(&mut self) -> Vec<(u32, ShutdownOutcome)> {
        self.stop_all(true).await
    }

    async fn stop_all(&mut self, force: bool) -> Vec<(u32, ShutdownOutcome)> {
        let Some(admin) = self.admin().cloned() else {
            return Vec::new();
        };
        let mut outcomes = Vec::with_capacity(self.nodes.len());
        for node in &mut self.nodes {
            outcomes.push((node.id(), node.shutdown(force, &admin).await));
        }
        outcomes
    }

    /// Graceful shutdown, a wait of at most `grace` for all nodes, then a
    /// forced kill of the survivors.
    pub async fn terminate(&mut self, grace: Duration) {
        self.shutdown().await;

        let Some(admin) = self.admin().cloned() else {
            return;
        };
        let deadline = Instant::now() + grace;
        for node in &mut self.nodes {
            if node.pid().is_none() {
                continue;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match node.wait_for_exit(remaining).await {
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => {
                    slog::info!(self.logger, "Validator did not exit in time"; "node" => node.name());
                    node.shutdown(true, &admin).await;
                    if let Err(e) = node.wait_for_exit(grace).await {
                        slog::warn!(self.logger, "Failed waiting for validator"; "node" => node.name(), "error" => %e);
                    }
                }
            }
        }
    }

    /// Packs every node's ledger data into `path`.
    pub fn pack_blockchain(&self, path: &Path) -> Result<()> {
        self.archive(path, ArchiveContents::Ledger)
    }

    /// Packs the whole fleet data directory, logs included, into `path`.
    pub fn create_result_archive(&self, path: &Path) -> Result<()> {
        self.archive(path, ArchiveContents::Everything)
    }

    fn archive(&self, path: &Path, contents: ArchiveContents) -> Result<()> {
        pack_directory(&self.config.data_dir, path, contents).map_err(|source| {
            FleetError::Archive {
                path: path.to_path_buf(),
                source,
            }
        })?;
        slog::info!(self.logger, "Wrote archive"; "path" => %path.display(), "contents" => ?contents);
        Ok(())
    }
}

/// Waits for `node` to appear in its own endpoint registry.
///
/// Returns the node's registry record, or its locally allocated endpoint when
/// the record cannot be read.
async fn discover(
    node: &mut NodeSupervisor,
    policy: &RetryPolicy,
    timeout: Duration,
) -> std::result::Result<PeerEndpoint, String> {
    let url = node.url();
    let start = Instant::now();
    let mut backoff = policy.initial_backoff;

    for attempt in 1..=policy.attempts.max(1) {
        if !node.is_running() {
            return Err("process exited before registering".to_string());
        }
        if node.is_registered(&url).await {
            let record = match LedgerWebClient::with_config(ClientConfig::new(url.as_str()).with_timeout(timeout)) {
                Ok(web) => web.endpoint_record(node.identity().address()).await.ok().flatten(),
                Err(_) => None,
            };
            return Ok(record.unwrap_or_else(|| node.identity().peer_endpoint()));
        }

        let elapsed = start.elapsed();
        if elapsed >= policy.deadline || attempt == policy.attempts {
            break;
        }
        tokio::time::sleep(backoff.min(policy.deadline - elapsed)).await;
        backoff = policy.next_backoff(backoff);
    }

    Err(format!(
        "not registered after {:.1}s",
        start.elapsed().as_secs_f64()
    ))
}

impl<Q: QuorumMembership> std::fmt::Debug for Fleet<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fleet")
            .field("nodes", &self.nodes)
            .field("data_dir", &self.config.data_dir)
            .finish_non_exhaustive()
    }
}
