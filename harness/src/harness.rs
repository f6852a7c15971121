//! Load and consistency harness.
//!
//! A run has three phases:
//!
//! ```text
//! setup(K)    set keys "1".."K" to random values, wait for commits
//! run(R)      per round: +2 on every key, then -1 on every key, wait
//! validate()  compare the ledger's state with the shadow state
//! ```
//!
//! Each operation goes to a randomly chosen client, and key order is
//! reshuffled for every pass. Rounds are not pipelined: a round's commit wait
//! completes before the next round submits anything.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sdk::{IntegerKeyClient, LedgerWebClient, TransactionId, Wallet};
use slog::{Logger, o};

use crate::client::LedgerClient;
use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::state::{PendingTransactions, ShadowState};

const INCREMENT: i64 = 2;
const DECREMENT: i64 = 1;

/// Drives integer-key load against a fleet and checks the outcome.
pub struct LoadHarness<C: LedgerClient> {
    clients: Vec<C>,
    config: HarnessConfig,
    shadow: ShadowState,
    pending: PendingTransactions,
    keys: Vec<String>,
    rng: StdRng,
    logger: Logger,
}

impl LoadHarness<IntegerKeyClient> {
    /// One client per endpoint, each signing with its own fresh key.
    pub fn connect(endpoints: &[String], config: HarnessConfig, logger: &Logger) -> Result<Self> {
        let clients = endpoints
            .iter()
            .map(|url| {
                LedgerWebClient::connect(url)
                    .map(|web| IntegerKeyClient::new(web, Wallet::generate()))
                    .map_err(HarnessError::Connect)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(clients, config, logger)
    }
}

impl<C: LedgerClient> LoadHarness<C> {
    pub fn new(clients: Vec<C>, config: HarnessConfig, logger: &Logger) -> Result<Self> {
        if clients.is_empty() {
            return Err(HarnessError::NoClients);
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            clients,
            config,
            shadow: ShadowState::new(),
            pending: PendingTransactions::new(),
            keys: Vec::new(),
            rng,
            logger: logger.new(o!("component" => "harness")),
        })
    }

    pub fn shadow(&self) -> &ShadowState {
        &self.shadow
    }

    pub fn pending(&self) -> &PendingTransactions {
        &self.pending
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    fn pick_client(&mut self) -> usize {
        self.rng.gen_range(0..self.clients.len())
    }

    fn shuffled_keys(&mut self) -> Vec<String> {
        let mut keys = self.keys.clone();
        keys.shuffle(&mut self.rng);
        keys
    }

    /// Sets keys `"1"` through `"key_count"` to random initial values and
    /// waits until every set is committed.
    pub async fn setup(&mut self, key_count: usize) -> Result<()> {
        for n in 1..=key_count {
            let key = n.to_string();
            let value = self.rng.gen_range(self.config.initial_values.clone());
            let client = self.pick_client();
            let id = self.clients[client]
                .set(&key, value)
                .await
                .map_err(|source| HarnessError::SubmissionFailed {
                    key: key.clone(),
                    op: "set",
                    source,
                })?;
            self.shadow.set(&key, value);
            self.pending.insert(id);
            self.keys.push(key);
        }
        slog::info!(self.logger, "Submitted initial values"; "keys" => key_count);
        self.wait_for_commits().await
    }

    /// Applies `rounds` rounds of +2 then -1 to every key.
    pub async fn run(&mut self, rounds: usize) -> Result<()> {
        for round in 1..=rounds {
            for key in self.shuffled_keys() {
                let id = self.submit_delta(&key, INCREMENT).await?;
                self.pending.insert(id);
            }
            for key in self.shuffled_keys() {
                let id = self.submit_delta(&key, -DECREMENT).await?;
                self.pending.insert(id);
            }
            slog::info!(self.logger, "Round submitted"; "round" => round, "pending" => self.pending.len());
            self.wait_for_commits().await?;
        }
        Ok(())
    }

    async fn submit_delta(&mut self, key: &str, delta: i64) -> Result<TransactionId> {
        let client = self.pick_client();
        let (op, result) = if delta >= 0 {
            ("inc", self.clients[client].inc(key, delta).await)
        } else {
            ("dec", self.clients[client].dec(key, -delta).await)
        };
        let id = result.map_err(|source| HarnessError::SubmissionFailed {
            key: key.to_string(),
            op,
            source,
        })?;
        self.shadow.add(key, delta);
        Ok(id)
    }

    /// Polls the first client until every pending transaction is committed
    /// or the commit timeout elapses. Returns at once when nothing is
    /// pending.
    ///
    /// The deadline is checked before every status query and each query is
    /// cut off at the remaining budget, so slow nodes cannot stretch the
    /// total wait.
    pub async fn wait_for_commits(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let start = Instant::now();
        let deadline = start + self.config.commit_timeout;
        loop {
            for id in self.pending.ids() {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                match tokio::time::timeout(remaining, self.clients[0].is_committed(&id)).await {
                    Ok(Ok(true)) => {
                        self.pending.confirm(&id);
                    }
                    Ok(Ok(false)) => {}
                    Ok(Err(e)) => {
                        slog::debug!(self.logger, "Status query failed"; "id" => %id, "error" => %e);
                    }
                    Err(_) => break,
                }
            }
            if self.pending.is_empty() {
                slog::debug!(self.logger, "All transactions committed"; "waited" => ?start.elapsed());
                return Ok(());
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                let waited = start.elapsed();
                slog::error!(
                    self.logger,
                    "Transactions not committed";
                    "count" => self.pending.len(),
                    "waited" => ?waited
                );
                return Err(HarnessError::UncommittedTransactions {
                    count: self.pending.len(),
                    ids: self.pending.ids(),
                    waited,
                });
            }
            tokio::time::sleep(self.config.poll_interval.min(remaining)).await;
        }
    }

    /// Compares the ledger's state with the shadow state, reporting every
    /// differing key.
    pub async fn validate(&self) -> Result<()> {
        let actual = self.clients[0]
            .fetch_state()
            .await
            .map_err(HarnessError::StateFetch)?;
        let mismatches = self.shadow.diff(&actual);
        if mismatches.is_empty() {
            slog::info!(self.logger, "Ledger state matches"; "keys" => self.shadow.len());
            return Ok(());
        }
        for mismatch in &mismatches {
            slog::error!(self.logger, "State mismatch"; "detail" => %mismatch);
        }
        Err(HarnessError::StateMismatch { mismatches })
    }
}
