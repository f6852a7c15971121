//! Shared test infrastructure: loggers, stand-in validator scripts, port
//! allocation and an HTTP fake of the integer-key ledger.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fleet::{Fleet, FleetConfig, RetryPolicy};
use resolver::{ConfigLayer, ConfigResolver, Platform};
use sdk::{
    ControlMessage, INTKEY_STORE, IntKeyTransaction, SignedEnvelope, TransactionId, Wallet,
};
use slog::{Drain, Level, Logger, o};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a logger for integration tests.
///
/// Respects the `RUST_LOG` environment variable (`error`, `warn`, `info`,
/// `debug`); defaults to `info`.
pub fn create_test_logger() -> Logger {
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|env_str| Level::from_str(&env_str).ok())
        .unwrap_or(Level::Info);

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain)
        .build()
        .fuse()
        .filter_level(log_level)
        .fuse();

    slog::Logger::root(drain, o!())
}

/// Writes a stand-in validator script that runs `body` under `/bin/sh`.
pub fn write_script(dir: &Path, body: &str) -> PathBuf {
    let script = dir.join("validator.sh");
    let mut file = std::fs::File::create(&script).unwrap();
    writeln!(file, "{body}").unwrap();
    script
}

/// Binds `count` listeners on consecutive localhost ports. Returns them with
/// the first port.
pub fn consecutive_listeners(count: usize) -> (Vec<TcpListener>, u16) {
    loop {
        let first = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = first.local_addr().unwrap().port();
        if usize::from(base) + count > usize::from(u16::MAX) {
            continue;
        }
        let mut listeners = vec![first];
        for offset in 1..count as u16 {
            match TcpListener::bind(("127.0.0.1", base + offset)) {
                Ok(listener) => listeners.push(listener),
                Err(_) => break,
            }
        }
        if listeners.len() == count {
            return (listeners, base);
        }
    }
}

pub async fn start_servers(listeners: Vec<TcpListener>) -> Vec<MockServer> {
    let mut servers = Vec::with_capacity(listeners.len());
    for listener in listeners {
        servers.push(MockServer::builder().listener(listener).start().await);
    }
    servers
}

/// Pre-seeds node `id`'s key file so the fleet adopts `wallet` as its
/// identity.
pub fn seed_key(data_dir: &Path, id: usize, wallet: &Wallet) {
    let node_dir = data_dir.join(format!("validator-{id}"));
    std::fs::create_dir_all(&node_dir).unwrap();
    wallet
        .write_key_file_if_absent(&node_dir.join(format!("validator-{id}.wif")))
        .unwrap();
}

/// Fleet settings for stand-in validators on `127.0.0.1`.
pub fn fleet_config(dir: &Path, script: PathBuf, base_http_port: u16) -> FleetConfig {
    FleetConfig {
        validator_binary: script,
        interpreter: Some(PathBuf::from("/bin/sh")),
        data_dir: dir.join("data"),
        host: "127.0.0.1".to_string(),
        base_http_port,
        http_timeout: Duration::from_secs(2),
        registration: RetryPolicy {
            attempts: 20,
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(200),
            deadline: Duration::from_secs(5),
        },
        ..FleetConfig::default()
    }
}

pub fn new_fleet(config: FleetConfig, logger: &Logger) -> Fleet {
    let resolver = ConfigResolver::new(Platform::Unix, BTreeMap::new());
    Fleet::new(config, ConfigLayer::new("base"), resolver, logger)
}

/// Makes `server` answer the registry query with `addresses` and accept
/// control messages.
pub async fn mount_registry(server: &MockServer, addresses: &[String]) {
    Mock::given(method("GET"))
        .and(path("/store/EndpointRegistryTransaction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(addresses))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/message"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// Control messages `server` has received, in arrival order.
pub async fn control_messages(server: &MockServer) -> Vec<SignedEnvelope<ControlMessage>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/message")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

#[derive(Default)]
struct LedgerState {
    values: BTreeMap<String, i64>,
    committed: HashSet<TransactionId>,
}

/// Integer-key ledger shared by every fake validator it is mounted on, so
/// all of them serve one replicated state.
#[derive(Clone, Default)]
pub struct FakeLedger {
    state: Arc<Mutex<LedgerState>>,
    /// Accept transactions but never commit them.
    pub stall: bool,
}

impl FakeLedger {
    pub fn stalled() -> Self {
        Self {
            stall: true,
            ..Self::default()
        }
    }

    pub fn values(&self) -> BTreeMap<String, i64> {
        self.state.lock().unwrap().values.clone()
    }

    pub async fn mount(&self, server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/transaction"))
            .respond_with(Submit(self.clone()))
            .mount(server)
            .await;
        Mock::given(method("HEAD"))
            .and(path_regex(r"^/transaction/[0-9a-f]{32}$"))
            .respond_with(Status(self.clone()))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/store/{INTKEY_STORE}/*")))
            .respond_with(Store(self.clone()))
            .mount(server)
            .await;
    }
}

struct Submit(FakeLedger);

impl Respond for Submit {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Ok(envelope) = serde_json::from_slice::<SignedEnvelope<IntKeyTransaction>>(&request.body) else {
            return ResponseTemplate::new(400);
        };
        let Ok(signature) = envelope.signature() else {
            return ResponseTemplate::new(400);
        };
        if envelope.verify().is_err() {
            return ResponseTemplate::new(403);
        }

        let mut state = self.0.state.lock().unwrap();
        let mut values = state.values.clone();
        for update in &envelope.payload.updates {
            match update.apply(values.get(&update.name).copied()) {
                Some(value) => values.insert(update.name.clone(), value),
                None => return ResponseTemplate::new(400),
            };
        }
        state.values = values;
        if !self.0.stall {
            state.committed.insert(TransactionId::from_signature(&signature));
        }
        ResponseTemplate::new(200)
    }
}

struct Status(FakeLedger);

impl Respond for Status {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let id = request
            .url
            .path()
            .rsplit('/')
            .next()
            .and_then(|hex| TransactionId::from_hex(hex).ok());
        match id {
            Some(id) if self.0.state.lock().unwrap().committed.contains(&id) => ResponseTemplate::new(200),
            _ => ResponseTemplate::new(404),
        }
    }
}

struct Store(FakeLedger);

impl Respond for Store {
    fn respond(&self, _: &Request) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(self.0.values())
    }
}
