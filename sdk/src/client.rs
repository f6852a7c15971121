//! Validator web API client

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::message::{ControlMessage, PeerEndpoint, SignedEnvelope};
use crate::transaction::{SignedTransaction, TxStatus};
use crate::types::{Address, TransactionId};

/// Store holding one endpoint record per registered validator.
pub const ENDPOINT_REGISTRY_STORE: &str = "EndpointRegistryTransaction";

/// Configuration for connecting to a validator.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Validator client endpoint (e.g., "http://localhost:8800").
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Attempts for idempotent requests that hit a transport or server error.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further attempt.
    pub retry_backoff: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8800".into(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

impl ClientConfig {
    /// Create config with endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, retry_backoff: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_backoff = retry_backoff;
        self
    }
}

/// Outcome of probing a validator's readiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub available: bool,
    /// Why the probe failed, when it did.
    pub detail: Option<String>,
}

impl Probe {
    fn up() -> Self {
        Self {
            available: true,
            detail: None,
        }
    }

    fn down(detail: impl Into<String>) -> Self {
        Self {
            available: false,
            detail: Some(detail.into()),
        }
    }
}

/// Client for a single validator's web API.
///
/// # Example
/// ```ignore
/// use sdk::LedgerWebClient;
///
/// let client = LedgerWebClient::connect("http://localhost:8800")?;
/// if client.registry_probe().await.available {
///     let peers = client.endpoint_record(&address).await?;
/// }
/// ```
#[derive(Clone, Debug)]
pub struct LedgerWebClient {
    http: Client,
    config: ClientConfig,
}

impl LedgerWebClient {
    /// Client for `endpoint` with default config.
    pub fn connect(endpoint: &str) -> Result<Self> {
        Self::with_config(ClientConfig::new(endpoint))
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn url(&self) -> &str {
        &self.config.endpoint
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    /// Sends an idempotent request, retrying transport and server errors with
    /// doubling backoff.
    async fn send_with_retry<F>(&self, mut build: F) -> Result<Response>
    where
        F: FnMut() -> RequestBuilder,
    {
        let attempts = self.config.max_retries.max(1);
        let mut delay = self.config.retry_backoff;
        let mut attempt = 1;
        loop {
            match build().send().await {
                Ok(resp) if resp.status().is_server_error() && attempt < attempts => {}
                Ok(resp) => return Ok(resp),
                Err(err) if attempt >= attempts => return Err(err.into()),
                Err(_) => {}
            }
            tokio::time::sleep(delay).await;
            delay = delay.saturating_mul(2);
            attempt += 1;
        }
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response> {
        let resp = self.http.post(self.endpoint(path)).json(body).send().await?;
        ensure_success(resp).await
    }

    /// Posts a signed control message to `/message`.
    pub async fn post_message(&self, message: &SignedEnvelope<ControlMessage>) -> Result<()> {
        self.post_json("/message", message).await?;
        Ok(())
    }

    /// Submits a signed transaction to `/transaction`.
    ///
    /// Returns the transaction id once the node has accepted it.
    pub async fn post_transaction(&self, tx: &SignedTransaction) -> Result<TransactionId> {
        self.post_json("/transaction", &tx.envelope).await?;
        Ok(tx.id)
    }

    /// Commit status of `id` as seen by this node.
    pub async fn transaction_status(&self, id: &TransactionId) -> Result<TxStatus> {
        let url = self.endpoint(&format!("/transaction/{id}"));
        let resp = self.send_with_retry(|| self.http.head(&url)).await?;
        Ok(if resp.status() == StatusCode::OK {
            TxStatus::Committed
        } else {
            TxStatus::Pending
        })
    }

    /// Addresses listed by the endpoint registry store.
    ///
    /// The answer must carry a JSON content type; non-string entries are
    /// ignored.
    pub async fn registered_addresses(&self) -> Result<Vec<String>> {
        let url = self.endpoint(&format!("/store/{ENDPOINT_REGISTRY_STORE}"));
        let resp = ensure_success(self.http.get(&url).send().await?).await?;
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_json(&content_type) {
            return Err(Error::UnexpectedContentType(content_type));
        }
        let body: serde_json::Value = resp.json().await?;
        Ok(body
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Probes the endpoint registry store.
    ///
    /// The node counts as available only when the store answers with a JSON
    /// body. Transport failures are reported in the probe, never as errors.
    pub async fn registry_probe(&self) -> Probe {
        match self.registered_addresses().await {
            Ok(_) => Probe::up(),
            Err(e) => Probe::down(e.to_string()),
        }
    }

    /// Endpoint registry record for `address`, `None` when not registered.
    pub async fn endpoint_record(&self, address: &Address) -> Result<Option<PeerEndpoint>> {
        let url = self.endpoint(&format!("/store/{ENDPOINT_REGISTRY_STORE}/{address}"));
        let resp = self.send_with_retry(|| self.http.get(&url)).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = ensure_success(resp).await?;
        Ok(Some(resp.json().await?))
    }

    /// Full contents of the store `name`.
    pub async fn fetch_store<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let url = self.endpoint(&format!("/store/{name}/*"));
        let resp = self.send_with_retry(|| self.http.get(&url)).await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json().await?)
    }
}

fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
}

async fn ensure_success(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Rejected {
        status: status.as_u16(),
        body: body.trim().to_string(),
    })
}
