//! Quorum admission.
//!
//! A voting validator only participates in consensus once it has been told
//! which peers form its quorum. The orchestrator delivers one admission per
//! (node, peer) pair through [`QuorumMembership`].

use std::time::Duration;

use async_trait::async_trait;
use sdk::{ClientConfig, ControlMessage, LedgerWebClient, PeerEndpoint, SignedEnvelope, Wallet};

/// Node receiving an admission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdmissionTarget {
    pub id: u32,
    pub name: String,
    pub url: String,
}

/// Delivers quorum admissions to validators.
#[async_trait]
pub trait QuorumMembership: Send + Sync {
    /// Tells `target` to treat `peer` as a quorum participant. The message is
    /// authorized by `admin`.
    async fn add_quorum_node(
        &self,
        admin: &Wallet,
        target: &AdmissionTarget,
        peer: &PeerEndpoint,
    ) -> sdk::Result<()>;
}

/// Posts a signed `AddQuorumNode` control message to the target's
/// `/message` endpoint.
#[derive(Clone, Debug)]
pub struct HttpQuorumMembership {
    timeout: Duration,
}

impl HttpQuorumMembership {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl QuorumMembership for HttpQuorumMembership {
    async fn add_quorum_node(
        &self,
        admin: &Wallet,
        target: &AdmissionTarget,
        peer: &PeerEndpoint,
    ) -> sdk::Result<()> {
        let web = LedgerWebClient::with_config(
            ClientConfig::new(target.url.clone()).with_timeout(self.timeout),
        )?;
        let message = SignedEnvelope::sign(ControlMessage::add_quorum_node(admin, peer.clone()), admin)?;
        web.post_message(&message).await
    }
}
