//! Per-node identity.

use std::path::Path;

use sdk::{Address, PeerEndpoint, Wallet};

/// Identity of one validator: fleet-local id and name, network endpoints and
/// signing key.
///
/// The key is fixed for the lifetime of the identity; the address is derived
/// from it.
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    pub id: u32,
    pub name: String,
    pub host: String,
    pub client_port: u16,
    pub consensus_port: u16,
    wallet: Wallet,
}

impl NodeIdentity {
    /// Creates an identity with a freshly generated signing key.
    pub fn generate(
        id: u32,
        name: impl Into<String>,
        host: impl Into<String>,
        client_port: u16,
        consensus_port: u16,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            host: host.into(),
            client_port,
            consensus_port,
            wallet: Wallet::generate(),
        }
    }

    /// Replaces the signing key with the one stored in `key_file`, if that
    /// file exists.
    ///
    /// Used when a node's data directory was restored from an archive: the
    /// node must keep the identity its ledger was built with.
    pub fn adopt_key_file(mut self, key_file: &Path) -> sdk::Result<Self> {
        if key_file.is_file() {
            self.wallet = Wallet::load_key_file(key_file)?;
        }
        Ok(self)
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn address(&self) -> &Address {
        self.wallet.address()
    }

    /// Client endpoint URL.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.client_port)
    }

    /// Endpoint this node advertises when its registry record is unavailable.
    pub fn peer_endpoint(&self) -> PeerEndpoint {
        PeerEndpoint {
            address: *self.address(),
            name: self.name.clone(),
            host: self.host.clone(),
            port: self.consensus_port,
            http_port: self.client_port,
        }
    }
}
