//! Signed envelopes and validator control messages.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Address;
use crate::wallet::Wallet;

/// Publicly visible endpoint of a validator, as stored in the endpoint
/// registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PeerEndpoint {
    #[serde(rename = "NodeIdentifier")]
    pub address: Address,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub http_port: u16,
}

impl PeerEndpoint {
    /// Client endpoint URL of the peer.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.http_port)
    }
}

/// Administrative messages accepted on a validator's `/message` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "MessageType", rename_all_fields = "PascalCase")]
pub enum ControlMessage {
    /// Ask the receiving validator to shut down.
    Shutdown { sender: Address, nonce: u64 },
    /// Admit `peer` into the receiving validator's quorum.
    AddQuorumNode {
        sender: Address,
        nonce: u64,
        peer: PeerEndpoint,
    },
}

impl ControlMessage {
    pub fn shutdown(sender: &Wallet) -> Self {
        ControlMessage::Shutdown {
            sender: *sender.address(),
            nonce: rand::random(),
        }
    }

    pub fn add_quorum_node(sender: &Wallet, peer: PeerEndpoint) -> Self {
        ControlMessage::AddQuorumNode {
            sender: *sender.address(),
            nonce: rand::random(),
            peer,
        }
    }
}

/// A payload together with the signer's public key and signature.
///
/// The signature covers the JSON serialization of `payload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignedEnvelope<T> {
    pub payload: T,
    pub public_key: String,
    pub signature: String,
}

impl<T: Serialize> SignedEnvelope<T> {
    /// Signs `payload` with `wallet`.
    pub fn sign(payload: T, wallet: &Wallet) -> Result<Self> {
        let bytes = serde_json::to_vec(&payload)?;
        let signature = wallet.sign(&bytes);
        Ok(Self {
            payload,
            public_key: wallet.public_key_hex(),
            signature: hex::encode(signature.to_bytes()),
        })
    }

    pub fn signature(&self) -> Result<Signature> {
        let bytes: [u8; 64] = hex::decode(&self.signature)?
            .try_into()
            .map_err(|_| Error::InvalidArgument("Signature must be 64 bytes".into()))?;
        Ok(Signature::from_bytes(&bytes))
    }

    pub fn public_key(&self) -> Result<VerifyingKey> {
        let bytes: [u8; 32] = hex::decode(&self.public_key)?
            .try_into()
            .map_err(|_| Error::InvalidKey("Public key must be 32 bytes".into()))?;
        Ok(VerifyingKey::from_bytes(&bytes)?)
    }

    /// Address of the signer.
    pub fn signer(&self) -> Result<Address> {
        Ok(Address::from_public_key(&self.public_key()?))
    }

    /// Checks the signature against the embedded public key.
    pub fn verify(&self) -> Result<()> {
        let bytes = serde_json::to_vec(&self.payload)?;
        self.public_key()?.verify(&bytes, &self.signature()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(wallet: &Wallet) -> PeerEndpoint {
        PeerEndpoint {
            address: *wallet.address(),
            name: "validator-1".into(),
            host: "localhost".into(),
            port: 5501,
            http_port: 8801,
        }
    }

    #[test]
    fn signed_envelope_verifies() {
        let admin = Wallet::generate();
        let envelope = SignedEnvelope::sign(ControlMessage::shutdown(&admin), &admin).unwrap();
        envelope.verify().unwrap();
        assert_eq!(&envelope.signer().unwrap(), admin.address());
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let admin = Wallet::generate();
        let node = Wallet::generate();
        let mut envelope =
            SignedEnvelope::sign(ControlMessage::add_quorum_node(&admin, peer(&node)), &admin)
                .unwrap();
        if let ControlMessage::AddQuorumNode { peer, .. } = &mut envelope.payload {
            peer.http_port = 9999;
        }
        assert!(envelope.verify().is_err());
    }

    #[test]
    fn control_message_wire_format() {
        let admin = Wallet::generate();
        let node = Wallet::generate();
        let message = ControlMessage::add_quorum_node(&admin, peer(&node));
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["MessageType"], "AddQuorumNode");
        assert_eq!(json["Peer"]["NodeIdentifier"], node.address().to_hex());
        assert_eq!(json["Peer"]["HttpPort"], 8801);
        assert!(json["Sender"].is_string());
    }

    #[test]
    fn peer_endpoint_url() {
        assert_eq!(peer(&Wallet::generate()).url(), "http://localhost:8801");
    }
}
