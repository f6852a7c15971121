//! Integer-key ledger client.

use std::collections::BTreeMap;

use crate::client::LedgerWebClient;
use crate::error::Result;
use crate::transaction::{TxBuilder, TxStatus};
use crate::types::TransactionId;
use crate::wallet::Wallet;

/// Store holding the integer-key state.
pub const INTKEY_STORE: &str = "IntegerKeyTransaction";

/// Submits integer-key transactions to one validator, signed by one wallet.
#[derive(Clone, Debug)]
pub struct IntegerKeyClient {
    web: LedgerWebClient,
    wallet: Wallet,
}

impl IntegerKeyClient {
    pub fn new(web: LedgerWebClient, wallet: Wallet) -> Self {
        Self { web, wallet }
    }

    pub fn web(&self) -> &LedgerWebClient {
        &self.web
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    async fn submit(&self, builder: TxBuilder) -> Result<TransactionId> {
        let tx = builder.sign(&self.wallet, rand::random())?;
        self.web.post_transaction(&tx).await
    }

    pub async fn set(&self, name: &str, value: i64) -> Result<TransactionId> {
        self.submit(TxBuilder::set(name, value)).await
    }

    pub async fn inc(&self, name: &str, value: i64) -> Result<TransactionId> {
        self.submit(TxBuilder::inc(name, value)).await
    }

    pub async fn dec(&self, name: &str, value: i64) -> Result<TransactionId> {
        self.submit(TxBuilder::dec(name, value)).await
    }

    pub async fn is_committed(&self, id: &TransactionId) -> Result<bool> {
        Ok(self.web.transaction_status(id).await? == TxStatus::Committed)
    }

    /// Current key/value state as seen by this validator.
    pub async fn fetch_state(&self) -> Result<BTreeMap<String, i64>> {
        self.web.fetch_store(INTKEY_STORE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SignedEnvelope;
    use crate::transaction::{IntKeyTransaction, Verb};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn inc_posts_signed_update() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transaction"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = IntegerKeyClient::new(
            LedgerWebClient::connect(&server.uri()).unwrap(),
            Wallet::generate(),
        );
        client.inc("4", 2).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let envelope: SignedEnvelope<IntKeyTransaction> =
            serde_json::from_slice(&requests[0].body).unwrap();
        envelope.verify().unwrap();
        assert_eq!(&envelope.signer().unwrap(), client.wallet().address());
        let update = &envelope.payload.updates[0];
        assert_eq!(update.verb, Verb::Inc);
        assert_eq!(update.name, "4");
        assert_eq!(update.value, 2);
    }

    #[tokio::test]
    async fn fetch_state_reads_store() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/IntegerKeyTransaction/*"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "1": 12, "2": 7 })),
            )
            .mount(&server)
            .await;

        let client = IntegerKeyClient::new(
            LedgerWebClient::connect(&server.uri()).unwrap(),
            Wallet::generate(),
        );
        let state = client.fetch_state().await.unwrap();
        assert_eq!(state, BTreeMap::from([("1".to_string(), 12), ("2".to_string(), 7)]));
    }
}
