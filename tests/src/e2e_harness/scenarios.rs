//! Load and consistency runs over HTTP against fake validators that share
//! one replicated integer-key store.

use std::time::Duration;

use harness::{HarnessConfig, HarnessError, LoadHarness};
use wiremock::MockServer;

use crate::common::{FakeLedger, create_test_logger};

async fn fake_fleet(ledger: &FakeLedger, nodes: usize) -> (Vec<MockServer>, Vec<String>) {
    let mut servers = Vec::with_capacity(nodes);
    for _ in 0..nodes {
        let server = MockServer::start().await;
        ledger.mount(&server).await;
        servers.push(server);
    }
    let urls = servers.iter().map(MockServer::uri).collect();
    (servers, urls)
}

fn config() -> HarnessConfig {
    HarnessConfig {
        poll_interval: Duration::from_millis(20),
        commit_timeout: Duration::from_secs(5),
        ..HarnessConfig::default()
    }
}

#[tokio::test]
async fn three_keys_two_rounds_end_two_above_initial() {
    let logger = create_test_logger();
    let ledger = FakeLedger::default();
    let (_servers, urls) = fake_fleet(&ledger, 2).await;
    let mut harness = LoadHarness::connect(&urls, config(), &logger).unwrap();

    harness.setup(3).await.unwrap();
    let initial = ledger.values();
    assert_eq!(initial.keys().collect::<Vec<_>>(), ["1", "2", "3"]);
    assert!(initial.values().all(|v| (5..=1000).contains(v)));

    harness.run(2).await.unwrap();
    harness.validate().await.unwrap();

    for (key, value) in ledger.values() {
        assert_eq!(value, initial[&key] + 2, "key {key}");
    }
    assert!(harness.pending().is_empty());
}

#[tokio::test]
async fn consistency_holds_for_many_rounds() {
    let logger = create_test_logger();
    let ledger = FakeLedger::default();
    let (_servers, urls) = fake_fleet(&ledger, 3).await;
    let mut harness = LoadHarness::connect(&urls, config(), &logger).unwrap();

    harness.setup(5).await.unwrap();
    let initial = ledger.values();
    harness.run(4).await.unwrap();
    harness.validate().await.unwrap();

    for (key, value) in ledger.values() {
        assert_eq!(value, initial[&key] + 4);
    }
}

#[tokio::test]
async fn stalled_ledger_reports_uncommitted_transactions() {
    let logger = create_test_logger();
    let ledger = FakeLedger::stalled();
    let (_servers, urls) = fake_fleet(&ledger, 1).await;
    let config = HarnessConfig {
        commit_timeout: Duration::from_millis(200),
        ..config()
    };
    let mut harness = LoadHarness::connect(&urls, config, &logger).unwrap();

    let err = harness.setup(3).await.unwrap_err();

    match err {
        HarnessError::UncommittedTransactions { count, ids, waited } => {
            assert_eq!(count, 3);
            assert_eq!(ids.len(), 3);
            assert!(waited >= Duration::from_millis(200));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unreachable_node_fails_setup() {
    let logger = create_test_logger();
    let urls = vec!["http://127.0.0.1:1".to_string()];
    let mut harness = LoadHarness::connect(&urls, config(), &logger).unwrap();

    let err = harness.setup(1).await.unwrap_err();
    assert!(matches!(err, HarnessError::SubmissionFailed { op: "set", .. }), "{err}");
}
