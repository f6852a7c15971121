//! Fleet bring-up against stand-in validators.
//!
//! Each node's process is a `/bin/sh` script that sleeps; its client port is
//! served by a wiremock server that answers the endpoint registry and
//! records control messages.

use std::time::Duration;

use fleet::{FleetError, JoinOutcome};
use sdk::{ControlMessage, PeerEndpoint, Wallet};
use supervisor::NodeState;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{
    consecutive_listeners, control_messages, create_test_logger, fleet_config, new_fleet,
    mount_registry, seed_key, start_servers, write_script,
};

/// Peers admitted to the node served by `server`.
async fn admitted_peers(server: &MockServer, admin: &Wallet) -> Vec<PeerEndpoint> {
    control_messages(server)
        .await
        .into_iter()
        .filter_map(|envelope| {
            envelope.verify().unwrap();
            assert_eq!(&envelope.signer().unwrap(), admin.address());
            match envelope.payload {
                ControlMessage::AddQuorumNode { peer, .. } => Some(peer),
                ControlMessage::Shutdown { .. } => None,
            }
        })
        .collect()
}

async fn shutdown_requests(server: &MockServer) -> usize {
    control_messages(server)
        .await
        .iter()
        .filter(|envelope| matches!(envelope.payload, ControlMessage::Shutdown { .. }))
        .count()
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn fleet_bootstraps_full_quorum_and_admits_a_late_node() {
    let logger = create_test_logger();
    let dir = TempDir::new().unwrap();
    let (listeners, base_port) = consecutive_listeners(4);
    let servers = start_servers(listeners).await;

    let wallets: Vec<Wallet> = (0..4).map(|_| Wallet::generate()).collect();
    let addresses: Vec<String> = wallets.iter().map(|w| w.address().to_hex()).collect();
    let config = fleet_config(dir.path(), write_script(dir.path(), "sleep 30"), base_port);
    for (id, (server, wallet)) in servers.iter().zip(&wallets).enumerate() {
        mount_registry(server, &addresses).await;
        seed_key(&config.data_dir, id, wallet);
    }
    let mut fleet = new_fleet(config, &logger);

    let report = fleet.launch_network(3).await.unwrap();

    assert!(report.is_complete(), "{:?}", report.failed);
    assert_eq!(report.launched, vec![0, 1, 2]);
    assert_eq!(report.joined, vec![0, 1, 2]);
    assert_eq!(fleet.admin().unwrap().address(), wallets[0].address());
    for target in 0..3u32 {
        for peer in 0..3usize {
            assert_eq!(
                fleet.is_admitted(target, wallets[peer].address()),
                target as usize != peer,
                "node {target} peer {peer}"
            );
        }
        let peers = admitted_peers(&servers[target as usize], &wallets[0]).await;
        assert_eq!(peers.len(), 2);
        for peer in &peers {
            assert_ne!(peer.address, *wallets[target as usize].address());
            assert_eq!(peer.host, "127.0.0.1");
        }
    }
    assert_eq!(fleet.endpoint(1).unwrap().http_port, base_port + 1);

    let late = fleet.launch_node(true).await.unwrap();
    assert_eq!(late.id, 3);
    assert_eq!(late.outcome, JoinOutcome::Joined);
    assert_eq!(admitted_peers(&servers[3], &wallets[0]).await.len(), 3);
    for server in &servers[..3] {
        let peers = admitted_peers(server, &wallets[0]).await;
        assert_eq!(peers.len(), 3, "each admission is delivered once");
        assert!(peers.iter().any(|p| p.address == *wallets[3].address()));
    }

    fleet.terminate(Duration::from_millis(200)).await;
    for server in &servers {
        assert_eq!(shutdown_requests(server).await, 1);
    }
    for status in fleet.status() {
        assert!(matches!(status.state, NodeState::Shutdown(_)), "{status}");
    }
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn unregistered_node_is_left_out_of_the_quorum() {
    let logger = create_test_logger();
    let dir = TempDir::new().unwrap();
    let (listeners, base_port) = consecutive_listeners(3);
    let servers = start_servers(listeners).await;

    let wallets: Vec<Wallet> = (0..3).map(|_| Wallet::generate()).collect();
    let addresses: Vec<String> = wallets.iter().map(|w| w.address().to_hex()).collect();
    let mut config = fleet_config(dir.path(), write_script(dir.path(), "sleep 30"), base_port);
    config.registration.deadline = Duration::from_millis(500);
    for (id, wallet) in wallets.iter().enumerate() {
        seed_key(&config.data_dir, id, wallet);
    }
    mount_registry(&servers[0], &addresses).await;
    mount_registry(&servers[2], &addresses).await;
    // Node 1 serves its registry as plain text, which does not count.
    Mock::given(method("GET"))
        .and(path("/store/EndpointRegistryTransaction"))
        .respond_with(ResponseTemplate::new(200).set_body_string(addresses.join(",")))
        .mount(&servers[1])
        .await;
    let mut fleet = new_fleet(config, &logger);

    let report = fleet.launch_network(3).await.unwrap();

    assert_eq!(report.launched, vec![0, 1, 2]);
    assert_eq!(report.joined, vec![0, 2]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].name, "validator-1");
    assert!(fleet.is_admitted(0, wallets[2].address()));
    assert!(fleet.is_admitted(2, wallets[0].address()));
    assert!(!fleet.is_admitted(0, wallets[1].address()));
    assert!(admitted_peers(&servers[1], &wallets[0]).await.is_empty());

    fleet.kill().await;
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn restored_fleet_keeps_identities_and_has_no_genesis() {
    let logger = create_test_logger();
    let dir = TempDir::new().unwrap();
    let (listeners, base_port) = consecutive_listeners(2);
    let servers = start_servers(listeners).await;
    let wallets: Vec<Wallet> = (0..2).map(|_| Wallet::generate()).collect();
    let addresses: Vec<String> = wallets.iter().map(|w| w.address().to_hex()).collect();
    for server in &servers {
        mount_registry(server, &addresses).await;
    }

    let script = write_script(dir.path(), "sleep 30");
    let config = fleet_config(dir.path(), script.clone(), base_port);
    for (id, wallet) in wallets.iter().enumerate() {
        seed_key(&config.data_dir, id, wallet);
    }
    let mut original = new_fleet(config, &logger);
    original.launch_network(2).await.unwrap();
    std::fs::write(original.nodes()[0].node_dir().join("block-0.dat"), b"genesis").unwrap();
    original.terminate(Duration::from_millis(200)).await;
    let archive = dir.path().join("ledger.tar.gz");
    original.pack_blockchain(&archive).unwrap();
    let results = dir.path().join("results.tar.gz");
    original.create_result_archive(&results).unwrap();
    assert!(results.metadata().unwrap().len() > 0);

    let restored_dir = TempDir::new().unwrap();
    let mut config = fleet_config(restored_dir.path(), script, base_port);
    config.blockchain_archive = Some(archive);
    let mut restored = new_fleet(config, &logger);
    let report = restored.launch_network(2).await.unwrap();

    assert!(report.is_complete(), "{:?}", report.failed);
    for (node, wallet) in restored.nodes().iter().zip(&wallets) {
        assert_eq!(node.identity().address(), wallet.address());
        assert!(!node.config().genesis_ledger);
    }
    let block = restored.nodes()[0].node_dir().join("block-0.dat");
    assert_eq!(std::fs::read(block).unwrap(), b"genesis");

    restored.kill().await;
}

#[tokio::test]
async fn missing_config_file_spawns_nothing() {
    let logger = create_test_logger();
    let dir = TempDir::new().unwrap();
    let mut config = fleet_config(dir.path(), write_script(dir.path(), "sleep 30"), 18800);
    config.config_files = vec!["absent.js".to_string()];
    let mut fleet = new_fleet(config, &logger);

    let err = fleet.launch_network(2).await.unwrap_err();

    assert!(matches!(err, FleetError::Config(_)), "{err}");
    assert!(fleet.is_empty());
}
