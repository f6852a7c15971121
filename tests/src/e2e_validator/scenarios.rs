//! Scenarios against a real validator binary.
//!
//! Ignored by default. Run with:
//! ```bash
//! ENABLE_INTEGRATION_TESTS=1 VALIDATOR_BINARY=/path/to/validator \
//!     cargo test -p tests -- --ignored
//! ```
//! `VALIDATOR_INTERPRETER` may name an interpreter for script validators.

use std::path::PathBuf;
use std::time::Duration;

use harness::{HarnessConfig, LoadHarness};
use tempfile::TempDir;

use crate::common::{create_test_logger, new_fleet};

fn validator_binary() -> Option<PathBuf> {
    if std::env::var("ENABLE_INTEGRATION_TESTS").as_deref() != Ok("1") {
        return None;
    }
    std::env::var_os("VALIDATOR_BINARY").map(PathBuf::from)
}

#[tokio::test]
#[ignore]
async fn two_validators_stay_consistent_under_load() {
    let Some(binary) = validator_binary() else {
        eprintln!("skipping: set ENABLE_INTEGRATION_TESTS=1 and VALIDATOR_BINARY");
        return;
    };
    let logger = create_test_logger();
    let dir = TempDir::new().unwrap();
    let config = fleet::FleetConfig {
        validator_binary: binary,
        interpreter: std::env::var_os("VALIDATOR_INTERPRETER").map(PathBuf::from),
        data_dir: dir.path().join("data"),
        log_level: "INFO".to_string(),
        ..fleet::FleetConfig::default()
    };
    let mut fleet = new_fleet(config, &logger);

    let report = fleet.launch_network(2).await.unwrap();
    assert!(report.is_complete(), "{:?}", report.failed);

    let mut harness = LoadHarness::connect(&fleet.urls(), HarnessConfig::default(), &logger).unwrap();
    let outcome = async {
        harness.setup(3).await?;
        harness.run(2).await?;
        harness.validate().await
    }
    .await;

    if outcome.is_err() {
        let results = dir.path().join("results.tar.gz");
        fleet.create_result_archive(&results).unwrap();
        eprintln!("fleet results kept at {}", results.display());
        let _ = dir.keep();
    }
    fleet.terminate(Duration::from_secs(10)).await;
    outcome.unwrap();
}
