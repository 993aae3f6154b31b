//! Test Helper Utilities
//!
//! Shared setup for the pipeline tests: a fresh destination node in a
//! temp directory, settings wired to the fake-embulk fixture binary,
//! and the FAKE_EMBULK_* environment reset between tests.

use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;

use embridge_common::events::BridgeEvent;
use embridge_common::store::{init_database, SqliteDataNode};
use embridge_import::{ImportParameters, ImportSettings};

const FAKE_EMBULK: &str = env!("CARGO_BIN_EXE_fake-embulk");

/// Clear every fixture switch. Called at the start of each test so a
/// panicked predecessor cannot leak behavior into it.
pub fn reset_fake_env() {
    for var in [
        "FAKE_EMBULK_USAGE",
        "FAKE_EMBULK_WARN",
        "FAKE_EMBULK_STALL_MS",
        "FAKE_EMBULK_CONTENT_LENGTH",
    ] {
        std::env::remove_var(var);
    }
}

pub async fn open_node(dir: &TempDir, name: &str) -> SqliteDataNode {
    let db_path = dir.path().join("bridge.db");
    let pool = init_database(&db_path).await.expect("init database");
    SqliteDataNode::open(pool, db_path, name)
        .await
        .expect("open node")
}

/// Settings pointing at the fixture binary, with a poll interval quick
/// enough to sample a short-lived run.
pub fn fixture_settings(dir: &TempDir) -> ImportSettings {
    ImportSettings {
        scratch_dir: dir.path().join("scratch"),
        embulk_binary: FAKE_EMBULK.to_string(),
        compression_factor: 10.0,
        poll_interval: Duration::from_millis(20),
        guess_config: true,
        template_config_file: None,
    }
}

pub fn local_params() -> ImportParameters {
    ImportParameters::Local {
        path_prefix: "/data/input/kv_".to_string(),
    }
}

/// Drain the event receiver and return the outcome string of the last
/// ImportFailed event, if any was published.
pub fn failure_outcome(rx: &mut broadcast::Receiver<BridgeEvent>) -> Option<String> {
    let mut outcome = None;
    while let Ok(event) = rx.try_recv() {
        if let BridgeEvent::ImportFailed { outcome: o, .. } = event {
            outcome = Some(o);
        }
    }
    outcome
}
