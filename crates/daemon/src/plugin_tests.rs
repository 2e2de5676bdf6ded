use super::*;
use bb_adapters::{DwWlmClient, FakeRunner};
use bb_core::test_support::FakeHost;
use bb_core::{AllocationKey, UserId};
use bb_storage::{write_snapshot, FakeSnapshotIo, SnapshotRecord};
use std::path::PathBuf;

fn make_plugin(snapshot_io: FakeSnapshotIo) -> (BurstBufferPlugin<FakeRunner, bb_core::FakeClock, FakeHost, FakeSnapshotIo>, FakeRunner) {
    let runner = FakeRunner::new();
    let client = DwWlmClient::new(PathBuf::from("/bin/dw_wlm_cli"), runner.clone());
    let clock = bb_core::FakeClock::default();
    let host = FakeHost::new();
    let mut cfg = bb_core::BbConfig::default();
    cfg.state_save_dir = PathBuf::from("/state");
    (BurstBufferPlugin::new(client, clock, host, cfg, snapshot_io).unwrap(), runner)
}

#[test]
fn starting_with_no_snapshot_succeeds_with_empty_recovery() {
    let (plugin, _runner) = make_plugin(FakeSnapshotIo::new());
    assert!(plugin.runtime().lock_state(|s| s.allocations().next().is_none()));
}

#[tokio::test]
async fn recovered_snapshot_reattributes_once_the_agent_rediscovers_the_session() {
    let io = FakeSnapshotIo::new();
    let record = SnapshotRecord {
        account: "acct".to_string(),
        create_time: 1_650_000_000,
        name: "scratch".to_string(),
        partition: "part".to_string(),
        qos: "normal".to_string(),
        user_id: 1000,
        size: None,
    };
    write_snapshot(&io, &PathBuf::from("/state"), &[record], false).unwrap();

    let (plugin, runner) = make_plugin(io);
    let rt = plugin.runtime();

    runner.queue_success("show_pools", "[]");
    runner.queue_success("show_instances", "[]");
    runner.queue_success("show_sessions", "[{'id': '1', 'token': 'scratch', 'used': true, 'owner': 1000}]");

    rt.sync_once().await;

    let alloc = rt
    .lock_state(|s| s.find_allocation(UserId::new(1000), &AllocationKey::Persistent(UserId::new(1000), "scratch".to_string())).cloned())
    .expect("recovered allocation should be re-attributed");
    assert_eq!(alloc.account, "acct");
    assert_eq!(alloc.create_time, 1_650_000_000);
}
