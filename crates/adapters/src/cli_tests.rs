use super::*;
use crate::fake_runner::FakeRunner;
use std::path::PathBuf;

fn client() -> (DwWlmClient<FakeRunner>, FakeRunner) {
    let runner = FakeRunner::new();
    let client = DwWlmClient::new(PathBuf::from("/opt/cray/dw_wlm/default/bin/dw_wlm_cli"), runner.clone());
    (client, runner)
}

#[tokio::test]
async fn data_in_builds_expected_argv() {
    let (client, runner) = client();
    runner.queue_success("data_in", "");
    client.data_in("jid1", Path::new("/tmp/script"), Duration::from_secs(1)).await;
    let call = &runner.calls()[0];
    assert_eq!(
        call.args,
        vec!["--function", "data_in", "--token", "jid1", "--job", "/tmp/script"]
    );
}

#[tokio::test]
async fn teardown_appends_hurry_flag_only_when_requested() {
    let (client, runner) = client();
    runner.queue_success("teardown", "");
    client.teardown("jid1", Path::new("/tmp/script"), true, Duration::from_secs(1)).await;
    let call = &runner.calls()[0];
    assert!(call.args.contains(&"--hurry".to_string()));
}

#[tokio::test]
async fn create_persistent_includes_optional_flags() {
    let (client, runner) = client();
    runner.queue_success("create_persistent", "");
    client
    .create_persistent("foo", 1000, "pool1:1073741824", Some("striped"), None, Duration::from_secs(1))
    .await;
    let call = &runner.calls()[0];
    assert!(call.args.contains(&"-a".to_string()));
    assert!(call.args.contains(&"striped".to_string()));
    assert!(!call.args.contains(&"-T".to_string()));
}

#[tokio::test]
async fn show_instances_parses_python_repr_output() {
    let (client, runner) = client();
    runner.queue_success("show_instances", "[{u'id': 1, u'label': u'a'}]");
    let instances = client.show_instances(Duration::from_secs(1)).await.unwrap();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].id, 1);
    assert_eq!(instances[0].label, "a");
}

#[tokio::test]
async fn setup_includes_node_list_flag_when_given() {
    let (client, runner) = client();
    runner.queue_success("setup", "");
    client
    .setup(
        "jid1",
        1000,
        "pool1:1073741824",
        Path::new("/tmp/script"),
        Some(&NodeList::NidListFile(PathBuf::from("/tmp/nids"))),
        Duration::from_secs(1),
    )
    .await;
    let call = &runner.calls()[0];
    assert!(call.args.contains(&"--nidlistfile".to_string()));
    assert!(call.args.contains(&"/tmp/nids".to_string()));
}
