use super::*;
use std::path::PathBuf;

#[tokio::test]
async fn records_calls_and_serves_queued_response() {
    let runner = FakeRunner::new();
    runner.queue_success("data_in", "ok");
    let out = runner
    .run(
        &PathBuf::from("/bin/dw_wlm_cli"),
        &["--function".to_string(), "data_in".to_string()],
        Duration::from_secs(1),
    )
    .await;
    assert!(out.success);
    assert_eq!(out.stdout, "ok");
    assert_eq!(runner.calls().len(), 1);
}

#[tokio::test]
async fn unscripted_function_falls_back_to_default() {
    let runner = FakeRunner::new();
    let out = runner
    .run(
        &PathBuf::from("/bin/dw_wlm_cli"),
        &["--function".to_string(), "show_pools".to_string()],
        Duration::from_secs(1),
    )
    .await;
    assert!(out.success);
    assert_eq!(out.stdout, "");
}

#[tokio::test]
async fn responses_are_consumed_in_order() {
    let runner = FakeRunner::new();
    runner.queue_failure("teardown", 1, "copy failed");
    runner.queue_success("teardown", "");
    let first = runner
    .run(&PathBuf::from("cli"), &["--function".to_string(), "teardown".to_string()], Duration::from_secs(1))
    .await;
    let second = runner
    .run(&PathBuf::from("cli"), &["--function".to_string(), "teardown".to_string()], Duration::from_secs(1))
    .await;
    assert!(!first.success);
    assert!(second.success);
}
