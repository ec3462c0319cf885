//! Integration tests for configuration loader
//!
//! Loads configuration from files on disk and drives a scheduler with it.

use std::sync::Arc;
use std::time::Duration;

use delayq_common::MockClock;
use delayq_domain::{BackoffKind, DelayqError, JobMessage};
use delayq_infra::config;
use delayq_infra::queue::InMemoryQueue;
use delayq_infra::scheduling::{CycleOutcome, FnJobHandler, RetryScheduler, TracingErrorReporter};

fn write_config(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("Failed to write config file");
    path
}

#[tokio::test]
async fn test_loaded_toml_drives_the_scheduler() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = write_config(
        &dir,
        "delayq.toml",
        r#"
[queue]
url = "memory://integration"
receive_wait_secs = 20
max_delay_secs = 60

[retry]
max_attempts = 5

[retry.backoff]
kind = "constant"
seed_secs = 150
"#,
    );

    let config = config::load_from_file(Some(path)).expect("TOML config should load");
    assert_eq!(config.retry.backoff.kind, BackoffKind::Constant);

    let clock = MockClock::new();
    let queue = Arc::new(InMemoryQueue::simulated(clock.clone()));
    let handler = FnJobHandler(|job: &JobMessage| job.attempted_count >= 2);
    let reporter = Arc::new(TracingErrorReporter);
    let scheduler = RetryScheduler::new(queue.clone(), Arc::new(handler), reporter, &config)
        .expect("loaded config is valid")
        .with_clock(Arc::new(clock.clone()));

    // The 60s ceiling from the file caps every send of the 150s backoff.
    let first = scheduler.job("job-1").await.expect("job runs");
    assert!(matches!(
        first,
        CycleOutcome::Retried { delay, .. } if delay == Duration::from_secs(60)
    ));

    let mut outcomes = Vec::new();
    while !matches!(outcomes.last(), Some(CycleOutcome::Completed { .. })) {
        let outcome = scheduler.poll_once().await;
        if outcome != CycleOutcome::Empty {
            outcomes.push(outcome);
        }
    }

    assert_eq!(outcomes.len(), 3, "two carried hops then the attempt: {outcomes:?}");
    assert_eq!(clock.elapsed(), Duration::from_secs(150));
    assert!(queue.is_empty());
}

#[test]
fn test_load_config_from_json_file_with_defaults() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_config(&dir, "delayq.json", r#"{ "queue": { "url": "memory://json" } }"#);

    let config = config::load_from_file(Some(path))?;

    assert_eq!(config.queue.url, "memory://json");
    assert_eq!(config.queue.receive_wait_secs, 10);
    assert_eq!(config.retry.max_attempts, 0);
    assert_eq!(config.retry.backoff.kind, BackoffKind::Exponential);
    assert_eq!(config.retry.due_tolerance_secs, 2);
    Ok(())
}

#[test]
fn test_load_config_with_invalid_format() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = write_config(&dir, "delayq.json", r#"{ "this is": "not valid" "#);

    match config::load_from_file(Some(path)) {
        Err(DelayqError::Config(msg)) => {
            assert!(msg.contains("Invalid JSON"), "Error message should mention invalid JSON");
        }
        other => panic!("Expected Config error, got {other:?}"),
    }
}

#[test]
fn test_load_config_rejects_out_of_range_wait() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = write_config(&dir, "delayq.toml", "[queue]\nreceive_wait_secs = 45\n");

    let err = config::load_from_file(Some(path)).expect_err("45s wait exceeds the long-poll limit");
    assert!(matches!(err, DelayqError::Config(msg) if msg.contains("receive_wait_secs")));
}

#[test]
fn test_load_config_from_nonexistent_file() {
    let result = config::load_from_file(Some("/nonexistent/path/delayq.json".into()));

    match result {
        Err(DelayqError::Config(msg)) => {
            assert!(msg.contains("not found"), "Error message should mention 'not found'");
        }
        other => panic!("Expected Config error, got {other:?}"),
    }
}
