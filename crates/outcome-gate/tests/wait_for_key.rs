//! Search-and-restore behaviour of `wait_for_key`.

use std::sync::Arc;
use std::time::Duration;

use outcome_gate::{Outcome, Validator, ValidatorError};

/// Delay that lets detached re-sends reach the channel.
const SETTLE: Duration = Duration::from_millis(50);

/// Test: peek a success record, later drain still sees the failure.
#[tokio::test]
async fn test_wait_for_key_then_drain_sees_everything() {
    let v = Validator::new();
    v.declare_expected(2);
    v.record_failure("x", "boom");
    v.record_success("y");

    let found = v.wait_for_key("y").await.expect("search");
    assert_eq!(found, Some(Outcome::success("y")));

    tokio::time::sleep(SETTLE).await;
    let failures = v.collect_failures().await.expect("drain");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures["x"], vec!["boom".to_string()]);
}

/// Test: a missing key returns None after scanning every expected outcome.
#[tokio::test]
async fn test_wait_for_missing_key_returns_none() {
    let v = Validator::new();
    v.declare_expected(3);
    v.record_failure("a", "bad a");
    v.record_success("b");
    v.record_failure("c", "bad c");

    let found = v.wait_for_key("zzz").await.expect("search");
    assert_eq!(found, None);

    tokio::time::sleep(SETTLE).await;
    let failures = v.collect_failures().await.expect("drain");
    assert_eq!(failures.len(), 2);
    assert_eq!(failures["a"], vec!["bad a".to_string()]);
    assert_eq!(failures["c"], vec!["bad c".to_string()]);
}

/// Test: the matching failure is returned as a copy and is not consumed.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_wait_for_failure_key_returns_copy() {
    let v = Arc::new(Validator::new());
    v.declare_expected(10);
    for i in 0..9 {
        v.record_success(format!("ok-{i}"));
    }
    v.record_failure("target", "needle");

    let found = v.wait_for_key("target").await.expect("search");
    assert_eq!(found, Some(Outcome::failure("target", "needle")));

    tokio::time::sleep(SETTLE).await;
    let failures = v.collect_failures().await.expect("drain");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures["target"], vec!["needle".to_string()]);
}

/// Test: repeated probes leave the full set intact.
#[tokio::test]
async fn test_repeated_probes_are_non_destructive() {
    let v = Validator::new();
    v.declare_expected(3);
    v.record_failure("a", "1");
    v.record_failure("b", "2");
    v.record_failure("c", "3");

    for key in ["c", "a", "missing", "b"] {
        v.wait_for_key(key).await.expect("search");
        tokio::time::sleep(SETTLE).await;
    }

    let failures = v.collect_failures().await.expect("drain");
    assert_eq!(failures.len(), 3);
}

/// Test: a bounded search restores what it pulled before timing out.
#[tokio::test]
async fn test_wait_for_key_timeout_restores_pulled() {
    let v = Validator::new();
    v.declare_expected(2);
    v.record_failure("early", "seen");

    let err = v
        .wait_for_key_within("late", Duration::from_millis(50))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ValidatorError::DrainTimedOut {
            received: 1,
            expected: 2
        }
    );

    v.record_failure("late", "arrived");
    tokio::time::sleep(SETTLE).await;
    let failures = v.collect_failures().await.expect("drain");
    assert_eq!(failures["early"], vec!["seen".to_string()]);
    assert_eq!(failures["late"], vec!["arrived".to_string()]);
}
