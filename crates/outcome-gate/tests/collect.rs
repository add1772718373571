//! Drain-and-classify behaviour of `collect_failures`.

use std::sync::Arc;

use futures::future::join_all;
use outcome_gate::{check_condition, record_failure, Validator};

/// Test: the three-outcome scenario — success dropped, failures grouped.
#[tokio::test]
async fn test_collect_groups_failures_by_key() {
    let v = Arc::new(Validator::new());
    v.declare_expected(3);

    // Serialize the two "b" failures so their order is deterministic.
    let producer = {
        let v = Arc::clone(&v);
        tokio::spawn(async move {
            v.record_outcome("a", "", false).await.expect("a");
            v.record_outcome("b", "bad b", true).await.expect("b1");
            v.record_outcome("b", "bad b again", true).await.expect("b2");
        })
    };

    let failures = v.collect_failures().await.expect("drain");
    producer.await.expect("producer");

    assert_eq!(failures.len(), 1);
    assert!(!failures.contains_key("a"), "success keys must be absent");
    assert_eq!(
        failures["b"],
        vec!["bad b".to_string(), "bad b again".to_string()]
    );
}

/// Test: many concurrent producers, failure counts per key match.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_collect_counts_failures_per_key_under_concurrency() {
    let v = Arc::new(Validator::new());

    let checks = (0..60).map(|i| {
        let v = Arc::clone(&v);
        tokio::spawn(async move {
            v.declare_expected(1);
            let key = format!("k{}", i % 3);
            // Every fourth check passes.
            check_condition!(v, key, i % 4 == 0, "check {} failed", i);
        })
    });
    for joined in join_all(checks).await {
        joined.expect("check task");
    }
    assert_eq!(v.expected(), 60);

    let failures = v.collect_failures().await.expect("drain");

    let mut total = 0;
    for k in 0..3 {
        let key = format!("k{k}");
        let want = (0..60).filter(|i| i % 3 == k && i % 4 != 0).count();
        let got = failures.get(&key).map_or(0, Vec::len);
        assert_eq!(got, want, "failure count for {key}");
        total += got;
    }
    assert_eq!(total, 45);
}

/// Test: an all-success run yields an empty map.
#[tokio::test]
async fn test_collect_all_success_is_empty() {
    let v = Validator::new();
    v.declare_expected(5);
    for i in 0..5 {
        v.record_success(format!("ok-{i}"));
    }

    let failures = v.collect_failures().await.expect("drain");
    assert!(failures.is_empty());
}

/// Test: declarations split across calls add up before the drain.
#[tokio::test]
async fn test_collect_waits_for_sum_of_declarations() {
    let v = Arc::new(Validator::new());
    v.declare_expected(2);
    v.declare_expected(1);

    let drain = {
        let v = Arc::clone(&v);
        tokio::spawn(async move { v.collect_failures().await })
    };

    v.record_failure("x", "one");
    v.record_failure("x", "two");
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
    assert!(!drain.is_finished(), "drain must wait for the third outcome");

    v.record_success("y");
    let failures = drain.await.expect("join").expect("drain");
    assert_eq!(failures["x"].len(), 2);
    assert!(!failures.contains_key("y"));
}

/// Test: the formatting macro and the plain method agree.
#[tokio::test]
async fn test_record_failure_macro_formats_message() {
    let v = Validator::new();
    v.declare_expected(2);
    let port = 70000;
    record_failure!(v, "port", "port {} out of range", port);
    v.check_condition("host", false, "host missing");

    let failures = v.collect_failures().await.expect("drain");
    assert_eq!(failures["port"], vec!["port 70000 out of range".to_string()]);
    assert_eq!(failures["host"], vec!["host missing".to_string()]);
}

/// Test: check_condition! does not record a failure for a true condition.
#[tokio::test]
async fn test_check_condition_macro_true_is_success() {
    let v = Validator::new();
    v.declare_expected(1);
    check_condition!(v, "len", 3 > 2, "unreachable {}", 0);

    let failures = v.collect_failures().await.expect("drain");
    assert!(failures.is_empty());
}
