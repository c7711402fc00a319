//! Schema Agreement Tests
//!
//! The wait after every schema change:
//! - Returns only once a single version is reported
//! - Never retries a transport failure
//! - Honors a deadline and a cancellation from another thread
//! - Treats unreachable nodes as an outstanding version

use std::thread;
use std::time::Duration;

use ringschema::cluster::{
    await_agreement, AgreementPolicy, CancellationFlag, MemoryTransport, TransportError, UNREACHABLE,
};
use ringschema::schema::{Attributes, KeyspaceDef, SchemaError, SchemaErrorCode};
use ringschema::SchemaManager;

// =============================================================================
// Helper Functions
// =============================================================================

fn fast_policy() -> AgreementPolicy {
    AgreementPolicy::unbounded().with_poll_interval(Duration::from_millis(1))
}

fn three_node_cluster() -> MemoryTransport {
    MemoryTransport::new().with_nodes(["10.0.0.1", "10.0.0.2", "10.0.0.3"])
}

// =============================================================================
// Poller Tests
// =============================================================================

/// Two versions for N polls, then one: the wait ends on poll N + 1.
#[test]
fn test_poller_waits_through_disagreement() {
    for n in [0u64, 1, 3, 7] {
        let mut transport = three_node_cluster();
        transport.script_disagreement(n);

        let report = await_agreement(&mut transport, &fast_policy(), &CancellationFlag::new()).unwrap();

        assert_eq!(report.polls, n + 1);
        assert_eq!(transport.poll_count(), n + 1);
        assert_eq!(report.version, transport.schema_version());
    }
}

/// A transport failure while polling ends the wait at once.
#[test]
fn test_poller_does_not_retry_transport_errors() {
    let mut transport = three_node_cluster();
    transport.script_disagreement(5);
    transport.fail_next(TransportError::Timeout("rpc timeout".into()));

    let err = await_agreement(&mut transport, &fast_policy(), &CancellationFlag::new()).unwrap_err();

    assert_eq!(err, SchemaError::Remote(TransportError::Timeout("rpc timeout".into())));
    assert_eq!(transport.poll_count(), 0);
}

/// The deadline turns an endless disagreement into a distinct outcome.
#[test]
fn test_poller_times_out() {
    let mut transport = three_node_cluster();
    transport.script_disagreement(u64::MAX);
    let policy = fast_policy().with_timeout(Duration::from_millis(30));

    let err = await_agreement(&mut transport, &policy, &CancellationFlag::new()).unwrap_err();

    match &err {
        SchemaError::AgreementTimeout { waited, versions } => {
            assert!(*waited >= Duration::from_millis(30));
            assert_eq!(versions.len(), 2);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.code(), SchemaErrorCode::AgreementTimeout);
    assert!(err.is_retryable());
    assert!(transport.poll_count() >= 2);
}

/// Unreachable nodes keep the cluster from agreeing.
#[test]
fn test_unreachable_nodes_block_agreement() {
    let mut transport = three_node_cluster();
    transport.set_unreachable(["10.0.0.3"]);
    let policy = fast_policy().with_timeout(Duration::from_millis(10));

    let err = await_agreement(&mut transport, &policy, &CancellationFlag::new()).unwrap_err();

    match err {
        SchemaError::AgreementTimeout { versions, .. } => {
            assert_eq!(versions.get(UNREACHABLE), Some(&vec!["10.0.0.3".to_string()]));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

// =============================================================================
// Manager Wait Tests
// =============================================================================

/// Every schema change waits; the report carries the agreed version.
#[test]
fn test_schema_change_waits_for_agreement() {
    let mut manager = SchemaManager::new(three_node_cluster());
    manager.set_agreement_policy(fast_policy());
    manager.transport_mut().script_disagreement(4);

    let report = manager.create_keyspace("K1", &Attributes::new()).unwrap();

    assert_eq!(report.polls, 5);
    assert_eq!(report.version, manager.transport().schema_version());
}

/// The change is applied even when the wait times out.
#[test]
fn test_timeout_after_accepted_change() {
    let mut manager = SchemaManager::new(three_node_cluster());
    manager.set_agreement_policy(fast_policy().with_timeout(Duration::from_millis(20)));
    manager.transport_mut().script_disagreement(u64::MAX);

    let err = manager.create_keyspace("K1", &Attributes::new()).unwrap_err();

    assert!(matches!(err, SchemaError::AgreementTimeout { .. }));
    assert!(!err.is_local());
    assert!(manager.transport().keyspace("K1").is_some());
}

/// Another thread can cancel a wait that would never finish.
#[test]
fn test_cancel_from_another_thread() {
    let mut manager = SchemaManager::new(three_node_cluster());
    manager.set_agreement_policy(fast_policy());
    manager.transport_mut().script_disagreement(u64::MAX);

    let flag = manager.cancellation_flag();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        flag.cancel();
    });

    let result = manager.create_keyspace("K1", &Attributes::new());
    canceller.join().unwrap();

    match result {
        Err(SchemaError::AgreementCancelled { polls }) => assert!(polls >= 1),
        other => panic!("unexpected outcome: {:?}", other),
    }

    // The next wait starts re-armed
    manager.transport_mut().script_disagreement(0);
    let report = manager.drop_keyspace("K1").unwrap();
    assert_eq!(report.polls, 1);
}

/// A cancel issued while no wait is running does not leak into a later change.
#[test]
fn test_cancel_between_changes_does_not_abort_next_wait() {
    let mut manager = SchemaManager::new(three_node_cluster());
    manager.set_agreement_policy(fast_policy());
    manager.create_keyspace("K1", &Attributes::new()).unwrap();
    manager.create_column_family("K1", "CF1", &Attributes::new()).unwrap();

    manager.cancellation_flag().cancel();
    let mut comment = Attributes::new();
    comment.insert("comment".into(), "users".into());
    let report = manager.alter_column_family("K1", "CF1", &comment).unwrap();
    assert_eq!(report.polls, 1);

    manager.transport_mut().script_disagreement(1);
    let report = manager.drop_column_family("K1", "CF1").unwrap();
    assert_eq!(report.polls, 2);

    manager.cancellation_flag().cancel();
    manager.transport_mut().script_disagreement(1);
    let report = manager.drop_keyspace("K1").unwrap();
    assert_eq!(report.polls, 2);
}

/// Describing versions is a read and never waits.
#[test]
fn test_describe_schema_versions_reports_disagreement() {
    let mut manager = SchemaManager::new(three_node_cluster().with_keyspace(KeyspaceDef::new("K1")));
    manager.transport_mut().script_disagreement(1);

    let view = manager.describe_schema_versions().unwrap();
    assert!(!view.is_agreed());
    assert_eq!(view.version_count(), 2);

    let view = manager.describe_schema_versions().unwrap();
    assert!(view.is_agreed());
    assert_eq!(manager.transport().poll_count(), 2);
}
