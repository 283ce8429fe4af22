//! End-to-end daemon scenarios over scripted sessions and in-memory
//! brokers and stores.

mod support;

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use outbox_broker::{MemoryBroker, Sink};
use outbox_common::Status;
use outbox_delivery::{Daemon, MessageSource};
use outbox_store::{EmailStore, MemoryEmailStore};

use support::{
    ScriptState, ScriptedConnector, queue_email, statuses, test_config, wait_for_terminal,
};

struct Harness {
    store: Arc<MemoryEmailStore>,
    script: Arc<ScriptState>,
    cancel: CancellationToken,
    daemon: tokio::task::JoinHandle<()>,
}

impl Harness {
    /// Starts a daemon over the given brokers with `connection_count`
    /// scripted sessions.
    fn start(
        script: Arc<ScriptState>,
        brokers: &[Arc<MemoryBroker>],
        connection_count: usize,
    ) -> Self {
        let store = Arc::new(MemoryEmailStore::new());
        let sources = brokers
            .iter()
            .map(|broker| MessageSource::Pull(broker.clone()))
            .collect();
        let daemon = Daemon::with_connector(
            test_config(connection_count),
            sources,
            store.clone(),
            ScriptedConnector::new(script.clone()),
        );

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(daemon.run(cancel.clone()));

        Self {
            store,
            script,
            cancel,
            daemon: handle,
        }
    }

    async fn shutdown(self) {
        self.cancel.cancel();
        self.daemon.await.expect("daemon task completed");
    }
}

// Two failed attempts, then success.
#[tokio::test]
async fn two_failures_then_success_yield_the_expected_history() {
    let broker = Arc::new(MemoryBroker::new());
    let harness = Harness::start(
        ScriptState::new([false, false, true]),
        std::slice::from_ref(&broker),
        1,
    );

    let id = queue_email(&harness.store, broker.as_ref()).await;
    let email = wait_for_terminal(&harness.store, id).await;

    assert_eq!(
        statuses(&email),
        [
            Status::Queued,
            Status::FailedAttemptToSend,
            Status::FailedAttemptToSend,
            Status::SentSuccessfully,
        ]
    );
    assert!(email.status_history().is_monotonic());

    harness.shutdown().await;
}

// Every attempt fails; the message dead-letters after exactly five
// failures.
#[tokio::test]
async fn exhausting_the_attempt_bound_dead_letters_the_message() {
    let broker = Arc::new(MemoryBroker::new());
    let harness = Harness::start(
        ScriptState::new([false; 8]),
        std::slice::from_ref(&broker),
        2,
    );

    let id = queue_email(&harness.store, broker.as_ref()).await;
    let email = wait_for_terminal(&harness.store, id).await;

    assert_eq!(email.status_history().count_of(Status::FailedAttemptToSend), 5);
    assert_eq!(email.status_history().count_of(Status::SentSuccessfully), 0);
    assert_eq!(email.status_history().last().unwrap().status(), Status::Dead);
    assert!(email.status_history().is_monotonic());

    harness.shutdown().await;
}

// Three sources, pool capacity one: everything terminates with at most one
// delivery in flight at any instant.
#[tokio::test]
async fn capacity_one_serializes_deliveries_across_sources() {
    let brokers: Vec<_> = (0..3).map(|_| Arc::new(MemoryBroker::new())).collect();
    let harness = Harness::start(ScriptState::new([]), &brokers, 1);

    let mut ids = Vec::new();
    for broker in &brokers {
        ids.push(queue_email(&harness.store, broker.as_ref()).await);
    }

    for id in ids {
        let email = wait_for_terminal(&harness.store, id).await;
        assert_eq!(
            email.status_history().last().unwrap().status(),
            Status::SentSuccessfully
        );
    }

    assert_eq!(harness.script.max_in_flight(), 1);
    assert_eq!(harness.script.sessions_created(), 1);

    harness.shutdown().await;
}

// An undecodable payload is dropped without a storage write and without
// disturbing other in-flight messages.
#[tokio::test]
async fn undecodable_payloads_are_dropped_without_side_effects() {
    let broker = Arc::new(MemoryBroker::new());
    let harness = Harness::start(ScriptState::new([]), std::slice::from_ref(&broker), 1);

    broker
        .publish(b"definitely not an envelope".to_vec())
        .await
        .unwrap();
    let id = queue_email(&harness.store, broker.as_ref()).await;

    let email = wait_for_terminal(&harness.store, id).await;
    assert_eq!(
        email.status_history().last().unwrap().status(),
        Status::SentSuccessfully
    );

    // Only the valid email ever existed in storage, and its record is the
    // only one the daemon touched.
    assert_eq!(harness.store.len(), 1);

    harness.shutdown().await;
}

// Success on a later attempt stays under the bound: at most four failures
// may precede a success.
#[tokio::test]
async fn success_on_the_final_attempt_records_four_failures() {
    let broker = Arc::new(MemoryBroker::new());
    let harness = Harness::start(
        ScriptState::new([false, false, false, false, true]),
        std::slice::from_ref(&broker),
        1,
    );

    let id = queue_email(&harness.store, broker.as_ref()).await;
    let email = wait_for_terminal(&harness.store, id).await;

    assert_eq!(email.status_history().count_of(Status::FailedAttemptToSend), 4);
    assert_eq!(
        email.status_history().last().unwrap().status(),
        Status::SentSuccessfully
    );

    harness.shutdown().await;
}

// Failed sessions are recycled: the pool converges back to capacity and the
// message is retried on fresh sessions.
#[tokio::test]
async fn recycling_replaces_broken_sessions() {
    let broker = Arc::new(MemoryBroker::new());
    let harness = Harness::start(
        ScriptState::new([false, true]),
        std::slice::from_ref(&broker),
        1,
    );

    let id = queue_email(&harness.store, broker.as_ref()).await;
    wait_for_terminal(&harness.store, id).await;

    // One initial session plus one replacement for the failed attempt.
    assert_eq!(harness.script.sessions_created(), 2);

    harness.shutdown().await;
}

// Shutdown drains: a delivery already in flight finishes and persists even
// though cancellation fired mid-attempt.
#[tokio::test]
async fn shutdown_drains_in_flight_deliveries() {
    let broker = Arc::new(MemoryBroker::new());
    let store = Arc::new(MemoryEmailStore::new());
    let script = ScriptState::new([]);
    let daemon = Daemon::with_connector(
        test_config(1),
        vec![MessageSource::Pull(broker.clone())],
        store.clone(),
        ScriptedConnector::with_delivery_delay(script, Duration::from_millis(300)),
    );

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(daemon.run(cancel.clone()));

    let id = queue_email(&store, broker.as_ref()).await;

    // Let the worker pick the message up, then pull the plug mid-delivery.
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    handle.await.unwrap();

    let email = store.get(id).await.unwrap();
    assert_eq!(
        email.status_history().last().unwrap().status(),
        Status::SentSuccessfully
    );
}
