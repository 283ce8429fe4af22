//! Scripted transports and helpers for daemon scenario tests.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use outbox_broker::Sink;
use outbox_common::{Email, SmtpConfig, Status, TlsPolicy, encode};
use outbox_smtp::{Connector, Result as SmtpResult, SessionError, Transport};
use outbox_store::{EmailStore, MemoryEmailStore};

/// Shared observations of every session and delivery a scripted connector
/// produced: the outcome script (consumed one entry per delivery attempt,
/// exhausted means success), session count, and delivery overlap, which
/// observably bounds the pool.
#[derive(Default)]
pub struct ScriptState {
    outcomes: Mutex<VecDeque<bool>>,
    created: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptState {
    pub fn new(outcomes: impl IntoIterator<Item = bool>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            ..Self::default()
        })
    }

    pub fn sessions_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// A connector whose sessions succeed or fail per the shared script.
pub struct ScriptedConnector {
    shared: Arc<ScriptState>,
    delivery_delay: Duration,
}

impl ScriptedConnector {
    pub fn new(shared: Arc<ScriptState>) -> Arc<Self> {
        Self::with_delivery_delay(shared, Duration::from_millis(10))
    }

    pub fn with_delivery_delay(shared: Arc<ScriptState>, delivery_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            shared,
            delivery_delay,
        })
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self) -> SmtpResult<Box<dyn Transport>> {
        self.shared.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedTransport {
            shared: self.shared.clone(),
            delivery_delay: self.delivery_delay,
        }))
    }
}

struct ScriptedTransport {
    shared: Arc<ScriptState>,
    delivery_delay: Duration,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn deliver(&mut self, _email: &Email) -> SmtpResult<()> {
        let now = self.shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delivery_delay).await;

        let ok = self
            .shared
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(true);
        self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);

        if ok {
            Ok(())
        } else {
            Err(SessionError::Smtp {
                code: 451,
                message: "scripted failure".into(),
            })
        }
    }

    async fn close(&mut self) {}
}

/// SMTP settings for scripted runs; the endpoint is never dialed.
pub fn test_config(connection_count: usize) -> SmtpConfig {
    SmtpConfig {
        addr: "127.0.0.1:2525".into(),
        username: String::new(),
        password: String::new(),
        connection_count,
        tls: TlsPolicy::Disabled,
        accept_invalid_certs: false,
    }
}

/// Mirrors the ingestion path: record `Queued`, persist (assigning the id),
/// then publish the envelope. Returns the assigned id.
pub async fn queue_email(store: &MemoryEmailStore, sink: &dyn Sink) -> u64 {
    let mut email = Email::new(
        "daemon@example.com",
        &["recipient@example.com"],
        &[],
        &[],
        "notification",
        "payload",
    )
    .unwrap();
    email.record(Status::Queued);

    let email = store.insert(email).await.unwrap();
    sink.publish(encode(&email).unwrap()).await.unwrap();
    email.id()
}

/// Polls the store until the email's last status event is terminal.
pub async fn wait_for_terminal(store: &MemoryEmailStore, id: u64) -> Email {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let Ok(email) = store.get(id).await
                && email
                    .status_history()
                    .last()
                    .is_some_and(|event| event.status().is_terminal())
            {
                return email;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("email reached a terminal status")
}

/// The status sequence of an email's history.
pub fn statuses(email: &Email) -> Vec<Status> {
    email
        .status_history()
        .iter()
        .map(outbox_common::StatusEvent::status)
        .collect()
}
