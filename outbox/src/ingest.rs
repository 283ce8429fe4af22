//! The ingestion glue: what happens between "a caller hands us an email"
//! and "the daemon can see it".

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use outbox_broker::{BrokerError, Sink};
use outbox_common::{Email, EnvelopeError, Status, encode};
use outbox_store::{EmailStore, SendStatus, StatusInfo, StatusStore, StoreError};

/// Errors from queueing an email.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] EnvelopeError),

    #[error("failed to publish email: {0}")]
    Publish(#[from] BrokerError),

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

/// Accepts emails, stamps them `Queued`, and hands them to the broker.
pub struct Ingest {
    sink: Arc<dyn Sink>,
    store: Arc<dyn EmailStore>,
    statuses: Arc<dyn StatusStore>,
}

impl Ingest {
    #[must_use]
    pub fn new(
        sink: Arc<dyn Sink>,
        store: Arc<dyn EmailStore>,
        statuses: Arc<dyn StatusStore>,
    ) -> Self {
        Self {
            sink,
            store,
            statuses,
        }
    }

    /// Queues one email for delivery: records `Queued`, persists the email
    /// (assigning the id the envelope carries), publishes the envelope, and
    /// creates the notification status record.
    ///
    /// The email is persisted before the publish, so the daemon's eventual
    /// `update` finds its record. A publish failure therefore leaves a
    /// persisted `Queued` email behind that never reaches the broker; the
    /// caller sees the error and can re-queue.
    ///
    /// # Errors
    ///
    /// Returns an [`IngestError`] naming the step that failed.
    pub async fn queue(&self, mut email: Email) -> Result<(Email, StatusInfo), IngestError> {
        email.record(Status::Queued);

        let email = self.store.insert(email).await?;
        let payload = encode(&email)?;
        self.sink.publish(payload).await?;
        debug!(email_id = email.id(), "email queued for delivery");

        let info = self.statuses.create(SendStatus::Queued).await?;
        Ok((email, info))
    }

    /// Looks up a previously queued email, status history included.
    ///
    /// # Errors
    ///
    /// [`IngestError::Store`] if the id is unknown.
    pub async fn get(&self, id: u64) -> Result<Email, IngestError> {
        Ok(self.store.get(id).await?)
    }
}
