//! Source fan-in: merges every configured message source into one stream.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use outbox_broker::{BrokerError, PushSource, Source};

/// Depth of the shared stream between the fan-in tasks and the daemon.
const STREAM_DEPTH: usize = 256;

/// One configured message source, pull- or push-style.
pub enum MessageSource {
    /// Polled with a blocking `consume`.
    Pull(Arc<dyn Source>),
    /// Delivers through a subscription callback.
    Push(Arc<dyn PushSource>),
}

impl From<Arc<dyn Source>> for MessageSource {
    fn from(source: Arc<dyn Source>) -> Self {
        Self::Pull(source)
    }
}

impl From<Arc<dyn PushSource>> for MessageSource {
    fn from(source: Arc<dyn PushSource>) -> Self {
        Self::Push(source)
    }
}

/// Binds one helper task per source and returns the merged stream of raw
/// envelope bytes.
///
/// The fan-in adds no loss or duplication beyond what each source itself
/// guarantees. Cancellation stops the pull loops; the stream ends once
/// every producing task is gone.
pub fn fan_in(
    sources: Vec<MessageSource>,
    cancel: &CancellationToken,
) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel(STREAM_DEPTH);

    for (index, source) in sources.into_iter().enumerate() {
        match source {
            MessageSource::Pull(source) => {
                tokio::spawn(pull_loop(index, source, tx.clone(), cancel.clone()));
            }
            MessageSource::Push(source) => {
                tokio::spawn(attach_push(index, source, tx.clone()));
            }
        }
    }

    rx
}

async fn pull_loop(
    index: usize,
    source: Arc<dyn Source>,
    tx: mpsc::Sender<Vec<u8>>,
    cancel: CancellationToken,
) {
    debug!(source = index, "pull loop started");
    loop {
        let payload = tokio::select! {
            () = cancel.cancelled() => {
                debug!(source = index, "intake stopped");
                return;
            }
            result = source.consume() => match result {
                Ok(payload) => payload,
                Err(BrokerError::Closed) => {
                    debug!(source = index, "source closed");
                    return;
                }
                // Transient read errors must not kill the loop.
                Err(e) => {
                    warn!(source = index, "failed to receive message: {e}");
                    continue;
                }
            },
        };

        debug!(source = index, size = payload.len(), "message received");
        if tx.send(payload).await.is_err() {
            return;
        }
    }
}

async fn attach_push(index: usize, source: Arc<dyn PushSource>, tx: mpsc::Sender<Vec<u8>>) {
    let result = source
        .subscribe(Box::new(move |payload| {
            // The callback runs outside our task; hop back onto the stream
            // without dropping the payload.
            let tx = tx.clone();
            tokio::spawn(async move {
                let _ = tx.send(payload).await;
            });
        }))
        .await;

    match result {
        Ok(()) => debug!(source = index, "subscription attached"),
        Err(e) => warn!(source = index, "failed to subscribe: {e}"),
    }
}
