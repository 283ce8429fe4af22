//! A bounded in-process queue serving both as source and sink.

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::{BrokerError, Sink, Source};

/// Default queue depth, matching what the service historically allowed to
/// pile up in memory.
const DEFAULT_DEPTH: usize = 100_000;

/// An in-process broker over a bounded channel.
///
/// Messages are delivered at-most-once to whichever consumer pulls them
/// first; within one process lifetime nothing is lost or duplicated. Useful
/// for single-process deployments and for tests.
pub struct MemoryBroker {
    tx: mpsc::Sender<Vec<u8>>,
    rx: Mutex<mpsc::Receiver<Vec<u8>>>,
}

impl MemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::with_depth(DEFAULT_DEPTH)
    }

    /// A broker holding at most `depth` undelivered messages.
    #[must_use]
    pub fn with_depth(depth: usize) -> Self {
        let (tx, rx) = mpsc::channel(depth);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Source for MemoryBroker {
    async fn consume(&self) -> Result<Vec<u8>, BrokerError> {
        self.rx.lock().await.recv().await.ok_or(BrokerError::Closed)
    }
}

#[async_trait]
impl Sink for MemoryBroker {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), BrokerError> {
        self.tx
            .try_send(payload)
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => BrokerError::Full,
                mpsc::error::TrySendError::Closed(_) => BrokerError::Closed,
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn publishes_and_consumes_in_order() {
        let broker = MemoryBroker::new();
        broker.publish(b"one".to_vec()).await.unwrap();
        broker.publish(b"two".to_vec()).await.unwrap();

        assert_eq!(broker.consume().await.unwrap(), b"one");
        assert_eq!(broker.consume().await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn consume_blocks_until_a_message_arrives() {
        let broker = Arc::new(MemoryBroker::new());

        let consumer = {
            let broker = broker.clone();
            tokio::spawn(async move { broker.consume().await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        broker.publish(b"late".to_vec()).await.unwrap();

        assert_eq!(consumer.await.unwrap().unwrap(), b"late");
    }

    #[tokio::test]
    async fn rejects_when_full() {
        let broker = MemoryBroker::with_depth(1);
        broker.publish(b"fits".to_vec()).await.unwrap();

        let err = broker.publish(b"overflow".to_vec()).await.unwrap_err();
        assert!(matches!(err, BrokerError::Full));
    }
}
