//! An in-process pub/sub broker exposing the push-style source interface.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::{BrokerError, PushSource, Sink, SubscribeFn};

const DEFAULT_DEPTH: usize = 1024;

/// Broadcast fan-out: every subscriber attached at publish time receives a
/// copy. Subscribers attached later do not see earlier messages, matching
/// key-based pub/sub stores.
pub struct MemoryPubSub {
    tx: broadcast::Sender<Vec<u8>>,
}

impl MemoryPubSub {
    #[must_use]
    pub fn new() -> Self {
        Self::with_depth(DEFAULT_DEPTH)
    }

    /// `depth` bounds the per-subscriber backlog; a subscriber that lags
    /// beyond it loses the oldest messages, which is the store's own
    /// delivery guarantee, not the fan-in's.
    #[must_use]
    pub fn with_depth(depth: usize) -> Self {
        let (tx, _) = broadcast::channel(depth);
        Self { tx }
    }
}

impl Default for MemoryPubSub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushSource for MemoryPubSub {
    async fn subscribe(&self, callback: SubscribeFn) -> Result<(), BrokerError> {
        let mut rx = self.tx.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(payload) => callback(payload),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "pub/sub subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(())
    }
}

#[async_trait]
impl Sink for MemoryPubSub {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), BrokerError> {
        // A publish with no live subscriber is dropped, as with any pub/sub
        // store; that is not an error worth surfacing to the ingestion path.
        if self.tx.send(payload).is_err() {
            debug!("published without any subscriber attached");
        }
        Ok(())
    }
}
