//! Message source and sink capability traits, with in-process
//! implementations.
//!
//! The delivery daemon is agnostic to what backs these: an in-process
//! bounded queue, an AMQP-style broker, or a key-based pub/sub store all fit
//! behind the same three narrow interfaces. A source hands over raw envelope
//! bytes; decoding them is the consumer's concern.

pub mod memory;
pub mod pubsub;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryBroker;
pub use pubsub::MemoryPubSub;

/// Errors surfaced by broker implementations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The broker is closed and will yield no further messages.
    #[error("broker closed")]
    Closed,

    /// The broker's queue is at capacity.
    #[error("broker queue is full")]
    Full,

    /// A transient backend failure; the caller may retry.
    #[error("broker error: {0}")]
    Backend(String),
}

/// A blocking-pull message source.
#[async_trait]
pub trait Source: Send + Sync {
    /// Waits for and returns the next message.
    ///
    /// # Errors
    ///
    /// [`BrokerError::Closed`] once no further message can ever arrive;
    /// other errors are transient and the caller is expected to keep
    /// consuming.
    async fn consume(&self) -> Result<Vec<u8>, BrokerError>;
}

/// The callback a push source invokes once per received message.
pub type SubscribeFn = Box<dyn Fn(Vec<u8>) + Send + Sync>;

/// A push-style message source: rather than being polled, it calls back.
#[async_trait]
pub trait PushSource: Send + Sync {
    /// Registers the callback; returns once the subscription is live.
    ///
    /// # Errors
    ///
    /// [`BrokerError::Backend`] if the subscription cannot be established.
    async fn subscribe(&self, callback: SubscribeFn) -> Result<(), BrokerError>;
}

/// A message sink, as used by the ingestion path.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Hands one message to the broker.
    ///
    /// # Errors
    ///
    /// [`BrokerError::Full`] or [`BrokerError::Closed`] depending on the
    /// backend's state.
    async fn publish(&self, payload: Vec<u8>) -> Result<(), BrokerError>;
}
