//! The session pool.
//!
//! A bounded channel of ready sessions doubles as the counting semaphore
//! that caps concurrent outbound deliveries: its capacity is the configured
//! connection count, and there is no other admission control. A session is
//! exclusively owned by one worker between `acquire` and
//! `release`/`recycle`.

use std::{sync::Arc, time::Duration};

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use outbox_smtp::{Connector, Transport};

use crate::error::PoolError;

/// Pause between failed session-creation attempts, so a dead endpoint does
/// not make the replacement task spin.
const CREATE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// A fixed-capacity set of ready SMTP sessions.
pub struct SessionPool {
    capacity: usize,
    connector: Arc<dyn Connector>,
    slots: Mutex<mpsc::Receiver<Box<dyn Transport>>>,
    returns: mpsc::Sender<Box<dyn Transport>>,
    cancel: CancellationToken,
}

impl SessionPool {
    /// A pool of `capacity` sessions (at least one), initially empty; call
    /// [`populate`](Self::populate) to fill it.
    #[must_use]
    pub fn new(
        connector: Arc<dyn Connector>,
        capacity: usize,
        cancel: CancellationToken,
    ) -> Self {
        let capacity = capacity.max(1);
        let (returns, slots) = mpsc::channel(capacity);
        Self {
            capacity,
            connector,
            slots: Mutex::new(slots),
            returns,
            cancel,
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fills the pool to capacity in the background, retrying each
    /// individual creation indefinitely.
    pub fn populate(&self) {
        for _ in 0..self.capacity {
            self.spawn_replacement();
        }
    }

    /// Takes a session, waiting until one is available.
    ///
    /// An available session is handed out even after cancellation, so that
    /// draining workers can finish; only a caller that would otherwise wait
    /// observes the shutdown.
    ///
    /// # Errors
    ///
    /// [`PoolError::Cancelled`] under the shutdown signal when the pool is
    /// empty.
    pub async fn acquire(&self) -> Result<Box<dyn Transport>, PoolError> {
        tokio::select! {
            biased;
            session = async { self.slots.lock().await.recv().await } => {
                session.ok_or(PoolError::Closed)
            }
            () = self.cancel.cancelled() => Err(PoolError::Cancelled),
        }
    }

    /// Returns a presumed-healthy session to the pool. Never blocks.
    pub fn release(&self, session: Box<dyn Transport>) {
        // At most `capacity` sessions are ever outstanding, so a slot is
        // free for any well-formed return.
        if self.returns.try_send(session).is_err() {
            warn!("session pool rejected a returned session; dropping it");
        }
    }

    /// The failure path: closes the broken session, starts creating its
    /// replacement in the background, and hands the caller a different
    /// already-available session so it can retry immediately.
    ///
    /// # Errors
    ///
    /// [`PoolError::Cancelled`] as for [`acquire`](Self::acquire).
    pub async fn recycle(
        &self,
        mut broken: Box<dyn Transport>,
    ) -> Result<Box<dyn Transport>, PoolError> {
        broken.close().await;
        drop(broken);
        self.spawn_replacement();
        self.acquire().await
    }

    /// Creates one session in a background task, retrying indefinitely so a
    /// transient endpoint outage cannot permanently shrink the pool. The
    /// task gives up only under the shutdown signal.
    fn spawn_replacement(&self) {
        let connector = self.connector.clone();
        let returns = self.returns.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            loop {
                if cancel.is_cancelled() {
                    return;
                }
                match connector.connect().await {
                    Ok(session) => {
                        debug!("session created");
                        if returns.send(session).await.is_err() {
                            warn!("pool dropped before a new session could be enqueued");
                        }
                        return;
                    }
                    Err(e) => {
                        warn!("cannot create session: {e}; retrying");
                        tokio::select! {
                            () = tokio::time::sleep(CREATE_RETRY_DELAY) => {}
                            () = cancel.cancelled() => return,
                        }
                    }
                }
            }
        });
    }
}
