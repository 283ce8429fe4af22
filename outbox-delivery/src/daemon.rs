//! The daemon orchestrator: wires fan-in, pool, and workers together and
//! owns shutdown behaviour.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use outbox_common::SmtpConfig;
use outbox_smtp::{Connector, SmtpConnector};
use outbox_store::EmailStore;

use crate::{
    fanin::{MessageSource, fan_in},
    pool::SessionPool,
    worker::{WorkerContext, process_message},
};

/// The delivery daemon.
///
/// Construction takes the whole configuration surface; there is no runtime
/// reconfiguration. [`run`](Self::run) drains the sources until cancelled.
pub struct Daemon {
    config: SmtpConfig,
    sources: Vec<MessageSource>,
    store: Arc<dyn EmailStore>,
    connector: Arc<dyn Connector>,
}

impl Daemon {
    /// A daemon delivering through real SMTP sessions against the
    /// configured endpoint.
    #[must_use]
    pub fn new(
        config: SmtpConfig,
        sources: Vec<MessageSource>,
        store: Arc<dyn EmailStore>,
    ) -> Self {
        let connector = Arc::new(SmtpConnector::new(config.clone()));
        Self::with_connector(config, sources, store, connector)
    }

    /// As [`new`](Self::new), with the session factory swapped out.
    #[must_use]
    pub fn with_connector(
        config: SmtpConfig,
        sources: Vec<MessageSource>,
        store: Arc<dyn EmailStore>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            config,
            sources,
            store,
            connector,
        }
    }

    /// Runs until `cancel` fires and every in-flight delivery has reached
    /// its outcome.
    ///
    /// Cancellation halts intake from every source; already-spawned workers
    /// are drained to completion (success, dead, or dropped-on-decode)
    /// before this returns. No new sessions are created during the drain,
    /// so a worker that cannot get a session any more abandons its message
    /// to the source's redelivery guarantee.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            connections = self.config.connection_count,
            sources = self.sources.len(),
            "delivery daemon starting"
        );

        let pool = Arc::new(SessionPool::new(
            self.connector,
            self.config.connection_count,
            cancel.child_token(),
        ));
        pool.populate();

        let mut stream = fan_in(self.sources, &cancel);
        let ctx = Arc::new(WorkerContext {
            pool,
            store: self.store,
        });

        let mut workers = JoinSet::new();
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                message = stream.recv() => match message {
                    Some(payload) => {
                        debug!(size = payload.len(), "message about to be sent");
                        workers.spawn(process_message(ctx.clone(), payload));
                    }
                    // Every source ended on its own.
                    None => break,
                },
            }

            // Reap finished workers so the set does not grow with history.
            while workers.try_join_next().is_some() {}
        }

        info!(
            in_flight = workers.len(),
            "intake stopped; draining in-flight deliveries"
        );
        while workers.join_next().await.is_some() {}
        info!("delivery daemon stopped");
    }
}
