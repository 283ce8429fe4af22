//! Deserialised straight from the configuration file, the controller owns
//! every collaborator and the shutdown signal.

use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use outbox_broker::MemoryBroker;
use outbox_common::SmtpConfig;
use outbox_delivery::{Daemon, MessageSource};
use outbox_store::MemoryEmailStore;

const fn default_queue_depth() -> usize {
    100_000
}

/// Top-level daemon configuration and wiring.
#[derive(Debug, Deserialize)]
pub struct Controller {
    /// SMTP endpoint, credentials, and pool sizing.
    pub smtp: SmtpConfig,

    /// Depth of the in-process message queue.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl Controller {
    /// Builds the broker, stores, and daemon, then runs until ctrl-c.
    ///
    /// Shutdown halts intake and lets in-flight deliveries finish before
    /// returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal handler cannot be installed or the
    /// daemon task panics.
    pub async fn run(self) -> anyhow::Result<()> {
        let broker = Arc::new(MemoryBroker::with_depth(self.queue_depth));
        let store = Arc::new(MemoryEmailStore::new());

        let daemon = Daemon::new(self.smtp, vec![MessageSource::Pull(broker)], store);

        let cancel = CancellationToken::new();
        let daemon_task = tokio::spawn(daemon.run(cancel.clone()));

        tokio::signal::ctrl_c().await?;
        info!("shutdown signal received; stopping intake");
        cancel.cancel();
        daemon_task.await?;

        Ok(())
    }
}
