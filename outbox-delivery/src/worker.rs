//! The per-message delivery worker.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use outbox_common::{Status, envelope};
use outbox_store::EmailStore;

use crate::pool::SessionPool;

/// Total delivery attempts before a message is declared dead.
pub(crate) const MAX_ATTEMPTS: u32 = 5;

/// What a worker needs besides its message.
pub(crate) struct WorkerContext {
    pub pool: Arc<SessionPool>,
    pub store: Arc<dyn EmailStore>,
}

/// Runs one message through the delivery state machine: decode, attempt up
/// to [`MAX_ATTEMPTS`] times with recycle-on-failure, then persist the final
/// status history.
///
/// Attempts are strictly sequential within one message; distinct messages
/// run concurrently with no ordering between them. Failures here never
/// propagate: every outcome is handled by logging and status events.
pub(crate) async fn process_message(ctx: Arc<WorkerContext>, payload: Vec<u8>) {
    let mut email = match envelope::decode(&payload) {
        Ok(email) => email,
        Err(e) => {
            // An envelope that failed validation carries no trustworthy id,
            // so the message is dropped without a storage write.
            warn!(size = payload.len(), "dropping undecodable message: {e}");
            return;
        }
    };
    let email_id = email.id();
    info!(email_id, "email received");

    let mut session = match ctx.pool.acquire().await {
        Ok(session) => session,
        Err(e) => {
            warn!(email_id, "delivery abandoned while waiting for a session: {e}");
            return;
        }
    };

    let mut delivered = false;
    for attempt in 1..=MAX_ATTEMPTS {
        debug!(email_id, attempt, "attempting delivery");
        match session.deliver(&email).await {
            Ok(()) => {
                info!(email_id, attempt, "email sent");
                email.record(Status::SentSuccessfully);
                delivered = true;
                break;
            }
            Err(e) => {
                warn!(email_id, attempt, "failed to send email: {e}");
                email.record(Status::FailedAttemptToSend);
                match ctx.pool.recycle(session).await {
                    Ok(replacement) => session = replacement,
                    Err(e) => {
                        warn!(
                            email_id,
                            "delivery abandoned while replacing a failed session: {e}"
                        );
                        return;
                    }
                }
            }
        }
    }

    if !delivered {
        error!(email_id, "attempt bound exhausted; email is dead");
        email.record(Status::Dead);
    }
    ctx.pool.release(session);

    // Delivery and persistence are separate failure domains: the outcome
    // above stands even if the write fails.
    if let Err(e) = ctx.store.update(email).await {
        error!(email_id, "failed to persist delivery outcome: {e}");
    }
}
