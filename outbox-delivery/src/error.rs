//! Error types for the delivery daemon.

use thiserror::Error;

/// Errors from [`crate::pool::SessionPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The shutdown signal fired while waiting for a session.
    #[error("cancelled while waiting for a session")]
    Cancelled,

    /// The pool can no longer hand out sessions.
    #[error("session pool closed")]
    Closed,
}
