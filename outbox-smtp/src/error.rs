//! Error types for SMTP sessions.

use std::io;

use thiserror::Error;

/// Errors from opening or using an SMTP session.
///
/// `Connection`, `Tls`, and `Auth` classify the three stages of session
/// creation; the remaining variants surface from an in-flight delivery.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The endpoint could not be dialed, or rejected us before TLS.
    #[error("connection error: {0}")]
    Connection(String),

    /// STARTTLS negotiation failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The server rejected our credentials.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// The server answered a delivery command with an error code.
    #[error("SMTP error: {code} {message}")]
    Smtp { code: u16, message: String },

    /// I/O failure on the underlying transport.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A server reply that does not parse as an SMTP response.
    #[error("failed to parse SMTP reply: {0}")]
    Parse(String),

    /// The server stopped answering within the command timeout.
    #[error("timed out waiting for the server")]
    Timeout,

    /// The server closed the connection mid-exchange.
    #[error("connection closed unexpectedly")]
    ConnectionClosed,

    /// A reply that is not valid UTF-8.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Specialized `Result` for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
