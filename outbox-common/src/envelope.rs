//! The binary envelope codec.
//!
//! An envelope is the self-contained wire record carrying one email plus its
//! full status history between the ingestion path and the delivery daemon.
//! Status events travel as `(status-code, epoch-nanoseconds)` pairs. Empty
//! address lists encode as zero-length sequences, so a reader never has to
//! distinguish absent from empty.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{email::Email, status::{Status, StatusEvent}};

/// Errors from [`encode`] and [`decode`].
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The email could not be serialized.
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// The bytes do not describe a valid email: truncated or trailing input,
    /// an address that fails validation, or an unknown status code.
    #[error("malformed envelope: {0}")]
    Malformed(String),
}

/// The wire layout. Field order is the format; do not reorder.
#[derive(Debug, Serialize, Deserialize)]
struct WireEmail {
    id: u64,
    from: String,
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    subject: String,
    body: String,
    status: Vec<(u32, i64)>,
}

/// Encodes an email and its status history into a self-contained record.
///
/// Pure transform; the email is unchanged.
///
/// # Errors
///
/// Returns [`EnvelopeError::Encode`] if serialization fails.
pub fn encode(email: &Email) -> Result<Vec<u8>, EnvelopeError> {
    let wire = WireEmail {
        id: email.id(),
        from: email.from().to_string(),
        to: email.to().to_strings(),
        cc: email.cc().to_strings(),
        bcc: email.bcc().to_strings(),
        subject: email.subject().to_owned(),
        body: email.body().to_owned(),
        status: email
            .status_history()
            .iter()
            .map(|event| {
                (
                    u32::from(event.status()),
                    event.at().timestamp_nanos_opt().unwrap_or_default(),
                )
            })
            .collect(),
    };

    Ok(bincode::serde::encode_to_vec(&wire, bincode::config::standard())?)
}

/// Decodes an envelope back into an [`Email`].
///
/// Every address passes through the same validation as direct construction,
/// and the status history is replayed exactly as encoded; decode never
/// invents an entry of its own.
///
/// # Errors
///
/// Returns [`EnvelopeError::Malformed`] on truncated or trailing input, an
/// invalid address, or an unknown status code.
pub fn decode(bytes: &[u8]) -> Result<Email, EnvelopeError> {
    let (wire, consumed): (WireEmail, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| EnvelopeError::Malformed(e.to_string()))?;

    if consumed != bytes.len() {
        return Err(EnvelopeError::Malformed(format!(
            "{} trailing bytes",
            bytes.len() - consumed
        )));
    }

    let mut email = Email::new(
        &wire.from,
        &wire.to,
        &wire.cc,
        &wire.bcc,
        wire.subject,
        wire.body,
    )
    .map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
    email.assign_id(wire.id);

    for (code, nanos) in wire.status {
        let status =
            Status::try_from(code).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
        email.push_event(StatusEvent::new(status, DateTime::from_timestamp_nanos(nanos)));
    }

    Ok(email)
}
