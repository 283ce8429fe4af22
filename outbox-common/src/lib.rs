//! Domain model and shared leaves for the outbox workspace: validated
//! addresses, the email aggregate and its status history, the binary
//! envelope codec, configuration, and logging setup.

pub mod address;
pub mod config;
pub mod email;
pub mod envelope;
pub mod logging;
pub mod status;

pub use address::{AddressError, AddressList, Mailbox};
pub use config::{SmtpConfig, TlsPolicy};
pub use email::{Email, EmailError};
pub use envelope::{EnvelopeError, decode, encode};
pub use status::{Status, StatusEvent, StatusHistory, UnknownStatusCode};
