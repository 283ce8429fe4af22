//! Storage collaborators: persistent homes for emails and for the
//! ingestion path's status records. The daemon only ever calls
//! [`EmailStore::update`], after a delivery attempt sequence concludes.

pub mod email_store;
pub mod status;

use thiserror::Error;

pub use email_store::{EmailStore, MemoryEmailStore};
pub use status::{MemoryStatusStore, SendStatus, StatusInfo, StatusStore};

/// Errors from the storage collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with the given id.
    #[error("record {0} not found")]
    NotFound(u64),

    /// A backend failure (connection loss, constraint violation, ...).
    #[error("storage error: {0}")]
    Backend(String),
}

/// Specialized `Result` for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
