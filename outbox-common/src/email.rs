//! The `Email` aggregate.

use thiserror::Error;

use crate::{
    address::{AddressError, AddressList, Mailbox},
    status::{Status, StatusEvent, StatusHistory},
};

/// Errors that prevent an [`Email`] from being constructed.
///
/// Construction validates everything up front; a failed construction leaves
/// no partial state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmailError {
    /// The sender is not a valid mailbox.
    #[error("invalid sender address: {0}")]
    InvalidSender(#[source] AddressError),

    /// A recipient in to, cc, or bcc is not a valid mailbox.
    #[error("invalid recipient address {address:?}: {source}")]
    InvalidRecipient {
        address: String,
        #[source]
        source: AddressError,
    },

    /// to, cc, and bcc are all empty.
    #[error("an email needs at least one recipient across to, cc, and bcc")]
    NoRecipients,
}

/// An outbound email together with its append-only status history.
///
/// Invariants: `from` is a valid mailbox and at least one of to/cc/bcc is
/// non-empty; both are enforced at construction. The id is 0 until storage
/// assigns one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    id: u64,
    from: Mailbox,
    to: AddressList,
    cc: AddressList,
    bcc: AddressList,
    subject: String,
    body: String,
    status_history: StatusHistory,
}

impl Email {
    /// Builds an email from raw textual fields, validating every address.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] if `from` or any recipient fails mailbox
    /// parsing, or if to, cc, and bcc are all empty.
    pub fn new<S: AsRef<str>>(
        from: &str,
        to: &[S],
        cc: &[S],
        bcc: &[S],
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, EmailError> {
        if to.is_empty() && cc.is_empty() && bcc.is_empty() {
            return Err(EmailError::NoRecipients);
        }

        let from = Mailbox::parse(from).map_err(EmailError::InvalidSender)?;
        let parse_list = |inputs: &[S]| {
            AddressList::parse_all(inputs)
                .map_err(|(address, source)| EmailError::InvalidRecipient { address, source })
        };

        Ok(Self {
            id: 0,
            from,
            to: parse_list(to)?,
            cc: parse_list(cc)?,
            bcc: parse_list(bcc)?,
            subject: subject.into(),
            body: body.into(),
            status_history: StatusHistory::new(),
        })
    }

    /// The storage-assigned id; 0 before persistence.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Assigns the storage id.
    pub const fn assign_id(&mut self, id: u64) {
        self.id = id;
    }

    #[must_use]
    pub const fn from(&self) -> &Mailbox {
        &self.from
    }

    #[must_use]
    pub const fn to(&self) -> &AddressList {
        &self.to
    }

    #[must_use]
    pub const fn cc(&self) -> &AddressList {
        &self.cc
    }

    #[must_use]
    pub const fn bcc(&self) -> &AddressList {
        &self.bcc
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub const fn status_history(&self) -> &StatusHistory {
        &self.status_history
    }

    /// Every recipient, in declaration order: to, then cc, then bcc.
    pub fn recipients(&self) -> impl Iterator<Item = &Mailbox> {
        self.to.iter().chain(self.cc.iter()).chain(self.bcc.iter())
    }

    /// Appends a status event stamped with the current time.
    pub fn record(&mut self, status: Status) {
        self.status_history.record(status);
    }

    /// Appends a pre-stamped event, as when replaying a decoded history.
    pub fn push_event(&mut self, event: StatusEvent) {
        self.status_history.push(event);
    }
}
