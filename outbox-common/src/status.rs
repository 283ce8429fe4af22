//! Delivery status enumeration and the append-only status history.

use core::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The lifecycle status of a queued email.
///
/// `Queued` is the sole initial state, recorded by the ingestion path before
/// the message reaches the daemon. `SentSuccessfully` and `Dead` are
/// terminal. `FailedAttemptToSend` is recorded once per failed delivery
/// attempt.
///
/// The wire codes keep the numeric slots of the historical seven-state
/// enumeration so envelopes produced by older writers still decode; the
/// retired states are unknown codes here and fail conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Queued = 1,
    SentSuccessfully = 3,
    FailedAttemptToSend = 4,
    Dead = 6,
}

/// A status code outside the canonical set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown status code {0}")]
pub struct UnknownStatusCode(pub u32);

impl Status {
    /// Whether no further status event may follow this one.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::SentSuccessfully | Self::Dead)
    }
}

impl From<Status> for u32 {
    fn from(value: Status) -> Self {
        match value {
            Status::Queued => 1,
            Status::SentSuccessfully => 3,
            Status::FailedAttemptToSend => 4,
            Status::Dead => 6,
        }
    }
}

impl TryFrom<u32> for Status {
    type Error = UnknownStatusCode;

    fn try_from(value: u32) -> Result<Self, UnknownStatusCode> {
        match value {
            1 => Ok(Self::Queued),
            3 => Ok(Self::SentSuccessfully),
            4 => Ok(Self::FailedAttemptToSend),
            6 => Ok(Self::Dead),
            other => Err(UnknownStatusCode(other)),
        }
    }
}

impl Display for Status {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let name = match self {
            Self::Queued => "queued",
            Self::SentSuccessfully => "sent_successfully",
            Self::FailedAttemptToSend => "failed_attempt_to_send",
            Self::Dead => "dead",
        };
        write!(fmt, "{name}")
    }
}

/// One entry of an email's status history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEvent {
    status: Status,
    at: DateTime<Utc>,
}

impl StatusEvent {
    #[must_use]
    pub const fn new(status: Status, at: DateTime<Utc>) -> Self {
        Self { status, at }
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub const fn at(&self) -> DateTime<Utc> {
        self.at
    }
}

/// The ordered, append-only sequence of status events for one email.
///
/// Events are only ever appended, never reordered or truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusHistory(Vec<StatusEvent>);

impl StatusHistory {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an event as given, preserving its timestamp.
    pub fn push(&mut self, event: StatusEvent) {
        self.0.push(event);
    }

    /// Appends a status stamped with the current time, clamped so the
    /// history stays non-decreasing even if the wall clock steps backwards.
    pub fn record(&mut self, status: Status) {
        let mut at = Utc::now();
        if let Some(last) = self.last()
            && at < last.at()
        {
            at = last.at();
        }
        self.push(StatusEvent::new(status, at));
    }

    #[must_use]
    pub fn last(&self) -> Option<&StatusEvent> {
        self.0.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEvent> {
        self.0.iter()
    }

    /// The number of events carrying the given status.
    #[must_use]
    pub fn count_of(&self, status: Status) -> usize {
        self.0.iter().filter(|e| e.status() == status).count()
    }

    /// Whether timestamps are monotonically non-decreasing.
    #[must_use]
    pub fn is_monotonic(&self) -> bool {
        self.0.windows(2).all(|pair| pair[0].at() <= pair[1].at())
    }
}

impl<'a> IntoIterator for &'a StatusHistory {
    type Item = &'a StatusEvent;
    type IntoIter = std::slice::Iter<'a, StatusEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
