//! Email persistence.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use outbox_common::Email;

use crate::{Result, StoreError};

/// Where emails and their status histories live.
///
/// `insert` assigns the id; `update` replaces the stored record, status
/// history included.
#[async_trait]
pub trait EmailStore: Send + Sync {
    /// Persists a new email and returns it with its assigned id.
    async fn insert(&self, email: Email) -> Result<Email>;

    /// Fetches an email by id.
    async fn get(&self, id: u64) -> Result<Email>;

    /// Replaces the stored email, returning the stored value.
    async fn update(&self, email: Email) -> Result<Email>;
}

/// In-memory implementation over a concurrent map with a dense id sequence.
#[derive(Debug, Default)]
pub struct MemoryEmailStore {
    emails: DashMap<u64, Email>,
    next_id: AtomicU64,
}

impl MemoryEmailStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored emails.
    #[must_use]
    pub fn len(&self) -> usize {
        self.emails.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

#[async_trait]
impl EmailStore for MemoryEmailStore {
    async fn insert(&self, mut email: Email) -> Result<Email> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        email.assign_id(id);
        self.emails.insert(id, email.clone());
        Ok(email)
    }

    async fn get(&self, id: u64) -> Result<Email> {
        self.emails
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn update(&self, email: Email) -> Result<Email> {
        let id = email.id();
        if !self.emails.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        self.emails.insert(id, email.clone());
        Ok(email)
    }
}
