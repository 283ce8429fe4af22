//! The status-service collaborator used by the ingestion path.
//!
//! Distinct from the per-email status history: this is the coarse
//! notification-level record the ingestion API hands back to callers.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::{Result, StoreError};

/// Coarse state of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// Queued and in the process of being sent.
    Queued,
    /// Fulfilled.
    Sent,
    /// Failed for good.
    Failed,
}

/// One notification's status record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusInfo {
    id: u64,
    status: SendStatus,
    created_at: DateTime<Utc>,
    last_update_at: DateTime<Utc>,
}

impl StatusInfo {
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub const fn status(&self) -> SendStatus {
        self.status
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub const fn last_update_at(&self) -> DateTime<Utc> {
        self.last_update_at
    }
}

/// Creation and lookup of status records.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Creates a record in the given state, stamped now.
    async fn create(&self, status: SendStatus) -> Result<StatusInfo>;

    /// Fetches a record by id.
    async fn get(&self, id: u64) -> Result<StatusInfo>;
}

/// In-memory implementation.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    infos: DashMap<u64, StatusInfo>,
    next_id: AtomicU64,
}

impl MemoryStatusStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn create(&self, status: SendStatus) -> Result<StatusInfo> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let now = Utc::now();
        let info = StatusInfo {
            id,
            status,
            created_at: now,
            last_update_at: now,
        };
        self.infos.insert(id, info.clone());
        Ok(info)
    }

    async fn get(&self, id: u64) -> Result<StatusInfo> {
        self.infos
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound(id))
    }
}
