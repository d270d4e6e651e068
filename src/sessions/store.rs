//! Session store interface and an in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by a session store.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// The backing store could not be reached.
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    /// A write to a single session failed.
    #[error("session {id} could not be written: {reason}")]
    Write { id: String, reason: String },
}

/// One persisted login session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: Uuid,
    pub roles: Vec<String>,
    pub last_activity: DateTime<Utc>,
    pub expire_at: DateTime<Utc>,
    pub is_revoked: bool,
}

impl SessionRecord {
    /// A session that is neither revoked nor past its expiry.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked && now <= self.expire_at
    }
}

/// Storage for login sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, SessionStoreError>;

    async fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, SessionStoreError>;

    async fn insert_session(&self, record: SessionRecord) -> Result<(), SessionStoreError>;

    /// Set `last_activity`. Touching a missing session is not an error.
    async fn touch_session(&self, id: &str, at: DateTime<Utc>) -> Result<(), SessionStoreError>;

    /// Remove a session. Deleting a missing session is not an error.
    async fn delete_session(&self, id: &str) -> Result<(), SessionStoreError>;
}

/// Session store held in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<DashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, SessionStoreError> {
        Ok(self.inner.iter().map(|r| r.value().clone()).collect())
    }

    async fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, SessionStoreError> {
        Ok(self.inner.get(id).map(|r| r.value().clone()))
    }

    async fn insert_session(&self, record: SessionRecord) -> Result<(), SessionStoreError> {
        self.inner.insert(record.id.clone(), record);
        Ok(())
    }

    async fn touch_session(&self, id: &str, at: DateTime<Utc>) -> Result<(), SessionStoreError> {
        if let Some(mut record) = self.inner.get_mut(id) {
            record.last_activity = at;
        }
        Ok(())
    }

    async fn delete_session(&self, id: &str) -> Result<(), SessionStoreError> {
        self.inner.remove(id);
        Ok(())
    }
}
