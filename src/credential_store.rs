use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use futures::future::{self, BoxFuture};
use thiserror::Error;

use crate::data_structs::user::{ConnectionStatus, UserRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("user {0} not found")]
    UserNotFound(String),
    #[error("invalid user row: {0}")]
    InvalidRow(String),
}

/// Persistent home of the user credential records.
///
/// Lookups by identifier match either the email or the username column and
/// return the first match; both columns are unique so there is at most one.
pub trait CredentialStore: Send + Sync {
    fn find_by_identifier<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, Result<Option<UserRecord>, StoreError>>;

    fn find_by_id<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<UserRecord>, StoreError>>;

    fn mark_connected<'a>(&'a self, user_id: &'a str, at: DateTime<Utc>) -> BoxFuture<'a, Result<(), StoreError>>;

    fn mark_disconnected<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<(), StoreError>>;
}

/// Process-local store keyed by user id.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<AHashMap<String, UserRecord>>,
    writes: AtomicUsize,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<UserRecord>) -> Self {
        let store = Self::new();
        for user in users {
            store.insert(user);
        }
        return store;
    }

    /// Seeds a record. Not counted as a write.
    pub fn insert(&self, user: UserRecord) {
        let mut users = self.users.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        users.insert(user.id.clone(), user);
    }

    pub fn get(&self, user_id: &str) -> Option<UserRecord> {
        let users = self.users.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        users.get(user_id).cloned()
    }

    /// Number of status updates applied since creation.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn update(&self, user_id: &str, status: ConnectionStatus, at: Option<DateTime<Utc>>) -> Result<(), StoreError> {
        let mut users = self.users.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let user = users.get_mut(user_id)
            .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))?;
        user.auth = status;
        if at.is_some() {
            user.auth_last_at = at;
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn find_by_identifier<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, Result<Option<UserRecord>, StoreError>> {
        let users = self.users.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let found = users.values().find(|user| user.matches_identifier(identifier)).cloned();
        Box::pin(future::ready(Ok(found)))
    }

    fn find_by_id<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<UserRecord>, StoreError>> {
        Box::pin(future::ready(Ok(self.get(user_id))))
    }

    fn mark_connected<'a>(&'a self, user_id: &'a str, at: DateTime<Utc>) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(future::ready(self.update(user_id, ConnectionStatus::Connected, Some(at))))
    }

    fn mark_disconnected<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(future::ready(self.update(user_id, ConnectionStatus::Disconnected, None)))
    }
}
