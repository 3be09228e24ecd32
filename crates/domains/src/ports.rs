//! # Core Traits (Ports)
//!
//! Adapters implement these traits; services only ever see the traits.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::SessionId;
use crate::error::Result;
use crate::record::Record;

/// Persistence contract for one collection of records.
///
/// Implementations enforce `Record::unique_keys` atomically with the write
/// and report violations as `DomainError::Duplicate`.
#[async_trait]
pub trait DocumentStore<R: Record>: Send + Sync {
    /// Inserts a new record. Fails with `Duplicate` on a unique-key clash.
    async fn insert(&self, record: R) -> Result<R>;

    /// Replaces an existing record. `NotFound` if the id is unknown.
    async fn replace(&self, record: R) -> Result<R>;

    async fn get(&self, id: Uuid) -> Result<Option<R>>;

    /// Looks up a record by the value of one of its unique keys.
    async fn find_by(&self, field: &str, value: &str) -> Result<Option<R>>;

    /// Every record, oldest insert first.
    async fn list(&self) -> Result<Vec<R>>;

    /// Removes a record. Returns `false` when nothing had that id.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Object storage for dataset preview images.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Stores `bytes` under `key` and returns the object's public URL.
    async fn upload(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<String>;
}

/// One-way salted password hashing.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    /// Hashes `plaintext` with a fresh random salt.
    fn hash(&self, plaintext: &str) -> Result<String>;

    /// Recomputes and compares. Malformed hashes never verify.
    fn verify(&self, stored_hash: &str, plaintext: &str) -> bool;
}

/// Server-side session records.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Opens a session for `user_id`, issued at `now` and valid until
    /// `expires_at`. Stores may drop sessions that expired before `now`.
    async fn create(&self, user_id: Uuid, now: DateTime<Utc>, expires_at: DateTime<Utc>) -> Result<SessionId>;

    /// The user bound to a live session. Expired sessions resolve to `None`.
    async fn resolve(&self, id: &SessionId, now: DateTime<Utc>) -> Result<Option<Uuid>>;

    /// Ends a session. Unknown ids are ignored.
    async fn destroy(&self, id: &SessionId) -> Result<()>;
}

/// Source of "now" for save hooks and session expiry.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
