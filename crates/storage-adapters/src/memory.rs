//! In-process stores. Nothing survives a restart; used when no database is
//! configured and throughout the test suites.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use domains::auth::SessionId;
use domains::error::{DomainError, Result};
use domains::ports::{DocumentStore, SessionStore};
use domains::record::Record;
use uuid::Uuid;

struct Collection<R> {
    next_seq: u64,
    /// id -> (insert sequence, record)
    docs: HashMap<Uuid, (u64, R)>,
}

/// A collection held in a map behind a lock. Uniqueness checks and the
/// write happen under the same write lock.
pub struct MemoryDocumentStore<R> {
    inner: RwLock<Collection<R>>,
}

impl<R: Record> MemoryDocumentStore<R> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Collection {
                next_seq: 0,
                docs: HashMap::new(),
            }),
        }
    }
}

impl<R: Record> Default for MemoryDocumentStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> DomainError {
    DomainError::Internal("in-memory store lock poisoned".to_string())
}

/// First unique key of `candidate` already held by another record.
fn find_conflict<R: Record>(docs: &HashMap<Uuid, (u64, R)>, candidate: &R) -> Option<DomainError> {
    let keys = candidate.unique_keys();
    docs.values()
        .filter(|(_, other)| other.id() != candidate.id())
        .find_map(|(_, other)| {
            let theirs = other.unique_keys();
            keys.iter().find_map(|(field, value)| {
                theirs
                    .iter()
                    .any(|(f, v)| f == field && v == value)
                    .then(|| DomainError::Duplicate {
                        field: (*field).to_string(),
                        value: value.clone(),
                    })
            })
        })
}

#[async_trait]
impl<R: Record> DocumentStore<R> for MemoryDocumentStore<R> {
    async fn insert(&self, record: R) -> Result<R> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        if inner.docs.contains_key(&record.id()) {
            return Err(DomainError::Internal(format!(
                "{} {} already exists",
                R::KIND,
                record.id()
            )));
        }
        if let Some(conflict) = find_conflict(&inner.docs, &record) {
            return Err(conflict);
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.docs.insert(record.id(), (seq, record.clone()));
        Ok(record)
    }

    async fn replace(&self, record: R) -> Result<R> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        if let Some(conflict) = find_conflict(&inner.docs, &record) {
            return Err(conflict);
        }
        match inner.docs.get_mut(&record.id()) {
            Some(slot) => {
                slot.1 = record.clone();
                Ok(record)
            }
            None => Err(DomainError::NotFound(R::KIND, record.id().to_string())),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<R>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner.docs.get(&id).map(|(_, r)| r.clone()))
    }

    async fn find_by(&self, field: &str, value: &str) -> Result<Option<R>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner
            .docs
            .values()
            .find(|(_, r)| r.value(field).display() == value)
            .map(|(_, r)| r.clone()))
    }

    async fn list(&self) -> Result<Vec<R>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        let mut all: Vec<&(u64, R)> = inner.docs.values().collect();
        all.sort_by_key(|(seq, _)| *seq);
        Ok(all.into_iter().map(|(_, r)| r.clone()).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        Ok(inner.docs.remove(&id).is_some())
    }
}

#[derive(Debug, Clone, Copy)]
struct SessionRecord {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

/// Server-side sessions keyed by their random id.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<SessionId, SessionRecord>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user_id: Uuid, now: DateTime<Utc>, expires_at: DateTime<Utc>) -> Result<SessionId> {
        // Abandoned cookies are never resolved again; logins clear them out.
        self.sessions.retain(|_, r| r.expires_at > now);
        let id = SessionId::generate();
        self.sessions.insert(id.clone(), SessionRecord { user_id, expires_at });
        Ok(id)
    }

    async fn resolve(&self, id: &SessionId, now: DateTime<Utc>) -> Result<Option<Uuid>> {
        let record = self.sessions.get(id).map(|r| *r);
        match record {
            Some(r) if r.expires_at > now => Ok(Some(r.user_id)),
            Some(_) => {
                self.sessions.remove(id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn destroy(&self, id: &SessionId) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}
