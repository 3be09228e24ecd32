//! # RecordService
//!
//! The generic CRUD engine. One instance per collection; the same save
//! path serves the admin console, the public feedback form and the seed
//! tool, so hooks and validation always run.

use std::cmp::Ordering;
use std::sync::Arc;

use domains::error::{DomainError, Result, ValidationErrors};
use domains::hooks::SaveContext;
use domains::ports::{Clock, DocumentStore};
use domains::record::{Changes, FieldValue, Record};
use domains::view::{CollectionView, ListQuery, Page};
use uuid::Uuid;

/// A save that failed, with the unsaved draft so the form can be
/// re-rendered with the submitted values.
#[derive(Debug)]
pub struct Rejected<R> {
    pub draft: R,
    pub error: DomainError,
}

pub struct RecordService<R: Record> {
    store: Arc<dyn DocumentStore<R>>,
    clock: Arc<dyn Clock>,
}

impl<R: Record> Clone for RecordService<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R: Record> RecordService<R> {
    pub fn new(store: Arc<dyn DocumentStore<R>>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Filters, searches, sorts and paginates the collection.
    pub async fn list(&self, view: &CollectionView, query: &ListQuery) -> Result<Page<R>> {
        let mut matching: Vec<R> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|r| query.matches(view, r))
            .collect();

        if let Some(sort) = view.sort {
            matching.sort_by(|a, b| {
                let ord = compare(&a.value(sort.field), &b.value(sort.field));
                if sort.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(query.page.saturating_mul(query.per_page))
            .take(query.per_page)
            .collect();

        Ok(Page {
            items,
            page: query.page,
            per_page: query.per_page,
            total,
        })
    }

    /// Fetches a record, `NotFound` if the id is unknown.
    pub async fn get(&self, id: Uuid) -> Result<R> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(R::KIND, id.to_string()))
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.store.list().await?.is_empty())
    }

    pub async fn find_by(&self, field: &str, value: &str) -> Result<Option<R>> {
        self.store.find_by(field, value).await
    }

    /// Creates a record from form changes on top of the defaults.
    pub async fn create(&self, changes: &Changes) -> std::result::Result<R, Rejected<R>> {
        let mut draft = R::blank();
        draft.apply(changes);
        match self.insert(draft.clone()).await {
            Ok(saved) => Ok(saved),
            Err(error) => Err(Rejected { draft, error }),
        }
    }

    /// Applies form changes to an existing record and saves it.
    pub async fn update(&self, existing: R, changes: &Changes) -> std::result::Result<R, Rejected<R>> {
        let mut draft = existing;
        draft.apply(changes);
        match self.replace(draft.clone()).await {
            Ok(saved) => Ok(saved),
            Err(error) => Err(Rejected { draft, error }),
        }
    }

    /// Saves a new record through hooks, validation and uniqueness checks.
    pub async fn insert(&self, record: R) -> Result<R> {
        self.persist(record, true).await
    }

    /// Saves an existing record through hooks, validation and uniqueness checks.
    pub async fn replace(&self, record: R) -> Result<R> {
        self.persist(record, false).await
    }

    /// Deletes by id. `NotFound` when nothing had that id.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if self.store.delete(id).await? {
            tracing::info!(collection = R::COLLECTION, %id, "record deleted");
            Ok(())
        } else {
            Err(DomainError::NotFound(R::KIND, id.to_string()))
        }
    }

    async fn persist(&self, mut record: R, is_new: bool) -> Result<R> {
        let ctx = SaveContext { now: self.clock.now() };

        let mut errors = ValidationErrors::default();
        for hook in R::pre_save_hooks() {
            if let Err(e) = hook.apply(&mut record, &ctx) {
                tracing::debug!(collection = R::COLLECTION, hook = hook.name(), field = %e.field, "pre-save hook rejected record");
                errors.push(e);
            }
        }
        if let Err(DomainError::Validation(more)) = record.validate() {
            for e in more.0 {
                if !errors.iter().any(|known| known.field == e.field) {
                    errors.push(e);
                }
            }
        }
        errors.into_result()?;

        let id = record.id();
        let saved = if is_new {
            self.store.insert(record).await?
        } else {
            self.store.replace(record).await?
        };
        tracing::info!(collection = R::COLLECTION, %id, is_new, "record saved");
        Ok(saved)
    }
}

/// Ordering used by list sorting. Text compares case-insensitively;
/// missing timestamps sort before present ones.
fn compare(a: &FieldValue<'_>, b: &FieldValue<'_>) -> Ordering {
    match (a, b) {
        (FieldValue::Text(x), FieldValue::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (FieldValue::Time(x), FieldValue::Time(y)) => x.cmp(y),
        (FieldValue::Flag(x), FieldValue::Flag(y)) => x.cmp(y),
        _ => a.display().cmp(&b.display()),
    }
}
