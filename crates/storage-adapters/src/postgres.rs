//! # Postgres document store
//!
//! Each collection is a table of `(seq, id, doc JSONB)` rows; see
//! `migrations/`. Unique fields are enforced by expression indexes named
//! `{collection}_{field}_key`, so the uniqueness check and the write are a
//! single statement.

use std::marker::PhantomData;

use async_trait::async_trait;
use domains::error::{DomainError, Result};
use domains::ports::DocumentStore;
use domains::record::Record;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use uuid::Uuid;

/// Opens a connection pool.
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .map_err(|e| DomainError::Internal(format!("database connect: {e}")))
}

/// Applies the bundled migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::Internal(format!("database migration: {e}")))
}

pub struct PgDocumentStore<R> {
    pool: PgPool,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> PgDocumentStore<R> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _record: PhantomData,
        }
    }

    /// Maps driver errors, turning unique-index violations into
    /// `Duplicate` for the offending field.
    fn map_err(record: Option<&R>, err: sqlx::Error) -> DomainError {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                if let Some(field) = db.constraint().and_then(unique_field::<R>) {
                    let value = record
                        .and_then(|r| r.unique_keys().into_iter().find(|(f, _)| *f == field))
                        .map(|(_, v)| v)
                        .unwrap_or_default();
                    return DomainError::Duplicate {
                        field: field.to_string(),
                        value,
                    };
                }
            }
        }
        tracing::error!(collection = R::COLLECTION, error = %err, "database error");
        DomainError::Internal(format!("database error: {err}"))
    }
}

/// Field name encoded in a `{collection}_{field}_key` index name.
fn unique_field<R: Record>(constraint: &str) -> Option<&'static str> {
    let field = constraint
        .strip_prefix(R::COLLECTION)?
        .strip_prefix('_')?
        .strip_suffix("_key")?;
    R::FIELDS.iter().map(|f| f.name).find(|name| *name == field)
}

#[async_trait]
impl<R: Record + Unpin> DocumentStore<R> for PgDocumentStore<R> {
    async fn insert(&self, record: R) -> Result<R> {
        let sql = format!("INSERT INTO {} (id, doc) VALUES ($1, $2)", R::COLLECTION);
        sqlx::query(&sql)
            .bind(record.id())
            .bind(Json(&record))
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_err(Some(&record), e))?;
        Ok(record)
    }

    async fn replace(&self, record: R) -> Result<R> {
        let sql = format!("UPDATE {} SET doc = $2 WHERE id = $1", R::COLLECTION);
        let done = sqlx::query(&sql)
            .bind(record.id())
            .bind(Json(&record))
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_err(Some(&record), e))?;
        if done.rows_affected() == 0 {
            return Err(DomainError::NotFound(R::KIND, record.id().to_string()));
        }
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Option<R>> {
        let sql = format!("SELECT doc FROM {} WHERE id = $1", R::COLLECTION);
        let row: Option<(Json<R>,)> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::map_err(None, e))?;
        Ok(row.map(|(Json(doc),)| doc))
    }

    async fn find_by(&self, field: &str, value: &str) -> Result<Option<R>> {
        let sql = format!(
            "SELECT doc FROM {} WHERE doc->>$1 = $2 ORDER BY seq LIMIT 1",
            R::COLLECTION
        );
        let row: Option<(Json<R>,)> = sqlx::query_as(&sql)
            .bind(field)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::map_err(None, e))?;
        Ok(row.map(|(Json(doc),)| doc))
    }

    async fn list(&self) -> Result<Vec<R>> {
        let sql = format!("SELECT doc FROM {} ORDER BY seq", R::COLLECTION);
        let rows: Vec<(Json<R>,)> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Self::map_err(None, e))?;
        Ok(rows.into_iter().map(|(Json(doc),)| doc).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", R::COLLECTION);
        let done = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_err(None, e))?;
        Ok(done.rows_affected() > 0)
    }
}
