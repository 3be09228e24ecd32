//! # storage-adapters
//!
//! Implementations of the persistence and media ports:
//! - `memory`: in-process document and session stores (dev and tests)
//! - `postgres`: JSONB document store (feature `db-postgres`)
//! - `local_media`: previews written to a local directory
//! - `s3`: previews uploaded to an S3 bucket (feature `media-s3`)

pub mod local_media;
pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;

#[cfg(feature = "media-s3")]
pub mod s3;

pub use local_media::LocalMediaStorage;
pub use memory::{MemoryDocumentStore, MemorySessionStore};
