//! # domains
//!
//! Records, schema rules and port traits of the dataset catalog.
//! Nothing in here performs I/O; adapters implement the traits in `ports`.

pub mod auth;
pub mod clock;
pub mod error;
pub mod hooks;
pub mod models;
pub mod ports;
pub mod record;
pub mod slug;
pub mod view;

pub use auth::{CurrentUser, SessionId};
pub use error::{DomainError, FieldError, Result, ValidationErrors};
pub use models::{AdminUser, Dataset, Feedback};
pub use record::{Changes, FieldInput, FieldKind, FieldSpec, FieldValue, Record};
