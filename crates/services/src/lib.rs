//! # services
//!
//! Application logic of the catalog, written against the port traits in
//! `domains`. Adapters are injected at construction time.

pub mod auth;
pub mod media;
pub mod records;

pub use auth::AuthService;
pub use media::{PreviewService, Upload};
pub use records::{Rejected, RecordService};
