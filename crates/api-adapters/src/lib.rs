//! # api-adapters
//!
//! The axum web layer: public catalog, feedback form, JSON API and the
//! generic admin console, rendered with askama templates.

pub mod admin;
pub mod auth;
pub mod error;
pub mod forms;
pub mod metrics;
pub mod public;
pub mod router;
pub mod session;
pub mod state;
pub mod views;

pub use error::ApiError;
pub use metrics::Metrics;
pub use router::router;
pub use state::{AppComponents, AppState, WebSettings};
