//! Application state shared by every handler.

use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;

use auth_adapters::CookieSigner;
use domains::models::{Dataset, Feedback};
use services::{AuthService, PreviewService, RecordService};

use crate::metrics::Metrics;

/// Web-facing settings, resolved from configuration by the binary.
#[derive(Debug, Clone)]
pub struct WebSettings {
    /// Rows per admin list page
    pub page_size: usize,
    /// Datasets per public catalog page
    pub catalog_page_size: usize,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub session_ttl_seconds: u64,
    /// Largest accepted request body
    pub max_body_bytes: usize,
    /// Directory served at `media_url_prefix`, for the local media backend
    pub media_root: Option<PathBuf>,
    pub media_url_prefix: String,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            page_size: 20,
            catalog_page_size: 12,
            cookie_name: "nadbench_session".into(),
            cookie_secure: false,
            session_ttl_seconds: 8 * 60 * 60,
            max_body_bytes: 6 * 1024 * 1024,
            media_root: None,
            media_url_prefix: "/media".into(),
        }
    }
}

pub struct AppComponents {
    pub datasets: RecordService<Dataset>,
    pub feedback: RecordService<Feedback>,
    pub auth: AuthService,
    pub previews: PreviewService,
    pub signer: CookieSigner,
    pub metrics: Metrics,
    pub settings: WebSettings,
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppComponents>,
}

impl AppState {
    pub fn new(components: AppComponents) -> Self {
        Self {
            inner: Arc::new(components),
        }
    }
}

impl Deref for AppState {
    type Target = AppComponents;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
