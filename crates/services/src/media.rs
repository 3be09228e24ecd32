//! # PreviewService
//!
//! Validates dataset preview images and hands them to object storage.
//! One attempt per request: failures go back to the admin, who re-submits.

use std::sync::Arc;

use bytes::Bytes;
use domains::error::{DomainError, Result};
use domains::ports::MediaStorage;
use uuid::Uuid;

/// Field the preview URL is written to.
pub const PREVIEW_FIELD: &str = "image_url";

/// A file received from a form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Clone)]
pub struct PreviewService {
    storage: Arc<dyn MediaStorage>,
    max_bytes: usize,
}

impl PreviewService {
    pub fn new(storage: Arc<dyn MediaStorage>, max_bytes: usize) -> Self {
        Self { storage, max_bytes }
    }

    /// Stores a preview image and returns its public URL.
    pub async fn upload_preview(&self, upload: Upload) -> Result<String> {
        if upload.bytes.is_empty() {
            return Err(DomainError::invalid(PREVIEW_FIELD, "The uploaded file is empty."));
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(DomainError::invalid(
                PREVIEW_FIELD,
                format!("Preview images are limited to {} bytes.", self.max_bytes),
            ));
        }

        let content_type = upload.content_type.as_deref().unwrap_or_default();
        let file = upload.file_name.as_deref().filter(|n| !n.is_empty()).unwrap_or("upload");
        let extension = image_extension(content_type).ok_or_else(|| {
            DomainError::invalid(
                PREVIEW_FIELD,
                format!("Preview must be a PNG, JPEG, GIF or WebP image; {file} is {content_type:?}."),
            )
        })?;

        let key = format!("previews/{}.{}", Uuid::new_v4(), extension);
        let size = upload.bytes.len();
        match self.storage.upload(&key, upload.bytes, content_type).await {
            Ok(url) => {
                tracing::info!(%key, %file, size, "preview image stored");
                Ok(url)
            }
            Err(e) => {
                tracing::warn!(%key, %file, error = %e, "preview upload failed");
                Err(e)
            }
        }
    }
}

/// File extension for the raster image types accepted as previews.
fn image_extension(content_type: &str) -> Option<&'static str> {
    let parsed: mime::Mime = content_type.parse().ok()?;
    if parsed.type_() != mime::IMAGE {
        return None;
    }
    match parsed.subtype().as_str() {
        "png" => Some("png"),
        "jpeg" | "jpg" | "pjpeg" => Some("jpg"),
        "gif" => Some("gif"),
        "webp" => Some("webp"),
        _ => None,
    }
}
