//! Local filesystem implementation of `MediaStorage`.
//! Objects live under `root/{key}` and are served from `url_prefix`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use domains::error::{DomainError, Result};
use domains::ports::MediaStorage;
use tokio::fs;

pub struct LocalMediaStorage {
    /// Root directory for all uploads (e.g., "./data/media")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/media")
    url_prefix: String,
}

impl LocalMediaStorage {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self {
            root_path: root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_path
    }

    /// Resolves `key` below the root. Keys may only contain plain path
    /// segments.
    fn object_path(&self, key: &str) -> Result<PathBuf> {
        let rel = Path::new(key);
        let plain = !key.is_empty() && rel.components().all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(DomainError::Storage(format!("invalid object key `{key}`")));
        }
        Ok(self.root_path.join(rel))
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn upload(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<String> {
        let target = self.object_path(key)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::Storage(format!("create {}: {e}", parent.display())))?;
        }
        fs::write(&target, &bytes)
            .await
            .map_err(|e| DomainError::Storage(format!("write {}: {e}", target.display())))?;

        tracing::debug!(path = %target.display(), size = bytes.len(), "media object written");
        Ok(format!("{}/{}", self.url_prefix, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("nadbench-media-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn writes_object_and_returns_public_url() {
        let root = scratch_dir();
        let storage = LocalMediaStorage::new(root.clone(), "/media/".into());

        let url = storage
            .upload("previews/a.png", Bytes::from_static(b"png-bytes"), "image/png")
            .await
            .unwrap();

        assert_eq!(url, "/media/previews/a.png");
        let written = std::fs::read(root.join("previews/a.png")).unwrap();
        assert_eq!(written, b"png-bytes");
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn keys_cannot_escape_the_root() {
        let storage = LocalMediaStorage::new(scratch_dir(), "/media".into());
        for key in ["../etc/passwd", "/abs.png", ""] {
            let err = storage
                .upload(key, Bytes::from_static(b"x"), "image/png")
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::Storage(_)), "{key}");
        }
    }
}
