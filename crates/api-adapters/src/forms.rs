//! Submitted form data and its translation into record changes.

use std::collections::HashMap;

use axum::extract::Multipart;
use domains::record::{Changes, FieldInput, FieldKind, Record};
use domains::view::CollectionView;
use services::Upload;

use crate::error::ApiError;

/// Suffix of the file input that accompanies an image field.
pub const FILE_SUFFIX: &str = "_file";

/// Text values and files of one submission.
#[derive(Debug, Default)]
pub struct FormData {
    values: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

impl FormData {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self {
            values: pairs.into_iter().collect(),
            files: HashMap::new(),
        }
    }

    /// Reads a `multipart/form-data` body. Empty file inputs are dropped.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = FormData::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else { continue };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let declared = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(|e| ApiError::BadRequest(e.body_text()))?;
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    let content_type = declared
                        .filter(|ct| ct != "application/octet-stream")
                        .or_else(|| mime_guess::from_path(&file_name).first_raw().map(str::to_string));
                    form.files.insert(
                        name,
                        Upload {
                            file_name: Some(file_name),
                            content_type,
                            bytes,
                        },
                    );
                }
                None => {
                    let text = field.text().await.map_err(|e| ApiError::BadRequest(e.body_text()))?;
                    form.values.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }

    /// Changes for every field the view lets a form edit.
    pub fn changes<R: Record>(&self, view: &CollectionView) -> Changes {
        self.collect::<R>(|name| !view.is_hidden(name))
    }

    /// Changes restricted to the listed fields; everything else is ignored.
    pub fn changes_only<R: Record>(&self, allowed: &[&str]) -> Changes {
        self.collect::<R>(|name| allowed.contains(&name))
    }

    fn collect<R: Record>(&self, include: impl Fn(&str) -> bool) -> Changes {
        R::FIELDS
            .iter()
            .filter(|spec| spec.kind.is_editable() && include(spec.name))
            .filter_map(|spec| {
                let raw = self.value(spec.name);
                // A missing text input means the form did not offer it.
                if raw.is_none() && spec.kind != FieldKind::Flag {
                    return None;
                }
                FieldInput::parse(spec.kind, raw).map(|input| (spec.name, input))
            })
            .collect()
    }
}

/// Image fields of a record type, whose forms accept a file upload.
pub fn image_fields<R: Record>() -> impl Iterator<Item = &'static str> {
    R::FIELDS
        .iter()
        .filter(|spec| spec.kind == FieldKind::Image)
        .map(|spec| spec.name)
}
