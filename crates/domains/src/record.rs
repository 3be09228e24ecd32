//! # Record
//!
//! The schema contract shared by every collection in the document store.
//! Field metadata is declared as data (`FieldSpec`) so the generic CRUD
//! engine can validate, search, filter and render records without knowing
//! their concrete type.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::error::{FieldError, Result, ValidationErrors};
use crate::hooks::PreSaveHook;

/// How a field is stored and edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single-line string
    Text,
    /// Multi-line string
    LongText,
    /// List of short strings, edited as comma-separated text
    Tags,
    /// Boolean flag
    Flag,
    /// Server-assigned time; never taken from a form
    Timestamp,
    /// URL of an uploaded image; the form also offers a file input
    Image,
    /// Derived value; never taken from a form
    Derived,
    /// Secret material (password hashes); never rendered or taken from a form
    Secret,
}

impl FieldKind {
    /// Whether a submitted form may assign this field.
    pub fn is_editable(self) -> bool {
        !matches!(
            self,
            FieldKind::Timestamp | FieldKind::Derived | FieldKind::Secret
        )
    }
}

/// Static description of one field of a record.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self { name, label, kind, required: true }
    }

    pub const fn optional(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self { name, label, kind, required: false }
    }
}

/// A borrowed view of one field's current value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Tags(&'a [String]),
    Flag(bool),
    Time(Option<DateTime<Utc>>),
    /// The record has no field with that name.
    Absent,
}

impl FieldValue<'_> {
    /// Blank means "missing" for required-field validation.
    /// Flags are never blank; they always hold a value.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Tags(tags) => tags.iter().all(|t| t.trim().is_empty()),
            FieldValue::Flag(_) => false,
            FieldValue::Time(t) => t.is_none(),
            FieldValue::Absent => true,
        }
    }

    /// Plain-text rendering used in list tables and form inputs.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Text(s) => (*s).to_string(),
            FieldValue::Tags(tags) => tags.join(", "),
            FieldValue::Flag(b) => b.to_string(),
            FieldValue::Time(Some(t)) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
            FieldValue::Time(None) | FieldValue::Absent => String::new(),
        }
    }
}

/// A value submitted for one editable field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    Text(String),
    Tags(Vec<String>),
    Flag(bool),
}

impl FieldInput {
    /// Parses raw form text according to the field kind.
    /// `None` for fields forms must not assign.
    pub fn parse(kind: FieldKind, raw: Option<&str>) -> Option<Self> {
        match kind {
            FieldKind::Text | FieldKind::LongText | FieldKind::Image => {
                Some(FieldInput::Text(raw.unwrap_or_default().trim().to_string()))
            }
            FieldKind::Tags => Some(FieldInput::Tags(
                raw.unwrap_or_default()
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            // Unchecked HTML checkboxes are simply absent from the submission.
            FieldKind::Flag => Some(FieldInput::Flag(matches!(
                raw.map(|r| r.trim().to_ascii_lowercase()).as_deref(),
                Some("on" | "true" | "1" | "y" | "yes")
            ))),
            FieldKind::Timestamp | FieldKind::Derived | FieldKind::Secret => None,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            FieldInput::Text(s) => s,
            FieldInput::Tags(tags) => tags.join(", "),
            FieldInput::Flag(b) => b.to_string(),
        }
    }

    pub fn into_tags(self) -> Vec<String> {
        match self {
            FieldInput::Tags(tags) => tags,
            FieldInput::Text(s) => {
                if s.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![s]
                }
            }
            FieldInput::Flag(b) => vec![b.to_string()],
        }
    }

    pub fn into_flag(self) -> bool {
        match self {
            FieldInput::Flag(b) => b,
            FieldInput::Text(s) => matches!(s.as_str(), "on" | "true" | "1" | "y" | "yes"),
            FieldInput::Tags(_) => false,
        }
    }
}

/// An ordered set of field assignments coming from a form or an import.
pub type Changes = Vec<(&'static str, FieldInput)>;

/// Converts an optional text field into `None` when blank.
pub fn non_blank(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

/// A document kind persisted by a `DocumentStore`.
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Collection (table) name in the store.
    const COLLECTION: &'static str;
    /// Singular label used in messages ("Dataset").
    const KIND: &'static str;
    /// Every field, in display order.
    const FIELDS: &'static [FieldSpec];

    /// A new record with a fresh id and default values.
    fn blank() -> Self;

    fn id(&self) -> Uuid;

    fn value(&self, field: &str) -> FieldValue<'_>;

    /// Assigns one submitted value. Unknown or read-only fields are ignored.
    fn assign(&mut self, field: &str, input: FieldInput);

    /// (field, value) pairs that must be unique across the collection.
    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Side effects run, in order, before every save.
    fn pre_save_hooks() -> &'static [&'static dyn PreSaveHook<Self>] {
        &[]
    }

    fn field(name: &str) -> Option<&'static FieldSpec> {
        Self::FIELDS.iter().find(|f| f.name == name)
    }

    /// Applies every change in order.
    fn apply(&mut self, changes: &Changes) {
        for (field, input) in changes {
            self.assign(field, input.clone());
        }
    }

    /// Checks that every required field holds a value.
    fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::default();
        for spec in Self::FIELDS.iter().filter(|f| f.required) {
            if self.value(spec.name).is_blank() {
                errors.push(FieldError::new(spec.name, "This field is required."));
            }
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_split_on_commas() {
        let input = FieldInput::parse(FieldKind::Tags, Some(" segmentation, ,detection ,"));
        assert_eq!(
            input,
            Some(FieldInput::Tags(vec!["segmentation".into(), "detection".into()]))
        );
    }

    #[test]
    fn missing_checkbox_means_false() {
        assert_eq!(FieldInput::parse(FieldKind::Flag, None), Some(FieldInput::Flag(false)));
        assert_eq!(FieldInput::parse(FieldKind::Flag, Some("on")), Some(FieldInput::Flag(true)));
    }

    #[test]
    fn read_only_kinds_are_not_parsed() {
        assert_eq!(FieldInput::parse(FieldKind::Timestamp, Some("2020-01-01")), None);
        assert_eq!(FieldInput::parse(FieldKind::Derived, Some("x")), None);
        assert_eq!(FieldInput::parse(FieldKind::Secret, Some("x")), None);
    }

    #[test]
    fn blank_values() {
        assert!(FieldValue::Text("   ").is_blank());
        assert!(!FieldValue::Flag(false).is_blank());
        assert!(FieldValue::Time(None).is_blank());
        assert!(FieldValue::Absent.is_blank());
    }
}
