//! # DomainError
//!
//! Centralized error handling for the catalog.
//! Every port and service returns these; the web layer decides how each
//! variant is shown to the user.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A problem attached to a single form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// All field problems found by one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Returns `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// The primary error type for all catalog operations.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Record not found (e.g. Dataset, Feedback)
    #[error("{0} not found with ID {1}")]
    NotFound(&'static str, String),

    /// One or more required fields are blank or malformed
    #[error("validation error: {0}")]
    Validation(ValidationErrors),

    /// A unique field already holds this value in another record
    #[error("duplicate {field}: {value:?} is already taken")]
    Duplicate { field: String, value: String },

    /// Invalid credentials or missing session
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Object storage failure (transport, credentials, bucket)
    #[error("storage service error: {0}")]
    Storage(String),

    /// Infrastructure failure (e.g. DB down, serialization)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation(ValidationErrors(vec![FieldError::new(field, message)]))
    }

    /// True for errors the submitting form should display inline.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DomainError::Validation(_) | DomainError::Duplicate { .. }
        )
    }

    /// Field-level view of a validation or uniqueness failure.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            DomainError::Validation(errors) => errors.0.clone(),
            DomainError::Duplicate { field, value } => vec![FieldError::new(
                field.clone(),
                format!("{value:?} is already taken"),
            )],
            _ => Vec::new(),
        }
    }
}

/// A specialized Result type for catalog logic.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_is_reported_as_field_error() {
        let err = DomainError::Duplicate {
            field: "slug".into(),
            value: "flood-maps".into(),
        };
        assert!(err.is_validation());
        let fields = err.field_errors();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field, "slug");
    }

    #[test]
    fn empty_errors_are_ok() {
        assert!(ValidationErrors::default().into_result().is_ok());
        let mut errors = ValidationErrors::default();
        errors.push(FieldError::new("name", "is required"));
        assert!(matches!(
            errors.into_result(),
            Err(DomainError::Validation(_))
        ));
    }
}
