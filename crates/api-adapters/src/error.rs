//! HTTP mapping of domain errors.

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use domains::error::DomainError;
use thiserror::Error;

use crate::views::ErrorPage;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("template error: {0}")]
    Template(#[from] askama::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(DomainError::NotFound(..)) => StatusCode::NOT_FOUND,
            ApiError::Domain(DomainError::Validation(_) | DomainError::Duplicate { .. }) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Domain(DomainError::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
            ApiError::Domain(DomainError::Storage(_)) => StatusCode::BAD_GATEWAY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Domain(DomainError::Internal(_)) | ApiError::Template(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text safe to show a visitor. Server-side failures stay generic.
    fn public_message(&self) -> String {
        let status = self.status();
        if status.is_server_error() {
            if status == StatusCode::BAD_GATEWAY {
                return "The file storage service is unavailable. Please try again.".into();
            }
            return "Something went wrong on our side.".into();
        }
        match self {
            ApiError::Domain(DomainError::NotFound(kind, _)) => format!("{kind} not found."),
            other => other.to_string(),
        }
    }

    fn log(&self) {
        if self.status().is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status();
        let page = ErrorPage {
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            status: status.as_u16(),
            message: self.public_message(),
        };
        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "error page failed to render");
                (status, page.message).into_response()
            }
        }
    }
}

/// The same mapping for the JSON API: `{"error": "..."}`.
#[derive(Debug)]
pub struct JsonError(pub ApiError);

impl From<ApiError> for JsonError {
    fn from(err: ApiError) -> Self {
        JsonError(err)
    }
}

impl From<DomainError> for JsonError {
    fn from(err: DomainError) -> Self {
        JsonError(err.into())
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        self.0.log();
        let body = serde_json::json!({ "error": self.0.public_message() });
        (self.0.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        let nf = ApiError::from(DomainError::NotFound("Dataset", "x".into()));
        assert_eq!(nf.status(), StatusCode::NOT_FOUND);
        assert_eq!(nf.public_message(), "Dataset not found.");

        let storage = ApiError::from(DomainError::Storage("AccessDenied: key AKIA...".into()));
        assert_eq!(storage.status(), StatusCode::BAD_GATEWAY);
        assert!(!storage.public_message().contains("AKIA"));

        let internal = ApiError::from(DomainError::Internal("pool timed out".into()));
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!internal.public_message().contains("pool"));

        assert_eq!(
            ApiError::from(DomainError::invalid("name", "required")).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
