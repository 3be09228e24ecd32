//! # Admin console
//!
//! One set of generic CRUD handlers serves every collection. A collection
//! plugs in by implementing `AdminCollection`; its `CollectionView` decides
//! columns, search, filters and hidden fields.

use askama::Template;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Extension, Router};
use domains::auth::CurrentUser;
use domains::error::{DomainError, FieldError};
use domains::models::{Dataset, Feedback};
use domains::record::{FieldInput, Record};
use domains::view::{CollectionView, ListQuery, DATASET_ADMIN_VIEW, FEEDBACK_ADMIN_VIEW};
use services::{RecordService, Rejected};
use uuid::Uuid;

use crate::error::ApiError;
use crate::forms::{image_fields, FormData, FILE_SUFFIX};
use crate::state::AppState;
use crate::views::{self, AdminFormPage, AdminListPage};

/// Collections shown in the admin navigation, in order.
pub const ADMIN_VIEWS: &[&CollectionView] = &[&DATASET_ADMIN_VIEW, &FEEDBACK_ADMIN_VIEW];

/// A record type managed through the admin console.
pub trait AdminCollection: Record {
    const VIEW: CollectionView;

    fn service(state: &AppState) -> &RecordService<Self>;
}

impl AdminCollection for Dataset {
    const VIEW: CollectionView = DATASET_ADMIN_VIEW;

    fn service(state: &AppState) -> &RecordService<Self> {
        &state.datasets
    }
}

impl AdminCollection for Feedback {
    const VIEW: CollectionView = FEEDBACK_ADMIN_VIEW;

    fn service(state: &AppState) -> &RecordService<Self> {
        &state.feedback
    }
}

/// List, create, edit and delete routes for one collection.
pub fn collection_routes<R: AdminCollection>() -> Router<AppState> {
    let base = format!("/admin/{}", R::VIEW.slug);
    Router::new()
        .route(&base, get(list::<R>).post(create::<R>))
        .route(&format!("{base}/new"), get(new_form::<R>))
        .route(&format!("{base}/{{id}}/edit"), get(edit_form::<R>))
        .route(&format!("{base}/{{id}}"), post(update::<R>))
        .route(&format!("{base}/{{id}}/delete"), post(delete::<R>))
}

pub async fn home() -> Redirect {
    Redirect::to(&format!("/admin/{}", ADMIN_VIEWS[0].slug))
}

fn list_url<R: AdminCollection>() -> String {
    format!("/admin/{}", R::VIEW.slug)
}

pub async fn list<R: AdminCollection>(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let view = R::VIEW;
    // Empty filter inputs are how the form says "no filter".
    let params: Vec<(String, String)> = params
        .into_iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .collect();

    let (query, errors) = match ListQuery::from_params::<R>(&view, &params, state.settings.page_size) {
        Ok(query) => (query, Vec::new()),
        Err(e) => {
            let messages = e
                .field_errors()
                .into_iter()
                .map(|fe| format!("{}: {}", fe.field, fe.message))
                .collect();
            let fallback = ListQuery::new(state.settings.page_size);
            (fallback, messages)
        }
    };

    let page = R::service(&state).list(&view, &query).await?;
    let notice = params
        .iter()
        .find(|(k, _)| k == "notice")
        .map(|(_, v)| views::notice_text(v))
        .unwrap_or_default();

    let html = AdminListPage {
        title: view.label.to_string(),
        username: user.username().to_string(),
        nav: views::admin_nav(ADMIN_VIEWS, view.slug),
        heading: view.label.to_string(),
        list_url: list_url::<R>(),
        new_url: format!("{}/new", list_url::<R>()),
        notice: notice.to_string(),
        errors,
        search: query.search.clone().unwrap_or_default(),
        filters: views::filter_inputs::<R>(&view, &params),
        headers: views::column_headers::<R>(&view),
        rows: views::list_rows(&view, &page),
        total: page.total,
        pager: views::pager(&list_url::<R>(), &params, &page),
    }
    .render()?;
    Ok(Html(html).into_response())
}

pub async fn new_form<R: AdminCollection>(
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    render_form(&user, &R::blank(), None, &[])
}

pub async fn edit_form<R: AdminCollection>(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id::<R>(&raw_id)?;
    let record = R::service(&state).get(id).await?;
    render_form(&user, &record, Some(id), &[])
}

pub async fn create<R: AdminCollection>(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut form = FormData::from_multipart(multipart).await?;
    let mut changes = form.changes::<R>(&R::VIEW);

    if let Err(error) = attach_uploads::<R>(&state, &mut form, &mut changes).await {
        let mut draft = R::blank();
        draft.apply(&changes);
        return reject(&state, &user, Rejected { draft, error }, None);
    }

    match R::service(&state).create(&changes).await {
        Ok(saved) => {
            state.metrics.record_save(R::COLLECTION, true);
            tracing::info!(collection = R::COLLECTION, id = %saved.id(), admin = %user.username(), "record created");
            Ok(Redirect::to(&format!("{}?notice=created", list_url::<R>())).into_response())
        }
        Err(rejected) => reject(&state, &user, rejected, None),
    }
}

pub async fn update<R: AdminCollection>(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let id = parse_id::<R>(&raw_id)?;
    let existing = R::service(&state).get(id).await?;
    let mut form = FormData::from_multipart(multipart).await?;
    let mut changes = form.changes::<R>(&R::VIEW);

    if let Err(error) = attach_uploads::<R>(&state, &mut form, &mut changes).await {
        let mut draft = existing;
        draft.apply(&changes);
        return reject(&state, &user, Rejected { draft, error }, Some(id));
    }

    match R::service(&state).update(existing, &changes).await {
        Ok(_) => {
            state.metrics.record_save(R::COLLECTION, true);
            tracing::info!(collection = R::COLLECTION, %id, admin = %user.username(), "record updated");
            Ok(Redirect::to(&format!("{}?notice=saved", list_url::<R>())).into_response())
        }
        Err(rejected) => reject(&state, &user, rejected, Some(id)),
    }
}

pub async fn delete<R: AdminCollection>(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id::<R>(&raw_id)?;
    R::service(&state).delete(id).await?;
    tracing::info!(collection = R::COLLECTION, %id, admin = %user.username(), "record deleted");
    Ok(Redirect::to(&format!("{}?notice=deleted", list_url::<R>())).into_response())
}

/// Record ids in URLs. Anything that is not a UUID names no record.
fn parse_id<R: AdminCollection>(raw: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(raw).map_err(|_| DomainError::NotFound(R::KIND, raw.to_string()))
}

/// Uploads any submitted image files and points their fields at the new
/// URLs. Nothing is uploaded for fields the view hides.
async fn attach_uploads<R: AdminCollection>(
    state: &AppState,
    form: &mut FormData,
    changes: &mut Vec<(&'static str, FieldInput)>,
) -> Result<(), DomainError> {
    for field in image_fields::<R>().filter(|f| !R::VIEW.is_hidden(f)) {
        let Some(upload) = form.take_file(&format!("{field}{FILE_SUFFIX}")) else { continue };
        let url = state.previews.upload_preview(upload).await.map_err(|e| match e {
            DomainError::Validation(_) => e,
            // Storage failures are shown on the field so the admin can retry.
            other => DomainError::invalid(field, format!("Upload failed: {other}")),
        })?;
        changes.retain(|(name, _)| *name != field);
        changes.push((field, FieldInput::Text(url)));
    }
    Ok(())
}

/// Re-renders the form for a failed save, or propagates errors that are
/// not about the submitted values.
fn reject<R: AdminCollection>(
    state: &AppState,
    user: &CurrentUser,
    rejected: Rejected<R>,
    id: Option<Uuid>,
) -> Result<Response, ApiError> {
    state.metrics.record_save(R::COLLECTION, false);
    let Rejected { draft, error } = rejected;
    if !error.is_validation() {
        return Err(error.into());
    }
    tracing::debug!(collection = R::COLLECTION, error = %error, "form rejected");
    let page = render_form(user, &draft, id, &error.field_errors())?;
    Ok((StatusCode::BAD_REQUEST, page).into_response())
}

fn render_form<R: AdminCollection>(
    user: &CurrentUser,
    record: &R,
    id: Option<Uuid>,
    errors: &[FieldError],
) -> Result<Response, ApiError> {
    let view = R::VIEW;
    let (fields, general) = views::form_fields(record, |f| !view.is_hidden(f), errors);
    let (heading, action, delete_url) = match id {
        Some(id) => (
            format!("Edit {}", R::KIND),
            format!("{}/{}", list_url::<R>(), id),
            format!("{}/{}/delete", list_url::<R>(), id),
        ),
        None => (format!("Create {}", R::KIND), list_url::<R>(), String::new()),
    };

    let html = AdminFormPage {
        title: heading.clone(),
        username: user.username().to_string(),
        nav: views::admin_nav(ADMIN_VIEWS, view.slug),
        heading,
        action,
        cancel_url: list_url::<R>(),
        delete_url,
        fields,
        errors: general,
    }
    .render()?;
    Ok(Html(html).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_ids_are_not_found() {
        let err = parse_id::<Dataset>("not-a-uuid").unwrap_err();
        assert!(matches!(err, DomainError::NotFound("Dataset", ref raw) if raw == "not-a-uuid"));

        let id = Uuid::new_v4();
        assert_eq!(parse_id::<Feedback>(&id.to_string()).unwrap(), id);
    }
}
