//! Public catalog pages, the feedback form and the read-only JSON API.
//! Only approved datasets are ever visible here.

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use domains::error::DomainError;
use domains::models::{Dataset, Feedback};
use domains::record::Record;
use domains::view::{Filter, FilterOp, ListQuery, Page, DATASET_CATALOG_VIEW};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, JsonError};
use crate::forms::FormData;
use crate::state::AppState;
use crate::views::{self, AboutPage, CatalogPage, DatasetPage, FeedbackPage};

/// Fields a visitor may fill in. Replies are for administrators only.
pub const FEEDBACK_PUBLIC_FIELDS: &[&str] = &["first_name", "last_name", "email", "subject", "message"];

#[derive(Debug, Default, Deserialize)]
pub struct CatalogParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

impl CatalogParams {
    fn query(&self, per_page: usize) -> ListQuery {
        let mut query = ListQuery::new(per_page)
            .with_search(self.q.clone().unwrap_or_default())
            .with_filter(approved_only());
        for (field, value) in [("topic", &self.topic), ("data_type", &self.data_type)] {
            if let Some(v) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                query = query.with_filter(Filter::new(field, FilterOp::Equals(v.to_string())));
            }
        }
        query.page = self
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .saturating_sub(1);
        query
    }

    /// The parameters as they appear in pagination links.
    fn pairs(&self) -> Vec<(String, String)> {
        [("q", &self.q), ("topic", &self.topic), ("data_type", &self.data_type)]
            .into_iter()
            .filter_map(|(k, v)| {
                v.as_ref()
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (k.to_string(), v.clone()))
            })
            .collect()
    }
}

fn approved_only() -> Filter {
    Filter::new("approved", FilterOp::Equals("true".into()))
}

async fn approved_by_slug(state: &AppState, slug: &str) -> Result<Dataset, DomainError> {
    match state.datasets.find_by("slug", slug).await? {
        Some(d) if d.approved => Ok(d),
        _ => Err(DomainError::NotFound(Dataset::KIND, slug.to_string())),
    }
}

pub async fn index(State(state): State<AppState>, Query(params): Query<CatalogParams>) -> Result<Html<String>, ApiError> {
    let query = params.query(state.settings.catalog_page_size);
    let page = state.datasets.list(&DATASET_CATALOG_VIEW, &query).await?;

    // Every approved dataset feeds the topic and data type menus.
    let everything = ListQuery::new(usize::MAX).with_filter(approved_only());
    let all = state.datasets.list(&DATASET_CATALOG_VIEW, &everything).await?.items;

    let html = CatalogPage {
        title: "Datasets".into(),
        search: params.q.clone().unwrap_or_default(),
        topics: views::choices(
            all.iter().map(|d| d.topic.clone()).collect(),
            params.topic.as_deref().unwrap_or_default(),
        ),
        data_types: views::choices(
            all.iter().map(|d| d.data_type.clone()).collect(),
            params.data_type.as_deref().unwrap_or_default(),
        ),
        cards: page.items.iter().map(views::dataset_card).collect(),
        total: page.total,
        pager: views::pager("/", &params.pairs(), &page),
    }
    .render()?;
    Ok(Html(html))
}

pub async fn dataset_detail(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Html<String>, ApiError> {
    let dataset = approved_by_slug(&state, &slug).await?;
    let html = DatasetPage {
        title: dataset.name.clone(),
        image_url: dataset.image_url.clone().unwrap_or_default(),
        dataset_url: dataset.dataset_url.clone().unwrap_or_default(),
        dataset: &dataset,
    }
    .render()?;
    Ok(Html(html))
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedbackQuery {
    #[serde(default)]
    pub sent: Option<String>,
}

fn feedback_page(draft: &Feedback, errors: &[domains::error::FieldError], sent: bool) -> Result<String, ApiError> {
    let (fields, general) = views::form_fields(draft, |f| FEEDBACK_PUBLIC_FIELDS.contains(&f), errors);
    Ok(FeedbackPage {
        title: "Feedback".into(),
        sent,
        fields,
        errors: general,
    }
    .render()?)
}

pub async fn feedback_form(Query(query): Query<FeedbackQuery>) -> Result<Html<String>, ApiError> {
    let sent = query.sent.is_some();
    Ok(Html(feedback_page(&Feedback::blank(), &[], sent)?))
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let changes = FormData::from_pairs(pairs).changes_only::<Feedback>(FEEDBACK_PUBLIC_FIELDS);

    match state.feedback.create(&changes).await {
        Ok(saved) => {
            state.metrics.record_save(Feedback::COLLECTION, true);
            state.metrics.feedback_submitted();
            tracing::info!(id = %saved.id, "feedback received");
            Ok(Redirect::to("/feedback?sent=1").into_response())
        }
        Err(rejected) => {
            state.metrics.record_save(Feedback::COLLECTION, false);
            if !rejected.error.is_validation() {
                return Err(rejected.error.into());
            }
            let html = feedback_page(&rejected.draft, &rejected.error.field_errors(), false)?;
            Ok((StatusCode::BAD_REQUEST, Html(html)).into_response())
        }
    }
}

pub async fn about() -> Result<Html<String>, ApiError> {
    Ok(Html(AboutPage { title: "About".into() }.render()?))
}

/// One page of the JSON catalog. Page numbers are 1-based.
#[derive(Debug, Serialize)]
pub struct DatasetList {
    pub items: Vec<Dataset>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub pages: usize,
}

impl From<Page<Dataset>> for DatasetList {
    fn from(page: Page<Dataset>) -> Self {
        Self {
            page: page.page + 1,
            per_page: page.per_page,
            total: page.total,
            pages: page.page_count(),
            items: page.items,
        }
    }
}

pub async fn api_list(
    State(state): State<AppState>,
    Query(params): Query<CatalogParams>,
) -> Result<Json<DatasetList>, JsonError> {
    let query = params.query(state.settings.catalog_page_size);
    let page = state.datasets.list(&DATASET_CATALOG_VIEW, &query).await?;
    Ok(Json(page.into()))
}

pub async fn api_detail(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<Dataset>, JsonError> {
    Ok(Json(approved_by_slug(&state, &slug).await?))
}

pub async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "application/openmetrics-text; version=1.0.0; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_query_always_requires_approval() {
        let params = CatalogParams {
            q: Some("flood".into()),
            topic: Some("".into()),
            data_type: Some("image".into()),
            page: Some("3".into()),
        };
        let q = params.query(10);
        assert_eq!(q.page, 2);
        assert_eq!(q.search.as_deref(), Some("flood"));
        assert!(q.filters.contains(&approved_only()));
        assert_eq!(q.filters.len(), 2);
        assert_eq!(
            params.pairs(),
            vec![("q".to_string(), "flood".to_string()), ("data_type".to_string(), "image".to_string())]
        );
    }

    #[test]
    fn bad_page_numbers_fall_back_to_the_first_page() {
        let params = CatalogParams {
            page: Some("abc".into()),
            ..Default::default()
        };
        assert_eq!(params.query(10).page, 0);
    }
}
