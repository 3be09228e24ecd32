//! Route table and middleware stack.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use domains::models::{Dataset, Feedback};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{admin, auth, public, session};

/// Builds the full application: public site, JSON API, admin console,
/// health and metrics endpoints.
pub fn router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/admin", get(admin::home))
        .merge(admin::collection_routes::<Dataset>())
        .merge(admin::collection_routes::<Feedback>())
        .route_layer(middleware::from_fn_with_state(state.clone(), session::require_admin));

    let mut app = Router::new()
        .route("/", get(public::index))
        .route("/datasets/{slug}", get(public::dataset_detail))
        .route("/feedback", get(public::feedback_form).post(public::submit_feedback))
        .route("/about", get(public::about))
        .route("/api/datasets", get(public::api_list))
        .route("/api/datasets/{slug}", get(public::api_detail))
        .route("/healthz", get(public::healthz))
        .route("/metrics", get(public::metrics))
        .route(session::LOGIN_PATH, get(auth::login_form).post(auth::login_submit))
        .route("/admin/logout", post(auth::logout))
        .merge(admin_routes);

    if let Some(root) = &state.settings.media_root {
        app = app.nest_service(&state.settings.media_url_prefix, ServeDir::new(root));
    }

    app.layer(DefaultBodyLimit::max(state.settings.max_body_bytes))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
