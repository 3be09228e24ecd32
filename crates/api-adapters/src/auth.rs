//! Admin login and logout.

use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use domains::error::DomainError;
use serde::Deserialize;

use crate::error::ApiError;
use crate::session::{self, ADMIN_HOME, LOGIN_PATH};
use crate::state::AppState;
use crate::views::LoginPage;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

fn login_page(next: &str, username: &str, error: &str) -> Result<String, ApiError> {
    Ok(LoginPage {
        title: "Log in".into(),
        next: session::safe_next(next).unwrap_or_default().to_string(),
        username: username.to_string(),
        error: error.to_string(),
    }
    .render()?)
}

/// Handler for the login page (GET). Already logged-in admins go straight in.
pub async fn login_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Result<Response, ApiError> {
    let next = query.next.unwrap_or_default();
    let session = session::session_from_headers(&state, &headers);
    if state.auth.current_user(session.as_ref()).await.is_authenticated() {
        let target = session::safe_next(&next).unwrap_or(ADMIN_HOME);
        return Ok(Redirect::to(target).into_response());
    }
    Ok(Html(login_page(&next, "", "")?).into_response())
}

/// Handler for login form submission (POST)
pub async fn login_submit(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Result<Response, ApiError> {
    let next = form.next.unwrap_or_default();

    let user = match state.auth.authenticate(&form.username, &form.password).await {
        Ok(user) => user,
        Err(DomainError::Unauthorized(_)) => {
            state.metrics.login(false);
            let html = login_page(&next, &form.username, "Invalid username or password.")?;
            return Ok((StatusCode::UNAUTHORIZED, Html(html)).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let session = state.auth.login(&user).await?;
    state.metrics.login(true);

    let target = session::safe_next(&next).unwrap_or(ADMIN_HOME);
    Ok((
        [(header::SET_COOKIE, session::set_cookie(&state, &session))],
        Redirect::to(target),
    )
        .into_response())
}

/// Ends the session (if any) and clears the cookie.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(session) = session::session_from_headers(&state, &headers) {
        if let Err(e) = state.auth.logout(&session).await {
            tracing::warn!(error = %e, "session could not be destroyed");
        }
    }
    (
        [(header::SET_COOKIE, session::clear_cookie(&state))],
        Redirect::to(LOGIN_PATH),
    )
        .into_response()
}
