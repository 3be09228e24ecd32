//! Session cookies and the admin gate.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use domains::auth::SessionId;

use crate::state::AppState;

pub const LOGIN_PATH: &str = "/admin/login";
pub const ADMIN_HOME: &str = "/admin";

/// Redirects anonymous requests to the login page, remembering where they
/// were going. Authenticated requests get `CurrentUser` as an extension.
pub async fn require_admin(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let session = session_from_headers(&state, request.headers());
    let current = state.auth.current_user(session.as_ref()).await;

    if !current.is_authenticated() {
        let target = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or(ADMIN_HOME);
        tracing::debug!(%target, "anonymous admin request redirected to login");
        return Redirect::to(&login_url(Some(target))).into_response();
    }

    request.extensions_mut().insert(current);
    next.run(request).await
}

pub fn login_url(next: Option<&str>) -> String {
    match next.and_then(safe_next) {
        Some(next) => format!("{LOGIN_PATH}?next={}", urlencoding::encode(next)),
        None => LOGIN_PATH.to_string(),
    }
}

/// Accepts only same-site absolute paths as post-login targets.
pub fn safe_next(next: &str) -> Option<&str> {
    let local = next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(char::is_control);
    local.then_some(next)
}

/// The verified session id carried by the request's cookie, if any.
pub fn session_from_headers(state: &AppState, headers: &HeaderMap) -> Option<SessionId> {
    let raw = cookie_value(headers, &state.settings.cookie_name)?;
    let session = state.signer.verify(&raw);
    if session.is_none() {
        tracing::debug!("session cookie failed signature check");
    }
    session
}

/// Extract a cookie value from the request's `Cookie` headers.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

pub fn set_cookie(state: &AppState, session: &SessionId) -> String {
    let settings = &state.settings;
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        settings.cookie_name,
        state.signer.sign(session),
        settings.session_ttl_seconds
    );
    if settings.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_cookie(state: &AppState) -> String {
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        state.settings.cookie_name
    );
    if state.settings.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}
