//! Shared-password login and the session gate
//!
//! A successful login sets `session=authenticated`. There is no server-side
//! session store; the cookie alone marks the browser as signed in.

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_VALUE: &str = "authenticated";
/// 24 hours
pub const SESSION_MAX_AGE_SECS: u64 = 86_400;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

/// `Set-Cookie` value for the session flag; `max_age` 0 clears it
fn session_cookie(value: &str, max_age: u64, secure: bool) -> ApiResult<HeaderValue> {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Max-Age={}; Path=/",
        SESSION_COOKIE, value, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).map_err(|e| ApiError::Internal(e.to_string()))
}

/// Whether the request carries the session flag
pub fn has_session(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .any(|(name, value)| name == SESSION_COOKIE && value == SESSION_VALUE)
}

/// POST /api/auth/login
///
/// Exact comparison against the configured password.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;

    if request.password != state.config.access_password {
        warn!("Login rejected: wrong password");
        return Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": "Nesprávné heslo" })),
        )
            .into_response());
    }

    info!("Login accepted");
    let cookie = session_cookie(SESSION_VALUE, SESSION_MAX_AGE_SECS, state.config.production)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true })),
    )
        .into_response())
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>) -> ApiResult<Response> {
    let cookie = session_cookie("", 0, state.config.production)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true })),
    )
        .into_response())
}

/// Session middleware for API routes
///
/// Returns 401 JSON when the cookie is missing.
pub async fn require_session(request: Request, next: Next) -> Result<Response, ApiError> {
    if !has_session(request.headers()) {
        return Err(ApiError::Unauthorized(
            "Nejste přihlášeni. Přihlaste se prosím znovu.".to_string(),
        ));
    }
    Ok(next.run(request).await)
}

/// Session gate for pages
///
/// Signed-out visitors go to `/login`; signed-in visitors of `/login` go
/// to `/`.
pub async fn page_gate(request: Request, next: Next) -> Response {
    let signed_in = has_session(request.headers());
    let on_login_page = request.uri().path() == "/login";

    match (signed_in, on_login_page) {
        (false, false) => Redirect::temporary("/login").into_response(),
        (true, true) => Redirect::temporary("/").into_response(),
        _ => next.run(request).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_session_parses_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=authenticated"),
        );
        assert!(has_session(&headers));
    }

    #[test]
    fn test_has_session_rejects_other_values() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session=admin"));
        assert!(!has_session(&headers));
        assert!(!has_session(&HeaderMap::new()));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie(SESSION_VALUE, SESSION_MAX_AGE_SECS, false).unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("session=authenticated;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.contains("Path=/"));
        assert!(!cookie.contains("Secure"));

        let secure = session_cookie(SESSION_VALUE, SESSION_MAX_AGE_SECS, true).unwrap();
        assert!(secure.to_str().unwrap().ends_with("; Secure"));
    }
}
