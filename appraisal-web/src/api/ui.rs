//! UI serving routes
//!
//! Serves the static review UI and the login page

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};

const INDEX_HTML: &str = include_str!("../ui/index.html");
const LOGIN_HTML: &str = include_str!("../ui/login.html");
const APP_JS: &str = include_str!("../ui/app.js");
const LOGIN_JS: &str = include_str!("../ui/login.js");
const APP_CSS: &str = include_str!("../ui/app.css");

fn asset(content_type: &'static str, body: &'static str) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
}

/// GET /
pub async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /login
pub async fn serve_login() -> Html<&'static str> {
    Html(LOGIN_HTML)
}

/// GET /static/app.js
pub async fn serve_app_js() -> Response {
    asset("application/javascript; charset=utf-8", APP_JS)
}

/// GET /static/login.js
pub async fn serve_login_js() -> Response {
    asset("application/javascript; charset=utf-8", LOGIN_JS)
}

/// GET /static/app.css
pub async fn serve_app_css() -> Response {
    asset("text/css; charset=utf-8", APP_CSS)
}
