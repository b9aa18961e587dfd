//! appraisal-web library: property appraisal check service
//!
//! Serves the review UI, gates it behind a shared password, forwards
//! uploaded documents and photographs to a multimodal model for a
//! plausibility check, and renders the outcome as a PDF report.

use std::sync::Arc;
use std::time::{Duration, Instant};

use appraisal_common::config::ServiceConfig;
use axum::Router;

pub mod api;
pub mod error;
pub mod report;
pub mod services;

use services::{InMemoryRateLimiter, RequestCounter, VisionModel};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    /// Upstream multimodal model
    pub model: Arc<dyn VisionModel>,
    /// Per-caller ceiling for the analysis endpoints
    pub rate_limiter: Arc<dyn RequestCounter>,
    pub startup_time: Instant,
}

impl AppState {
    /// Create state with the in-process rate limiter sized from config
    pub fn new(config: ServiceConfig, model: Arc<dyn VisionModel>) -> Self {
        let rate_limiter = InMemoryRateLimiter::new(
            Duration::from_secs(config.rate_limit.window_secs),
            config.rate_limit.capacity,
        );
        Self::with_rate_limiter(config, model, Arc::new(rate_limiter))
    }

    pub fn with_rate_limiter(
        config: ServiceConfig,
        model: Arc<dyn VisionModel>,
        rate_limiter: Arc<dyn RequestCounter>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            model,
            rate_limiter,
            startup_time: Instant::now(),
        }
    }
}

/// Build application router
///
/// - Pages (`/`, `/login`) pass through the session gate, which redirects
/// - Analysis and report endpoints require the session cookie (401 JSON)
/// - Login, logout, health and static assets are public
pub fn build_router(state: AppState) -> Router {
    use axum::extract::DefaultBodyLimit;
    use axum::middleware;
    use axum::routing::{get, post};
    use tower_http::trace::TraceLayer;

    let body_limit = state.config.uploads.max_body_bytes;

    // Protected API routes (require session cookie)
    let protected = Router::new()
        .route("/api/analyze-property", post(api::analyze_property))
        .route("/api/analyze-property-pdf", post(api::analyze_property_pdf))
        .route("/api/generate-pdf", post(api::generate_pdf))
        .route(
            "/api/generate-pdf-from-analysis",
            post(api::generate_pdf_from_analysis),
        )
        .layer(middleware::from_fn(api::require_session));

    // Pages (redirect based on session)
    let pages = Router::new()
        .route("/", get(api::serve_index))
        .route("/login", get(api::serve_login))
        .layer(middleware::from_fn(api::page_gate));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/api/auth/login", post(api::login))
        .route("/api/auth/logout", post(api::logout))
        .route("/static/app.js", get(api::serve_app_js))
        .route("/static/login.js", get(api::serve_login_js))
        .route("/static/app.css", get(api::serve_app_css))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(pages)
        .merge(public)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
