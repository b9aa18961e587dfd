//! HTTP API handlers for appraisal-web

pub mod analysis;
pub mod auth;
pub mod health;
pub mod report;
pub mod ui;

pub use analysis::{analyze_property, analyze_property_pdf};
pub use auth::{login, logout, page_gate, require_session};
pub use health::health_routes;
pub use report::{generate_pdf, generate_pdf_from_analysis};
pub use ui::{serve_app_css, serve_app_js, serve_index, serve_login, serve_login_js};
