//! # Appraisal Common Library
//!
//! Shared code for the property appraisal check service:
//! - Property form data model and its validation rules
//! - AI analysis response model (leniently typed)
//! - Configuration loading (TOML + environment)
//! - Time formatting helpers

pub mod analysis;
pub mod config;
pub mod error;
pub mod property;
pub mod time;
pub mod validation;

pub use analysis::{AiResponse, FieldColor, Recommendation};
pub use error::{Error, Result};
pub use property::PropertyFormData;
