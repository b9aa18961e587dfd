//! Model reply handling
//!
//! The model is asked to answer with a bare JSON object but routinely wraps
//! it in prose or code fences. The outermost `{...}` span (first `{` to last
//! `}`) is taken and parsed; its content is not validated.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::anthropic_client::ModelError;

static JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("static pattern"));

/// Extract and parse the outermost JSON object from reply text
pub fn extract_json(text: &str) -> Result<Value, ModelError> {
    let span = JSON_OBJECT
        .find(text)
        .ok_or(ModelError::NoJsonObject)?;

    serde_json::from_str(span.as_str()).map_err(|e| ModelError::InvalidJson(e.to_string()))
}
