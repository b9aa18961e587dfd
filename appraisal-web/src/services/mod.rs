//! Service layer: rate limiting, attachment guards, prompts and the
//! upstream model client

pub mod anthropic_client;
pub mod attachments;
pub mod prompt;
pub mod rate_limiter;
pub mod response_parser;

pub use anthropic_client::{AnthropicClient, ModelError, VisionModel, VisionRequest};
pub use rate_limiter::{caller_key, InMemoryRateLimiter, RequestCounter};

use serde_json::Value;

/// One model round trip: call, then pull the JSON object out of the reply
pub async fn analyze(model: &dyn VisionModel, request: VisionRequest) -> Result<Value, ModelError> {
    let text = model.complete(request).await?;
    response_parser::extract_json(&text)
}
