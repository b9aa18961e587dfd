//! Anthropic Messages API client
//!
//! One non-streaming call per analysis: every attachment and the instruction
//! text travel in a single user message. No retries.

use std::time::{Duration, Instant};

use appraisal_common::config::AnthropicConfig;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::attachments::{MIME_JPEG, MIME_PDF};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const USER_AGENT: &str = concat!("appraisal-web/", env!("CARGO_PKG_VERSION"));

/// Upstream call and reply-handling errors
///
/// Display strings are shown to the bank employee as-is.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Překročen limit požadavků. Zkuste to za chvíli.")]
    RateLimited,

    #[error("Neplatný API klíč.")]
    InvalidApiKey,

    #[error("API Error: {message}")]
    Api { status: u16, message: String },

    #[error("Chyba při komunikaci s AI. Zkuste to znovu.")]
    Transport(String),

    #[error("AI nevrátila žádnou textovou odpověď.")]
    NoTextBlock,

    #[error("Odpověď AI neobsahuje JSON objekt.")]
    NoJsonObject,

    #[error("Odpověď AI není platný JSON.")]
    InvalidJson(String),
}

/// Everything sent upstream for one analysis
///
/// Blocks are emitted in this order: documents, images, then the prompt.
#[derive(Debug, Clone, Default)]
pub struct VisionRequest {
    /// PDF bytes
    pub documents: Vec<Vec<u8>>,
    /// Normalized JPEG bytes
    pub images: Vec<Vec<u8>>,
    pub prompt: String,
}

/// Multimodal completion endpoint
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Text of the first text block of the reply
    async fn complete(&self, request: VisionRequest) -> Result<String, ModelError>;
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Document { source: Base64Source },
    Image { source: Base64Source },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct Base64Source {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'static str,
    data: String,
}

impl Base64Source {
    fn new(media_type: &'static str, bytes: &[u8]) -> Self {
        Self {
            kind: "base64",
            media_type,
            data: STANDARD.encode(bytes),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

fn build_content(request: VisionRequest) -> Vec<ContentBlock> {
    let mut content = Vec::with_capacity(request.documents.len() + request.images.len() + 1);
    content.extend(request.documents.iter().map(|pdf| ContentBlock::Document {
        source: Base64Source::new(MIME_PDF, pdf),
    }));
    content.extend(request.images.iter().map(|jpeg| ContentBlock::Image {
        source: Base64Source::new(MIME_JPEG, jpeg),
    }));
    content.push(ContentBlock::Text {
        text: request.prompt,
    });
    content
}

/// Pick the first text block out of a reply body
fn first_text_block(response: MessagesResponse) -> Result<String, ModelError> {
    response
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .ok_or(ModelError::NoTextBlock)
}

/// Map a non-success status to the user-facing error
fn status_error(status: u16, body: &str) -> ModelError {
    match status {
        429 => ModelError::RateLimited,
        401 => ModelError::InvalidApiKey,
        _ => {
            let message = serde_json::from_str::<ErrorEnvelope>(body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("{} {}", status, body.trim()));
            ModelError::Api { status, message }
        }
    }
}

/// Anthropic API client
pub struct AnthropicClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(config: &AnthropicConfig) -> Result<Self, ModelError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/v1/messages", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl VisionModel for AnthropicClient {
    async fn complete(&self, request: VisionRequest) -> Result<String, ModelError> {
        let documents = request.documents.len();
        let images = request.images.len();
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: build_content(request),
            }],
        };

        debug!(model = %self.model, documents, images, "Calling Anthropic Messages API");
        let started = Instant::now();

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Anthropic request failed");
                ModelError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Anthropic API returned an error");
            return Err(status_error(status.as_u16(), &text));
        }

        let reply: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        info!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            blocks = reply.content.len(),
            "Anthropic reply received"
        );

        first_text_block(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_order_documents_images_text() {
        let request = VisionRequest {
            documents: vec![b"%PDF-1.4".to_vec()],
            images: vec![vec![0xFF, 0xD8, 0xFF], vec![0xFF, 0xD8, 0xFF]],
            prompt: "Analyzuj".to_string(),
        };
        let content = serde_json::to_value(build_content(request)).unwrap();

        assert_eq!(content[0]["type"], "document");
        assert_eq!(content[0]["source"]["media_type"], "application/pdf");
        assert_eq!(content[0]["source"]["type"], "base64");
        assert_eq!(content[1]["type"], "image");
        assert_eq!(content[2]["source"]["media_type"], "image/jpeg");
        assert_eq!(content[3], json!({"type": "text", "text": "Analyzuj"}));
    }

    #[test]
    fn test_first_text_block_skips_other_blocks() {
        let reply: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "{\"a\":1}"},
                {"type": "text", "text": "second"}
            ]
        }))
        .unwrap();
        assert_eq!(first_text_block(reply).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_reply_without_text_block() {
        let reply: MessagesResponse = serde_json::from_value(json!({"content": []})).unwrap();
        assert!(matches!(first_text_block(reply), Err(ModelError::NoTextBlock)));
    }

    #[test]
    fn test_status_error_mapping() {
        assert_eq!(
            status_error(429, "").to_string(),
            "Překročen limit požadavků. Zkuste to za chvíli."
        );
        assert_eq!(status_error(401, "").to_string(), "Neplatný API klíč.");

        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert_eq!(status_error(529, body).to_string(), "API Error: Overloaded");
        assert_eq!(status_error(502, "Bad Gateway").to_string(), "API Error: 502 Bad Gateway");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let config = AnthropicConfig {
            api_key: "test".to_string(),
            base_url: "http://127.0.0.1:1".to_string(),
            model: "test-model".to_string(),
            max_tokens: 16,
            timeout_secs: 5,
        };
        let client = AnthropicClient::new(&config).unwrap();
        let err = client.complete(VisionRequest::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Chyba při komunikaci s AI. Zkuste to znovu.");
    }
}
