//! DeepSeek chat-completion provider.
//!
//! Endpoint: `<base_url>/chat/completions` (no `/v1` prefix). Token ceiling
//! field: `max_tokens`. DeepSeek signals an exhausted balance with HTTP 402
//! and context overflow with 422; plain 5xx responses keep their status so
//! the retry predicate can treat them as transient.

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::{
    default_client, mentions_context_length, post_chat, redact, ChatRequest, ChatResponse,
    Provider,
};
use crate::error::{RestructureError, Result};

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";

const DEFAULT_MODEL: &str = "deepseek-reasoner";
const MAX_OUTPUT_TOKENS: u32 = 64_000;

/// Provider for the DeepSeek API.
///
/// # Example
///
/// ```
/// use transcript_restructure::DeepSeekProvider;
///
/// let provider = DeepSeekProvider::new("sk-...");
/// ```
pub struct DeepSeekProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl DeepSeekProvider {
    /// Create a provider against the public DeepSeek endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: default_client(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Point the provider at a compatible gateway or test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_body(request: &ChatRequest) -> serde_json::Value {
        json!({
            "model": request.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user},
            ],
            "max_tokens": request.max_output_tokens,
            "temperature": request.temperature,
        })
    }

    /// 422 bodies that talk about context, length, or tokens mean the input
    /// does not fit the model.
    fn mentions_context_overflow(message: &str) -> bool {
        let lower = message.to_ascii_lowercase();
        lower.contains("context") || lower.contains("length") || lower.contains("token")
    }
}

impl std::fmt::Debug for DeepSeekProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepSeekProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

#[async_trait]
impl Provider for DeepSeekProvider {
    async fn complete(
        &self,
        cancel: &CancellationToken,
        request: &ChatRequest,
    ) -> Result<ChatResponse> {
        let body = Self::build_body(request);
        let url = self.url();
        tokio::select! {
            _ = cancel.cancelled() => Err(RestructureError::Cancelled),
            result = post_chat(&self.client, &url, &self.api_key, &body) => result,
        }
    }

    fn classify(&self, error: RestructureError) -> RestructureError {
        match error {
            RestructureError::Api { status, message } => match status {
                401 => RestructureError::AuthFailed(message),
                // Insufficient balance.
                402 => RestructureError::QuotaExceeded(message),
                403 | 404 => RestructureError::BadRequest(message),
                408 | 504 => RestructureError::Timeout(message),
                422 if Self::mentions_context_overflow(&message) => {
                    RestructureError::TranscriptTooLong(message)
                }
                429 => RestructureError::RateLimit(message),
                400 if mentions_context_length(&message) => {
                    RestructureError::TranscriptTooLong(message)
                }
                400 => RestructureError::BadRequest(message),
                // 5xx keeps its status; the retry predicate treats it as
                // transient.
                _ => RestructureError::Api { status, message },
            },
            RestructureError::Request(inner) if inner.is_timeout() => {
                RestructureError::Timeout(inner.to_string())
            }
            other => other,
        }
    }

    fn name(&self) -> &'static str {
        "deepseek"
    }

    fn default_model(&self) -> &'static str {
        DEFAULT_MODEL
    }

    fn max_output_tokens(&self) -> u32 {
        MAX_OUTPUT_TOKENS
    }
}
