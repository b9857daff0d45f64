//! OpenAI-compatible chat-completion provider.
//!
//! Endpoint: `<base_url>/v1/chat/completions`. Token ceiling field:
//! `max_completion_tokens`. Quota exhaustion arrives as 429 with
//! "quota"/"billing" wording; transient 5xx responses are reclassified as
//! timeouts so the retry driver picks them up.

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::{
    default_client, mentions_context_length, mentions_quota, post_chat, redact, ChatRequest,
    ChatResponse, Provider,
};
use crate::error::{RestructureError, Result};

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

const DEFAULT_MODEL: &str = "o4-mini";
const MAX_OUTPUT_TOKENS: u32 = 100_000;

/// Provider for the OpenAI API and compatible gateways.
///
/// # Example
///
/// ```
/// use transcript_restructure::OpenAiProvider;
///
/// let provider = OpenAiProvider::new("sk-...");
/// let local = OpenAiProvider::new("sk-...").with_base_url("http://localhost:8080");
/// ```
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiProvider {
    /// Create a provider against the public OpenAI endpoint.
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
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_body(request: &ChatRequest) -> serde_json::Value {
        json!({
            "model": request.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user},
            ],
            "max_completion_tokens": request.max_output_tokens,
            "temperature": request.temperature,
        })
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
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
                402 => RestructureError::QuotaExceeded(message),
                403 | 404 => RestructureError::BadRequest(message),
                408 | 504 => RestructureError::Timeout(message),
                429 if mentions_quota(&message) => RestructureError::QuotaExceeded(message),
                429 => RestructureError::RateLimit(message),
                400 if mentions_context_length(&message) => {
                    RestructureError::TranscriptTooLong(message)
                }
                400 => RestructureError::BadRequest(message),
                500 | 502 | 503 => RestructureError::Timeout(message),
                _ => RestructureError::Api { status, message },
            },
            RestructureError::Request(inner) if inner.is_timeout() => {
                RestructureError::Timeout(inner.to_string())
            }
            other => other,
        }
    }

    fn name(&self) -> &'static str {
        "openai"
    }

    fn default_model(&self) -> &'static str {
        DEFAULT_MODEL
    }

    fn max_output_tokens(&self) -> u32 {
        MAX_OUTPUT_TOKENS
    }
}
