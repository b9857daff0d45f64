//! Provider abstraction over chat-completion HTTP APIs.
//!
//! The [`Provider`] trait translates between the normalized
//! [`ChatRequest`]/[`ChatResponse`] types and a provider-specific HTTP API,
//! and maps raw failures onto the error taxonomy. Built-in implementations:
//! [`OpenAiProvider`], [`DeepSeekProvider`], and [`MockProvider`] for tests.
//!
//! ## Architecture
//!
//! ```text
//! Restructurer ──► ChatRequest ──► Provider::complete() ──► ChatResponse
//!                                        │
//!                            ┌───────────┴───────────┐
//!                      OpenAiProvider          DeepSeekProvider
//!                    /v1/chat/completions      /chat/completions
//!                    max_completion_tokens     max_tokens
//! ```
//!
//! A provider is a pure adapter: no retry, no prompt assembly. The retry
//! driver and the restructurer sit on top.

pub mod deepseek;
pub mod mock;
pub mod openai;

pub use deepseek::DeepSeekProvider;
pub use mock::MockProvider;
pub use openai::OpenAiProvider;

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{RestructureError, Result};

/// Hard cap on response body size, applied on every path. Protects against
/// resource exhaustion from malformed or hostile responses.
pub(crate) const MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

/// Overall per-request timeout, independent of the caller's cancellation
/// token. Reasoning models can take several minutes on long transcripts.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// A normalized chat-completion request, provider-agnostic.
///
/// Built by the restructurer; the provider translates it into its wire
/// format (field names and endpoint path differ per provider).
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier (e.g. `"o4-mini"`, `"deepseek-reasoner"`).
    pub model: String,
    /// System message: the restructuring prompt.
    pub system: String,
    /// User message: the transcript (or framed map outputs).
    pub user: String,
    /// Completion-token ceiling for the selected model.
    pub max_output_tokens: u32,
    /// Sampling temperature. The pipeline always uses 0 for deterministic
    /// output.
    pub temperature: f32,
}

/// A parsed chat-completion response envelope.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// Completion alternatives. The pipeline requests exactly one; an empty
    /// list is treated as "no response" by the restructurer.
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    /// Token accounting, when the provider reports it.
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// One completion alternative.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// The generated message.
    pub message: ChoiceMessage,
}

/// The message inside a completion choice.
#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    /// The generated markdown.
    pub content: String,
}

/// Token usage reported by the provider.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Abstraction over chat-completion providers.
///
/// Object-safe; designed to be shared as `Arc<dyn Provider>`. The HTTP
/// client inside each implementation is reentrant, so one provider value
/// serves concurrent callers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Execute one chat-completion round-trip.
    ///
    /// Raced against `cancel` so an in-flight request aborts promptly.
    /// Errors come back raw ([`RestructureError::Api`],
    /// [`RestructureError::Request`], [`RestructureError::Json`]); callers
    /// run them through [`Provider::classify`].
    async fn complete(
        &self,
        cancel: &CancellationToken,
        request: &ChatRequest,
    ) -> Result<ChatResponse>;

    /// Map a raw transport or HTTP error onto the sentinel taxonomy.
    ///
    /// Status-code semantics differ per provider; anything the provider
    /// does not recognize passes through unchanged.
    fn classify(&self, error: RestructureError) -> RestructureError;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;

    /// The model used when the caller does not override it.
    fn default_model(&self) -> &'static str;

    /// The documented completion-token ceiling for the default model.
    fn max_output_tokens(&self) -> u32;
}

/// Build the shared HTTP client with the overall request timeout.
pub(crate) fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("default HTTP client configuration is valid")
}

/// POST `body` to `url` and parse the chat-completion envelope.
///
/// Non-2xx responses become [`RestructureError::Api`] with the message
/// taken from the provider's error envelope when it parses, or the raw
/// body otherwise. The body is read to exhaustion up to
/// [`MAX_RESPONSE_BYTES`] on every path.
pub(crate) async fn post_chat(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &serde_json::Value,
) -> Result<ChatResponse> {
    let response = client
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .bearer_auth(api_key)
        .json(body)
        .send()
        .await?;

    let status = response.status();
    let bytes = read_capped(response).await?;

    if !status.is_success() {
        let message = error_message(&bytes);
        debug!(status = status.as_u16(), "provider returned error status");
        return Err(RestructureError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let parsed: ChatResponse = serde_json::from_slice(&bytes)?;
    Ok(parsed)
}

/// Read the response body, truncating past [`MAX_RESPONSE_BYTES`].
async fn read_capped(mut response: reqwest::Response) -> Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = MAX_RESPONSE_BYTES - buf.len();
        if chunk.len() >= room {
            buf.extend_from_slice(&chunk[..room]);
            break;
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

/// The provider error envelope: `{"error": {"message", "type", "code"}}`.
#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    #[allow(dead_code)]
    kind: String,
    #[serde(default)]
    #[allow(dead_code)]
    code: Option<serde_json::Value>,
}

/// Extract a human-readable message from an error response body, falling
/// back to the raw body when the envelope does not parse.
fn error_message(body: &[u8]) -> String {
    if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body) {
        if let Some(error) = envelope.error {
            if !error.message.is_empty() {
                return error.message;
            }
        }
    }
    String::from_utf8_lossy(body).trim().to_string()
}

/// Keep a short key prefix for identification in `Debug` output, never the
/// full key.
pub(crate) fn redact(key: &str) -> String {
    if key.len() > 6 {
        format!("{}***", &key[..6])
    } else {
        "***".to_string()
    }
}

/// OpenAI signals quota exhaustion through 429 plus keywords.
pub(crate) fn mentions_quota(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("quota") || lower.contains("billing")
}

/// Context-overflow phrasing used in 400 responses.
pub(crate) fn mentions_context_length(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("context_length") || lower.contains("maximum context length")
}
