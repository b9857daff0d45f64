//! Single-pass transcript restructuring.
//!
//! [`Restructurer`] turns one transcript (or one chunk) into markdown with a
//! single chat-completion call: it assembles the system prompt from a
//! template and an optional output-language instruction, enforces the input
//! token budget, and drives the provider through the retry driver with
//! classified errors.
//!
//! Transcripts that exceed the chunk budget belong to the
//! [`Orchestrator`](crate::orchestrator::Orchestrator), which calls back
//! into [`Restructurer::restructure_with_custom_prompt`] for each chunk.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{should_retry, RestructureError, Result};
use crate::language::Language;
use crate::provider::{ChatRequest, Provider};
use crate::retry::{retry, RetryConfig};
use crate::splitter::estimate_tokens;
use crate::template::TemplateName;

/// Default ceiling on estimated input tokens for a single call.
pub const DEFAULT_MAX_INPUT_TOKENS: usize = 100_000;

/// Stateless restructuring service over a shared provider.
///
/// Safe to share across tasks; every call is independent.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
/// use transcript_restructure::{OpenAiProvider, Restructurer, TemplateName};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = Arc::new(OpenAiProvider::new("sk-..."));
/// let restructurer = Restructurer::new(provider);
/// let markdown = restructurer
///     .restructure(&CancellationToken::new(), "raw transcript", TemplateName::Notes, None)
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Restructurer {
    provider: Arc<dyn Provider>,
    model: String,
    retry_config: RetryConfig,
    max_input_tokens: usize,
}

impl Restructurer {
    /// Create a restructurer using the provider's default model.
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        let model = provider.default_model().to_string();
        Self {
            provider,
            model,
            retry_config: RetryConfig::default(),
            max_input_tokens: DEFAULT_MAX_INPUT_TOKENS,
        }
    }

    /// Override the model identifier sent to the provider.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the retry configuration. Default: [`RetryConfig::default`].
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Override the input token budget. Default:
    /// [`DEFAULT_MAX_INPUT_TOKENS`].
    pub fn with_max_input_tokens(mut self, max_input_tokens: usize) -> Self {
        self.max_input_tokens = max_input_tokens;
        self
    }

    /// Restructure a whole transcript with a template.
    ///
    /// `output_lang: None` keeps the template's native English. A transcript
    /// whose estimated token count exceeds the input budget is rejected with
    /// [`RestructureError::TranscriptTooLong`] before any network call.
    pub async fn restructure(
        &self,
        cancel: &CancellationToken,
        transcript: &str,
        template: TemplateName,
        output_lang: Option<&Language>,
    ) -> Result<String> {
        let tokens = estimate_tokens(transcript);
        if tokens > self.max_input_tokens {
            return Err(RestructureError::TranscriptTooLong(format!(
                "estimated {tokens} tokens exceeds the {} token input budget",
                self.max_input_tokens
            )));
        }
        let prompt = compose_prompt(template, output_lang);
        self.restructure_with_custom_prompt(cancel, transcript, &prompt)
            .await
    }

    /// Restructure `content` with a caller-supplied system prompt.
    ///
    /// Skips template resolution, the language instruction, and the token
    /// budget check. Used by the orchestrator for map and reduce calls.
    pub async fn restructure_with_custom_prompt(
        &self,
        cancel: &CancellationToken,
        content: &str,
        prompt: &str,
    ) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            system: prompt.to_string(),
            user: content.to_string(),
            max_output_tokens: self.provider.max_output_tokens(),
            // Deterministic output.
            temperature: 0.0,
        };
        debug!(
            provider = self.provider.name(),
            model = %request.model,
            content_bytes = content.len(),
            "requesting restructured markdown"
        );
        retry(
            cancel,
            self.retry_config,
            || self.attempt(cancel, &request),
            should_retry,
        )
        .await
    }

    async fn attempt(&self, cancel: &CancellationToken, request: &ChatRequest) -> Result<String> {
        let response = self
            .provider
            .complete(cancel, request)
            .await
            .map_err(|err| self.provider.classify(err))?;
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(RestructureError::NoResponse)
    }
}

/// Template prompt plus the optional `"Respond in <X>."` prefix.
pub(crate) fn compose_prompt(template: TemplateName, output_lang: Option<&Language>) -> String {
    let prompt = template.prompt();
    match output_lang.and_then(Language::instruction) {
        Some(prefix) => format!("{prefix}{prompt}"),
        None => prompt.to_string(),
    }
}
