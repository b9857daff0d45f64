//! Scripted provider for testing without a live API.
//!
//! [`MockProvider`] returns pre-configured outcomes in order and records
//! every request it receives, so downstream consumers can assert call
//! counts and request contents in deterministic tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{ChatChoice, ChatRequest, ChatResponse, ChoiceMessage, Provider};
use crate::error::{RestructureError, Result};

/// A test provider that replays a script of responses and errors.
///
/// Outcomes are consumed in the order they were added; running past the end
/// of the script panics, which in a test points at an unexpected extra
/// call. Scripted errors should already carry their taxonomy kind, since
/// `classify` is the identity here.
///
/// # Example
///
/// ```
/// use transcript_restructure::MockProvider;
///
/// let mock = MockProvider::new()
///     .respond("# Part 1")
///     .respond("# Part 2")
///     .respond("# Merged");
/// ```
#[derive(Debug, Default)]
pub struct MockProvider {
    script: Mutex<VecDeque<Result<ChatResponse>>>,
    requests: Mutex<Vec<ChatRequest>>,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Create a mock with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a successful response with a single choice.
    pub fn respond(self, content: impl Into<String>) -> Self {
        self.push(Ok(ChatResponse {
            choices: vec![ChatChoice {
                message: ChoiceMessage {
                    content: content.into(),
                },
            }],
            usage: None,
        }))
    }

    /// Append a 2xx response with no choices.
    pub fn respond_empty(self) -> Self {
        self.push(Ok(ChatResponse {
            choices: Vec::new(),
            usage: None,
        }))
    }

    /// Append a failure.
    pub fn fail(self, error: RestructureError) -> Self {
        self.push(Err(error))
    }

    fn push(self, outcome: Result<ChatResponse>) -> Self {
        self.script
            .lock()
            .expect("mock script lock poisoned")
            .push_back(outcome);
        self
    }

    /// Number of `complete` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received, in call order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .expect("mock requests lock poisoned")
            .clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        cancel: &CancellationToken,
        request: &ChatRequest,
    ) -> Result<ChatResponse> {
        if cancel.is_cancelled() {
            return Err(RestructureError::Cancelled);
        }
        let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests
            .lock()
            .expect("mock requests lock poisoned")
            .push(request.clone());
        self.script
            .lock()
            .expect("mock script lock poisoned")
            .pop_front()
            .unwrap_or_else(|| panic!("MockProvider script exhausted after {calls} calls"))
    }

    fn classify(&self, error: RestructureError) -> RestructureError {
        error
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn default_model(&self) -> &'static str {
        "mock-model"
    }

    fn max_output_tokens(&self) -> u32 {
        4_096
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_request(user: &str) -> ChatRequest {
        ChatRequest {
            model: "mock-model".into(),
            system: "system".into(),
            user: user.into(),
            max_output_tokens: 4_096,
            temperature: 0.0,
        }
    }

    #[test]
    fn test_replays_in_order_and_records() {
        tokio_test::block_on(async {
            let mock = MockProvider::new().respond("first").respond("second");
            let cancel = CancellationToken::new();

            let r1 = mock.complete(&cancel, &test_request("a")).await.unwrap();
            let r2 = mock.complete(&cancel, &test_request("b")).await.unwrap();

            assert_eq!(r1.choices[0].message.content, "first");
            assert_eq!(r2.choices[0].message.content, "second");
            assert_eq!(mock.calls(), 2);

            let requests = mock.requests();
            assert_eq!(requests.len(), 2);
            assert_eq!(requests[0].user, "a");
            assert_eq!(requests[1].user, "b");
        });
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let mock = MockProvider::new().fail(RestructureError::RateLimit("busy".into()));
        let cancel = CancellationToken::new();
        let err = mock
            .complete(&cancel, &test_request("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, RestructureError::RateLimit(_)));
    }

    #[tokio::test]
    async fn test_cancelled_short_circuits_script() {
        let mock = MockProvider::new().respond("unused");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = mock
            .complete(&cancel, &test_request("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, RestructureError::Cancelled));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    #[should_panic(expected = "script exhausted")]
    async fn test_exhausted_script_panics() {
        let mock = MockProvider::new();
        let cancel = CancellationToken::new();
        let _ = mock.complete(&cancel, &test_request("x")).await;
    }
}
