//! # Transcript Restructure
//!
//! The restructuring core of a record → transcribe → restructure pipeline:
//! turns arbitrarily long speech-to-text transcripts into coherent markdown
//! by calling a chat-completion provider, with strict error classification,
//! bounded retry, map/reduce over the model context, and two-phase
//! interrupt handling.
//!
//! ## Core Concepts
//!
//! - **[`Provider`]** — object-safe trait over chat-completion APIs.
//!   Built-in: [`OpenAiProvider`], [`DeepSeekProvider`], and
//!   [`MockProvider`] for tests. A provider is a pure adapter; it also
//!   knows how to classify its own error statuses onto the taxonomy.
//! - **[`RestructureError`]** / **[`ErrorKind`]** — the error taxonomy.
//!   Wrapped errors keep both the provider message and the abstract kind
//!   reachable from one value.
//! - **[`retry`](retry::retry)** — bounded exponential backoff around any
//!   fallible async operation, gated by a positive-list retry predicate and
//!   a cancellation token.
//! - **[`Restructurer`]** — one transcript (or chunk) in, markdown out:
//!   prompt assembly, input token budget, retry-wrapped provider calls.
//! - **[`Orchestrator`]** — decides between a single pass and map/reduce
//!   via the paragraph-aligned [splitter](splitter::split), reports
//!   [progress](progress::ProgressHandler), and honors cancellation
//!   between chunks.
//! - **[`InterruptHandler`]** — SIGINT/SIGTERM to cooperative cancellation:
//!   first signal stops gracefully, a second within 2 s aborts.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use transcript_restructure::{
//!     InterruptHandler, OpenAiProvider, Orchestrator, Restructurer, TemplateName,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api_key = std::env::var("OPENAI_API_KEY")?;
//!     let provider = Arc::new(OpenAiProvider::new(api_key));
//!     let orchestrator = Orchestrator::new(Restructurer::new(provider));
//!
//!     let interrupts = InterruptHandler::listen()?;
//!     let cancel = interrupts.cancellation_token();
//!
//!     let outcome = orchestrator
//!         .restructure(&cancel, "the raw transcript…", TemplateName::Meeting, None)
//!         .await?;
//!     interrupts.stop();
//!
//!     println!("{}", outcome.markdown);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod interrupt;
pub mod language;
pub mod orchestrator;
pub mod progress;
pub mod provider;
pub mod restructurer;
pub mod retry;
pub mod splitter;
pub mod template;

pub use error::{should_retry, ErrorKind, RestructureError, Result};
pub use interrupt::{Decision, InterruptHandler};
pub use language::Language;
pub use orchestrator::{Orchestrator, RestructureOutcome};
pub use progress::{FnProgressHandler, Phase, ProgressHandler};
pub use provider::{
    ChatRequest, ChatResponse, DeepSeekProvider, MockProvider, OpenAiProvider, Provider,
};
pub use restructurer::Restructurer;
pub use retry::{retry, RetryConfig};
pub use splitter::{estimate_tokens, split, Chunk};
pub use template::TemplateName;
