//! Map/reduce orchestration for transcripts that exceed the model context.
//!
//! The orchestrator is the main entry point for restructuring: it asks the
//! [splitter](crate::splitter) whether the transcript fits a single call and
//! either delegates straight to the [`Restructurer`] or runs the two-phase
//! path: one map call per chunk, in order, then a single reduce call that
//! merges the partial documents. Progress is reported through an optional
//! [`ProgressHandler`]; the cancellation token is checked before every
//! chunk.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{RestructureError, Result};
use crate::language::Language;
use crate::progress::{emit, Phase, ProgressHandler};
use crate::restructurer::{compose_prompt, Restructurer};
use crate::splitter::split;
use crate::template::TemplateName;

/// Default per-chunk token budget for the map phase.
///
/// Comfortably below every supported model's context so that chunk plus
/// prompt plus completion fit together.
pub const DEFAULT_MAX_CHUNK_TOKENS: usize = 30_000;

/// The result of an orchestrated restructuring run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestructureOutcome {
    /// The final markdown document.
    pub markdown: String,
    /// Whether the transcript was split and merged, or handled in one call.
    pub used_map_reduce: bool,
}

/// Drives single-pass or map/reduce restructuring over a [`Restructurer`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
/// use transcript_restructure::{Orchestrator, OpenAiProvider, Restructurer, TemplateName};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = Arc::new(OpenAiProvider::new("sk-..."));
/// let orchestrator = Orchestrator::new(Restructurer::new(provider));
/// let outcome = orchestrator
///     .restructure(&CancellationToken::new(), "long transcript…", TemplateName::Lecture, None)
///     .await?;
/// println!("{}", outcome.markdown);
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator {
    restructurer: Restructurer,
    max_chunk_tokens: usize,
    progress: Option<Arc<dyn ProgressHandler>>,
}

impl Orchestrator {
    /// Create an orchestrator over the given restructurer.
    pub fn new(restructurer: Restructurer) -> Self {
        Self {
            restructurer,
            max_chunk_tokens: DEFAULT_MAX_CHUNK_TOKENS,
            progress: None,
        }
    }

    /// Override the per-chunk token budget. Default:
    /// [`DEFAULT_MAX_CHUNK_TOKENS`].
    pub fn with_max_chunk_tokens(mut self, max_chunk_tokens: usize) -> Self {
        self.max_chunk_tokens = max_chunk_tokens;
        self
    }

    /// Attach a progress observer.
    pub fn with_progress_handler(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress = Some(handler);
        self
    }

    /// Restructure a transcript, engaging map/reduce when it exceeds the
    /// chunk budget.
    ///
    /// Cancellation between chunks surfaces as
    /// [`RestructureError::Cancelled`]; failures inside a chunk or the merge
    /// are wrapped in [`RestructureError::Chunk`] /
    /// [`RestructureError::Merge`].
    pub async fn restructure(
        &self,
        cancel: &CancellationToken,
        transcript: &str,
        template: TemplateName,
        output_lang: Option<&Language>,
    ) -> Result<RestructureOutcome> {
        let Some(chunks) = split(transcript, self.max_chunk_tokens) else {
            let markdown = self
                .restructurer
                .restructure(cancel, transcript, template, output_lang)
                .await?;
            return Ok(RestructureOutcome {
                markdown,
                used_map_reduce: false,
            });
        };

        let total = chunks.len();
        debug!(chunks = total, "transcript exceeds chunk budget, running map/reduce");
        let base_prompt = compose_prompt(template, output_lang);
        let mut outputs: Vec<String> = Vec::with_capacity(total);

        for chunk in &chunks {
            if cancel.is_cancelled() {
                return Err(RestructureError::Cancelled);
            }
            emit(&self.progress, Phase::Map, chunk.index + 1, total);
            let prompt = map_prompt(chunk.index + 1, total, &base_prompt);
            let output = self
                .restructurer
                .restructure_with_custom_prompt(cancel, &chunk.content, &prompt)
                .await
                .map_err(|source| RestructureError::Chunk {
                    index: chunk.index + 1,
                    total,
                    source: Box::new(source),
                })?;
            outputs.push(output);
        }

        emit(&self.progress, Phase::Reduce, 1, 1);
        let merged_input = frame_parts(&outputs);
        let prompt = reduce_prompt(output_lang);
        let markdown = self
            .restructurer
            .restructure_with_custom_prompt(cancel, &merged_input, &prompt)
            .await
            .map_err(|source| RestructureError::Merge {
                source: Box::new(source),
            })?;

        Ok(RestructureOutcome {
            markdown,
            used_map_reduce: true,
        })
    }
}

/// The per-chunk system prompt: the base prompt wrapped in part framing.
fn map_prompt(part: usize, total: usize, base_prompt: &str) -> String {
    format!(
        "IMPORTANT: This transcript has been split into multiple parts due to length.\n\
         You are processing part {part} of {total}.\n\n\
         {base_prompt}\n\n\
         Process this part following the rules above. The final output will be merged with other parts.\n\
         If this is not part 1, continue the structure from where the previous part left off.\n\
         Do not add a main title (H1) unless this is part 1."
    )
}

/// Concatenate map outputs with part markers for the reduce call.
fn frame_parts(outputs: &[String]) -> String {
    outputs
        .iter()
        .enumerate()
        .map(|(i, output)| format!("=== PART {} ===\n\n{}", i + 1, output))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

const REDUCE_PROMPT: &str = "\
You are merging several restructured parts of one transcript into a single coherent markdown document.

The input contains the parts in order, separated by '---' and labeled '=== PART n ==='.

Rules:
- Merge the parts in order into one document.
- Keep exactly one top-level heading (H1); demote or drop extra H1s from later parts.
- Deduplicate only exact repetitions across part boundaries. Preserve all unique content.
- Join sections that were split across parts; renumber or rename headings only where coherence requires it.
- Remove the part markers and separators from the output.
- Output only the merged markdown document, with no commentary before or after it.";

/// The reduce prompt plus the optional output-language prefix.
fn reduce_prompt(output_lang: Option<&Language>) -> String {
    match output_lang.and_then(Language::instruction) {
        Some(prefix) => format!("{prefix}{REDUCE_PROMPT}"),
        None => REDUCE_PROMPT.to_string(),
    }
}
