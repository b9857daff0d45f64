//! Restructuring templates.
//!
//! Each [`TemplateName`] maps to an immutable system prompt baked into the
//! binary. The set is closed; callers that accept user input parse into the
//! enum and handle "no template" (skip restructuring) before reaching this
//! crate.

use std::fmt;
use std::str::FromStr;

use crate::error::RestructureError;

/// The closed set of restructuring templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateName {
    /// Free-form ideation sessions: cluster ideas by theme.
    Brainstorm,
    /// Meetings: decisions, discussion, action items.
    Meeting,
    /// Lectures and talks: topic outline with key points.
    Lecture,
    /// General-purpose structured notes.
    Notes,
}

impl TemplateName {
    /// Every template, for iteration and CLI help text.
    pub const ALL: [TemplateName; 4] = [
        TemplateName::Brainstorm,
        TemplateName::Meeting,
        TemplateName::Lecture,
        TemplateName::Notes,
    ];

    /// The canonical lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateName::Brainstorm => "brainstorm",
            TemplateName::Meeting => "meeting",
            TemplateName::Lecture => "lecture",
            TemplateName::Notes => "notes",
        }
    }

    /// The system prompt for this template.
    pub fn prompt(&self) -> &'static str {
        match self {
            TemplateName::Brainstorm => BRAINSTORM_PROMPT,
            TemplateName::Meeting => MEETING_PROMPT,
            TemplateName::Lecture => LECTURE_PROMPT,
            TemplateName::Notes => NOTES_PROMPT,
        }
    }
}

impl FromStr for TemplateName {
    type Err = RestructureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brainstorm" => Ok(TemplateName::Brainstorm),
            "meeting" => Ok(TemplateName::Meeting),
            "lecture" => Ok(TemplateName::Lecture),
            "notes" => Ok(TemplateName::Notes),
            _ => Err(RestructureError::InvalidConfig(format!(
                "unknown template: {s}"
            ))),
        }
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const BRAINSTORM_PROMPT: &str = "\
You are restructuring the raw transcript of a brainstorming session into a markdown document.

Rules:
- Start with a single H1 title summarizing the session's subject.
- Group ideas into thematic sections (H2). Invent concise section names; do not use timestamps.
- Render each idea as a bullet. Keep the speaker's wording where it is clear; tighten filler and repetition.
- Preserve every distinct idea, including half-formed ones. Mark clearly abandoned ideas with '(discarded)'.
- Collect open questions and next steps into their own sections at the end, when present.
- Output only the markdown document, with no commentary before or after it.";

const MEETING_PROMPT: &str = "\
You are restructuring the raw transcript of a meeting into markdown minutes.

Rules:
- Start with a single H1 title naming the meeting's subject.
- Use these H2 sections in order, omitting any that are empty: Summary, Discussion, Decisions, Action Items, Open Questions.
- Summary is at most three sentences.
- Under Discussion, group related exchanges by topic (H3) rather than chronologically.
- Decisions are bullets stating what was decided, without restating the debate.
- Action Items are bullets in the form 'Owner: task', using '(unassigned)' when no owner was named.
- Do not invent content. If attribution of a statement is unclear, leave the speaker out.
- Output only the markdown document, with no commentary before or after it.";

const LECTURE_PROMPT: &str = "\
You are restructuring the raw transcript of a lecture or talk into markdown study notes.

Rules:
- Start with a single H1 title naming the lecture topic.
- Follow the speaker's own structure: main topics as H2, subtopics as H3.
- Turn spoken explanations into short paragraphs; enumerations into lists.
- Keep definitions, formulas, and examples verbatim where precision matters.
- Include asides and audience questions only when they add substance, under a trailing 'Questions' section.
- Output only the markdown document, with no commentary before or after it.";

const NOTES_PROMPT: &str = "\
You are restructuring a raw spoken transcript into clean markdown notes.

Rules:
- Start with a single H1 title capturing the overall subject.
- Organize content into sections (H2) by topic. Use lists for enumerations, paragraphs for narrative.
- Remove filler words, false starts, and exact repetitions; keep everything of substance.
- Preserve the original order of topics unless fragments of the same topic are scattered, in which case merge them.
- Do not add information that is not in the transcript.
- Output only the markdown document, with no commentary before or after it.";
