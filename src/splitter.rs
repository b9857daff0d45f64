//! Paragraph-aligned transcript splitting for map/reduce.
//!
//! [`split`] decides whether a transcript needs map/reduce at all and, when
//! it does, packs paragraphs greedily into chunks that respect a token
//! budget. Paragraphs are never broken: a single paragraph larger than the
//! budget becomes an oversized chunk of its own, trading size compliance for
//! coherence.

/// Coarse token estimate: one token per three bytes.
///
/// Deliberately biased toward over-counting so that budget checks fail on
/// the client side rather than after a paid request. Not a tokenizer.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 3
}

/// One map unit of a split transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 0-based position of this chunk in the split.
    pub index: usize,
    /// Number of chunks in the split; identical across all of them.
    pub total: usize,
    /// The chunk text, trimmed at both ends.
    pub content: String,
}

/// Split `transcript` into paragraph-aligned chunks of at most `max_tokens`
/// estimated tokens each.
///
/// Returns `None` when no split is needed: the whole transcript fits the
/// budget, or packing yields fewer than two chunks. Callers handle the
/// single-pass path themselves.
pub fn split(transcript: &str, max_tokens: usize) -> Option<Vec<Chunk>> {
    if estimate_tokens(transcript) <= max_tokens {
        return None;
    }

    let mut contents: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_tokens = 0usize;

    for paragraph in transcript.split("\n\n") {
        let paragraph_tokens = estimate_tokens(paragraph);
        // Seal the current chunk when this paragraph would overflow it.
        // An empty chunk always accepts the paragraph, however large.
        if !current.is_empty() && current_tokens + paragraph_tokens > max_tokens {
            seal(&mut contents, &mut current);
            current_tokens = 0;
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
        current_tokens += paragraph_tokens;
    }
    seal(&mut contents, &mut current);

    if contents.len() < 2 {
        return None;
    }

    let total = contents.len();
    Some(
        contents
            .into_iter()
            .enumerate()
            .map(|(index, content)| Chunk {
                index,
                total,
                content,
            })
            .collect(),
    )
}

fn seal(contents: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        contents.push(trimmed.to_string());
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("ab"), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens(&"x".repeat(300)), 100);
    }

    #[test]
    fn test_no_split_when_under_budget() {
        assert!(split("short transcript", 1_000).is_none());
    }

    #[test]
    fn test_no_split_single_chunk() {
        // Over budget but with a single paragraph: packing yields one chunk.
        let transcript = "a".repeat(300);
        assert!(split(&transcript, 50).is_none());
    }

    #[test]
    fn test_two_paragraphs_two_chunks() {
        let transcript = format!("{}\n\n{}", "a".repeat(300), "b".repeat(300));
        let chunks = split(&transcript, 50).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "a".repeat(300));
        assert_eq!(chunks[1].content, "b".repeat(300));
    }

    #[test]
    fn test_index_and_total_invariants() {
        let paragraphs: Vec<String> = (0..8).map(|i| format!("{}", i).repeat(90)).collect();
        let transcript = paragraphs.join("\n\n");
        let chunks = split(&transcript, 40).unwrap();
        assert!(chunks.len() >= 2);
        let total = chunks.len();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.total, total);
        }
    }

    #[test]
    fn test_greedy_packing_keeps_small_paragraphs_together() {
        // Four paragraphs of ~20 tokens each against a 50-token budget:
        // expect two chunks of two paragraphs.
        let para = "p".repeat(60);
        let transcript = [&para, &para, &para, &para]
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = split(&transcript, 50).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, format!("{para}\n\n{para}"));
        assert_eq!(chunks[1].content, format!("{para}\n\n{para}"));
    }

    #[test]
    fn test_oversized_paragraph_stays_whole() {
        let big = "b".repeat(900); // ~300 tokens, budget 50
        let small = "s".repeat(60);
        let transcript = format!("{small}\n\n{big}\n\n{small}");
        let chunks = split(&transcript, 50).unwrap();
        // The big paragraph is not broken apart.
        assert!(chunks.iter().any(|c| c.content == big));
    }

    #[test]
    fn test_content_preserved_modulo_whitespace() {
        let paragraphs: Vec<String> = (0..6)
            .map(|i| format!("paragraph {} {}", i, "word ".repeat(40)))
            .collect();
        let transcript = paragraphs.join("\n\n");
        let chunks = split(&transcript, 60).unwrap();

        let rejoined = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let normalize = |s: &str| {
            s.split("\n\n")
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join("\n\n")
        };
        assert_eq!(normalize(&rejoined), normalize(&transcript));
    }

    #[test]
    fn test_whitespace_only_paragraphs_dropped() {
        let transcript = format!("{}\n\n   \n\n{}", "a".repeat(300), "b".repeat(300));
        let chunks = split(&transcript, 50).unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| !c.content.trim().is_empty()));
    }

    #[test]
    fn test_chunks_are_trimmed() {
        let transcript = format!("  {}  \n\n  {}  ", "a".repeat(300), "b".repeat(300));
        let chunks = split(&transcript, 60).unwrap();
        for chunk in &chunks {
            assert_eq!(chunk.content, chunk.content.trim());
        }
    }
}
