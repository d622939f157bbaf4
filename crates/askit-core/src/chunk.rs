//! Paragraph-boundary text chunker.
//!
//! PDF text is split into [`Chunk`]s before it is indexed, so a search hit
//! returns a passage rather than a whole document. Splits fall on blank
//! lines (`\n\n`); a paragraph longer than the budget is hard-split at the
//! last newline or space that fits.
//!
//! # Example
//!
//! ```rust
//! use askit_core::chunk::chunk_text;
//!
//! let chunks = chunk_text("doc-1", "Refunds are allowed.\n\nWithin 30 days.", 700);
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].chunk_index, 0);
//! ```

use uuid::Uuid;

use crate::models::Chunk;

/// Approximate characters-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

/// Split `text` into chunks of at most `max_tokens` (≈ `max_tokens × 4`
/// characters).
///
/// - Indices are contiguous from 0.
/// - Empty input yields no chunks; callers skip empty documents earlier.
pub fn chunk_text(document_id: &str, text: &str, max_tokens: usize) -> Vec<Chunk> {
    let max_chars = (max_tokens * CHARS_PER_TOKEN).max(1);
    let mut pieces: Vec<String> = Vec::new();
    let mut buf = String::new();

    for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let would_be = if buf.is_empty() {
            para.len()
        } else {
            buf.len() + 2 + para.len()
        };
        if would_be > max_chars && !buf.is_empty() {
            pieces.push(std::mem::take(&mut buf));
        }

        if para.len() > max_chars {
            pieces.extend(hard_split(para, max_chars));
            continue;
        }

        if !buf.is_empty() {
            buf.push_str("\n\n");
        }
        buf.push_str(para);
    }

    if !buf.is_empty() {
        pieces.push(buf);
    }

    pieces
        .into_iter()
        .enumerate()
        .map(|(i, piece)| make_chunk(document_id, i as i64, &piece))
        .collect()
}

/// Split an oversized paragraph at whitespace, never inside a UTF-8
/// sequence.
fn hard_split(para: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut remaining = para;

    while !remaining.is_empty() {
        if remaining.len() <= max_chars {
            out.push(remaining.trim().to_string());
            break;
        }
        let limit = floor_char_boundary(remaining, max_chars);
        let window = &remaining[..limit];
        let mut cut = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .map(|pos| pos + 1)
            .unwrap_or(limit);
        if cut == 0 {
            // a single character wider than the budget
            cut = remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len());
        }
        let piece = remaining[..cut].trim();
        if !piece.is_empty() {
            out.push(piece.to_string());
        }
        remaining = &remaining[cut..];
    }

    out.retain(|p| !p.is_empty());
    out
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn make_chunk(document_id: &str, index: i64, text: &str) -> Chunk {
    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chunk_index: index,
        text: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_text("d", "Refunds are allowed within 30 days.", 700);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Refunds are allowed within 30 days.");
        assert_eq!(chunks[0].document_id, "d");
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk_text("d", "", 700).is_empty());
        assert!(chunk_text("d", "\n\n  \n\n", 700).is_empty());
    }

    #[test]
    fn paragraphs_pack_until_budget() {
        let text = "This is paragraph one.\n\nThis is paragraph two.\n\nThis is paragraph three.";
        let chunks = chunk_text("d", text, 12);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.contains("one."));
        assert!(chunks[0].text.contains("two."));
        assert_eq!(chunks[1].text, "This is paragraph three.");
    }

    #[test]
    fn indices_are_contiguous() {
        let text = (0..40)
            .map(|i| format!("Paragraph number {}.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunk_text("d", &text, 10);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
        }
    }

    #[test]
    fn long_paragraph_splits_on_spaces() {
        let para = "word ".repeat(100);
        let chunks = chunk_text("d", &para, 5);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.text.len() <= 20, "chunk too long: {}", c.text.len());
            assert!(!c.text.starts_with(' '));
        }
    }

    #[test]
    fn multibyte_text_does_not_panic() {
        let text = "┌──────────────────┐\n│ Hello world      │\n└──────────────────┘";
        let chunks = chunk_text("d", text, 1);
        assert!(!chunks.is_empty());
        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert!(joined.contains("Hello"));
    }

    #[test]
    fn chunk_ids_are_fresh() {
        let a = chunk_text("d", "Alpha\n\nBeta", 700);
        let b = chunk_text("d", "Alpha\n\nBeta", 700);
        assert_eq!(a[0].text, b[0].text);
        assert_ne!(a[0].id, b[0].id);
    }
}
