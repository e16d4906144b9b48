//! Fixed-window text chunking with overlap.
//!
//! Offsets are counted in characters (Unicode scalar values), never bytes,
//! so a window never splits a code point.

use crate::types::Chunk;
use sage_core::{AppError, AppResult};

/// Check window and overlap parameters.
pub fn validate_params(chunk_size: usize, overlap: usize) -> AppResult<()> {
    if chunk_size == 0 {
        return Err(AppError::Config("Chunk size must be positive".to_string()));
    }
    if overlap >= chunk_size {
        return Err(AppError::Config(format!(
            "Chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, chunk_size
        )));
    }
    Ok(())
}

/// Split `text` into windows of `chunk_size` characters, consecutive windows
/// sharing `overlap` characters.
///
/// Windows start at 0 and advance by `chunk_size - overlap`. The last window
/// may be shorter than `chunk_size`. Splitting stops once a window reaches the
/// end of the text. Chunks are not trimmed or padded.
pub fn chunk_text(
    source: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> AppResult<Vec<Chunk>> {
    validate_params(chunk_size, overlap)?;

    // Byte offset of every char boundary, plus the end of the text.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = boundaries.len() - 1;

    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < char_len {
        let end = (start + chunk_size).min(char_len);
        chunks.push(Chunk::new(
            &text[boundaries[start]..boundaries[end]],
            source,
            chunks.len() as u32,
        ));

        if end == char_len {
            break;
        }
        start += step;
    }

    tracing::debug!(
        source,
        chunks = chunks.len(),
        chunk_size,
        overlap,
        "Chunked document"
    );

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("doc.txt", "", 100, 10).unwrap().is_empty());
    }

    #[test]
    fn test_short_text_yields_single_chunk() {
        let chunks = chunk_text("doc.txt", "  short text  ", 100, 10).unwrap();
        assert_eq!(texts(&chunks), vec!["  short text  "]);
        assert_eq!(chunks[0].source, "doc.txt");
        assert_eq!(chunks[0].position, 0);
    }

    #[test]
    fn test_text_of_exactly_window_size_is_one_chunk() {
        let text = "a".repeat(50);
        assert_eq!(chunk_text("doc.txt", &text, 50, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_two_windows_scenario() {
        // len = 2W - O
        let (w, o) = (10, 3);
        let text: String = ('a'..='q').collect();
        assert_eq!(text.chars().count(), 2 * w - o);

        let chunks = chunk_text("doc.txt", &text, w, o).unwrap();
        assert_eq!(texts(&chunks), vec!["abcdefghij", "hijklmnopq"]);
        assert_eq!(&chunks[0].text[w - o..], &chunks[1].text[..o]);
    }

    #[test]
    fn test_consecutive_chunks_overlap_exactly() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(40);
        let (w, o) = (97, 23);
        let chunks = chunk_text("fox.txt", &text, w, o).unwrap();
        assert!(chunks.len() > 2);

        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].text.chars().collect();
            let next: Vec<char> = pair[1].text.chars().collect();
            assert_eq!(prev.len(), w);
            assert_eq!(&prev[w - o..], &next[..o]);
        }
        assert!(chunks.last().unwrap().text.chars().count() <= w);
    }

    #[test]
    fn test_chunks_reassemble_original_text() {
        let text = "0123456789".repeat(7);
        let (w, o) = (20, 5);
        let chunks = chunk_text("digits.txt", &text, w, o).unwrap();

        let mut rebuilt = chunks[0].text.clone();
        for chunk in &chunks[1..] {
            rebuilt.extend(chunk.text.chars().skip(o));
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_zero_overlap() {
        let text = "a".repeat(300);
        let chunks = chunk_text("doc.txt", &text, 100, 0).unwrap();
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_positions_follow_reading_order() {
        let text = "abcdefghijklmnopqrstuvwxyz".repeat(10);
        let chunks = chunk_text("alpha.txt", &text, 50, 10).unwrap();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.position, i as u32);
            assert_eq!(chunk.source, "alpha.txt");
        }
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // Multi-byte scalars: Arabic letters and an emoji
        let text = "بسم الله الرحمن الرحيم 🌙".repeat(3);
        let chunks = chunk_text("ar.txt", &text, 10, 4).unwrap();

        for chunk in &chunks[..chunks.len() - 1] {
            assert_eq!(chunk.text.chars().count(), 10);
        }
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].text.chars().collect();
            let next: Vec<char> = pair[1].text.chars().collect();
            assert_eq!(&prev[6..], &next[..4]);
        }
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let text = "Deterministic chunking of the same text. ".repeat(25);
        let first = chunk_text("a.txt", &text, 64, 16).unwrap();
        let second = chunk_text("a.txt", &text, 64, 16).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(matches!(
            chunk_text("a.txt", "text", 0, 0),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            chunk_text("a.txt", "text", 10, 10),
            Err(AppError::Config(_))
        ));
    }
}
