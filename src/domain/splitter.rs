//! Recursive character splitting with exact overlap.

use crate::domain::{DomainError, Result};

pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        Self::with_separators(
            chunk_size,
            chunk_overlap,
            DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn with_separators(
        chunk_size: usize,
        chunk_overlap: usize,
        separators: Vec<String>,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(DomainError::validation("chunk_size must be positive"));
        }
        if chunk_overlap >= chunk_size {
            return Err(DomainError::validation(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: separators.into_iter().filter(|s| !s.is_empty()).collect(),
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char, plus the end of the text.
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = bounds.len() - 1;

        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            if total - start <= self.chunk_size {
                chunks.push(text[bounds[start]..].to_string());
                break;
            }

            let end = self.chunk_end(text, &bounds, start);
            chunks.push(text[bounds[start]..bounds[end]].to_string());
            start = end - self.chunk_overlap;
        }

        chunks
    }

    /// Char index where the chunk starting at `start` ends. Always lies in
    /// `(start + chunk_overlap, start + chunk_size]`.
    fn chunk_end(&self, text: &str, bounds: &[usize], start: usize) -> usize {
        let limit = start + self.chunk_size;
        let min_end = start + self.chunk_overlap + 1;
        let window = &text[bounds[start]..bounds[limit]];

        for separator in &self.separators {
            let Some(pos) = window.rfind(separator.as_str()) else {
                continue;
            };
            let end_byte = bounds[start] + pos + separator.len();
            let end = bounds.binary_search(&end_byte).unwrap_or_else(|i| i);
            if end >= min_end {
                return end;
            }
        }

        limit
    }
}

pub fn split(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Result<Vec<String>> {
    let splitter = TextSplitter::with_separators(
        chunk_size,
        chunk_overlap,
        separators.iter().map(|s| s.to_string()).collect(),
    )?;
    Ok(splitter.split(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suffix(s: &str, n: usize) -> String {
        let chars: Vec<char> = s.chars().collect();
        chars[chars.len() - n..].iter().collect()
    }

    fn prefix(s: &str, n: usize) -> String {
        s.chars().take(n).collect()
    }

    fn sample_text(sentences: usize) -> String {
        (0..sentences)
            .map(|i| {
                let sentence = format!(
                    "Sentence {i} explains how retirement savings compound over the years. "
                );
                if i % 6 == 5 {
                    format!("{sentence}\n\n")
                } else {
                    sentence
                }
            })
            .collect()
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let splitter = TextSplitter::new(100, 10).unwrap();
        assert!(splitter.split("").is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let splitter = TextSplitter::new(100, 10).unwrap();
        assert_eq!(splitter.split("Hello world."), vec!["Hello world."]);
    }

    #[test]
    fn test_adjacent_chunks_overlap_exactly() {
        let text = sample_text(120);
        let splitter = TextSplitter::new(1000, 100).unwrap();
        let chunks = splitter.split(&text);

        assert!(chunks.len() > 3);
        for pair in chunks.windows(2) {
            assert_eq!(suffix(&pair[0], 100), prefix(&pair[1], 100));
        }
    }

    #[test]
    fn test_chunks_respect_size_and_cover_text() {
        let text = sample_text(80);
        let splitter = TextSplitter::new(500, 50).unwrap();
        let chunks = splitter.split(&text);

        for chunk in &chunks {
            assert!(chunk.chars().count() <= 500);
        }

        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            rebuilt.push_str(&chunk.chars().skip(50).collect::<String>());
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let first = "a".repeat(40);
        let second = "b".repeat(40);
        let text = format!("{first}. tail\n\n{second}. more words here");
        let splitter = TextSplitter::new(60, 5).unwrap();
        let chunks = splitter.split(&text);

        assert!(chunks[0].ends_with("\n\n"));
    }

    #[test]
    fn test_falls_back_to_hard_cut_without_separators() {
        let text = "x".repeat(250);
        let splitter = TextSplitter::new(100, 20).unwrap();
        let chunks = splitter.split(&text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 100);
        assert_eq!(chunks[1].len(), 100);
        assert_eq!(chunks[2].len(), 250 - 160);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = "é".repeat(30);
        let splitter = TextSplitter::new(10, 2).unwrap();
        let chunks = splitter.split(&text);

        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(suffix(&chunks[0], 2), prefix(&chunks[1], 2));
    }

    #[test]
    fn test_overlap_not_smaller_than_size_is_rejected() {
        assert!(matches!(
            TextSplitter::new(100, 100),
            Err(DomainError::Validation(_))
        ));
        assert!(TextSplitter::new(0, 0).is_err());
        assert!(split("text", 10, 20, &DEFAULT_SEPARATORS).is_err());
    }
}
