//! Paragraph-boundary chunking of concatenated patient notes.
//!
//! Long notes are split into chunks that fit the model's context budget.
//! Chunks only break at blank-line paragraph boundaries; a paragraph is never
//! split, even when it alone exceeds the budget.

/// Paragraph separator used when notes are concatenated.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Split `text` into chunks of at most `budget` characters, breaking only at
/// paragraph boundaries.
///
/// The returned iterator is lazy and borrows the input: each chunk is a
/// contiguous slice of `text`, so concatenating all chunks plus the skipped
/// separators reproduces the input. Cloning the iterator restarts it.
///
/// A single paragraph longer than `budget` is emitted as its own oversized
/// chunk. Empty input yields no chunks.
pub fn chunk_text(text: &str, budget: usize) -> TextChunks<'_> {
    TextChunks {
        text,
        pos: 0,
        budget,
    }
}

/// Lazy iterator over paragraph-aligned chunks of a note.
#[derive(Debug, Clone)]
pub struct TextChunks<'a> {
    text: &'a str,
    pos: usize,
    budget: usize,
}

impl<'a> TextChunks<'a> {
    /// End offset of the paragraph starting at or after `from`.
    fn paragraph_end(&self, from: usize) -> usize {
        self.text[from..]
            .find(PARAGRAPH_SEPARATOR)
            .map(|i| from + i)
            .unwrap_or(self.text.len())
    }
}

impl<'a> Iterator for TextChunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        // Skip separators left over from the previous chunk.
        while self.text[self.pos..].starts_with(PARAGRAPH_SEPARATOR) {
            self.pos += PARAGRAPH_SEPARATOR.len();
        }
        if self.pos >= self.text.len() {
            return None;
        }

        let start = self.pos;
        // The first paragraph is always taken, so an oversized paragraph
        // still makes progress as its own chunk.
        let mut end = self.paragraph_end(start);

        // Greedily extend, one paragraph at a time, while the chunk fits.
        while end < self.text.len() {
            let next_start = end + PARAGRAPH_SEPARATOR.len();
            let candidate_end = self.paragraph_end(next_start);
            let candidate_is_empty = candidate_end == next_start;
            if candidate_is_empty && candidate_end == self.text.len() {
                // Trailing separator, nothing left to take.
                break;
            }
            if candidate_end - start > self.budget {
                break;
            }
            end = candidate_end;
        }

        self.pos = end;
        Some(&self.text[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_chunks() {
        let chunks: Vec<&str> = chunk_text("", 100).collect();
        assert!(chunks.is_empty());
    }

    #[test]
    fn separator_only_input_yields_no_chunks() {
        let chunks: Vec<&str> = chunk_text("\n\n\n\n", 100).collect();
        assert!(chunks.is_empty());
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks: Vec<&str> = chunk_text("a single paragraph", 100).collect();
        assert_eq!(chunks, vec!["a single paragraph"]);
    }

    #[test]
    fn paragraphs_pack_up_to_budget() {
        let text = "aaaa\n\nbbbb\n\ncccc";
        // "aaaa\n\nbbbb" is 10 chars, adding "cccc" would reach 16.
        let chunks: Vec<&str> = chunk_text(text, 10).collect();
        assert_eq!(chunks, vec!["aaaa\n\nbbbb", "cccc"]);
    }

    #[test]
    fn oversized_paragraph_emitted_alone() {
        let long = "x".repeat(50);
        let text = format!("short\n\n{long}\n\ntail");
        let chunks: Vec<String> = chunk_text(&text, 10).map(str::to_string).collect();
        assert_eq!(chunks, vec!["short".to_string(), long, "tail".to_string()]);
    }

    #[test]
    fn chunk_lengths_respect_budget_except_oversized_paragraphs() {
        let text = "aa\n\nbb\n\nccccccccccccccc\n\ndd\n\nee";
        for chunk in chunk_text(text, 8) {
            let is_single_paragraph = !chunk.contains(PARAGRAPH_SEPARATOR);
            assert!(chunk.len() <= 8 || is_single_paragraph, "chunk {chunk:?}");
        }
    }

    #[test]
    fn concatenation_reproduces_input() {
        let text = "alpha\n\nbeta gamma\n\ndelta\n\nepsilon zeta eta\n\ntheta";
        let chunks: Vec<&str> = chunk_text(text, 12).collect();
        let rejoined = chunks.join(PARAGRAPH_SEPARATOR);
        assert_eq!(rejoined, text);
    }

    #[test]
    fn iterator_is_restartable() {
        let text = "aaaa\n\nbbbb\n\ncccc";
        let iter = chunk_text(text, 10);
        let first: Vec<&str> = iter.clone().collect();
        let second: Vec<&str> = iter.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn trailing_separator_produces_no_empty_chunk() {
        let chunks: Vec<&str> = chunk_text("paragraph\n\n", 100).collect();
        assert_eq!(chunks, vec!["paragraph"]);
    }
}
