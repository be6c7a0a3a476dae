//! Recursive character splitting of uploaded documents into overlapping
//! chunks sized for embedding.
//!
//! Text is cut on the coarsest separator that yields pieces under the chunk
//! size, recursing to finer separators for oversized pieces, then adjacent
//! pieces are merged back together up to the size limit with a tail of the
//! previous chunk carried over as overlap. Sizes are measured in characters,
//! never bytes, so multi-byte text cannot be cut mid-character.

/// Splitter with a fixed separator ladder from paragraph breaks down to
/// single characters.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(500, 100)
    }
}

impl TextSplitter {
    /// `chunk_overlap` greater than or equal to `chunk_size` would make
    /// merging loop forever, so it is clamped below the size.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                " ".to_string(),
                String::new(),
            ],
        }
    }

    /// Split `text` into chunks of at most `chunk_size` characters.
    /// Whitespace-only input yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        let pieces = self.split_recursive(text, 0);
        self.merge(pieces)
    }

    fn split_recursive(&self, text: &str, separator_idx: usize) -> Vec<String> {
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }
        if separator_idx >= self.separators.len() {
            return vec![text.to_string()];
        }

        let separator = &self.separators[separator_idx];
        let parts: Vec<&str> = if separator.is_empty() {
            // Last rung: hard cut into chunk-sized character windows.
            return hard_split(text, self.chunk_size);
        } else {
            text.split(separator.as_str()).collect()
        };

        let mut pieces = Vec::new();
        for part in parts {
            if char_len(part) > self.chunk_size {
                pieces.extend(self.split_recursive(part, separator_idx + 1));
            } else {
                pieces.push(part.to_string());
            }
        }
        pieces
    }

    /// Greedily pack pieces into chunks, seeding each new chunk with the
    /// last `chunk_overlap` characters of the previous one. The carried
    /// overlap shrinks when the next piece is large, so the seeded chunk
    /// still fits within `chunk_size`.
    fn merge(&self, pieces: Vec<String>) -> Vec<String> {
        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();

        for piece in pieces {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }

            let joined_len = if current.is_empty() {
                char_len(piece)
            } else {
                char_len(&current) + 1 + char_len(piece)
            };

            if joined_len > self.chunk_size && !current.is_empty() {
                let budget = self.chunk_size.saturating_sub(char_len(piece) + 1);
                let overlap = tail_chars(&current, self.chunk_overlap.min(budget));
                chunks.push(std::mem::take(&mut current));
                current = overlap;
            }

            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(piece);
        }

        let current = current.trim().to_string();
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn tail_chars(s: &str, n: usize) -> String {
    let total = char_len(s);
    if total <= n {
        return s.to_string();
    }
    s.chars().skip(total - n).collect()
}

fn hard_split(text: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_size)
        .map(|window| window.iter().collect())
        .collect()
}
