
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::loader::Document;
use crate::{RagError, Result};

/// A bounded piece of a document, ready for embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// The chunk text, including the overlap with the previous chunk
    pub text: String,
    /// The file this chunk was read from
    pub source: PathBuf,
    /// Page of the source file, for paginated formats
    pub page: Option<usize>,
    /// Position of this chunk within its document
    pub chunk_index: usize,
}

/// Configuration for document chunking. Sizes are in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks of the same document
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Places a chunk may end, in order of preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Paragraph,
    Sentence,
    Word,
}

impl Boundary {
    const PREFERENCE: [Self; 3] = [Self::Paragraph, Self::Sentence, Self::Word];

    /// Whether a chunk ending just before `end` would end on this boundary
    fn ends_at(self, chars: &[char], end: usize) -> bool {
        let last = chars[end - 1];
        let before_last = end.checked_sub(2).map(|i| chars[i]);
        match self {
            Self::Paragraph => last == '\n' && before_last == Some('\n'),
            Self::Sentence => {
                last == '\n'
                    || (last.is_whitespace() && matches!(before_last, Some('.' | '!' | '?')))
            }
            Self::Word => last.is_whitespace(),
        }
    }
}

/// Split documents into overlapping chunks
#[inline]
pub fn chunk_documents(documents: &[Document], config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    if config.chunk_size == 0 || config.chunk_overlap >= config.chunk_size {
        return Err(RagError::Config(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            config.chunk_overlap, config.chunk_size
        )));
    }

    let mut chunks = Vec::new();
    for document in documents {
        let pieces = split_text(&document.text, config);
        chunks.extend(
            pieces
                .into_iter()
                .enumerate()
                .map(|(chunk_index, text)| Chunk {
                    text,
                    source: document.source.clone(),
                    page: document.page,
                    chunk_index,
                }),
        );
    }

    debug!(
        "Split {} documents into {} chunks (avg {} chars)",
        documents.len(),
        chunks.len(),
        chunks.iter().map(|c| c.text.chars().count()).sum::<usize>() / chunks.len().max(1)
    );

    Ok(chunks)
}

/// Split text into pieces of at most `chunk_size` characters.
///
/// Each piece after the first starts with the last `chunk_overlap` characters
/// of the previous piece, so dropping that prefix from every later piece and
/// concatenating gives back the original text.
#[inline]
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let chars = text.chars().collect::<Vec<_>>();
    let size = config.chunk_size;
    let overlap = config.chunk_overlap.min(size.saturating_sub(1));

    if chars.len() <= size {
        return vec![text.to_string()];
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    loop {
        if chars.len() - start <= size {
            pieces.push(chars[start..].iter().collect());
            break;
        }

        let end = find_break(&chars, start, size, overlap);
        pieces.push(chars[start..end].iter().collect());
        start = end - overlap;
    }

    pieces
}

/// Pick the end of the chunk starting at `start`.
///
/// Only ends in the second half of the window are considered so chunks stay
/// reasonably full, and the end always lies past the overlap so the next chunk
/// makes progress.
fn find_break(chars: &[char], start: usize, size: usize, overlap: usize) -> usize {
    let hard_end = start + size;
    let earliest = start + (size / 2).max(overlap + 1).min(size);

    Boundary::PREFERENCE
        .iter()
        .find_map(|boundary| {
            (earliest..=hard_end)
                .rev()
                .find(|&end| boundary.ends_at(chars, end))
        })
        .unwrap_or(hard_end)
}
