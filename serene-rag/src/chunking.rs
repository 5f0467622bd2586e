//! Document chunking.
//!
//! [`RecursiveChunker`] prefers to cut at paragraph breaks, then line breaks,
//! then spaces, and only cuts between arbitrary characters when no separator
//! fits. Every chunk is an exact slice of the source text, and consecutive
//! chunks share at least `chunk_overlap` characters, so the tail of one chunk
//! reappears at the head of the next.
//!
//! All lengths are measured in characters, not bytes.

use crate::config::RagConfig;
use crate::document::{Chunk, Document, chunk_id, content_hash};

/// Separators tried from coarsest to finest. Below the last one the chunker
/// falls back to character boundaries.
pub const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Chunk metadata key holding the chunk's position within its document.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";
/// Chunk metadata key holding the first character offset of the chunk.
pub const START_OFFSET_KEY: &str = "start_offset";
/// Chunk metadata key holding the end character offset (exclusive) of the chunk.
pub const END_OFFSET_KEY: &str = "end_offset";
/// Chunk metadata key holding the hex SHA-256 of the chunk's source and text.
pub const CONTENT_HASH_KEY: &str = "content_hash";

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty or whitespace-only text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;

    /// Split a batch of documents, preserving document order.
    fn split(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|document| self.chunk(document)).collect()
    }
}

/// Split `documents` with a [`RecursiveChunker`] of the given size and overlap.
pub fn split(documents: &[Document], chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    RecursiveChunker::new(chunk_size, overlap).split(documents)
}

/// Splits text at paragraph, line, word, or character boundaries.
///
/// Chunk ids are derived from `(source, chunk_index, content_hash)` via
/// [`chunk_id`]. Each chunk inherits the parent document's metadata plus
/// `chunk_index`, `start_offset`, `end_offset`, and `content_hash`.
///
/// Chunks cover the whole document. A long run of whitespace inside a
/// document can therefore produce a whitespace-only chunk.
///
/// # Example
///
/// ```rust,ignore
/// use serene_rag::{Chunker, RecursiveChunker};
///
/// let chunker = RecursiveChunker::new(1000, 200);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::new(1000, 200)
    }
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk (at least 1)
    /// * `chunk_overlap`: minimum number of characters shared by consecutive
    ///   chunks, capped at `chunk_size - 1`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self { chunk_size, chunk_overlap: chunk_overlap.min(chunk_size - 1) }
    }

    /// Build a chunker from the validated pipeline configuration.
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Maximum chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap in characters after capping.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.trim().is_empty() {
            return Vec::new();
        }

        let text = CharText::new(&document.text);
        let source = document.source();

        split_spans(&text, self.chunk_size, self.chunk_overlap)
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| {
                let slice = text.slice(start, end);
                let hash = content_hash(source, slice);
                let mut metadata = document.metadata.clone();
                metadata.insert(CHUNK_INDEX_KEY.to_string(), index.to_string());
                metadata.insert(START_OFFSET_KEY.to_string(), start.to_string());
                metadata.insert(END_OFFSET_KEY.to_string(), end.to_string());
                metadata.insert(CONTENT_HASH_KEY.to_string(), hash.clone());
                Chunk { id: chunk_id(source, index, &hash), text: slice.to_string(), metadata }
            })
            .collect()
    }
}

/// Text indexed by character position.
struct CharText<'a> {
    text: &'a str,
    /// Byte offset of every character, plus `text.len()` as a sentinel.
    offsets: Vec<usize>,
}

impl<'a> CharText<'a> {
    fn new(text: &'a str) -> Self {
        let offsets =
            text.char_indices().map(|(byte, _)| byte).chain(std::iter::once(text.len())).collect();
        Self { text, offsets }
    }

    fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[self.offsets[start]..self.offsets[end]]
    }

    fn char_at_byte(&self, byte: usize) -> usize {
        self.offsets.binary_search(&byte).unwrap_or_else(|insert_at| insert_at)
    }

    /// Character positions right after each occurrence of `separator`.
    fn ends_of(&self, separator: &str) -> Vec<usize> {
        self.text
            .match_indices(separator)
            .map(|(byte, matched)| self.char_at_byte(byte + matched.len()))
            .collect()
    }

    /// Positions where a word starts right after whitespace.
    fn word_starts(&self) -> Vec<usize> {
        let chars: Vec<char> = self.text.chars().collect();
        (1..chars.len())
            .filter(|&i| chars[i - 1].is_whitespace() && !chars[i].is_whitespace())
            .collect()
    }
}

/// Compute `(start, end)` character spans covering the whole text.
///
/// A span ends on the furthest boundary of the coarsest separator that lies
/// past both the previous span's end and `overlap` characters from its own
/// start, and within `chunk_size`;
/// with no such boundary it is cut at exactly `chunk_size` characters. The
/// next span starts at the latest word start leaving at least `overlap`
/// shared characters, or exactly `overlap` characters back when there is
/// none. `overlap` must be smaller than `chunk_size`.
fn split_spans(text: &CharText<'_>, chunk_size: usize, overlap: usize) -> Vec<(usize, usize)> {
    let len = text.len();
    if len == 0 {
        return Vec::new();
    }

    let levels: Vec<Vec<usize>> = SEPARATORS.iter().map(|sep| text.ends_of(sep)).collect();
    let word_starts = text.word_starts();

    let mut spans = Vec::new();
    let mut start: usize = 0;
    let mut prev_end = 0;

    loop {
        let limit = start.saturating_add(chunk_size);
        if limit >= len {
            spans.push((start, len));
            break;
        }

        // Past the overlap and past the previous chunk. Always <= limit.
        let earliest = (start + overlap + 1).max(prev_end + 1);
        let end = levels
            .iter()
            .find_map(|boundaries| last_in_range(boundaries, earliest, limit))
            .unwrap_or(limit);
        spans.push((start, end));
        prev_end = end;

        start = if overlap == 0 {
            end
        } else {
            let latest = end - overlap;
            last_in_range(&word_starts, start + 1, latest).unwrap_or(latest)
        };
    }

    spans
}

/// Largest value in the sorted slice within `[low, high]`.
fn last_in_range(sorted: &[usize], low: usize, high: usize) -> Option<usize> {
    let upper = sorted.partition_point(|&v| v <= high);
    sorted[..upper].last().copied().filter(|&v| v >= low)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new(text).with_metadata("source", "test").with_metadata("topic", "sleep")
    }

    fn offsets(chunk: &Chunk) -> (usize, usize) {
        let start = chunk.metadata[START_OFFSET_KEY].parse().unwrap();
        let end = chunk.metadata[END_OFFSET_KEY].parse().unwrap();
        (start, end)
    }

    /// Check size, overlap, and exact reconstruction from non-overlapping spans.
    fn assert_covers(text: &str, chunks: &[Chunk], chunk_size: usize, overlap: usize) {
        let chars: Vec<char> = text.chars().collect();
        let mut rebuilt = String::new();
        let mut covered = 0;
        for (i, chunk) in chunks.iter().enumerate() {
            let (start, end) = offsets(chunk);
            assert!(end - start <= chunk_size, "chunk {i} has {} chars", end - start);
            if i > 0 {
                assert!(covered - start >= overlap, "chunk {i} overlaps by {}", covered - start);
            }
            rebuilt.extend(&chars[covered.max(start)..end]);
            covered = end;
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn short_document_is_a_single_identical_chunk() {
        let text = "  Maintaining a consistent sleep schedule is crucial.\n";
        let chunks = RecursiveChunker::new(1000, 200).chunk(&doc(text));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(offsets(&chunks[0]), (0, text.chars().count()));
    }

    #[test]
    fn empty_and_whitespace_documents_yield_nothing() {
        let chunker = RecursiveChunker::default();
        assert!(chunker.chunk(&doc("")).is_empty());
        assert!(chunker.chunk(&doc(" \n\n\t  ")).is_empty());
    }

    #[test]
    fn chunk_metadata_is_superset_of_document_metadata() {
        let text = "word ".repeat(100);
        let chunks = RecursiveChunker::new(60, 10).chunk(&doc(&text));
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata["source"], "test");
            assert_eq!(chunk.metadata["topic"], "sleep");
            assert_eq!(chunk.metadata[CHUNK_INDEX_KEY], i.to_string());
            assert!(chunk.metadata.contains_key(CONTENT_HASH_KEY));
        }
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let first = "a".repeat(30);
        let second = "b".repeat(30);
        let text = format!("{first}\n\n{second}");
        let chunks = RecursiveChunker::new(40, 0).chunk(&doc(&text));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, format!("{first}\n\n"));
        assert_eq!(chunks[1].text, second);
    }

    #[test]
    fn falls_back_to_character_cuts_without_separators() {
        let text = "x".repeat(25);
        let chunks = RecursiveChunker::new(10, 0).chunk(&doc(&text));
        let lens: Vec<usize> = chunks.iter().map(|c| c.text.len()).collect();
        assert_eq!(lens, vec![10, 10, 5]);
    }

    #[test]
    fn consecutive_chunks_overlap_and_reconstruct() {
        let text = (0..120).map(|i| format!("token{i}")).collect::<Vec<_>>().join(" ");
        let chunks = RecursiveChunker::new(100, 20).chunk(&doc(&text));
        assert!(chunks.len() > 2);

        let mut rebuilt = String::new();
        let mut covered = 0;
        for window in chunks.windows(2) {
            let (_, prev_end) = offsets(&window[0]);
            let (next_start, _) = offsets(&window[1]);
            assert!(prev_end - next_start >= 20, "overlap {} too small", prev_end - next_start);
        }
        for chunk in &chunks {
            let (start, end) = offsets(chunk);
            assert!(chunk.text.chars().count() <= 100);
            assert_eq!(chunk.text.chars().count(), end - start);
            rebuilt.extend(chunk.text.chars().skip(covered - start.min(covered)));
            covered = end;
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn paragraphs_near_chunk_size_keep_full_overlap() {
        for words in [113, 125] {
            let paragraph = vec!["breathe"; words].join(" ");
            let text = [paragraph.as_str(); 3].join("\n\n");
            let chunks = RecursiveChunker::new(1000, 200).chunk(&doc(&text));
            assert!(chunks.len() >= 3);
            assert_covers(&text, &chunks, 1000, 200);
        }
    }

    #[test]
    fn whitespace_runs_inside_a_document_are_kept() {
        let text = format!("calm breathing{}sleep schedule", "\n".repeat(40));
        let chunks = RecursiveChunker::new(20, 5).chunk(&doc(&text));
        assert_covers(&text, &chunks, 20, 5);
        assert!(chunks.iter().any(|c| c.text.trim().is_empty()));
        assert!(chunks.last().unwrap().text.ends_with("sleep schedule"));
    }

    #[test]
    fn huge_chunk_size_does_not_overflow() {
        let text = "Rest well tonight.";
        let chunks = RecursiveChunker::new(usize::MAX, usize::MAX).chunk(&doc(text));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn overlap_is_capped_below_chunk_size() {
        let chunker = RecursiveChunker::new(10, 50);
        assert_eq!(chunker.chunk_overlap(), 9);
        let text = "x".repeat(30);
        let chunks = chunker.chunk(&doc(&text));
        assert_covers(&text, &chunks, 10, 9);
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        let text = "é".repeat(15);
        let chunks = RecursiveChunker::new(10, 0).chunk(&doc(&text));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text.chars().count(), 10);
        assert_eq!(chunks[1].text.chars().count(), 5);
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = "Breathe in for four counts.\nHold for four.\n\nExhale for six. ".repeat(20);
        let chunker = RecursiveChunker::new(120, 30);
        assert_eq!(chunker.chunk(&doc(&text)), chunker.chunk(&doc(&text)));
    }

    #[test]
    fn split_keeps_document_order() {
        let docs = vec![doc("first"), Document::new(""), doc("second")];
        let chunks = split(&docs, 1000, 200);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }
}
