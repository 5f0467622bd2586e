//! Embedding providers that turn text into vectors.
//!
//! The vector index treats embeddings as a black box: it only needs an
//! [`EmbeddingProvider`]. [`HashingEmbedder`] is the default offline provider;
//! the `openai` feature adds an API-backed one.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// The default [`embed_batch`](EmbeddingProvider::embed_batch) implementation
/// calls [`embed`](EmbeddingProvider::embed) sequentially; backends that
/// support native batching should override it.
///
/// # Example
///
/// ```rust,ignore
/// use serene_rag::{EmbeddingProvider, HashingEmbedder};
///
/// let provider = HashingEmbedder::default();
/// let embedding = provider.embed("trouble sleeping").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}

/// Default dimensionality of [`HashingEmbedder`] vectors.
pub const DEFAULT_HASHING_DIMENSIONS: usize = 1024;

/// Buckets written per token. Spreading a token over several buckets keeps a
/// single hash collision from dominating a similarity score.
const PROBES_PER_TOKEN: usize = 4;

const STOP_WORDS: &[&str] = &[
    "a", "about", "am", "an", "and", "are", "as", "at", "be", "but", "by", "can", "do", "for",
    "from", "had", "has", "have", "how", "i", "if", "in", "is", "it", "its", "me", "my", "of",
    "on", "or", "so", "that", "the", "this", "to", "was", "what", "with", "you", "your",
];

/// Deterministic bag-of-words embedder based on signed feature hashing.
///
/// Text is lower-cased and split on non-alphanumeric characters; stop words
/// and single characters are dropped and a light suffix strip is applied.
/// Each token adds `1 + ln(tf)` to a few SHA-256-selected buckets with a
/// hash-selected sign, and the result is L2-normalised. Vectors are stable
/// across processes and platforms, so they can be persisted.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSIONS)
    }
}

impl HashingEmbedder {
    /// Create an embedder producing vectors of the given size (at least 1).
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut counts: Vec<(String, u32)> = Vec::new();
        for token in tokenize(text) {
            match counts.iter_mut().find(|(seen, _)| *seen == token) {
                Some((_, count)) => *count += 1,
                None => counts.push((token, 1)),
            }
        }

        let mut vector = vec![0.0f32; self.dimensions];
        for (token, count) in counts {
            let weight = 1.0 + (count as f32).ln();
            let digest = Sha256::digest(token.as_bytes());
            for probe in 0..PROBES_PER_TOKEN {
                let bytes = [
                    digest[probe * 4],
                    digest[probe * 4 + 1],
                    digest[probe * 4 + 2],
                    digest[probe * 4 + 3],
                ];
                let bucket = u32::from_le_bytes(bytes) as usize % self.dimensions;
                let sign = if digest[16 + probe] & 1 == 0 { 1.0 } else { -1.0 };
                vector[bucket] += sign * weight;
            }
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|raw| raw.chars().count() > 1)
        .map(str::to_lowercase)
        .filter(|token| !STOP_WORDS.contains(&token.as_str()))
        .map(stem)
}

fn stem(token: String) -> String {
    let len = token.chars().count();
    if len > 5 && token.ends_with("ing") {
        return token[..token.len() - 3].to_string();
    }
    if len > 3 && token.ends_with('s') && !token.ends_with("ss") {
        return token[..token.len() - 1].to_string();
    }
    token
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if the lengths differ or either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Cosine distance (`1 - cosine similarity`), clamped to `[0, 2]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    (1.0 - cosine_similarity(a, b)).clamp(0.0, 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_text_has_zero_distance() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("Deep breathing exercises calm the nervous system").await.unwrap();
        let b = embedder.embed("Deep breathing exercises calm the nervous system").await.unwrap();
        assert_eq!(a.len(), DEFAULT_HASHING_DIMENSIONS);
        assert!(cosine_distance(&a, &b) < 1e-5);
    }

    #[tokio::test]
    async fn shared_terms_are_closer_than_disjoint_terms() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed("trouble with sleep").await.unwrap();
        let near = embedder.embed("a consistent sleep schedule").await.unwrap();
        let far = embedder.embed("endorphins lift mood").await.unwrap();
        assert!(cosine_distance(&query, &near) < cosine_distance(&query, &far));
    }

    #[tokio::test]
    async fn stop_words_only_text_embeds_to_zero_vector() {
        let embedder = HashingEmbedder::new(32);
        let v = embedder.embed("I can do it").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
        assert_eq!(cosine_distance(&v, &v), 1.0);
    }

    #[test]
    fn tokenizer_normalises_case_and_suffixes() {
        let tokens: Vec<String> = tokenize("Sleeping EXERCISES can't stress").collect();
        assert_eq!(tokens, vec!["sleep", "exercise", "stress"]);
    }

    #[tokio::test]
    async fn default_batch_preserves_order() {
        let embedder = HashingEmbedder::new(64);
        let batch = embedder.embed_batch(&["calm", "sleep"]).await.unwrap();
        assert_eq!(batch[0], embedder.embed("calm").await.unwrap());
        assert_eq!(batch[1], embedder.embed("sleep").await.unwrap());
    }

    #[test]
    fn cosine_similarity_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
    }
}
