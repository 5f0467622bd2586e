//! Query-time retrieval: relevance scoring, filtering, and context assembly.
//!
//! The read path never fails. Index errors and timeouts are logged and turn
//! into an empty result, so a conversation degrades to the fallback context
//! instead of erroring.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::RagConfig;
use crate::document::RetrievedChunk;
use crate::index::VectorIndex;

/// Default `k` for [`Retriever::retrieve`] callers without a specific need.
pub const DEFAULT_RETRIEVE_K: usize = 5;

/// Reads from a [`VectorIndex`] and shapes results for the language model.
///
/// # Example
///
/// ```rust,ignore
/// let retriever = Retriever::new(index.clone(), RagConfig::default());
/// let context = retriever.context_for("I can't sleep").await;
/// ```
#[derive(Debug, Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    config: RagConfig,
}

impl Retriever {
    /// Create a retriever over `index` using the thresholds in `config`.
    pub fn new(index: Arc<VectorIndex>, config: RagConfig) -> Self {
        Self { index, config }
    }

    /// The active configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return the `k` nearest chunks with `relevance_score = 1 - distance`.
    ///
    /// Any index failure or timeout yields an empty vec.
    pub async fn retrieve(&self, query: &str, k: usize) -> Vec<RetrievedChunk> {
        match self.index.query(query, k).await {
            Ok(hits) => {
                let chunks: Vec<RetrievedChunk> = hits
                    .into_iter()
                    .map(|h| RetrievedChunk::from_distance(h.text, h.metadata, h.distance))
                    .collect();
                info!(k, result_count = chunks.len(), "retrieved chunks");
                chunks
            }
            Err(e) => {
                error!(k, error = %e, "retrieval failed; continuing without context");
                Vec::new()
            }
        }
    }

    /// Build the grounding context for `message`.
    ///
    /// Chunks scoring strictly above `relevance_threshold_context` are joined
    /// with blank lines under the optional header. With no such chunk, the
    /// configured fallback string is returned verbatim.
    pub async fn context_for(&self, message: &str) -> String {
        let chunks = self.retrieve(message, self.config.retrieval_k_context).await;
        let threshold = self.config.relevance_threshold_context;
        let parts: Vec<&str> = chunks
            .iter()
            .filter(|c| c.relevance_score > threshold)
            .map(|c| c.content.as_str())
            .collect();

        debug!(retrieved = chunks.len(), relevant = parts.len(), threshold, "assembled context");

        if parts.is_empty() {
            return self.config.fallback_context.clone();
        }

        let body = parts.join("\n\n");
        match &self.config.context_header {
            Some(header) => format!("{header}\n{body}"),
            None => body,
        }
    }

    /// Extract up to `max_suggestions` actionable chunks for `message`.
    ///
    /// A suggestion must score strictly above `relevance_threshold_suggestions`
    /// and mention one of the suggestion keywords, case-insensitively.
    /// Retrieval order is preserved.
    pub async fn suggestions_for(&self, message: &str) -> Vec<String> {
        let chunks = self.retrieve(message, self.config.retrieval_k_suggestions).await;
        let threshold = self.config.relevance_threshold_suggestions;
        let keywords: Vec<String> =
            self.config.suggestion_keywords.iter().map(|k| k.to_lowercase()).collect();

        chunks
            .into_iter()
            .filter(|c| c.relevance_score > threshold)
            .filter(|c| {
                let lower = c.content.to_lowercase();
                keywords.iter().any(|k| lower.contains(k.as_str()))
            })
            .take(self.config.max_suggestions)
            .map(|c| c.content)
            .collect()
    }
}
