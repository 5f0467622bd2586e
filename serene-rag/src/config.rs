//! Configuration for the retrieval-augmented context pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Name of the single logical collection the index writes to.
pub const DEFAULT_COLLECTION: &str = "mental_health_knowledge";

/// Context returned when no retrieved chunk passes the relevance filter.
pub const DEFAULT_FALLBACK_CONTEXT: &str =
    "I'm here to help with mental health support. How can I assist you today?";

/// Header placed above the joined chunks of a non-empty context.
pub const DEFAULT_CONTEXT_HEADER: &str = "Based on mental health knowledge:";

/// Words that mark a chunk as an actionable suggestion.
pub const DEFAULT_SUGGESTION_KEYWORDS: [&str; 5] =
    ["try", "practice", "exercise", "technique", "method"];

/// Configuration parameters for chunking and retrieval.
///
/// Build validated instances with [`RagConfig::builder()`]. Values loaded via
/// serde must be checked with [`RagConfig::validate()`] before use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Minimum number of characters shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved when assembling context.
    pub retrieval_k_context: usize,
    /// Number of chunks retrieved when extracting suggestions.
    pub retrieval_k_suggestions: usize,
    /// Chunks must score strictly above this to enter the context.
    pub relevance_threshold_context: f32,
    /// Chunks must score strictly above this to become suggestions.
    pub relevance_threshold_suggestions: f32,
    /// Maximum number of suggestions returned.
    pub max_suggestions: usize,
    /// Case-insensitive keywords a suggestion must contain.
    pub suggestion_keywords: Vec<String>,
    /// Context returned when nothing passes the relevance filter.
    pub fallback_context: String,
    /// Optional header line above the joined context chunks.
    pub context_header: Option<String>,
    /// Name of the vector store collection.
    pub collection: String,
    /// Time budget for each embedding or store call, in milliseconds.
    pub operation_timeout_ms: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            retrieval_k_context: 3,
            retrieval_k_suggestions: 5,
            relevance_threshold_context: 0.5,
            relevance_threshold_suggestions: 0.6,
            max_suggestions: 3,
            suggestion_keywords: DEFAULT_SUGGESTION_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            fallback_context: DEFAULT_FALLBACK_CONTEXT.to_string(),
            context_header: Some(DEFAULT_CONTEXT_HEADER.to_string()),
            collection: DEFAULT_COLLECTION.to_string(),
            operation_timeout_ms: 15_000,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// The per-call time budget as a [`Duration`].
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Check that all parameters are in range.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - either retrieval `k` is zero, or `max_suggestions == 0`
    /// - a relevance threshold is outside `[0, 1]`
    /// - the fallback context or collection name is empty
    /// - `operation_timeout_ms == 0`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.retrieval_k_context == 0 {
            return Err(RagError::Config(
                "retrieval_k_context must be greater than zero".to_string(),
            ));
        }
        if self.retrieval_k_suggestions == 0 {
            return Err(RagError::Config(
                "retrieval_k_suggestions must be greater than zero".to_string(),
            ));
        }
        if self.max_suggestions == 0 {
            return Err(RagError::Config("max_suggestions must be greater than zero".to_string()));
        }
        check_threshold("relevance_threshold_context", self.relevance_threshold_context)?;
        check_threshold("relevance_threshold_suggestions", self.relevance_threshold_suggestions)?;
        if self.fallback_context.trim().is_empty() {
            return Err(RagError::Config("fallback_context must not be empty".to_string()));
        }
        if self.collection.trim().is_empty() {
            return Err(RagError::Config("collection must not be empty".to_string()));
        }
        if self.operation_timeout_ms == 0 {
            return Err(RagError::Config(
                "operation_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_threshold(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(RagError::Config(format!("{name} ({value}) must be within [0, 1]")));
    }
    Ok(())
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks retrieved for context assembly.
    pub fn retrieval_k_context(mut self, k: usize) -> Self {
        self.config.retrieval_k_context = k;
        self
    }

    /// Set the number of chunks retrieved for suggestion extraction.
    pub fn retrieval_k_suggestions(mut self, k: usize) -> Self {
        self.config.retrieval_k_suggestions = k;
        self
    }

    /// Set the relevance threshold for context chunks.
    pub fn relevance_threshold_context(mut self, threshold: f32) -> Self {
        self.config.relevance_threshold_context = threshold;
        self
    }

    /// Set the relevance threshold for suggestions.
    pub fn relevance_threshold_suggestions(mut self, threshold: f32) -> Self {
        self.config.relevance_threshold_suggestions = threshold;
        self
    }

    /// Set the maximum number of suggestions returned.
    pub fn max_suggestions(mut self, max: usize) -> Self {
        self.config.max_suggestions = max;
        self
    }

    /// Replace the suggestion keyword set.
    pub fn suggestion_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.suggestion_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Set the fallback context string.
    pub fn fallback_context(mut self, fallback: impl Into<String>) -> Self {
        self.config.fallback_context = fallback.into();
        self
    }

    /// Set or clear the context header.
    pub fn context_header(mut self, header: Option<String>) -> Self {
        self.config.context_header = header;
        self
    }

    /// Set the vector store collection name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Set the per-call time budget for embedding and store operations.
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.config.operation_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] under the conditions listed on
    /// [`RagConfig::validate()`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
