//! Error types for the `serene-rag` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in the retrieval-augmented context pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// A single source failed to load or chunk. The batch it belongs to continues.
    #[error("Ingestion error ({source_id}): {message}")]
    Ingestion {
        /// Identifier of the failing source (usually a path).
        source_id: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector store rejected or failed an upsert. Nothing from the batch was written.
    #[error("Index write error ({backend}): {message}")]
    IndexWrite {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A similarity query against the vector store failed.
    #[error("Index query error ({backend}): {message}")]
    IndexQuery {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An embedding or store call exceeded its time budget.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// The operation that timed out.
        operation: &'static str,
        /// The budget that was exceeded.
        after: Duration,
    },

    /// A configuration validation error. Fatal at start-up.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
