//! Retrieval-augmented context pipeline for the Serene support assistant.
//!
//! This crate provides:
//! - Recursive, overlap-preserving document chunking
//! - Embedding providers (offline hashing embedder, OpenAI behind `openai`)
//! - Text, markdown, PDF (`pdf`) and DOCX (`docx`) document loaders
//! - In-memory and SQLite vector stores behind the [`VectorStore`] trait
//! - A [`VectorIndex`] handle, an [`IngestionPipeline`], and a [`Retriever`]
//!   that filters by relevance and assembles grounding context

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod inmemory;
pub mod loader;
pub mod pipeline;
pub mod retriever;
pub mod seed;
pub mod sqlite;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{Chunker, RecursiveChunker, split};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, IndexedEntry, Metadata, RetrievedChunk, ScoredEntry};
pub use embedding::{EmbeddingProvider, HashingEmbedder};
pub use error::{RagError, Result};
pub use index::{IndexHit, IndexOptions, VectorIndex};
pub use inmemory::InMemoryVectorStore;
pub use loader::{DocumentLoader, LoaderSet, TextFileLoader, discover_files};
#[cfg(feature = "docx")]
pub use loader::DocxLoader;
#[cfg(feature = "pdf")]
pub use loader::PdfLoader;
pub use pipeline::{IngestResult, IngestionPipeline, IngestionPipelineBuilder};
pub use retriever::Retriever;
pub use seed::seed_documents;
pub use sqlite::SqliteVectorStore;
pub use vectorstore::VectorStore;
