//! SQLite vector store backend.
//!
//! Provides [`SqliteVectorStore`], a durable [`VectorStore`] in a single file,
//! using [sqlx](https://docs.rs/sqlx). Embeddings are stored as little-endian
//! `f32` blobs and searched by brute-force cosine distance, which is plenty for
//! a knowledge base of a few thousand chunks.
//!
//! Every upsert runs in one transaction, so a failing batch leaves no rows behind.
//!
//! # Example
//!
//! ```rust,ignore
//! use serene_rag::SqliteVectorStore;
//!
//! let store = SqliteVectorStore::open("./serene_db/index.sqlite").await?;
//! store.create_collection("mental_health_knowledge", 1024).await?;
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::document::{IndexedEntry, Metadata, ScoredEntry};
use crate::embedding::cosine_distance;
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, rank};

const BACKEND: &str = "sqlite";

/// A [`VectorStore`] persisted in a SQLite database file.
///
/// Tables:
/// - `collections(name, dimensions)`
/// - `entries(collection, id, text, metadata, embedding, updated_at)`, keyed by `(collection, id)`
pub struct SqliteVectorStore {
    pool: SqlitePool,
    path: Option<PathBuf>,
}

impl SqliteVectorStore {
    /// Open (creating if missing) the database file at `path`.
    ///
    /// Parent directories are created as needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| RagError::IndexWrite {
                backend: BACKEND.to_string(),
                message: format!("failed to create '{}': {e}", parent.display()),
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(Self::write_err)?;

        let store = Self { pool, path: Some(path) };
        store.init_schema().await?;
        debug!(path = ?store.path, "opened sqlite vector store");
        Ok(store)
    }

    /// Open a private in-memory database, discarded on [`close`](VectorStore::close).
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().in_memory(true);
        // One long-lived connection: every in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(Self::write_err)?;

        let store = Self { pool, path: None };
        store.init_schema().await?;
        Ok(store)
    }

    /// Location of the database file, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                dimensions INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(Self::write_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS entries (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                text TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (collection, id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(Self::write_err)?;

        Ok(())
    }

    fn write_err(e: sqlx::Error) -> RagError {
        RagError::IndexWrite { backend: BACKEND.to_string(), message: e.to_string() }
    }

    fn query_err(e: sqlx::Error) -> RagError {
        RagError::IndexQuery { backend: BACKEND.to_string(), message: e.to_string() }
    }

    async fn dimensions_of(
        &self,
        collection: &str,
    ) -> std::result::Result<Option<usize>, sqlx::Error> {
        let row = sqlx::query("SELECT dimensions FROM collections WHERE name = ?1")
            .bind(collection)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.try_get::<i64, _>("dimensions").map(|d| d as usize)).transpose()
    }

    fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn row_to_entry(row: &SqliteRow) -> Result<IndexedEntry> {
        let id: String = row.try_get("id").map_err(Self::query_err)?;
        let text: String = row.try_get("text").map_err(Self::query_err)?;
        let metadata_json: String = row.try_get("metadata").map_err(Self::query_err)?;
        let blob: Vec<u8> = row.try_get("embedding").map_err(Self::query_err)?;
        let metadata: Metadata =
            serde_json::from_str(&metadata_json).map_err(|e| RagError::IndexQuery {
                backend: BACKEND.to_string(),
                message: format!("corrupt metadata for entry '{id}': {e}"),
            })?;
        Ok(IndexedEntry { id, text, metadata, embedding: Self::decode_embedding(&blob) })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO collections (name, dimensions) VALUES (?1, ?2)")
            .bind(name)
            .bind(dimensions as i64)
            .execute(&self.pool)
            .await
            .map_err(Self::write_err)?;
        debug!(collection = name, dimensions, "ensured sqlite collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Self::write_err)?;
        sqlx::query("DELETE FROM entries WHERE collection = ?1")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(Self::write_err)?;
        sqlx::query("DELETE FROM collections WHERE name = ?1")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(Self::write_err)?;
        tx.commit().await.map_err(Self::write_err)?;
        debug!(collection = name, "deleted sqlite collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, entries: &[IndexedEntry]) -> Result<()> {
        let dimensions = self
            .dimensions_of(collection)
            .await
            .map_err(Self::write_err)?
            .ok_or_else(|| RagError::IndexWrite {
                backend: BACKEND.to_string(),
                message: format!("collection '{collection}' does not exist"),
            })?;

        // Dropping the transaction on any early return rolls the batch back.
        let mut tx = self.pool.begin().await.map_err(Self::write_err)?;

        for entry in entries {
            if entry.embedding.len() != dimensions {
                return Err(RagError::IndexWrite {
                    backend: BACKEND.to_string(),
                    message: format!(
                        "entry '{}' has {} dimensions, collection '{collection}' expects {dimensions}",
                        entry.id,
                        entry.embedding.len()
                    ),
                });
            }
            let metadata = serde_json::to_string(&entry.metadata).map_err(|e| {
                RagError::IndexWrite { backend: BACKEND.to_string(), message: e.to_string() }
            })?;

            sqlx::query(
                "INSERT INTO entries (collection, id, text, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (collection, id) DO UPDATE SET
                    text = excluded.text,
                    metadata = excluded.metadata,
                    embedding = excluded.embedding,
                    updated_at = STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')",
            )
            .bind(collection)
            .bind(&entry.id)
            .bind(&entry.text)
            .bind(&metadata)
            .bind(Self::encode_embedding(&entry.embedding))
            .execute(&mut *tx)
            .await
            .map_err(Self::write_err)?;
        }

        tx.commit().await.map_err(Self::write_err)?;
        debug!(collection, count = entries.len(), "upserted entries to sqlite");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredEntry>> {
        if self.dimensions_of(collection).await.map_err(Self::query_err)?.is_none() {
            return Err(RagError::IndexQuery {
                backend: BACKEND.to_string(),
                message: format!("collection '{collection}' does not exist"),
            });
        }

        let rows = sqlx::query(
            "SELECT id, text, metadata, embedding FROM entries WHERE collection = ?1",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::query_err)?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let entry = Self::row_to_entry(row)?;
            let distance = cosine_distance(&entry.embedding, embedding);
            scored.push(ScoredEntry { entry, distance });
        }

        Ok(rank(scored, top_k))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM entries WHERE collection = ?1")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .map_err(Self::query_err)?;
        let n: i64 = row.try_get("n").map_err(Self::query_err)?;
        Ok(n as usize)
    }

    async fn close(&self) {
        self.pool.close().await;
        debug!(path = ?self.path, "closed sqlite vector store");
    }
}
