//! Operator command line for the Serene knowledge base.

pub mod settings;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serene_guardrail::{SafetyGate, SafetyVerdict};
use serene_rag::{
    EmbeddingProvider, HashingEmbedder, IndexOptions, InMemoryVectorStore, IngestResult,
    IngestionPipeline, RecursiveChunker, Retriever, SqliteVectorStore, VectorIndex, VectorStore,
};
use tracing::info;

use crate::settings::{EmbeddingBackend, Settings, StoreBackend};

/// Serene knowledge-base tools
#[derive(Parser, Debug)]
#[command(name = "serene", version, about = "Seed, ingest, and inspect the Serene knowledge base", long_about = None)]
pub struct Cli {
    /// Settings file (YAML). Defaults to ./serene.yaml when present.
    #[arg(long, global = true, env = "SERENE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the built-in starter documents
    Seed {
        /// Empty the collection first
        #[arg(long)]
        reset: bool,
    },

    /// Ingest text, markdown, PDF, or DOCX files and directories
    ///
    /// PDF and DOCX need the `pdf` and `docx` features.
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Print the grounding context retrieved for a message
    Context {
        message: String,
        /// Also list every retrieved chunk with its relevance
        #[arg(long)]
        scores: bool,
    },

    /// Print suggestions extracted for a message
    Suggest { message: String },

    /// Run the safety gate on a message
    Check {
        message: String,
        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show index statistics
    Stats,
}

/// Execute a parsed command against resolved settings.
pub async fn execute(cli: Cli, settings: Settings) -> Result<()> {
    match cli.command {
        Commands::Seed { reset } => {
            let index = open_index(&settings).await?;
            if reset {
                index.clear().await?;
            }
            let result = pipeline(&settings, index.clone())?.seed().await?;
            report(&result);
            index.close().await;
        }
        Commands::Ingest { paths } => {
            let index = open_index(&settings).await?;
            let pipeline = pipeline(&settings, index.clone())?;
            let mut total = IngestResult::default();
            let (dirs, files): (Vec<PathBuf>, Vec<PathBuf>) =
                paths.into_iter().partition(|p| p.is_dir());

            for dir in dirs {
                merge(&mut total, pipeline.ingest_directory(&dir).await?);
            }
            if !files.is_empty() {
                merge(&mut total, pipeline.ingest_files(&files).await?);
            }
            report(&total);
            index.close().await;
        }
        Commands::Context { message, scores } => {
            let index = open_index(&settings).await?;
            let retriever = Retriever::new(index.clone(), settings.rag.clone());
            if scores {
                for chunk in retriever.retrieve(&message, settings.rag.retrieval_k_context).await {
                    let source = chunk.metadata.get("source").map(String::as_str).unwrap_or("-");
                    println!("[{:.3}] {source}: {}", chunk.relevance_score, first_line(&chunk.content));
                }
                println!();
            }
            println!("{}", retriever.context_for(&message).await);
            index.close().await;
        }
        Commands::Suggest { message } => {
            let index = open_index(&settings).await?;
            let suggestions = Retriever::new(index.clone(), settings.rag.clone())
                .suggestions_for(&message)
                .await;
            if suggestions.is_empty() {
                println!("No suggestions.");
            }
            for (i, suggestion) in suggestions.iter().enumerate() {
                println!("{}. {suggestion}", i + 1);
            }
            index.close().await;
        }
        Commands::Check { message, json } => {
            let gate = SafetyGate::new(settings.safety.clone())?;
            let verdict = gate.assess(&message);
            if json {
                println!("{}", serde_json::to_string_pretty(&verdict)?);
            } else {
                match verdict {
                    SafetyVerdict::Clear => println!("clear"),
                    SafetyVerdict::Emergency { matched, .. } => {
                        println!("emergency (matched: {})\n", matched.join(", "));
                        println!("{}", gate.emergency_message());
                    }
                }
            }
        }
        Commands::Stats => {
            let index = open_index(&settings).await?;
            println!("collection: {}", index.collection());
            println!("entries:    {}", index.count().await?);
            match settings.store.backend {
                StoreBackend::Sqlite => println!("store:      {}", settings.store.path.display()),
                StoreBackend::Memory => println!("store:      in-memory"),
            }
            println!("embedding:  {:?} ({} dims)", settings.embedding.provider, settings.embedding.dimensions);
            println!("keywords:   v{}", settings.safety.keyword_list_version);
            index.close().await;
        }
    }
    Ok(())
}

/// Open the vector index described by `settings`.
pub async fn open_index(settings: &Settings) -> Result<Arc<VectorIndex>> {
    let store: Arc<dyn VectorStore> = match settings.store.backend {
        StoreBackend::Sqlite => Arc::new(
            SqliteVectorStore::open(&settings.store.path)
                .await
                .with_context(|| format!("failed to open index at '{}'", settings.store.path.display()))?,
        ),
        StoreBackend::Memory => Arc::new(InMemoryVectorStore::new()),
    };
    let index = VectorIndex::open(store, embedder(settings)?, IndexOptions::from(&settings.rag)).await?;
    info!(collection = index.collection(), "index ready");
    Ok(Arc::new(index))
}

fn embedder(settings: &Settings) -> Result<Arc<dyn EmbeddingProvider>> {
    match settings.embedding.provider {
        EmbeddingBackend::Hashing => Ok(Arc::new(HashingEmbedder::new(settings.embedding.dimensions))),
        #[cfg(feature = "openai")]
        EmbeddingBackend::OpenAI => {
            let mut provider = serene_rag::openai::OpenAIEmbeddingProvider::from_env()?
                .with_dimensions(settings.embedding.dimensions);
            if let Some(model) = &settings.embedding.model {
                provider = provider.with_model(model);
            }
            if let Some(base_url) = &settings.embedding.base_url {
                provider = provider.with_base_url(base_url);
            }
            Ok(Arc::new(provider))
        }
        #[cfg(not(feature = "openai"))]
        EmbeddingBackend::OpenAI => anyhow::bail!("embedding.provider 'openai' requires the `openai` feature"),
    }
}

fn pipeline(settings: &Settings, index: Arc<VectorIndex>) -> Result<IngestionPipeline> {
    Ok(IngestionPipeline::builder()
        .index(index)
        .chunker(Arc::new(RecursiveChunker::from_config(&settings.rag)))
        .build()?)
}

fn merge(total: &mut IngestResult, next: IngestResult) {
    total.documents_seen += next.documents_seen;
    total.chunks_written += next.chunks_written;
    total.skipped.extend(next.skipped);
}

fn report(result: &IngestResult) {
    println!(
        "{} documents, {} chunks written, {} skipped",
        result.documents_seen,
        result.chunks_written,
        result.skipped.len()
    );
    for skipped in &result.skipped {
        println!("  skipped: {skipped}");
    }
}

fn first_line(text: &str) -> String {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or_default().trim();
    if line.chars().count() > 80 {
        format!("{}...", line.chars().take(77).collect::<String>())
    } else {
        line.to_string()
    }
}
