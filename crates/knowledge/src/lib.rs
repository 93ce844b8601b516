//! Retrieval-augmented question answering over a constitution.
//!
//! The offline path segments the document into citable units, embeds them
//! and stores them in a SQLite vector index stamped with the embedding model.
//! The online path is a [`rag::RagPipeline`]: contextualize the question
//! against the session history, retrieve the top-k units, generate a grounded
//! answer, and cite the units that were used.

pub mod config;
pub mod embeddings;
pub mod history;
pub mod index;
pub mod indexer;
pub mod profile;
pub mod progress;
pub mod rag;
pub mod retriever;
pub mod segment;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use history::{HistoryBuffer, Role, TokenCounter, Turn};
pub use index::SqliteIndex;
pub use indexer::Indexer;
pub use profile::Profile;
pub use progress::{BuildPhase, ProgressEvent, ProgressReporter};
pub use rag::{AnswerGenerator, AnswerRecord, QueryContextualizer, RagPipeline, RetryPolicy, Session};
pub use retriever::Retriever;
pub use segment::{Segmentation, SegmentationGap, Segmenter};
pub use types::{BuildStats, DocumentUnit, IndexManifest, IndexStats, RetrievalResult, ScoredUnit};
pub use vector_index::VectorIndex;

use charter_core::{AppConfig, AppError, AppResult};
use charter_llm::create_client;
use charter_prompt::resolve_prompt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Build (or rebuild) the configured index from the source document.
///
/// `source` overrides the configured document path.
pub async fn build(
    app: &AppConfig,
    source: Option<&Path>,
    progress: ProgressReporter,
) -> AppResult<BuildStats> {
    let source = source
        .map(Path::to_path_buf)
        .unwrap_or_else(|| app.source_path());
    let index_name = &app.rag.index_name;

    tracing::info!("Building index '{}' from {:?}", index_name, source);

    // Read the whole source before the index file is created.
    let raw = indexer::read_source(&source).await?;

    let profile = Profile::from_settings(&app.rag)?;
    let segmenter = Segmenter::new(&profile)?;
    let embedding = EmbeddingConfig::from(&app.embedding);
    let embedder = create_provider(&embedding).await?;
    let index = Arc::new(SqliteIndex::open(&config::get_index_path(
        &app.workspace,
        index_name,
    ))?);

    Indexer::new(index_name.clone(), index, embedder)
        .with_batch_size(embedding.batch_size)
        .with_progress(progress)
        .build_from_text(&raw, &source.display().to_string(), &segmenter)
        .await
}

/// Statistics for the configured index.
pub fn stats(app: &AppConfig) -> AppResult<IndexStats> {
    let index_name = &app.rag.index_name;
    let index_path = existing_index_path(app)?;

    let index = SqliteIndex::open(&index_path)?;
    let entry_count = index.count()?;
    let manifest = index.manifest()?;
    let db_size_bytes = std::fs::metadata(&index_path).map(|m| m.len()).unwrap_or(0);

    Ok(IndexStats {
        index_name: index_name.clone(),
        entry_count,
        db_size_bytes,
        manifest,
    })
}

/// Wire a pipeline from configuration: chat client, prompts, embedder and
/// the built index.
pub async fn open_pipeline(app: &AppConfig) -> AppResult<RagPipeline> {
    let index_path = existing_index_path(app)?;
    let profile = Profile::from_settings(&app.rag)?;

    let embedder = create_provider(&EmbeddingConfig::from(&app.embedding)).await?;
    let index = Arc::new(SqliteIndex::open(&index_path)?);
    let retriever = Arc::new(Retriever::open(index, embedder)?);

    let endpoint = app.resolve_endpoint(&app.provider);
    let api_key = app.resolve_api_key(&app.provider);
    let timeout = Duration::from_secs(app.resolve_timeout_secs(&app.provider));
    let client = create_client(
        &app.provider,
        endpoint.as_deref(),
        api_key.as_deref(),
        Some(timeout),
    )
    .map_err(|e| AppError::Config(format!("Failed to create LLM client: {}", e)))?;

    let contextualize_prompt = resolve_prompt(&app.workspace, &profile.contextualize_prompt)?;
    let answer_prompt = resolve_prompt(&app.workspace, &profile.answer_prompt)?;

    tracing::debug!(
        provider = %app.provider,
        model = %app.model,
        profile = %profile.name,
        "Opening RAG pipeline"
    );

    RagPipeline::builder()
        .contextualizer(QueryContextualizer::from_prompt(
            client.clone(),
            &app.model,
            &contextualize_prompt,
        )?)
        .retriever(retriever)
        .generator(AnswerGenerator::new(
            client,
            &app.model,
            answer_prompt,
            profile.sentinel.clone(),
        ))
        .top_k(app.rag.top_k)
        .retry(RetryPolicy::from(&app.rag.retry))
        .no_sources(profile.no_sources.clone())
        .history(app.rag.history.clone())
        .build()
}

fn existing_index_path(app: &AppConfig) -> AppResult<std::path::PathBuf> {
    let index_path = config::get_index_path(&app.workspace, &app.rag.index_name);
    if !index_path.exists() {
        return Err(AppError::Knowledge(format!(
            "Index '{}' does not exist. Run `charter index build` first.",
            app.rag.index_name
        )));
    }
    Ok(index_path)
}
