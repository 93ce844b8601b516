//! Query-time retrieval over a built index.

use crate::embeddings::EmbeddingProvider;
use crate::types::{IndexManifest, RetrievalResult};
use crate::vector_index::VectorIndex;
use charter_core::{AppError, AppResult};
use std::sync::Arc;

/// Embeds queries and ranks index entries by cosine similarity.
///
/// Shared read-only between sessions. Construction fails unless the index
/// was built with the same embedding model the provider implements.
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    manifest: IndexManifest,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("index", &self.manifest.index_name)
            .field("embedding", &self.manifest.embedding.identifier())
            .finish()
    }
}

impl Retriever {
    pub fn open(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> AppResult<Self> {
        let manifest = index.manifest()?.ok_or_else(|| {
            AppError::IndexMismatch(
                "Index has not been built yet; run `charter index build` first".to_string(),
            )
        })?;

        manifest
            .embedding
            .validate_consistency(&embedder.config())?;

        tracing::debug!(
            index = %manifest.index_name,
            units = manifest.unit_count,
            embedding = %manifest.embedding.identifier(),
            "Opened retriever"
        );

        Ok(Self {
            index,
            embedder,
            manifest,
        })
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// Top-`k` units for `query`. A blank query or an empty index yields an
    /// empty result rather than an error.
    #[tracing::instrument(skip(self, query))]
    pub async fn retrieve(&self, query: &str, k: usize) -> AppResult<RetrievalResult> {
        if query.trim().is_empty() || k == 0 {
            tracing::debug!("Blank query, skipping retrieval");
            return Ok(RetrievalResult::default());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let result = RetrievalResult {
            units: self.index.query(&query_embedding, k)?,
        };

        match result.top_score() {
            None => tracing::warn!("No units retrieved; index '{}' is empty", self.manifest.index_name),
            Some(top) => tracing::debug!(
                citations = ?result.citations(),
                "Retrieved {} units (top score: {:.3})",
                result.len(),
                top
            ),
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::index::SqliteIndex;
    use crate::indexer::Indexer;
    use crate::types::DocumentUnit;

    async fn built_index(units: &[DocumentUnit]) -> Arc<SqliteIndex> {
        let index = Arc::new(SqliteIndex::open_in_memory().unwrap());
        Indexer::new("constitution", index.clone(), Arc::new(TrigramProvider::new(256)))
            .build_index(units, "digest")
            .await
            .unwrap();
        index
    }

    fn units() -> Vec<DocumentUnit> {
        vec![
            DocumentUnit::new("We the people.", "Introduction and preamble"),
            DocumentUnit::new(
                "Freedom of the press and other means of social communication shall be ensured.",
                "Chapter I, Article 14",
            ),
            DocumentUnit::new(
                "The Sejm shall consist of 460 deputies.",
                "Chapter IV, Article 96",
            ),
            DocumentUnit::new(
                "Everyone shall have the right to protection of health.",
                "Chapter II, Article 68",
            ),
        ]
    }

    #[tokio::test]
    async fn test_retrieve_ranks_relevant_unit_first() {
        let index = built_index(&units()).await;
        let retriever = Retriever::open(index, Arc::new(TrigramProvider::new(256))).unwrap();

        let result = retriever.retrieve("freedom of the press", 2).await.unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.units[0].unit.citation, "Chapter I, Article 14");
        assert!(result.units[0].score >= result.units[1].score);
    }

    #[tokio::test]
    async fn test_blank_query_is_empty_result() {
        let index = built_index(&units()).await;
        let retriever = Retriever::open(index, Arc::new(TrigramProvider::new(256))).unwrap();
        assert!(retriever.retrieve("   ", 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_index_is_empty_result() {
        let index = built_index(&[]).await;
        let retriever = Retriever::open(index, Arc::new(TrigramProvider::new(256))).unwrap();
        assert!(retriever.retrieve("health", 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fewer_than_k_only_when_index_is_small() {
        let index = built_index(&units()[..1]).await;
        let retriever = Retriever::open(index, Arc::new(TrigramProvider::new(256))).unwrap();
        assert_eq!(retriever.retrieve("people", 2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unbuilt_index_is_refused() {
        let index = Arc::new(SqliteIndex::open_in_memory().unwrap());
        let result = Retriever::open(index, Arc::new(TrigramProvider::new(256)));
        assert!(matches!(result, Err(AppError::IndexMismatch(_))));
    }

    #[tokio::test]
    async fn test_embedding_mismatch_is_refused() {
        let index = built_index(&units()).await;
        let result = Retriever::open(index, Arc::new(TrigramProvider::new(128)));
        let err = result.unwrap_err();
        assert!(matches!(err, AppError::IndexMismatch(_)));
        assert!(err.to_string().contains("Dimension mismatch"));
    }
}
