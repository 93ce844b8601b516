//! Offline index build: embed every unit and replace the index contents.

use crate::embeddings::EmbeddingProvider;
use crate::progress::ProgressReporter;
use crate::segment::Segmenter;
use crate::types::{BuildStats, DocumentUnit, IndexManifest, IndexedEntry};
use crate::vector_index::VectorIndex;
use charter_core::{AppError, AppResult};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

pub struct Indexer {
    index_name: String,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    progress: ProgressReporter,
}

impl Indexer {
    pub fn new(
        index_name: impl Into<String>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            index,
            embedder,
            batch_size: 32,
            progress: ProgressReporter::noop(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Read, segment and index a source document.
    ///
    /// An unreadable document fails with `InputRead` before the index is touched.
    pub async fn build_from_file(&self, path: &Path, segmenter: &Segmenter) -> AppResult<BuildStats> {
        let raw = read_source(path).await?;
        self.build_from_text(&raw, &path.display().to_string(), segmenter)
            .await
    }

    /// Segment and index a document that was already read from `source`.
    pub async fn build_from_text(
        &self,
        raw: &str,
        source: &str,
        segmenter: &Segmenter,
    ) -> AppResult<BuildStats> {
        self.progress.read(raw.len() as u64, source);

        let segmentation = segmenter.segment_with_report(raw);
        let gaps = segmentation.gaps.len() as u32;
        self.progress
            .segment(segmentation.units.len() as u64, gaps);

        let mut stats = self
            .build_index(&segmentation.units, &document_digest(raw))
            .await?;
        stats.segmentation_gaps = gaps;
        Ok(stats)
    }

    /// Embed `units` and atomically replace the index contents with them.
    ///
    /// Entry ids are the units' positions, so rebuilding from the same units
    /// yields identical entries.
    #[tracing::instrument(skip(self, units, document_sha256), fields(index = %self.index_name, units = units.len()))]
    pub async fn build_index(
        &self,
        units: &[DocumentUnit],
        document_sha256: &str,
    ) -> AppResult<BuildStats> {
        let start = Instant::now();
        let model = self.embedder.model_name().to_string();
        let dimensions = self.embedder.dimensions();
        let total = units.len() as u64;

        let mut entries = Vec::with_capacity(units.len());
        for batch in units.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(DocumentUnit::embedding_text).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;

            if vectors.len() != batch.len() {
                return Err(AppError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }

            for (unit, vector) in batch.iter().zip(vectors) {
                if vector.len() != dimensions {
                    return Err(AppError::Embedding(format!(
                        "Embedding for '{}' has {} dimensions, expected {}",
                        unit.citation,
                        vector.len(),
                        dimensions
                    )));
                }
                entries.push(IndexedEntry {
                    id: entries.len() as u64,
                    vector,
                    unit: unit.clone(),
                });
            }

            self.progress.embed(entries.len() as u64, total, &model);
        }

        let manifest = IndexManifest {
            index_name: self.index_name.clone(),
            embedding: self.embedder.config(),
            unit_count: total,
            document_sha256: document_sha256.to_string(),
            built_at: Utc::now(),
        };

        self.index.replace_all(&entries, &manifest)?;
        self.progress.index(total);

        let duration_secs = start.elapsed().as_secs_f64();
        tracing::info!(
            "Indexed {} units into '{}' with {} in {:.2}s",
            total,
            self.index_name,
            manifest.embedding.identifier(),
            duration_secs
        );

        Ok(BuildStats {
            index_name: self.index_name.clone(),
            units_indexed: total,
            segmentation_gaps: 0,
            embedding_model: manifest.embedding.identifier(),
            duration_secs,
        })
    }
}

/// Read the whole source document as UTF-8.
///
/// Missing files, directories and undecodable bytes all map to `InputRead`.
pub async fn read_source(path: &Path) -> AppResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::InputRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

/// Hex-encoded SHA-256 of the source text.
pub fn document_digest(raw: &str) -> String {
    format!("{:x}", Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::index::SqliteIndex;
    use crate::profile::Profile;
    use crate::progress::{BuildPhase, ProgressEvent};
    use crate::segment::tests::sample_document;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn indexer(index: Arc<SqliteIndex>) -> Indexer {
        Indexer::new("constitution", index, Arc::new(TrigramProvider::new(64))).with_batch_size(2)
    }

    #[tokio::test]
    async fn test_build_index_writes_every_unit() {
        let index = Arc::new(SqliteIndex::open_in_memory().unwrap());
        let segmenter = Segmenter::new(&Profile::english()).unwrap();
        let units = segmenter.segment(&sample_document(&[2, 3]));

        let stats = indexer(index.clone()).build_index(&units, "digest").await.unwrap();

        assert_eq!(stats.units_indexed, 6);
        assert_eq!(index.count().unwrap(), 6);
        let manifest = index.manifest().unwrap().unwrap();
        assert_eq!(manifest.unit_count, 6);
        assert_eq!(manifest.embedding.identifier(), "trigram/trigram-v1@64");
        assert_eq!(stats.embedding_model, "trigram/trigram-v1@64");
    }

    #[tokio::test]
    async fn test_rebuild_is_idempotent() {
        let index = Arc::new(SqliteIndex::open_in_memory().unwrap());
        let units = Segmenter::new(&Profile::english())
            .unwrap()
            .segment(&sample_document(&[3]));
        let indexer = indexer(index.clone());

        indexer.build_index(&units, "digest").await.unwrap();
        let embedder = TrigramProvider::new(64);
        let query = embedder.embed("body of article number 2").await.unwrap();
        let first = index.query(&query, 10).unwrap();

        indexer.build_index(&units, "digest").await.unwrap();
        let second = index.query(&query, 10).unwrap();

        assert_eq!(index.count().unwrap(), units.len() as u64);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_build_from_missing_file_is_input_read_error() {
        let temp = TempDir::new().unwrap();
        let index = Arc::new(SqliteIndex::open_in_memory().unwrap());
        let segmenter = Segmenter::new(&Profile::english()).unwrap();

        let result = indexer(index.clone())
            .build_from_file(&temp.path().join("missing.txt"), &segmenter)
            .await;

        assert!(matches!(result, Err(AppError::InputRead { .. })));
        assert!(index.manifest().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_source_rejects_non_utf8_and_directories() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cp1250.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        assert!(matches!(read_source(&path).await, Err(AppError::InputRead { .. })));
        assert!(matches!(read_source(temp.path()).await, Err(AppError::InputRead { .. })));
    }

    #[tokio::test]
    async fn test_build_from_file_reports_progress_and_gaps() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("constitution.txt");
        let mut document = sample_document(&[2]);
        document.push_str("Chapter II\nFINAL PROVISIONS WITHOUT ARTICLES\n");
        std::fs::write(&path, &document).unwrap();

        let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let progress = ProgressReporter::new(Arc::new(move |e| sink.lock().unwrap().push(e)));

        let index = Arc::new(SqliteIndex::open_in_memory().unwrap());
        let segmenter = Segmenter::new(&Profile::english()).unwrap();
        let stats = indexer(index.clone())
            .with_progress(progress)
            .build_from_file(&path, &segmenter)
            .await
            .unwrap();

        assert_eq!(stats.units_indexed, 3);
        assert_eq!(stats.segmentation_gaps, 1);
        assert_eq!(
            index.manifest().unwrap().unwrap().document_sha256,
            document_digest(&document)
        );

        let phases: Vec<BuildPhase> = events.lock().unwrap().iter().map(|e| e.phase).collect();
        assert_eq!(phases.first(), Some(&BuildPhase::Read));
        assert!(phases.contains(&BuildPhase::Segment));
        assert!(phases.contains(&BuildPhase::Embed));
        assert_eq!(phases.last(), Some(&BuildPhase::Index));
    }

    #[test]
    fn test_document_digest_is_hex_sha256() {
        assert_eq!(
            document_digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
