//! Knowledge system type definitions.

use crate::embeddings::EmbeddingConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Smallest citable passage of the source document.
///
/// Produced only by the segmenter. `citation` is unique within one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUnit {
    pub text: String,
    pub citation: String,
}

impl DocumentUnit {
    pub fn new(text: impl Into<String>, citation: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citation: citation.into(),
        }
    }

    /// Text handed to the embedding model: the locator, then the body.
    pub fn embedding_text(&self) -> String {
        format!("{}\n{}", self.citation, self.text)
    }
}

/// A unit stored in the vector index together with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedEntry {
    /// Running sequence number of the unit in segmentation order
    pub id: u64,
    pub vector: Vec<f32>,
    pub unit: DocumentUnit,
}

/// A retrieved unit and its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredUnit {
    pub id: u64,
    pub unit: DocumentUnit,
    pub score: f32,
}

/// Units returned for one query, by descending similarity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub units: Vec<ScoredUnit>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Citations in retrieval order.
    pub fn citations(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.unit.citation.as_str()).collect()
    }

    pub fn top_score(&self) -> Option<f32> {
        self.units.first().map(|u| u.score)
    }
}

/// Metadata stamped into an index when it is built.
///
/// Queries are refused when the configured embedding model differs from the
/// one recorded here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub index_name: String,
    pub embedding: EmbeddingConfig,
    pub unit_count: u64,
    /// SHA-256 of the raw source text, hex encoded
    pub document_sha256: String,
    pub built_at: DateTime<Utc>,
}

/// Outcome of an index build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStats {
    pub index_name: String,
    pub units_indexed: u64,
    /// Chapters dropped because they contained no article marker
    pub segmentation_gaps: u32,
    pub embedding_model: String,
    pub duration_secs: f64,
}

/// Statistics for an existing index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub index_name: String,
    pub entry_count: u64,
    pub db_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<IndexManifest>,
}
