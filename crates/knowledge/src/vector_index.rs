//! Vector index abstraction.
//!
//! Defines a trait for provider-agnostic vector storage and retrieval.

use crate::types::{IndexManifest, IndexedEntry, ScoredUnit};
use charter_core::AppResult;

/// Trait for vector index backends.
///
/// Methods take `&self` so one index can be shared (behind an `Arc`) by the
/// build path and every query session; backends synchronize internally.
pub trait VectorIndex: Send + Sync {
    /// Insert or update a single entry, keyed by its id.
    fn upsert(&self, entry: &IndexedEntry) -> AppResult<()>;

    /// Atomically replace all entries and the manifest.
    ///
    /// Either every entry and the manifest are written, or the index is left
    /// exactly as it was.
    fn replace_all(&self, entries: &[IndexedEntry], manifest: &IndexManifest) -> AppResult<()>;

    /// Top-k entries by descending cosine similarity to `query_embedding`.
    fn query(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<ScoredUnit>>;

    /// Number of stored entries.
    fn count(&self) -> AppResult<u64>;

    /// Remove all entries and the manifest.
    fn reset(&self) -> AppResult<()>;

    /// Manifest written by the last successful build, if any.
    fn manifest(&self) -> AppResult<Option<IndexManifest>>;
}
