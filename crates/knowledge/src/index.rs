//! SQLite-backed vector index.
//!
//! Vectors are stored as little-endian `f32` blobs and ranked by a full scan;
//! a constitution has a few hundred units, so no ANN structure is needed.

use crate::types::{DocumentUnit, IndexManifest, IndexedEntry, ScoredUnit};
use crate::vector_index::VectorIndex;
use charter_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const MANIFEST_KEY: &str = "manifest";

pub struct SqliteIndex {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteIndex {
    /// Open (creating if needed) the index database at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;
        init_schema(&conn)?;

        tracing::debug!("Opened SQLite index at {:?}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(db_path.to_path_buf()),
        })
    }

    /// Open a private in-memory index.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Knowledge(format!("Failed to open in-memory index: {}", e)))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Knowledge("Index connection lock poisoned".to_string()))
    }
}

fn init_schema(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY,
            citation TEXT NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))
}

fn insert_entry(conn: &Connection, entry: &IndexedEntry) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT OR REPLACE INTO entries (id, citation, text, embedding) VALUES (?1, ?2, ?3, ?4)",
        params![
            entry.id as i64,
            entry.unit.citation,
            entry.unit.text,
            embedding_to_bytes(&entry.vector),
        ],
    )
}

impl VectorIndex for SqliteIndex {
    fn upsert(&self, entry: &IndexedEntry) -> AppResult<()> {
        let conn = self.lock()?;
        insert_entry(&conn, entry)
            .map_err(|e| AppError::Knowledge(format!("Failed to insert entry: {}", e)))?;
        Ok(())
    }

    fn replace_all(&self, entries: &[IndexedEntry], manifest: &IndexManifest) -> AppResult<()> {
        let manifest_json = serde_json::to_string(manifest)?;
        let mut conn = self.lock()?;

        let tx = conn
            .transaction()
            .map_err(|e| AppError::Knowledge(format!("Failed to begin transaction: {}", e)))?;

        tx.execute("DELETE FROM entries", [])
            .map_err(|e| AppError::Knowledge(format!("Failed to delete entries: {}", e)))?;

        for entry in entries {
            insert_entry(&tx, entry).map_err(|e| {
                AppError::Knowledge(format!("Failed to insert entry {}: {}", entry.id, e))
            })?;
        }

        tx.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![MANIFEST_KEY, manifest_json],
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to write manifest: {}", e)))?;

        // Dropping the transaction without commit rolls it back.
        tx.commit()
            .map_err(|e| AppError::Knowledge(format!("Failed to commit index: {}", e)))?;

        tracing::debug!(entries = entries.len(), "Replaced index contents");
        Ok(())
    }

    fn query(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<ScoredUnit>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, citation, text, embedding FROM entries")
            .map_err(|e| AppError::Retrieval(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })
            .map_err(|e| AppError::Retrieval(format!("Failed to query entries: {}", e)))?;

        let mut results = Vec::new();
        for row in rows {
            let (id, citation, text, blob) =
                row.map_err(|e| AppError::Retrieval(format!("Failed to read entry: {}", e)))?;
            let vector = bytes_to_embedding(&blob)?;
            results.push(ScoredUnit {
                id: id as u64,
                unit: DocumentUnit { text, citation },
                score: cosine_similarity(query_embedding, &vector),
            });
        }

        // Highest score first; equal scores keep document order.
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        results.truncate(top_k);

        tracing::debug!(
            "Retrieved {} entries (requested top-{})",
            results.len(),
            top_k
        );

        Ok(results)
    }

    fn count(&self) -> AppResult<u64> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM entries", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u64)
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to count entries: {}", e)))
    }

    fn reset(&self) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM entries; DELETE FROM meta;")
            .map_err(|e| AppError::Knowledge(format!("Failed to reset index: {}", e)))?;

        tracing::info!("Reset vector index");
        Ok(())
    }

    fn manifest(&self) -> AppResult<Option<IndexManifest>> {
        let conn = self.lock()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![MANIFEST_KEY],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::Knowledge(format!("Failed to read manifest: {}", e)))?;

        value
            .map(|json| serde_json::from_str(&json).map_err(AppError::from))
            .transpose()
    }
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Retrieval(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
