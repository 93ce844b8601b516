//! Ranking correctness of the SQLite vector index on disk.

use crate::index::SqliteIndex;
use crate::types::{DocumentUnit, IndexedEntry};
use crate::vector_index::VectorIndex;
use tempfile::NamedTempFile;

/// Helper to create an entry for a citation.
fn create_test_entry(id: u64, citation: &str, text: &str, vector: Vec<f32>) -> IndexedEntry {
    IndexedEntry {
        id,
        vector,
        unit: DocumentUnit::new(text, citation),
    }
}

/// Helper to create a normalized embedding.
fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

fn open_index(file: &NamedTempFile) -> SqliteIndex {
    SqliteIndex::open(file.path()).unwrap()
}

#[test]
fn test_relevant_query_returns_high_scores() {
    let temp_file = NamedTempFile::new().unwrap();
    let index = open_index(&temp_file);

    let press = create_test_entry(
        1,
        "Chapter II, Article 14",
        "Freedom of the press shall be ensured.",
        normalize(&[1.0, 0.5, 0.2, 0.1]),
    );
    let budget = create_test_entry(
        2,
        "Chapter X, Article 219",
        "The Sejm shall adopt the budget.",
        normalize(&[-0.3, -0.8, 0.4, -0.2]),
    );
    index.upsert(&press).unwrap();
    index.upsert(&budget).unwrap();

    let results = index
        .query(&normalize(&[0.9, 0.4, 0.3, 0.1]), 5)
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(
        results[0].unit.citation, "Chapter II, Article 14",
        "Most relevant unit should be first"
    );
    assert!(
        results[0].score > 0.8,
        "Relevant unit score should be high: {}",
        results[0].score
    );
    assert!(results[0].score > results[1].score, "Scores should be ordered");
}

#[test]
fn test_unrelated_query_returns_low_scores() {
    let temp_file = NamedTempFile::new().unwrap();
    let index = open_index(&temp_file);

    index
        .upsert(&create_test_entry(
            1,
            "Chapter I, Article 1",
            "The Republic is the common good of all its citizens.",
            normalize(&[1.0, 0.0, 0.0, 0.0]),
        ))
        .unwrap();

    let results = index
        .query(&normalize(&[0.0, 1.0, 0.0, 0.0]), 5)
        .unwrap();

    // Still returned, the index applies no score cutoff
    assert_eq!(results.len(), 1);
    assert!(
        results[0].score < 0.5,
        "Unrelated unit score should be low: {}",
        results[0].score
    );
}

#[test]
fn test_scores_are_ordered_descending() {
    let temp_file = NamedTempFile::new().unwrap();
    let index = open_index(&temp_file);

    let entries = vec![
        create_test_entry(0, "A", "Text A", normalize(&[1.0, 0.0, 0.0])),
        create_test_entry(1, "B", "Text B", normalize(&[0.7, 0.7, 0.0])),
        create_test_entry(2, "C", "Text C", normalize(&[0.0, 1.0, 0.0])),
        create_test_entry(3, "D", "Text D", normalize(&[-1.0, 0.0, 0.0])),
    ];
    for entry in &entries {
        index.upsert(entry).unwrap();
    }

    let results = index.query(&normalize(&[1.0, 0.0, 0.0]), 10).unwrap();

    for i in 1..results.len() {
        assert!(
            results[i - 1].score >= results[i].score,
            "Scores should be ordered: {} >= {}",
            results[i - 1].score,
            results[i].score
        );
    }
    assert_eq!(results[0].unit.citation, "A");
    assert!(results[0].score > 0.99, "Perfect match should have score near 1.0");
    assert_eq!(results[3].unit.citation, "D");
    assert!(results[3].score < -0.9, "Opposite vectors should be close to -1.0");
}

#[test]
fn test_equal_scores_keep_document_order() {
    let temp_file = NamedTempFile::new().unwrap();
    let index = open_index(&temp_file);

    for id in [3, 1, 2] {
        index
            .upsert(&create_test_entry(id, &format!("Unit {}", id), "same", vec![0.0, 1.0]))
            .unwrap();
    }

    let citations: Vec<String> = index
        .query(&[0.0, 1.0], 3)
        .unwrap()
        .into_iter()
        .map(|r| r.unit.citation)
        .collect();
    assert_eq!(citations, vec!["Unit 1", "Unit 2", "Unit 3"]);
}

#[test]
fn test_empty_index_returns_no_results() {
    let temp_file = NamedTempFile::new().unwrap();
    let index = open_index(&temp_file);

    let results = index.query(&normalize(&[1.0, 0.0, 0.0]), 5).unwrap();
    assert_eq!(results.len(), 0, "Empty index should return no results");
}

#[test]
fn test_top_k_limit_respected() {
    let temp_file = NamedTempFile::new().unwrap();
    let index = open_index(&temp_file);

    for i in 0..10 {
        index
            .upsert(&create_test_entry(
                i,
                &format!("Chapter I, Article {}", i + 1),
                &format!("Text {}", i),
                normalize(&[(i + 1) as f32 / 10.0, 0.1, 0.0]),
            ))
            .unwrap();
    }

    let results = index.query(&normalize(&[1.0, 0.0, 0.0]), 3).unwrap();
    assert_eq!(results.len(), 3, "Should return exactly top_k results");
    assert_eq!(results[0].unit.citation, "Chapter I, Article 10");
}
