//! Top-K ranking of chunks by cosine similarity to a query embedding.
//!
//! Ranking is a linear scan: every candidate is scored, the scores are sorted
//! in descending order, and the first `k` are kept. Candidates whose embedding
//! is missing, malformed, or of a different dimension than the query are
//! skipped. Equal scores keep their input order.
//!
//! # Example
//!
//! ```rust
//! use datakit_rag::{Chunk, rank};
//!
//! let chunks = vec![
//!     Chunk::new("east", Some(vec![1.0, 0.0])),
//!     Chunk::new("north", Some(vec![0.0, 1.0])),
//!     Chunk::new("mostly east", Some(vec![0.9, 0.1])),
//! ];
//! let results = rank(&[1.0, 0.0], &chunks, 2).unwrap();
//! assert_eq!(results[0].chunk_content, "east");
//! assert_eq!(results[1].chunk_content, "mostly east");
//! ```

use tracing::debug;

use crate::document::{Chunk, Dataset, ScoredResult};
use crate::error::{RagError, Result};
use crate::similarity::{cosine_similarity, is_well_formed};

/// Score `candidates` against `query_embedding` and return the `k` best.
///
/// The result holds `min(k, scorable candidates)` entries ordered by
/// non-increasing similarity. An empty or malformed query embedding yields an
/// empty result.
///
/// # Errors
///
/// Returns [`RagError::InvalidTopK`] if `k` is zero.
pub fn rank<'a, I>(query_embedding: &[f32], candidates: I, k: usize) -> Result<Vec<ScoredResult>>
where
    I: IntoIterator<Item = &'a Chunk>,
{
    if k == 0 {
        return Err(RagError::InvalidTopK(k));
    }
    if !is_well_formed(query_embedding) {
        debug!(dimensions = query_embedding.len(), "query embedding is unusable");
        return Ok(Vec::new());
    }

    let mut skipped = 0usize;
    let mut scored: Vec<(f32, &Chunk)> = Vec::new();
    for chunk in candidates {
        match score(query_embedding, chunk) {
            Some(similarity) => scored.push((similarity, chunk)),
            None => skipped += 1,
        }
    }

    // `sort_by` is stable, so ties stay in input order.
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    let candidate_count = scored.len();
    scored.truncate(k);

    debug!(candidate_count, skipped, returned = scored.len(), "ranked candidates");

    Ok(scored
        .into_iter()
        .map(|(similarity, chunk)| ScoredResult::from_chunk(chunk, similarity))
        .collect())
}

/// Like [`rank`], then drop results whose similarity is below `min_similarity`.
///
/// The threshold is applied after truncation, so fewer than `k` results may
/// be returned even if more candidates would pass it.
///
/// # Errors
///
/// Returns [`RagError::InvalidTopK`] if `k` is zero.
pub fn rank_with_threshold<'a, I>(
    query_embedding: &[f32],
    candidates: I,
    k: usize,
    min_similarity: Option<f32>,
) -> Result<Vec<ScoredResult>>
where
    I: IntoIterator<Item = &'a Chunk>,
{
    let mut results = rank(query_embedding, candidates, k)?;
    if let Some(threshold) = min_similarity {
        results.retain(|r| r.similarity >= threshold);
    }
    Ok(results)
}

/// Rank every chunk of every document in `dataset`.
///
/// # Errors
///
/// Returns [`RagError::InvalidTopK`] if `k` is zero.
pub fn rank_dataset(
    query_embedding: &[f32],
    dataset: &Dataset,
    k: usize,
) -> Result<Vec<ScoredResult>> {
    rank(query_embedding, dataset.chunks(), k)
}

fn score(query_embedding: &[f32], chunk: &Chunk) -> Option<f32> {
    let Some(embedding) = chunk.embedding.as_deref() else {
        debug!(document.id = %chunk.document_id, "skipping chunk without embedding");
        return None;
    };
    if !is_well_formed(embedding) {
        debug!(document.id = %chunk.document_id, "skipping chunk with malformed embedding");
        return None;
    }
    let similarity = cosine_similarity(query_embedding, embedding);
    if similarity.is_none() {
        debug!(
            document.id = %chunk.document_id,
            expected = query_embedding.len(),
            actual = embedding.len(),
            "skipping chunk with mismatched dimensions"
        );
    }
    similarity
}
