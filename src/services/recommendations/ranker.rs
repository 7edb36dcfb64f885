use std::cmp::Ordering;

use crate::models::BookId;

use super::{FeatureVector, RecommendError};

/// A candidate book together with its similarity to the anchor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
    pub book_id: BookId,
    pub score: f64,
}

/// Cosine of the angle between `a` and `b`
///
/// A zero-norm vector is treated as orthogonal to everything.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Result<f64, RecommendError> {
    if a.len() != b.len() {
        return Err(RecommendError::DimensionMismatch(a.len(), b.len()));
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (norm_a * norm_b))
}

/// Scores every candidate against the anchor and orders them by descending
/// similarity
///
/// The sort is stable: equal scores keep the order in which candidates were
/// supplied.
pub fn rank(
    anchor: &[f64],
    candidates: &[(BookId, FeatureVector)],
) -> Result<Vec<ScoredCandidate>, RecommendError> {
    let mut scored = candidates
        .iter()
        .map(|(book_id, vector)| {
            cosine_similarity(anchor, vector).map(|score| ScoredCandidate {
                book_id: *book_id,
                score,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    Ok(scored)
}

/// Picks up to `k` distinct book ids from an already ranked list
///
/// A book can appear in the corpus twice (once as a favorite, once from the
/// catalog); only its best-ranked occurrence counts.
pub fn top_k(ranked: &[ScoredCandidate], k: usize) -> Vec<BookId> {
    let mut selected: Vec<BookId> = Vec::with_capacity(k.min(ranked.len()));
    for candidate in ranked {
        if selected.len() == k {
            break;
        }
        if !selected.contains(&candidate.book_id) {
            selected.push(candidate.book_id);
        }
    }
    selected
}
