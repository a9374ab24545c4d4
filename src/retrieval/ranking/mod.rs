
use std::cmp::Ordering;
use std::sync::Arc;

use itertools::Itertools;

use crate::cache::Document;

/// A document paired with its similarity to the query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: Arc<Document>,
    pub score: f32,
}

/// Cosine similarity of two vectors.
///
/// Returns 0 when the lengths differ or either vector has zero magnitude.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold(
        (0.0_f64, 0.0_f64, 0.0_f64),
        |(dot, norm_a, norm_b), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (dot + x * y, norm_a + x * x, norm_b + y * y)
        },
    );

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if similarity.is_finite() {
        similarity as f32
    } else {
        0.0
    }
}

/// Keep the `k` documents most similar to `query`, best first.
///
/// Equal scores are ordered by path so the result does not depend on the
/// order documents were supplied in.
#[inline]
pub fn rank_documents<I>(query: &[f32], documents: I, k: usize) -> Vec<ScoredDocument>
where
    I: IntoIterator<Item = Arc<Document>>,
{
    documents
        .into_iter()
        .map(|document| ScoredDocument {
            score: cosine_similarity(query, &document.embedding),
            document,
        })
        .k_largest_by(k, compare_scored)
        .collect()
}

/// Higher score wins; among equal scores the lexically smaller path wins
fn compare_scored(a: &ScoredDocument, b: &ScoredDocument) -> Ordering {
    a.score
        .total_cmp(&b.score)
        .then_with(|| b.document.path.cmp(&a.document.path))
}
