//! Adaptive-lambda maximal marginal relevance reranking.

use super::similarity::cosine_similarity;

/// Compute the adaptive MMR lambda from a score-sorted list of
/// relevance scores.
///
/// `gap = top - mean`. Empty input returns the midpoint of
/// `[lambda_min, lambda_max]`.
pub fn adaptive_lambda(scores_sorted_desc: &[f32], lambda_min: f32, lambda_max: f32) -> f32 {
    let mid = (lambda_min + lambda_max) / 2.0;

    let Some(&top) = scores_sorted_desc.first() else {
        return mid;
    };

    let mean = scores_sorted_desc.iter().sum::<f32>() / scores_sorted_desc.len() as f32;
    let gap = top - mean;

    if gap > 0.3 {
        lambda_max
    } else if gap > 0.2 {
        mid + 0.05
    } else if gap > 0.1 {
        mid
    } else {
        lambda_min
    }
}

/// A candidate for MMR selection.
#[derive(Debug, Clone)]
pub struct MmrCandidate {
    pub id: String,
    pub relevance: f32,
    /// Missing embeddings contribute 0 similarity to any comparison.
    pub embedding: Option<Vec<f32>>,
}

/// Select `k` items from a score-sorted candidate list by maximal
/// marginal relevance: `lambda * relevance - (1 - lambda) * max_sim(candidate, selected)`.
///
/// Returns ids in selection order (not raw-score order).
pub fn mmr_rerank(candidates: &[MmrCandidate], k: usize, lambda: f32) -> Vec<String> {
    let mut remaining: Vec<&MmrCandidate> = candidates.iter().collect();
    let mut selected: Vec<&MmrCandidate> = Vec::with_capacity(k.min(candidates.len()));

    while !remaining.is_empty() && selected.len() < k {
        let (best_idx, _) = remaining
            .iter()
            .enumerate()
            .map(|(idx, cand)| {
                let max_sim = selected
                    .iter()
                    .map(|s| match (&cand.embedding, &s.embedding) {
                        (Some(a), Some(b)) => cosine_similarity(a, b),
                        _ => 0.0,
                    })
                    .fold(0.0_f32, f32::max);
                let mmr_score = lambda * cand.relevance - (1.0 - lambda) * max_sim;
                (idx, mmr_score)
            })
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .expect("remaining is non-empty");

        selected.push(remaining.remove(best_idx));
    }

    selected.into_iter().map(|c| c.id.clone()).collect()
}
