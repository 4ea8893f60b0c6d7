//! Score fusion: reciprocal-rank fusion and coverage-adjusted weighted
//! averaging, the two ways the engine combines ranked lists from
//! independent sources (vector search, full-text search, PPR).

use std::collections::HashMap;

use super::normalize::{align_distribution, min_max_normalize};

/// Reciprocal-rank fusion over `k` ranked (id, score) lists: each id's
/// fused score is the sum of `1 / (rank + c)` across every list it
/// appears in, `rank` being its 0-based position in that list.
///
/// Only consumed by the reference hybrid-search primitive (the graph
/// store's `searchHybrid`) — the pipelines themselves fuse with
/// [`fuse_scored`].
pub fn reciprocal_rank_fusion(lists: &[Vec<(String, f32)>], c: f32) -> Vec<(String, f32)> {
    let mut scores: HashMap<String, f32> = HashMap::new();

    for list in lists {
        for (rank, (id, _)) in list.iter().enumerate() {
            *scores.entry(id.clone()).or_default() += 1.0 / (c + rank as f32);
        }
    }

    let mut result: Vec<(String, f32)> = scores.into_iter().collect();
    result.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    result
}

/// Coverage-adjusted fusion weights.
///
/// Given base weights `(w_v, w_f)` and observed result counts
/// `(n_v, n_f)`, scales each weight by `min(n / threshold, 1)` and
/// renormalizes so the pair sums to 1. If one source produced zero
/// results, the other gets all the weight (division by zero in the
/// renormalization is avoided by this short-circuit, matching the
/// design's "its counterpart gets weight 1" rule).
pub fn coverage_adjusted_weights(
    base: (f32, f32),
    counts: (usize, usize),
    threshold: usize,
) -> (f32, f32) {
    let (base_v, base_f) = base;
    let (n_v, n_f) = counts;

    if n_v == 0 && n_f == 0 {
        return (base_v, base_f);
    }
    if n_v == 0 {
        return (0.0, 1.0);
    }
    if n_f == 0 {
        return (1.0, 0.0);
    }

    let t = threshold.max(1) as f32;
    let coverage_v = (n_v as f32 / t).min(1.0);
    let coverage_f = (n_f as f32 / t).min(1.0);

    let adj_v = base_v * coverage_v;
    let adj_f = base_f * coverage_f;
    let total = adj_v + adj_f;

    if total <= 0.0 {
        return (0.5, 0.5);
    }

    (adj_v / total, adj_f / total)
}

/// One scored candidate from a single source, keyed by id.
#[derive(Debug, Clone)]
pub struct ScoredId {
    pub id: String,
    pub score: f32,
}

/// A fused candidate, tagging whether it was present in both input
/// lists ("multiple") or came from a single source.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedScore {
    pub id: String,
    pub score: f32,
    pub in_both: bool,
}

/// Fuse two ranked lists (vector, full-text) the way LAND and DISTILL
/// both do: align each list to the target distribution, min-max
/// normalize, compute coverage-adjusted weights from how many results
/// each side actually returned, then weighted-average per id and drop
/// anything below `quality_floor`.
///
/// Ids present in only one list are scored using that list's
/// (aligned, normalized) value times that source's fused weight.
pub fn fuse_scored(
    primary: &[ScoredId],
    secondary: &[ScoredId],
    base_weights: (f32, f32),
    min_results_for_full_weight: usize,
    quality_floor: f32,
    target_mean: f32,
    target_std: f32,
) -> Vec<FusedScore> {
    let primary_raw: Vec<f32> = primary.iter().map(|s| s.score).collect();
    let secondary_raw: Vec<f32> = secondary.iter().map(|s| s.score).collect();

    let primary_norm = min_max_normalize(&align_distribution(&primary_raw, target_mean, target_std));
    let secondary_norm = min_max_normalize(&align_distribution(&secondary_raw, target_mean, target_std));

    let (w_primary, w_secondary) = coverage_adjusted_weights(
        base_weights,
        (primary.len(), secondary.len()),
        min_results_for_full_weight,
    );

    let mut primary_scores: HashMap<&str, f32> = HashMap::new();
    for (item, norm) in primary.iter().zip(primary_norm.iter()) {
        primary_scores.insert(item.id.as_str(), *norm);
    }
    let mut secondary_scores: HashMap<&str, f32> = HashMap::new();
    for (item, norm) in secondary.iter().zip(secondary_norm.iter()) {
        secondary_scores.insert(item.id.as_str(), *norm);
    }

    let mut ids: Vec<&str> = primary_scores.keys().chain(secondary_scores.keys()).copied().collect();
    ids.sort_unstable();
    ids.dedup();

    let mut fused: Vec<FusedScore> = ids
        .into_iter()
        .filter_map(|id| {
            let p = primary_scores.get(id).copied();
            let s = secondary_scores.get(id).copied();
            let score = match (p, s) {
                (Some(p), Some(s)) => p * w_primary + s * w_secondary,
                (Some(p), None) => p * w_primary,
                (None, Some(s)) => s * w_secondary,
                (None, None) => return None,
            };
            if score < quality_floor {
                return None;
            }
            Some(FusedScore {
                id: id.to_string(),
                score,
                in_both: p.is_some() && s.is_some(),
            })
        })
        .collect();

    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rrf_rewards_ids_appearing_in_multiple_lists() {
        let a = vec![("d1".to_string(), 0.9), ("d2".to_string(), 0.8)];
        let b = vec![("d2".to_string(), 0.95), ("d3".to_string(), 0.7)];
        let fused = reciprocal_rank_fusion(&[a, b], 60.0);
        let rank_of = |id: &str| fused.iter().position(|(k, _)| k == id).unwrap();
        assert!(rank_of("d2") < rank_of("d1"));
        assert!(rank_of("d2") < rank_of("d3"));
    }

    #[test]
    fn coverage_weights_give_all_weight_to_sole_source() {
        let (wv, wf) = coverage_adjusted_weights((0.7, 0.3), (0, 10), 20);
        assert_eq!((wv, wf), (0.0, 1.0));
        let (wv, wf) = coverage_adjusted_weights((0.7, 0.3), (10, 0), 20);
        assert_eq!((wv, wf), (1.0, 0.0));
    }

    #[test]
    fn coverage_weights_shrink_proportionally_below_threshold() {
        let (wv, wf) = coverage_adjusted_weights((0.7, 0.3), (10, 20), 20);
        // vector coverage is 10/20=0.5, fulltext is fully covered.
        assert!(wv < 0.7);
        assert!((wv + wf - 1.0).abs() < 1e-6);
    }

    #[test]
    fn fuse_scored_tags_intersection_as_in_both() {
        let primary = vec![
            ScoredId { id: "m1".into(), score: 0.9 },
            ScoredId { id: "m2".into(), score: 0.5 },
        ];
        let secondary = vec![
            ScoredId { id: "m1".into(), score: 0.8 },
            ScoredId { id: "m3".into(), score: 0.4 },
        ];
        let fused = fuse_scored(&primary, &secondary, (0.7, 0.3), 20, 0.0, 0.5, 0.2);
        let m1 = fused.iter().find(|f| f.id == "m1").unwrap();
        assert!(m1.in_both);
        let m2 = fused.iter().find(|f| f.id == "m2").unwrap();
        assert!(!m2.in_both);
    }

    #[test]
    fn fuse_scored_drops_below_quality_floor() {
        let primary = vec![ScoredId { id: "m1".into(), score: 0.01 }];
        let secondary: Vec<ScoredId> = vec![];
        let fused = fuse_scored(&primary, &secondary, (0.7, 0.3), 20, 0.9, 0.5, 0.2);
        assert!(fused.is_empty());
    }
}
