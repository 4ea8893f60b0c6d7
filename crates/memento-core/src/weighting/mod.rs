//! Multi-signal entity weighting (design §4.2).
//!
//! Blends three signals about how relevant an entity is to the current
//! query — semantic similarity, co-occurrence with seed memories, and
//! graph degree — into a single weight per entity, normalized to sum
//! to 1 so it doubles as a personalized-PageRank seed vector.

use std::collections::HashMap;

use crate::config::AnchorConfig;
use crate::math::cosine_similarity;

/// One candidate entity to weight.
#[derive(Debug, Clone)]
pub struct WeightableEntity {
    pub id: String,
    pub embedding: Option<Vec<f32>>,
    pub degree: u64,
}

/// A seed memory labeled with which entities (by id) it is ABOUT.
#[derive(Debug, Clone)]
pub struct SeedMemory {
    pub embedding: Option<Vec<f32>>,
    pub about_entity_ids: Vec<String>,
}

/// Compute normalized entity weights.
///
/// Returns an empty map if every entity scores zero or negative after
/// blending, so callers can short-circuit (design: "if the total is
/// ≤ 0 an empty map is returned").
pub fn compute_entity_weights(
    entities: &[WeightableEntity],
    seeds: &[SeedMemory],
    query_embedding: &[f32],
    config: &AnchorConfig,
) -> HashMap<String, f64> {
    if entities.is_empty() {
        return HashMap::new();
    }

    let max_log_degree = entities
        .iter()
        .map(|e| ((1 + e.degree) as f64).ln())
        .fold(0.0_f64, f64::max);

    let mut raw: HashMap<String, f64> = HashMap::new();

    for entity in entities {
        let semantic = entity
            .embedding
            .as_deref()
            .map(|emb| cosine_similarity(emb, query_embedding) as f64)
            .unwrap_or(0.0);

        let memory_scores: Vec<f64> = seeds
            .iter()
            .filter(|s| s.about_entity_ids.iter().any(|id| id == &entity.id))
            .filter_map(|s| s.embedding.as_deref())
            .map(|emb| cosine_similarity(emb, query_embedding) as f64)
            .collect();
        let memory = if memory_scores.is_empty() {
            0.0
        } else {
            memory_scores.iter().sum::<f64>() / memory_scores.len() as f64
        };

        let structural = if max_log_degree > 0.0 {
            ((1 + entity.degree) as f64).ln() / max_log_degree
        } else {
            0.0
        };

        let blended = config.semantic_weight * semantic
            + config.memory_weight * memory
            + config.structural_weight * structural;

        raw.insert(entity.id.clone(), blended);
    }

    let total: f64 = raw.values().sum();
    if total <= 0.0 {
        return HashMap::new();
    }

    raw.into_iter().map(|(id, w)| (id, w / total)).collect()
}
