//! DISTILL: fuse LAND and EXPAND outputs with the same fusion
//! algorithm LAND uses, then diversify with adaptive-λ MMR.

use std::collections::{HashMap, HashSet};

use crate::config::DistillConfig;
use crate::math::{adaptive_lambda, fuse_scored, mmr_rerank, MmrCandidate, ScoredId};
use crate::model::Memory;

use super::expand::ExpandResult;
use super::land::LandResult;
use super::Source;

pub struct DistillResult {
    pub ordered_ids: Vec<String>,
    pub score_by_id: HashMap<String, f32>,
    pub source_by_id: HashMap<String, Source>,
    pub hits_by_id: HashMap<String, Memory>,
}

pub fn distill(land: &LandResult, expand: &ExpandResult, config: &DistillConfig) -> DistillResult {
    let primary: Vec<ScoredId> = land.fused.iter().map(|(f, _)| ScoredId { id: f.id.clone(), score: f.score }).collect();
    let secondary: Vec<ScoredId> = expand.scored.iter().map(|(id, score)| ScoredId { id: id.clone(), score: *score }).collect();

    let fused = fuse_scored(
        &primary,
        &secondary,
        (config.fusion.vector_weight, config.fusion.fulltext_weight),
        config.fusion.min_results_for_full_weight,
        config.fusion.quality_floor,
        config.fusion.target_mean,
        config.fusion.target_std,
    );

    let land_ids: HashSet<&str> = land.fused.iter().map(|(f, _)| f.id.as_str()).collect();
    let expand_ids: HashSet<&str> = expand.scored.iter().map(|(id, _)| id.as_str()).collect();
    let land_source_by_id: HashMap<&str, Source> = land.fused.iter().map(|(f, s)| (f.id.as_str(), *s)).collect();

    let mut hits_by_id: HashMap<String, Memory> = land.hits_by_id.clone();
    for (id, memory) in &expand.hits_by_id {
        hits_by_id.entry(id.clone()).or_insert_with(|| memory.clone());
    }

    let scores_sorted: Vec<f32> = fused.iter().map(|f| f.score).collect();
    let lambda = adaptive_lambda(&scores_sorted, config.lambda_min, config.lambda_max);

    let candidates: Vec<MmrCandidate> = fused
        .iter()
        .map(|f| MmrCandidate {
            id: f.id.clone(),
            relevance: f.score,
            embedding: hits_by_id.get(&f.id).and_then(|m| m.embedding.clone()),
        })
        .collect();

    let ordered_ids = mmr_rerank(&candidates, config.top_k, lambda);

    let mut score_by_id = HashMap::new();
    let mut source_by_id = HashMap::new();
    for f in &fused {
        score_by_id.insert(f.id.clone(), f.score);
        let in_land = land_ids.contains(f.id.as_str());
        let in_expand = expand_ids.contains(f.id.as_str());
        let source = if in_land && in_expand {
            Source::Multiple
        } else if in_land {
            land_source_by_id.get(f.id.as_str()).copied().unwrap_or(Source::Vector)
        } else {
            Source::SemPpr
        };
        source_by_id.insert(f.id.clone(), source);
    }

    DistillResult { ordered_ids, score_by_id, source_by_id, hits_by_id }
}
