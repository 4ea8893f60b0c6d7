//! LAND: cast a wide net with parallel vector + full-text search over
//! valid memories, fused by distribution alignment and coverage-
//! adjusted weighting.

use std::collections::{HashMap, HashSet};

use crate::config::LandConfig;
use crate::error::Result;
use crate::graph::{GraphStore, NodeLabel, SearchOptions};
use crate::math::{fuse_scored, ScoredId};
use crate::model::Memory;
use crate::stats::RunStats;

use super::Source;

pub struct LandResult {
    pub fused: Vec<(crate::math::FusedScore, Source)>,
    pub hits_by_id: HashMap<String, Memory>,
}

pub async fn land(
    graph: &dyn GraphStore,
    query: &str,
    query_embedding: &[f32],
    config: &LandConfig,
    stats: &mut RunStats,
) -> Result<LandResult> {
    let options = SearchOptions { valid_only: true };

    let (vector_hits, fulltext_hits) = tokio::try_join!(
        graph.search_vector(NodeLabel::Memory, query_embedding, config.candidates, options),
        graph.search_fulltext(NodeLabel::Memory, query, config.candidates, options),
    )?;
    stats.record_graph_read();
    stats.record_graph_read();

    let vector_ids: HashSet<String> = vector_hits.iter().map(|h| h.memory.id.clone()).collect();
    let fulltext_ids: HashSet<String> = fulltext_hits.iter().map(|h| h.memory.id.clone()).collect();

    let mut hits_by_id: HashMap<String, Memory> = HashMap::new();
    for hit in &vector_hits {
        hits_by_id.insert(hit.memory.id.clone(), hit.memory.clone());
    }
    for hit in &fulltext_hits {
        hits_by_id.entry(hit.memory.id.clone()).or_insert_with(|| hit.memory.clone());
    }

    let primary: Vec<ScoredId> = vector_hits.iter().map(|h| ScoredId { id: h.memory.id.clone(), score: h.score }).collect();
    let secondary: Vec<ScoredId> = fulltext_hits.iter().map(|h| ScoredId { id: h.memory.id.clone(), score: h.score }).collect();

    let fused = fuse_scored(
        &primary,
        &secondary,
        (config.fusion.vector_weight, config.fusion.fulltext_weight),
        config.fusion.min_results_for_full_weight,
        config.fusion.quality_floor,
        config.fusion.target_mean,
        config.fusion.target_std,
    );

    let tagged: Vec<(crate::math::FusedScore, Source)> = fused
        .into_iter()
        .map(|f| {
            let in_vector = vector_ids.contains(&f.id);
            let in_fulltext = fulltext_ids.contains(&f.id);
            let source = if in_vector && in_fulltext {
                Source::Multiple
            } else if in_vector {
                Source::Vector
            } else {
                Source::Fulltext
            };
            (f, source)
        })
        .collect();

    Ok(LandResult { fused: tagged, hits_by_id })
}
