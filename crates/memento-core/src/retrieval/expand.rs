//! EXPAND: walk the graph from ANCHOR's weighted entities via
//! personalized PageRank, then re-score with the Semantic-PPR blend.

use std::collections::HashMap;

use crate::config::ExpandConfig;
use crate::error::Result;
use crate::graph::GraphStore;
use crate::math::cosine_similarity;
use crate::model::Memory;
use crate::stats::RunStats;

pub struct ExpandResult {
    pub scored: Vec<(String, f32)>,
    pub hits_by_id: HashMap<String, Memory>,
}

impl ExpandResult {
    pub fn empty() -> Self {
        Self { scored: Vec::new(), hits_by_id: HashMap::new() }
    }
}

pub async fn expand(
    graph: &dyn GraphStore,
    anchor_weights: &HashMap<String, f64>,
    query_embedding: &[f32],
    config: &ExpandConfig,
    limit: usize,
    stats: &mut RunStats,
) -> Result<ExpandResult> {
    let source_ids: Vec<String> = anchor_weights.keys().cloned().collect();

    let ppr = graph.personalized_page_rank(&source_ids, config.damping, config.iterations, limit).await?;
    stats.record_graph_read();

    let mut scored = Vec::with_capacity(ppr.len());
    let mut hits_by_id = HashMap::with_capacity(ppr.len());

    for (memory, structural) in ppr {
        let final_score = match &memory.embedding {
            Some(emb) => {
                let semantic = cosine_similarity(emb, query_embedding) as f64;
                config.alpha * structural + (1.0 - config.alpha) * semantic
            }
            None => structural,
        };
        scored.push((memory.id.clone(), final_score as f32));
        hits_by_id.insert(memory.id.clone(), memory);
    }

    Ok(ExpandResult { scored, hits_by_id })
}
