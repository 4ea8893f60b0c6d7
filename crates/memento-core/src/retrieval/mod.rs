//! The retrieval pipeline: LAND → ANCHOR → EXPAND → DISTILL → TRACE
//! (design §4.4). `retrieve` is the single entry point consolidation's
//! branch A and the shell both call.

mod anchor;
mod distill;
mod expand;
mod land;
mod trace;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::graph::GraphStore;
use crate::model::EntityType;
use crate::stats::RunStats;

/// Which discovery mechanism surfaced a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    Vector,
    Fulltext,
    SemPpr,
    Multiple,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityOutput {
    pub id: String,
    pub name: String,
    pub entity_type: Option<EntityType>,
    pub description: Option<String>,
    pub is_well_known: bool,
    pub is_user: bool,
    pub memory_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvalidatedMemory {
    pub id: String,
    pub content: String,
    pub valid_at: Option<DateTime<Utc>>,
    pub invalidated_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub invalidated: Vec<InvalidatedMemory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Provenance {
    pub note_id: String,
    pub note_content: String,
    pub note_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryOutput {
    pub rank: usize,
    pub id: String,
    pub content: String,
    pub score: f32,
    pub source: Source,
    pub about: Vec<String>,
    pub about_entity_ids: Vec<String>,
    pub valid_at: Option<DateTime<Utc>>,
    pub invalidates: Vec<InvalidatedMemory>,
    pub extracted_from: Option<Provenance>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub total_candidates: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrievalOutput {
    pub query: String,
    pub entities: Vec<EntityOutput>,
    pub memories: Vec<MemoryOutput>,
    pub meta: Meta,
}

/// Run the full five-stage pipeline. `stats` accumulates graph-read
/// counters; the caller owns it across the whole request.
pub async fn retrieve(
    graph: &dyn GraphStore,
    query: &str,
    query_embedding: &[f32],
    config: &RetrievalConfig,
) -> Result<(RetrievalOutput, RunStats)> {
    let started = Instant::now();
    let mut stats = RunStats::new();

    let land_out = land::land(graph, query, query_embedding, &config.land, &mut stats).await?;
    let total_candidates_land = land_out.fused.len();

    if land_out.fused.is_empty() {
        return Ok((
            RetrievalOutput {
                query: query.to_string(),
                entities: Vec::new(),
                memories: Vec::new(),
                meta: Meta { total_candidates: 0, duration_ms: started.elapsed().as_millis() as u64 },
            },
            stats,
        ));
    }

    let anchor_weights = anchor::anchor(graph, &land_out, query_embedding, &config.anchor, &mut stats).await?;

    let expand_out = if anchor_weights.is_empty() {
        expand::ExpandResult::empty()
    } else {
        expand::expand(graph, &anchor_weights, query_embedding, &config.expand, config.land.candidates, &mut stats).await?
    };

    let total_candidates = total_candidates_land + expand_out.scored.len();

    let distilled = distill::distill(&land_out, &expand_out, &config.distill);

    let memories = trace::trace(graph, &distilled, &mut stats).await?;

    let mut entity_counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for memory in &memories {
        for id in &memory.about_entity_ids {
            *entity_counts.entry(id.clone()).or_default() += 1;
        }
    }

    let mut distinct_ids: Vec<String> = entity_counts.keys().cloned().collect();
    distinct_ids.sort();

    let entity_details = graph.entity_details_by_id(&distinct_ids).await?;
    stats.record_graph_read();

    let mut entities: Vec<EntityOutput> = entity_details
        .values()
        .filter_map(|d| {
            let count = entity_counts.get(&d.id).copied().unwrap_or(0);
            if count == 0 {
                return None;
            }
            Some(EntityOutput {
                id: d.id.clone(),
                name: d.name.clone(),
                entity_type: d.entity_type,
                description: d.description.clone(),
                is_well_known: d.is_well_known,
                is_user: d.is_user,
                memory_count: count,
            })
        })
        .collect();

    entities.sort_by(|a, b| {
        b.is_user.cmp(&a.is_user).then_with(|| b.memory_count.cmp(&a.memory_count))
    });

    Ok((
        RetrievalOutput {
            query: query.to_string(),
            entities,
            memories,
            meta: Meta { total_candidates, duration_ms: started.elapsed().as_millis() as u64 },
        },
        stats,
    ))
}
