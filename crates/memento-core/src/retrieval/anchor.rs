//! ANCHOR: pick the entities the LAND seed memories are most often
//! ABOUT, then weight them by semantic/memory/structural signal.

use std::collections::HashMap;

use futures::future::try_join_all;

use crate::config::AnchorConfig;
use crate::error::Result;
use crate::graph::GraphStore;
use crate::model::USER_ID;
use crate::stats::RunStats;
use crate::weighting::{compute_entity_weights, SeedMemory, WeightableEntity};

use super::land::LandResult;

pub async fn anchor(
    graph: &dyn GraphStore,
    land: &LandResult,
    query_embedding: &[f32],
    config: &AnchorConfig,
    stats: &mut RunStats,
) -> Result<HashMap<String, f64>> {
    let memory_ids: Vec<String> = land.fused.iter().map(|(f, _)| f.id.clone()).collect();
    if memory_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let about_refs = graph.about_refs_for_memories(&memory_ids).await?;
    stats.record_graph_read();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for refs in about_refs.values() {
        for r in refs {
            if r.id == USER_ID {
                continue;
            }
            *counts.entry(r.id.clone()).or_default() += 1;
        }
    }

    let survivors: Vec<String> = counts
        .into_iter()
        .filter(|(_, count)| *count >= config.min_memories)
        .map(|(id, _)| id)
        .collect();

    if survivors.is_empty() {
        return Ok(HashMap::new());
    }

    let entity_fetches = try_join_all(survivors.iter().map(|id| graph.get_entity_by_id(id)));
    let degrees_fetch = graph.entity_degrees(&survivors);
    let (entity_opts, degrees) = tokio::try_join!(entity_fetches, degrees_fetch)?;
    stats.record_graph_read();
    stats.record_graph_read();

    let entities: Vec<WeightableEntity> = survivors
        .iter()
        .zip(entity_opts)
        .filter_map(|(id, entity)| {
            let entity = entity?;
            Some(WeightableEntity {
                id: id.clone(),
                embedding: entity.embedding,
                degree: degrees.get(id).copied().unwrap_or(0),
            })
        })
        .collect();

    if entities.is_empty() {
        return Ok(HashMap::new());
    }

    let seeds: Vec<SeedMemory> = land
        .fused
        .iter()
        .map(|(f, _)| SeedMemory {
            embedding: land.hits_by_id.get(&f.id).and_then(|m| m.embedding.clone()),
            about_entity_ids: about_refs.get(&f.id).map(|refs| refs.iter().map(|r| r.id.clone()).collect()).unwrap_or_default(),
        })
        .collect();

    Ok(compute_entity_weights(&entities, &seeds, query_embedding, config))
}
