//! TRACE: enrich the DISTILL selection with entity names,
//! invalidation chains, and provenance — the four graph reads the
//! design calls out, issued concurrently.

use futures::future::try_join_all;

use crate::error::Result;
use crate::graph::{self, GraphStore};
use crate::model::USER_ID;
use crate::stats::RunStats;

use super::distill::DistillResult;
use super::{InvalidatedMemory, MemoryOutput, Provenance};

fn convert_chain(node: graph::InvalidationNode) -> InvalidatedMemory {
    InvalidatedMemory {
        id: node.id,
        content: node.content,
        valid_at: node.valid_at,
        invalidated_at: node.invalid_at,
        reason: node.reason,
        invalidated: node.invalidated.into_iter().map(convert_chain).collect(),
    }
}

pub async fn trace(graph: &dyn GraphStore, distilled: &DistillResult, stats: &mut RunStats) -> Result<Vec<MemoryOutput>> {
    let ids = &distilled.ordered_ids;
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let about_refs_fut = graph.about_refs_for_memories(ids);
    let invalidation_futs = try_join_all(ids.iter().map(|id| graph.invalidation_chain(id, 2)));
    let provenance_futs = try_join_all(ids.iter().map(|id| graph.provenance_note_for_memory(id)));

    let (about_refs, invalidation_chains, provenances) =
        tokio::try_join!(about_refs_fut, invalidation_futs, provenance_futs)?;
    stats.record_graph_read();
    stats.record_graph_read();
    stats.record_graph_read();

    let mentions_user = about_refs.values().any(|refs| refs.iter().any(|r| r.id == USER_ID));
    let user_display_name = if mentions_user {
        let user = graph.get_user().await?;
        stats.record_graph_read();
        user.map(|u| u.display_name)
    } else {
        None
    };

    let mut out = Vec::with_capacity(ids.len());
    for (idx, id) in ids.iter().enumerate() {
        let refs = about_refs.get(id).cloned().unwrap_or_default();
        let about: Vec<String> = refs
            .iter()
            .map(|r| {
                if r.id == USER_ID {
                    user_display_name.clone().unwrap_or_else(|| r.name.clone())
                } else {
                    r.name.clone()
                }
            })
            .collect();
        let about_entity_ids: Vec<String> = refs.iter().map(|r| r.id.clone()).collect();

        let memory = distilled.hits_by_id.get(id);
        let content = memory.map(|m| m.normalized_content()).unwrap_or_default();
        let valid_at = memory.and_then(|m| m.valid_at);

        let invalidates = invalidation_chains[idx].iter().cloned().map(convert_chain).collect();

        let extracted_from = provenances[idx].clone().map(|note| Provenance {
            note_id: note.id,
            note_content: note.content,
            note_timestamp: note.timestamp,
        });

        out.push(MemoryOutput {
            rank: idx + 1,
            id: id.clone(),
            content,
            score: distilled.score_by_id.get(id).copied().unwrap_or(0.0),
            source: distilled.source_by_id.get(id).copied().unwrap_or(super::Source::Vector),
            about,
            about_entity_ids,
            valid_at,
            invalidates,
            extracted_from,
        });
    }

    Ok(out)
}
