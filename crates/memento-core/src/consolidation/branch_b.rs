//! Consolidation branch B: extract candidate entities, resolve them
//! against the graph, then extract memories against the resolved set
//! (design §4.6 step 2, branch B).

use futures::future::try_join_all;

use crate::agent::run_agent;
use crate::agents::{entity_extract, entity_resolver, memory_extract};
use crate::config::ConsolidationConfig;
use crate::embedding_client::EmbeddingClient;
use crate::error::Result;
use crate::graph::GraphStore;
use crate::llm::LlmClient;
use crate::model::EntityType;
use crate::stats::RunStats;

use super::normalize_name;

#[derive(Debug, Clone)]
pub enum EntityOutcomeAction {
    Create { description: String, is_well_known: bool },
    Match { matched_id: String, update_description: bool },
}

/// One branch-B entity, carrying the embedding used to search for it
/// so the write stage can re-use it instead of re-embedding.
#[derive(Debug, Clone)]
pub struct ResolvedEntity {
    pub name: String,
    pub entity_type: EntityType,
    pub action: EntityOutcomeAction,
    pub embedding: Vec<f32>,
}

pub struct Output {
    pub resolved_entities: Vec<ResolvedEntity>,
    pub user_description_update: Option<entity_resolver::UserDescriptionUpdate>,
    pub extracted_memories: Vec<memory_extract::ExtractedMemory>,
}

fn embedding_text(name: &str, description: &str) -> String {
    if description.is_empty() {
        name.to_string()
    } else {
        format!("{name}: {description}")
    }
}

pub async fn run(
    graph: &dyn GraphStore,
    embedder: &dyn EmbeddingClient,
    llm: &dyn LlmClient,
    note_content: &str,
    note_timestamp: chrono::DateTime<chrono::Utc>,
    known_user_name: Option<&str>,
    user_description: Option<&str>,
    config: &ConsolidationConfig,
) -> Result<(Output, RunStats)> {
    let mut stats = RunStats::new();

    let extract_input = entity_extract::Input {
        note_content: note_content.to_string(),
        known_user_name: known_user_name.map(str::to_string),
    };
    let extracted = run_agent(llm, &entity_extract::agent(), &extract_input, &config.agent, &mut stats).await?;

    let normalized: Vec<_> = extracted
        .entities
        .into_iter()
        .map(|mut e| {
            e.name = normalize_name::normalize(&e.name);
            e
        })
        .collect();

    if normalized.is_empty() {
        let memory_input = memory_extract::Input {
            note_content: note_content.to_string(),
            note_timestamp,
            resolved_entities: Vec::new(),
        };
        let memories = run_agent(llm, &memory_extract::agent(), &memory_input, &config.agent, &mut stats).await?;
        return Ok((
            Output { resolved_entities: Vec::new(), user_description_update: None, extracted_memories: memories.memories },
            stats,
        ));
    }

    let texts: Vec<String> = normalized.iter().map(|e| embedding_text(&e.name, &e.description)).collect();
    let embeddings = embedder.embed_batch(&texts).await?;

    let searches = try_join_all(
        normalized
            .iter()
            .zip(embeddings.iter())
            .map(|(e, emb)| graph.search_hybrid_entities(&e.name, emb, config.entity_search_k)),
    )
    .await?;
    for _ in &searches {
        stats.record_graph_read();
    }

    let resolver_entities: Vec<entity_resolver::InputEntity> = normalized
        .iter()
        .zip(embeddings.iter())
        .zip(searches.iter())
        .map(|((e, emb), hits)| entity_resolver::InputEntity {
            name: e.name.clone(),
            entity_type: e.entity_type,
            description: e.description.clone(),
            is_well_known: e.is_well_known,
            query_embedding: emb.clone(),
            matches: hits
                .iter()
                .map(|h| entity_resolver::HybridMatch {
                    id: h.entity.id.clone(),
                    name: h.entity.name.clone(),
                    entity_type: h.entity.entity_type,
                    description: h.entity.description.clone(),
                    similarity: h.score,
                })
                .collect(),
        })
        .collect();

    let resolver_input = entity_resolver::Input {
        entities: resolver_entities,
        user_description: user_description.map(str::to_string),
        biographical_facts: extracted.user_biographical_facts.clone(),
    };
    let resolved = run_agent(llm, &entity_resolver::agent(), &resolver_input, &config.agent, &mut stats).await?;

    let resolved_entities: Vec<ResolvedEntity> = normalized
        .iter()
        .zip(embeddings.iter())
        .zip(resolved.resolutions.iter())
        .map(|((extracted, embedding), resolution)| {
            let action = match &resolution.action {
                crate::agents::EntityAction::Create => {
                    EntityOutcomeAction::Create { description: extracted.description.clone(), is_well_known: extracted.is_well_known }
                }
                crate::agents::EntityAction::Match { matched_id, update_description } => {
                    EntityOutcomeAction::Match { matched_id: matched_id.clone(), update_description: *update_description }
                }
            };
            ResolvedEntity { name: extracted.name.clone(), entity_type: extracted.entity_type, action, embedding: embedding.clone() }
        })
        .collect();

    let memory_entity_refs: Vec<memory_extract::ResolvedEntityRef> = resolved_entities
        .iter()
        .map(|r| memory_extract::ResolvedEntityRef {
            name: r.name.clone(),
            entity_type: r.entity_type,
            action: match &r.action {
                EntityOutcomeAction::Create { .. } => "CREATE",
                EntityOutcomeAction::Match { .. } => "MATCH",
            },
        })
        .collect();

    let memory_input = memory_extract::Input {
        note_content: note_content.to_string(),
        note_timestamp,
        resolved_entities: memory_entity_refs,
    };
    let memories = run_agent(llm, &memory_extract::agent(), &memory_input, &config.agent, &mut stats).await?;

    Ok((
        Output {
            resolved_entities,
            user_description_update: resolved.user_description_update,
            extracted_memories: memories.memories,
        },
        stats,
    ))
}
