//! The atomic write stage (design §4.6 step 4): assemble one
//! [`GraphWriteBatch`] honoring the write-ordering guarantees (§5.2)
//! and commit it in a single transaction.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::agents::entity_resolver::UserDescriptionUpdate;
use crate::agents::memory_extract::ExtractedMemory;
use crate::agents::{InvalidateTarget, MemoryAction};
use crate::embedding_client::EmbeddingClient;
use crate::error::Result;
use crate::graph::{
    AboutCreate, AboutCreateTarget, CommitResult, EntityCreate, EntityUpdate, GraphStore, GraphWriteBatch,
    InvalidatesCreate, MemoryCreate, UserUpsert,
};
use crate::stats::RunStats;

use super::branch_b::{EntityOutcomeAction, ResolvedEntity};

pub struct WriteInput<'a> {
    pub note_content: &'a str,
    pub note_timestamp: DateTime<Utc>,
    pub known_user_name: Option<&'a str>,
    pub resolved_entities: &'a [ResolvedEntity],
    pub user_description_update: Option<&'a UserDescriptionUpdate>,
    pub extracted_memories: &'a [ExtractedMemory],
    pub memory_resolutions: &'a [MemoryAction],
}

pub async fn commit(
    graph: &dyn GraphStore,
    embedder: &dyn EmbeddingClient,
    input: WriteInput<'_>,
    stats: &mut RunStats,
) -> Result<CommitResult> {
    // Step 1: drop any extracted entity that is really the user.
    let filtered_out_names: HashSet<String> = input
        .resolved_entities
        .iter()
        .filter(|e| input.known_user_name.is_some_and(|known| e.name.eq_ignore_ascii_case(known)))
        .map(|e| e.name.to_lowercase())
        .collect();

    let surviving_entities: Vec<&ResolvedEntity> =
        input.resolved_entities.iter().filter(|e| !filtered_out_names.contains(&e.name.to_lowercase())).collect();

    // Resolve each memory's about-names into batch targets, substituting
    // USER for any name that survived filtering because it referred to
    // the user.
    let resolve_about = |name: &str, create_index: &HashMap<String, usize>, match_id: &HashMap<String, String>| -> AboutCreateTarget {
        if name == "USER" || filtered_out_names.contains(&name.to_lowercase()) {
            return AboutCreateTarget::User;
        }
        let lower = name.to_lowercase();
        if let Some(&idx) = create_index.get(&lower) {
            return AboutCreateTarget::NewEntity { entity_index: idx };
        }
        if let Some(id) = match_id.get(&lower) {
            return AboutCreateTarget::Entity { entity_id: id.clone() };
        }
        // Unreachable under memory-extract's alignment contract; fall
        // back to USER rather than dropping the edge silently.
        AboutCreateTarget::User
    };

    let mut entities_to_create = Vec::new();
    let mut entities_to_update = Vec::new();
    let mut create_index: HashMap<String, usize> = HashMap::new();
    let mut match_id: HashMap<String, String> = HashMap::new();

    for entity in &surviving_entities {
        match &entity.action {
            EntityOutcomeAction::Create { description, is_well_known } => {
                create_index.insert(entity.name.to_lowercase(), entities_to_create.len());
                entities_to_create.push(EntityCreate {
                    name: entity.name.clone(),
                    entity_type: entity.entity_type,
                    description: Some(description.clone()),
                    embedding: Some(entity.embedding.clone()),
                    is_well_known: *is_well_known,
                });
            }
            EntityOutcomeAction::Match { matched_id, update_description } => {
                match_id.insert(entity.name.to_lowercase(), matched_id.clone());
                if *update_description {
                    entities_to_update.push(EntityUpdate {
                        entity_id: matched_id.clone(),
                        name: None,
                        description: None,
                        embedding: Some(entity.embedding.clone()),
                    });
                }
            }
        }
    }

    // Steps 2-3: user upsert.
    let any_memory_about_user = input
        .extracted_memories
        .iter()
        .zip(input.memory_resolutions)
        .any(|(m, r)| !matches!(r, MemoryAction::Skip) && m.about_entities.iter().any(|a| a == "USER" || filtered_out_names.contains(&a.to_lowercase())));

    let mut user_upsert = None;
    if any_memory_about_user {
        let display_name = input.known_user_name.map(str::to_string).unwrap_or_else(|| "user".to_string());
        let embedding = embedder.embed(&display_name).await.ok();
        user_upsert = Some(UserUpsert { display_name: Some(display_name), description: None, embedding });
    }

    if let Some(update) = input.user_description_update {
        if update.should_update {
            let name = input.known_user_name.unwrap_or("user");
            let text = format!("{name}: {}", update.merged_description);
            let embedding = embedder.embed(&text).await.ok();
            let mut upsert = user_upsert.take().unwrap_or_default();
            upsert.description = Some(update.merged_description.clone());
            upsert.embedding = embedding.or(upsert.embedding);
            user_upsert = Some(upsert);
        }
    }

    // Step 4: pre-embed memories lacking one, keyed by content.
    let mut memories_to_create: Vec<MemoryCreate> = Vec::new();
    let mut memory_index_of: Vec<usize> = Vec::new(); // extracted-memory index -> batch index, only for ADD/INVALIDATE

    let surviving: Vec<(usize, &ExtractedMemory, &MemoryAction)> = input
        .extracted_memories
        .iter()
        .zip(input.memory_resolutions)
        .enumerate()
        .filter(|(_, (_, action))| !matches!(action, MemoryAction::Skip))
        .map(|(i, (m, a))| (i, m, a))
        .collect();

    let contents: Vec<String> = surviving.iter().map(|(_, m, _)| m.content.clone()).collect();
    let embeddings = if contents.is_empty() { Vec::new() } else { embedder.embed_batch(&contents).await? };

    for ((_, memory, _), embedding) in surviving.iter().zip(embeddings.iter()) {
        memory_index_of.push(memories_to_create.len());
        memories_to_create.push(MemoryCreate {
            content: memory.content.clone(),
            embedding: Some(embedding.clone()),
            valid_at: memory.valid_at.unwrap_or(input.note_timestamp),
        });
    }

    // ABOUT edges for every surviving memory.
    let mut about_edges = Vec::new();
    for (pos, (_, memory, _)) in surviving.iter().enumerate() {
        let batch_index = memory_index_of[pos];
        for about in &memory.about_entities {
            about_edges.push(AboutCreate {
                memory_index: batch_index,
                target: resolve_about(about, &create_index, &match_id),
            });
        }
    }

    // INVALIDATES edges.
    let mut invalidates_edges = Vec::new();
    for (pos, (_, _, action)) in surviving.iter().enumerate() {
        if let MemoryAction::Invalidate { targets } = action {
            let batch_index = memory_index_of[pos];
            for InvalidateTarget { existing_memory_id, reason } in targets {
                invalidates_edges.push(InvalidatesCreate {
                    memory_index: batch_index,
                    target_memory_id: existing_memory_id.clone(),
                    reason: reason.clone(),
                });
            }
        }
    }

    // MENTIONS: every distinct entity created or matched by this note.
    let mut mentions = Vec::new();
    for idx in 0..entities_to_create.len() {
        mentions.push(AboutCreateTarget::NewEntity { entity_index: idx });
    }
    for id in match_id.values() {
        mentions.push(AboutCreateTarget::Entity { entity_id: id.clone() });
    }

    let batch = GraphWriteBatch {
        user_upsert,
        note: Some((input.note_content.to_string(), input.note_timestamp)),
        entities_to_create,
        entities_to_update,
        memories_to_create,
        about_edges,
        extracted_from_for_all_memories: true,
        invalidates_edges,
        mentions,
    };

    let result = graph.commit(batch).await?;
    stats.record_graph_write();

    Ok(result)
}
