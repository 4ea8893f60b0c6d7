//! The consolidation pipeline: turn one note into graph writes (design
//! §4.6).
//!
//! Branch A (existing-context retrieval widened by HyDE) and branch B
//! (entity extraction/resolution then memory extraction) run
//! concurrently; memory-resolver joins their outputs against the
//! existing graph, and the result either writes atomically or the note
//! is skipped with a reason.

mod branch_a;
mod branch_b;
mod normalize_name;
mod write;

use crate::agent::run_agent;
use crate::agents::{memory_resolver, MemoryAction};
use crate::config::ConsolidationConfig;
use crate::embedding_client::EmbeddingClient;
use crate::error::{EngineError, Result};
use crate::graph::GraphStore;
use crate::llm::LlmClient;
use crate::stats::RunStats;

/// The outcome of consolidating one note.
#[derive(Debug, Clone)]
pub enum ConsolidationOutcome {
    /// The note was written to the graph.
    Written { note_id: String, created_entity_ids: Vec<String>, created_memory_ids: Vec<String> },
    /// Nothing was written; the note contributed no new knowledge.
    Skipped { reason: &'static str },
}

#[derive(Debug, Clone)]
pub struct ConsolidationResult {
    pub outcome: ConsolidationOutcome,
    pub stats: RunStats,
}

pub async fn consolidate(
    graph: &dyn GraphStore,
    embedder: &dyn EmbeddingClient,
    llm: &dyn LlmClient,
    note_content: &str,
    note_timestamp: chrono::DateTime<chrono::Utc>,
    config: &ConsolidationConfig,
) -> Result<ConsolidationResult> {
    if note_content.trim().is_empty() {
        return Err(EngineError::InvalidInput("note content must not be empty".to_string()));
    }

    let mut stats = RunStats::new();

    let existing_user = graph.get_user().await?;
    stats.record_graph_read();
    let known_user_name = existing_user.as_ref().map(|u| u.display_name.as_str());
    let user_description = existing_user.as_ref().and_then(|u| u.description.as_deref());

    let (context_out, branch_b_out) = tokio::try_join!(
        branch_a::run(graph, embedder, llm, note_content, config),
        branch_b::run(graph, embedder, llm, note_content, note_timestamp, known_user_name, user_description, config),
    )?;
    let (context, context_stats) = context_out;
    let (branch_b_out, branch_b_stats) = branch_b_out;
    stats.merge(context_stats);
    stats.merge(branch_b_stats);

    if branch_b_out.extracted_memories.is_empty() {
        return Ok(ConsolidationResult {
            outcome: ConsolidationOutcome::Skipped { reason: "No memories could be extracted from this note" },
            stats,
        });
    }

    let resolver_input = memory_resolver::Input {
        extracted: branch_b_out.extracted_memories.clone(),
        existing: context.into_iter().map(|c| memory_resolver::ExistingMemoryRef { id: c.id, content: c.content }).collect(),
    };
    let resolved = run_agent(llm, &memory_resolver::agent(), &resolver_input, &config.agent, &mut stats).await?;

    if resolved.resolutions.iter().all(|r| matches!(r, MemoryAction::Skip)) {
        return Ok(ConsolidationResult {
            outcome: ConsolidationOutcome::Skipped { reason: "All memories were duplicates of existing knowledge" },
            stats,
        });
    }

    let write_input = write::WriteInput {
        note_content,
        note_timestamp,
        known_user_name,
        resolved_entities: &branch_b_out.resolved_entities,
        user_description_update: branch_b_out.user_description_update.as_ref(),
        extracted_memories: &branch_b_out.extracted_memories,
        memory_resolutions: &resolved.resolutions,
    };
    let commit_result = write::commit(graph, embedder, write_input, &mut stats).await?;

    Ok(ConsolidationResult {
        outcome: ConsolidationOutcome::Written {
            note_id: commit_result.note_id.unwrap_or_default(),
            created_entity_ids: commit_result.created_entity_ids,
            created_memory_ids: commit_result.created_memory_ids,
        },
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unreachable;

    #[async_trait::async_trait]
    impl EmbeddingClient for Unreachable {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            unreachable!("rejected before any collaborator call")
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for Unreachable {
        async fn complete_json(
            &self,
            _system_prompt: &str,
            _user_message: &str,
            _schema: &serde_json::Value,
            _options: &crate::llm::CompletionOptions,
        ) -> Result<serde_json::Value> {
            unreachable!("rejected before any collaborator call")
        }
    }

    #[tokio::test]
    async fn empty_note_is_rejected_before_touching_any_collaborator() {
        let graph = crate::testing::InMemoryGraphStore::new();
        let config = ConsolidationConfig::default();
        let result = consolidate(&graph, &Unreachable, &Unreachable, "   ", chrono::Utc::now(), &config).await;
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    }
}
