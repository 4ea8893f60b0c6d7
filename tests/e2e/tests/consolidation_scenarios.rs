//! End-to-end consolidation scenarios (design §8 scenarios A, B, C, F).
//!
//! Each scenario seeds an `InMemoryGraphStore` directly through the
//! public `GraphStore::commit` API, then drives `consolidate()` with a
//! `ScriptedLlmClient` queued with exactly the responses the pipeline
//! is expected to ask for — an unexpected extra call drains the queue
//! and surfaces as a `dependency-unavailable` error, so over- or
//! under-invoking an agent fails the test.

use chrono::{DateTime, Utc};
use serde_json::json;

use memento_core::config::ConsolidationConfig;
use memento_core::graph::{GraphWriteBatch, MemoryCreate};
use memento_core::prelude::GraphStore;
use memento_core::testing::{InMemoryGraphStore, ScriptedEmbeddingClient, ScriptedLlmClient};
use memento_core::{consolidate, ConsolidationOutcome};

/// Overrides the note's own embedding to match the seeded memory's
/// pinned vector exactly, so LAND's vector search always recalls it
/// regardless of the in-memory store's hash-embedding fallback.
fn embedder(note_content: &str) -> ScriptedEmbeddingClient {
    ScriptedEmbeddingClient::new(32).with_override(note_content, vec![1.0, 0.0, 0.0])
}

/// Seed one existing memory whose embedding matches the note's
/// override vector exactly, so LAND always recalls it regardless of
/// the in-memory store's lexical overlap heuristics.
async fn seed_memory(graph: &InMemoryGraphStore, content: &str, valid_at: DateTime<Utc>) -> String {
    let batch = GraphWriteBatch {
        memories_to_create: vec![MemoryCreate { content: content.to_string(), embedding: Some(vec![1.0, 0.0, 0.0]), valid_at }],
        ..Default::default()
    };
    let result = graph.commit(batch).await.unwrap();
    result.created_memory_ids[0].clone()
}

fn hyde_response() -> serde_json::Value {
    json!({"semantic": [], "stateChange": []})
}

fn entity_extract_empty_response() -> serde_json::Value {
    json!({"entities": [], "userBiographicalFacts": null})
}

fn memory_extract_response(content: &str) -> serde_json::Value {
    json!({"memories": [{"content": content, "aboutEntities": ["USER"], "validAt": null}]})
}

#[tokio::test]
async fn scenario_a_invalidation() {
    let graph = InMemoryGraphStore::new();
    let ts: DateTime<Utc> = "2026-01-15T10:00:00Z".parse().unwrap();
    let old_id = seed_memory(&graph, "USER prefers JavaScript over TypeScript", ts - chrono::Duration::days(30)).await;

    let responses = vec![
        hyde_response(),
        entity_extract_empty_response(),
        memory_extract_response("USER prefers TypeScript over JavaScript"),
        json!({"resolutions": [{"action": "INVALIDATE", "targets": [{"existingMemoryId": old_id, "reason": "User changed preference"}]}]}),
    ];
    let llm = ScriptedLlmClient::new(responses);
    let note = "I now prefer TypeScript over JavaScript";
    let embedder = embedder(note);
    let config = ConsolidationConfig::default();

    let result = consolidate(&graph, &embedder, &llm, note, ts, &config).await.unwrap();

    let (note_id, created_memory_ids) = match result.outcome {
        ConsolidationOutcome::Written { note_id, created_memory_ids, .. } => (note_id, created_memory_ids),
        ConsolidationOutcome::Skipped { reason } => panic!("expected a write, got skipped: {reason}"),
    };
    assert!(!note_id.is_empty());
    assert_eq!(created_memory_ids.len(), 1);

    let old = graph.get_memory_by_id(&old_id).await.unwrap().unwrap();
    assert_eq!(old.invalid_at, Some(ts));

    let chain = graph.invalidation_chain(&created_memory_ids[0], 2).await.unwrap();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].id, old_id);
    assert_eq!(chain[0].reason.as_deref(), Some("User changed preference"));
}

#[tokio::test]
async fn scenario_b_duplicate_is_skipped_without_writing_anything() {
    let graph = InMemoryGraphStore::new();
    let ts: DateTime<Utc> = "2026-01-15T10:00:00Z".parse().unwrap();
    seed_memory(&graph, "USER works at Acme Corp", ts - chrono::Duration::days(10)).await;

    let responses = vec![
        hyde_response(),
        entity_extract_empty_response(),
        memory_extract_response("USER works at Acme Corp"),
        json!({"resolutions": [{"action": "SKIP"}]}),
    ];
    let llm = ScriptedLlmClient::new(responses);
    let note = "I work at Acme Corp";
    let embedder = embedder(note);
    let config = ConsolidationConfig::default();

    let result = consolidate(&graph, &embedder, &llm, note, ts, &config).await.unwrap();

    match result.outcome {
        ConsolidationOutcome::Skipped { reason } => {
            assert_eq!(reason, "All memories were duplicates of existing knowledge");
        }
        ConsolidationOutcome::Written { .. } => panic!("expected a skip, got a write"),
    }
}

#[tokio::test]
async fn scenario_c_multi_invalidate() {
    let graph = InMemoryGraphStore::new();
    let ts: DateTime<Utc> = "2026-02-01T09:00:00Z".parse().unwrap();
    let old_1 = seed_memory(&graph, "USER uses React 17", ts - chrono::Duration::days(100)).await;
    let old_2 = seed_memory(&graph, "USER is on React 17.0.2", ts - chrono::Duration::days(5)).await;

    let responses = vec![
        hyde_response(),
        entity_extract_empty_response(),
        memory_extract_response("USER upgraded to React 18"),
        json!({"resolutions": [{"action": "INVALIDATE", "targets": [
            {"existingMemoryId": old_1, "reason": "Upgraded major version"},
            {"existingMemoryId": old_2, "reason": "Upgraded major version"}
        ]}]}),
    ];
    let llm = ScriptedLlmClient::new(responses);
    let note = "I upgraded to React 18 today";
    let embedder = embedder(note);
    let config = ConsolidationConfig::default();

    let result = consolidate(&graph, &embedder, &llm, note, ts, &config).await.unwrap();

    let created_memory_ids = match result.outcome {
        ConsolidationOutcome::Written { created_memory_ids, .. } => created_memory_ids,
        ConsolidationOutcome::Skipped { reason } => panic!("expected a write, got skipped: {reason}"),
    };
    assert_eq!(created_memory_ids.len(), 1);

    for old_id in [&old_1, &old_2] {
        let old = graph.get_memory_by_id(old_id).await.unwrap().unwrap();
        assert_eq!(old.invalid_at, Some(ts));
    }

    let chain = graph.invalidation_chain(&created_memory_ids[0], 2).await.unwrap();
    assert_eq!(chain.len(), 2);
}

#[tokio::test]
async fn scenario_f_hyde_is_skipped_on_an_empty_graph() {
    let graph = InMemoryGraphStore::new();
    let ts: DateTime<Utc> = "2026-03-01T00:00:00Z".parse().unwrap();

    // No HyDE response queued: if branch A called the HyDE agent
    // anyway it would consume entity-extract's slot, fail to parse
    // against entity-extract's expectations, and the run would error
    // out after exhausting retries.
    let responses = vec![entity_extract_empty_response(), memory_extract_response("USER likes hiking"), json!({"resolutions": [{"action": "ADD"}]})];
    let llm = ScriptedLlmClient::new(responses);
    let note = "I like hiking";
    let embedder = embedder(note);
    let config = ConsolidationConfig::default();

    let result = consolidate(&graph, &embedder, &llm, note, ts, &config).await.unwrap();

    match result.outcome {
        ConsolidationOutcome::Written { created_memory_ids, .. } => assert_eq!(created_memory_ids.len(), 1),
        ConsolidationOutcome::Skipped { reason } => panic!("expected a write, got skipped: {reason}"),
    }
}
