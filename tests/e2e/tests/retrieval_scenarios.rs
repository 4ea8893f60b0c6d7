//! End-to-end retrieval scenarios (design §8 scenarios D and E).
//!
//! Each scenario seeds an `InMemoryGraphStore` directly through the
//! public `GraphStore::commit` API (no LLM involved — the retrieval
//! pipeline never calls one), then drives `retrieve()` and, for
//! scenario E, `format::render()` against the result.

use chrono::{DateTime, Utc};

use memento_core::config::RetrievalConfig;
use memento_core::format;
use memento_core::graph::{AboutCreate, AboutCreateTarget, EntityCreate, GraphWriteBatch, MemoryCreate};
use memento_core::model::EntityType;
use memento_core::prelude::{EmbeddingClient, GraphStore};
use memento_core::retrieve;
use memento_core::testing::{InMemoryGraphStore, ScriptedEmbeddingClient};

const QUERY_VECTOR: [f32; 3] = [1.0, 0.0, 0.0];

#[tokio::test]
async fn scenario_d_basic_retrieval_surfaces_the_seeded_memory() {
    let graph = InMemoryGraphStore::new();
    let valid_at: DateTime<Utc> = "2026-01-10T08:00:00Z".parse().unwrap();

    let entity_batch = GraphWriteBatch {
        entities_to_create: vec![EntityCreate {
            name: "Rust".to_string(),
            entity_type: EntityType::Technology,
            description: Some("A systems programming language".to_string()),
            embedding: Some(QUERY_VECTOR.to_vec()),
            is_well_known: false,
        }],
        ..Default::default()
    };
    let entity_result = graph.commit(entity_batch).await.unwrap();
    let entity_id = entity_result.created_entity_ids[0].clone();

    let memory_batch = GraphWriteBatch {
        memories_to_create: vec![MemoryCreate {
            content: "USER started learning Rust".to_string(),
            embedding: Some(QUERY_VECTOR.to_vec()),
            valid_at,
        }],
        about_edges: vec![AboutCreate { memory_index: 0, target: AboutCreateTarget::Entity { entity_id: entity_id.clone() } }],
        ..Default::default()
    };
    graph.commit(memory_batch).await.unwrap();

    let embedder = ScriptedEmbeddingClient::new(3).with_override("what is the user learning", QUERY_VECTOR.to_vec());
    let query_embedding = embedder.embed("what is the user learning").await.unwrap();

    let config = RetrievalConfig::default();
    let (output, stats) = retrieve(&graph, "what is the user learning", &query_embedding, &config).await.unwrap();

    assert_eq!(output.memories.len(), 1);
    let memory = &output.memories[0];
    assert_eq!(memory.content, "USER started learning Rust");
    assert_eq!(memory.about, vec!["Rust".to_string()]);
    assert_eq!(memory.about_entity_ids, vec![entity_id.clone()]);
    assert!(memory.score > 0.0);

    assert_eq!(output.entities.len(), 1);
    assert_eq!(output.entities[0].id, entity_id);
    assert_eq!(output.entities[0].memory_count, 1);

    assert!(stats.graph_reads > 0);
}

#[tokio::test]
async fn scenario_e_format_stability_renders_the_extracted_from_tag() {
    let graph = InMemoryGraphStore::new();
    let note_timestamp: DateTime<Utc> = "2026-01-05T09:00:00Z".parse().unwrap();
    let valid_at = note_timestamp;

    let batch = GraphWriteBatch {
        note: Some(("Started learning Rust this week".to_string(), note_timestamp)),
        memories_to_create: vec![MemoryCreate { content: "USER started learning Rust".to_string(), embedding: Some(QUERY_VECTOR.to_vec()), valid_at }],
        about_edges: vec![AboutCreate { memory_index: 0, target: AboutCreateTarget::User }],
        extracted_from_for_all_memories: true,
        ..Default::default()
    };
    graph.commit(batch).await.unwrap();

    let embedder = ScriptedEmbeddingClient::new(3).with_override("what does the user know", QUERY_VECTOR.to_vec());
    let query_embedding = embedder.embed("what does the user know").await.unwrap();

    let config = RetrievalConfig::default();
    let (output, _stats) = retrieve(&graph, "what does the user know", &query_embedding, &config).await.unwrap();
    assert_eq!(output.memories.len(), 1);
    assert!(output.memories[0].extracted_from.is_some());

    let rendered = format::render(&output, "2026-07-30T12:00:00Z".parse().unwrap());

    assert!(rendered.contains("<extracted_from note_id=\"note-01\"/>"));
    assert_eq!(rendered.matches("<note id=\"note-01\"").count(), 1);
    assert!(rendered.contains("Started learning Rust this week"));
}
