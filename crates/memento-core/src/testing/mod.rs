//! Deterministic test doubles for the three external collaborators.
//!
//! Gated behind `#[cfg(any(test, feature = "testing"))]` so inline unit
//! tests across the crate and the `memento-shell` demo mode share one
//! implementation instead of each hand-rolling a mock.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::embedding_client::EmbeddingClient;
use crate::error::{EngineError, Result};
use crate::graph::{
    AboutCreateTarget, AboutRef, CommitResult, EntityDetails, EntityHit, EntityUpdate, GraphStore, GraphWriteBatch,
    InvalidationNode, MemoryHit, NodeLabel, SearchOptions, UserUpsert,
};
use crate::llm::{CompletionOptions, LlmClient};
use crate::math::cosine_similarity;
use crate::model::{new_id, AboutEdge, AboutTarget, Entity, EntityType, ExtractedFromEdge, InvalidatesEdge, Memory, MentionsEdge, Note, User, USER_ID};

#[derive(Default)]
struct Inner {
    user: Option<User>,
    entities: HashMap<String, Entity>,
    memories: HashMap<String, Memory>,
    notes: HashMap<String, Note>,
    about_edges: Vec<AboutEdge>,
    extracted_from_edges: Vec<ExtractedFromEdge>,
    mentions_edges: Vec<MentionsEdge>,
    invalidates_edges: Vec<InvalidatesEdge>,
}

/// A single-process, in-memory [`GraphStore`]: cosine similarity for
/// vector search, naive token overlap for full text, and a one-hop
/// degree count. Good enough to exercise every pipeline invariant
/// without a real graph database.
pub struct InMemoryGraphStore {
    inner: RwLock<Inner>,
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self { inner: RwLock::new(Inner::default()) }
    }

    fn token_overlap_score(query: &str, text: &str) -> f32 {
        let q: Vec<String> = query.split_whitespace().map(|t| t.to_lowercase()).collect();
        if q.is_empty() {
            return 0.0;
        }
        let text_lower = text.to_lowercase();
        let hits = q.iter().filter(|t| text_lower.contains(t.as_str())).count();
        hits as f32 / q.len() as f32
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn create_or_merge_entity(&self, name: &str, entity_type: EntityType, is_well_known: bool) -> Result<Entity> {
        let mut inner = self.inner.write().unwrap();
        if let Some(existing) = inner.entities.values().find(|e| e.name.eq_ignore_ascii_case(name)) {
            return Ok(existing.clone());
        }
        let entity = Entity::new(new_id(), name, entity_type, is_well_known, Utc::now());
        inner.entities.insert(entity.id.clone(), entity.clone());
        Ok(entity)
    }

    async fn get_entity_by_id(&self, id: &str) -> Result<Option<Entity>> {
        Ok(self.inner.read().unwrap().entities.get(id).cloned())
    }

    async fn get_entity_by_name(&self, name: &str) -> Result<Option<Entity>> {
        Ok(self.inner.read().unwrap().entities.values().find(|e| e.name.eq_ignore_ascii_case(name)).cloned())
    }

    async fn get_memory_by_id(&self, id: &str) -> Result<Option<Memory>> {
        Ok(self.inner.read().unwrap().memories.get(id).cloned())
    }

    async fn update_entity(&self, update: &EntityUpdate) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let entity = inner
            .entities
            .get_mut(&update.entity_id)
            .ok_or_else(|| EngineError::GraphConstraint(format!("no such entity '{}'", update.entity_id)))?;
        if let Some(name) = &update.name {
            entity.name = name.clone();
        }
        if let Some(description) = &update.description {
            entity.description = Some(description.clone());
        }
        if let Some(embedding) = &update.embedding {
            entity.embedding = Some(embedding.clone());
        }
        entity.updated_at = Utc::now();
        Ok(())
    }

    async fn get_user(&self) -> Result<Option<User>> {
        Ok(self.inner.read().unwrap().user.clone())
    }

    async fn get_or_create_user(&self, default_name: &str) -> Result<User> {
        let mut inner = self.inner.write().unwrap();
        if let Some(user) = &inner.user {
            return Ok(user.clone());
        }
        let user = User::new(default_name, Utc::now());
        inner.user = Some(user.clone());
        Ok(user)
    }

    async fn update_user(&self, upsert: &UserUpsert) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let now = Utc::now();
        let user = inner.user.get_or_insert_with(|| User::new("user", now));
        if let Some(name) = &upsert.display_name {
            user.display_name = name.clone();
        }
        if let Some(description) = &upsert.description {
            user.description = Some(description.clone());
        }
        if let Some(embedding) = &upsert.embedding {
            user.embedding = Some(embedding.clone());
        }
        user.updated_at = now;
        Ok(())
    }

    async fn search_vector(&self, label: NodeLabel, vector: &[f32], k: usize, options: SearchOptions) -> Result<Vec<MemoryHit>> {
        let inner = self.inner.read().unwrap();
        if label != NodeLabel::Memory {
            return Ok(Vec::new());
        }
        let mut hits: Vec<MemoryHit> = inner
            .memories
            .values()
            .filter(|m| !options.valid_only || m.is_valid())
            .filter_map(|m| m.embedding.as_ref().map(|e| MemoryHit { memory: m.clone(), score: cosine_similarity(vector, e) }))
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    async fn search_fulltext(&self, label: NodeLabel, query: &str, k: usize, options: SearchOptions) -> Result<Vec<MemoryHit>> {
        let inner = self.inner.read().unwrap();
        if label != NodeLabel::Memory {
            return Ok(Vec::new());
        }
        let mut hits: Vec<MemoryHit> = inner
            .memories
            .values()
            .filter(|m| !options.valid_only || m.is_valid())
            .map(|m| MemoryHit { memory: m.clone(), score: Self::token_overlap_score(query, &m.content) })
            .filter(|h| h.score > 0.0)
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    async fn search_hybrid_entities(&self, query: &str, vector: &[f32], k: usize) -> Result<Vec<EntityHit>> {
        let inner = self.inner.read().unwrap();
        let mut hits: Vec<EntityHit> = inner
            .entities
            .values()
            .map(|e| {
                let semantic = e.embedding.as_ref().map(|emb| cosine_similarity(vector, emb)).unwrap_or(0.0);
                let lexical = Self::token_overlap_score(query, &e.name);
                EntityHit { entity: e.clone(), score: semantic.max(lexical) }
            })
            .filter(|h| h.score > 0.0)
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    async fn personalized_page_rank(&self, source_entity_ids: &[String], _damping: f64, _iterations: usize, limit: usize) -> Result<Vec<(Memory, f64)>> {
        let inner = self.inner.read().unwrap();
        let sources: std::collections::HashSet<&str> = source_entity_ids.iter().map(String::as_str).collect();
        let mut scored: HashMap<String, f64> = HashMap::new();
        for edge in &inner.about_edges {
            if let AboutTarget::Entity { entity_id } = &edge.target {
                if sources.contains(entity_id.as_str()) {
                    *scored.entry(edge.memory_id.clone()).or_insert(0.0) += 1.0;
                }
            }
        }
        let mut out: Vec<(Memory, f64)> = scored
            .into_iter()
            .filter_map(|(id, score)| inner.memories.get(&id).filter(|m| m.is_valid()).map(|m| (m.clone(), score)))
            .collect();
        out.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        out.truncate(limit);
        Ok(out)
    }

    async fn entity_degrees(&self, entity_ids: &[String]) -> Result<HashMap<String, u64>> {
        let inner = self.inner.read().unwrap();
        let mut degrees: HashMap<String, u64> = entity_ids.iter().map(|id| (id.clone(), 0)).collect();
        for edge in &inner.about_edges {
            if let AboutTarget::Entity { entity_id } = &edge.target {
                if let Some(d) = degrees.get_mut(entity_id) {
                    *d += 1;
                }
            }
        }
        for edge in &inner.mentions_edges {
            if let Some(d) = degrees.get_mut(&edge.entity_id) {
                *d += 1;
            }
        }
        Ok(degrees)
    }

    async fn about_refs_for_memories(&self, memory_ids: &[String]) -> Result<HashMap<String, Vec<AboutRef>>> {
        let inner = self.inner.read().unwrap();
        let wanted: std::collections::HashSet<&str> = memory_ids.iter().map(String::as_str).collect();
        let mut out: HashMap<String, Vec<AboutRef>> = HashMap::new();
        for edge in &inner.about_edges {
            if !wanted.contains(edge.memory_id.as_str()) {
                continue;
            }
            let about_ref = match &edge.target {
                AboutTarget::User => AboutRef { id: USER_ID.to_string(), name: "USER".to_string() },
                AboutTarget::Entity { entity_id } => {
                    let name = inner.entities.get(entity_id).map(|e| e.name.clone()).unwrap_or_default();
                    AboutRef { id: entity_id.clone(), name }
                }
            };
            out.entry(edge.memory_id.clone()).or_default().push(about_ref);
        }
        Ok(out)
    }

    async fn invalidation_chain(&self, memory_id: &str, max_depth: usize) -> Result<Vec<InvalidationNode>> {
        let inner = self.inner.read().unwrap();
        fn build(inner: &Inner, memory_id: &str, depth: usize) -> Vec<InvalidationNode> {
            if depth == 0 {
                return Vec::new();
            }
            inner
                .invalidates_edges
                .iter()
                .filter(|e| e.source_memory_id == memory_id)
                .filter_map(|e| {
                    inner.memories.get(&e.target_memory_id).map(|m| InvalidationNode {
                        id: m.id.clone(),
                        content: m.content.clone(),
                        valid_at: m.valid_at,
                        invalid_at: m.invalid_at,
                        reason: Some(e.reason.clone()),
                        invalidated: build(inner, &m.id, depth - 1),
                    })
                })
                .collect()
        }
        Ok(build(&inner, memory_id, max_depth))
    }

    async fn provenance_note_for_memory(&self, memory_id: &str) -> Result<Option<Note>> {
        let inner = self.inner.read().unwrap();
        let note_id = inner.extracted_from_edges.iter().find(|e| e.memory_id == memory_id).map(|e| e.note_id.clone());
        Ok(note_id.and_then(|id| inner.notes.get(&id).cloned()))
    }

    async fn entity_details_by_id(&self, ids: &[String]) -> Result<HashMap<String, EntityDetails>> {
        let inner = self.inner.read().unwrap();
        let mut out = HashMap::new();
        for id in ids {
            if id == USER_ID {
                if let Some(user) = &inner.user {
                    out.insert(
                        id.clone(),
                        EntityDetails {
                            id: user.id.clone(),
                            name: user.display_name.clone(),
                            entity_type: None,
                            description: user.description.clone(),
                            is_well_known: false,
                            is_user: true,
                        },
                    );
                }
                continue;
            }
            if let Some(entity) = inner.entities.get(id) {
                out.insert(
                    id.clone(),
                    EntityDetails {
                        id: entity.id.clone(),
                        name: entity.name.clone(),
                        entity_type: Some(entity.entity_type),
                        description: entity.description.clone(),
                        is_well_known: entity.is_well_known,
                        is_user: false,
                    },
                );
            }
        }
        Ok(out)
    }

    async fn commit(&self, batch: GraphWriteBatch) -> Result<CommitResult> {
        let mut inner = self.inner.write().unwrap();
        let now = Utc::now();

        if let Some(upsert) = &batch.user_upsert {
            let user = inner.user.get_or_insert_with(|| User::new("user", now));
            if let Some(name) = &upsert.display_name {
                user.display_name = name.clone();
            }
            if let Some(description) = &upsert.description {
                user.description = Some(description.clone());
            }
            if let Some(embedding) = &upsert.embedding {
                user.embedding = Some(embedding.clone());
            }
            user.updated_at = now;
        }

        let note_id = batch.note.as_ref().map(|(content, timestamp)| {
            let note = Note::new(new_id(), content.clone(), *timestamp);
            let id = note.id.clone();
            inner.notes.insert(id.clone(), note);
            id
        });

        let mut created_entity_ids: Vec<String> = Vec::with_capacity(batch.entities_to_create.len());
        for create in &batch.entities_to_create {
            let mut entity = Entity::new(new_id(), create.name.clone(), create.entity_type, create.is_well_known, now);
            entity.description = create.description.clone();
            entity.embedding = create.embedding.clone();
            created_entity_ids.push(entity.id.clone());
            inner.entities.insert(entity.id.clone(), entity);
        }

        for update in &batch.entities_to_update {
            if let Some(entity) = inner.entities.get_mut(&update.entity_id) {
                if let Some(name) = &update.name {
                    entity.name = name.clone();
                }
                if let Some(description) = &update.description {
                    entity.description = Some(description.clone());
                }
                if let Some(embedding) = &update.embedding {
                    entity.embedding = Some(embedding.clone());
                }
                entity.updated_at = now;
            }
        }

        let resolve_target = |target: &AboutCreateTarget, created: &[String]| -> Option<String> {
            match target {
                AboutCreateTarget::Entity { entity_id } => Some(entity_id.clone()),
                AboutCreateTarget::NewEntity { entity_index } => created.get(*entity_index).cloned(),
                AboutCreateTarget::User => None,
            }
        };

        let mut created_memory_ids: Vec<String> = Vec::with_capacity(batch.memories_to_create.len());
        for create in &batch.memories_to_create {
            let mut memory = Memory::new(new_id(), create.content.clone(), now);
            memory.embedding = create.embedding.clone();
            memory.valid_at = Some(create.valid_at);
            created_memory_ids.push(memory.id.clone());
            inner.memories.insert(memory.id.clone(), memory);
        }

        for about in &batch.about_edges {
            let Some(memory_id) = created_memory_ids.get(about.memory_index).cloned() else { continue };
            let target = match &about.target {
                AboutCreateTarget::User => AboutTarget::User,
                other => match resolve_target(other, &created_entity_ids) {
                    Some(entity_id) => AboutTarget::Entity { entity_id },
                    None => continue,
                },
            };
            inner.about_edges.push(AboutEdge { id: new_id(), memory_id, target, created_at: now });
        }

        if batch.extracted_from_for_all_memories {
            if let Some(note_id) = &note_id {
                for memory_id in &created_memory_ids {
                    inner.extracted_from_edges.push(ExtractedFromEdge {
                        id: new_id(),
                        memory_id: memory_id.clone(),
                        note_id: note_id.clone(),
                        created_at: now,
                    });
                }
            }
        }

        for invalidates in &batch.invalidates_edges {
            let Some(source_memory_id) = created_memory_ids.get(invalidates.memory_index).cloned() else { continue };
            let Some(effective_at) = batch.memories_to_create.get(invalidates.memory_index).map(|m| m.valid_at) else { continue };
            if let Some(target) = inner.memories.get_mut(&invalidates.target_memory_id) {
                target.invalid_at = Some(effective_at);
            }
            inner.invalidates_edges.push(InvalidatesEdge {
                id: new_id(),
                source_memory_id,
                target_memory_id: invalidates.target_memory_id.clone(),
                reason: invalidates.reason.clone(),
                created_at: now,
            });
        }

        if let Some(note_id) = &note_id {
            for mention in &batch.mentions {
                if let Some(entity_id) = resolve_target(mention, &created_entity_ids) {
                    inner.mentions_edges.push(MentionsEdge { id: new_id(), note_id: note_id.clone(), entity_id, created_at: now });
                }
            }
        }

        Ok(CommitResult { note_id, created_entity_ids, created_memory_ids })
    }
}

/// A fixed-vector embedding client: returns the same vector for the
/// same input text (by simple hashing), and lets tests pre-register
/// exact responses for specific inputs.
pub struct ScriptedEmbeddingClient {
    dimensions: usize,
    overrides: HashMap<String, Vec<f32>>,
}

impl ScriptedEmbeddingClient {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, overrides: HashMap::new() }
    }

    pub fn with_override(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.overrides.insert(text.into(), vector);
        self
    }

    fn hash_embed(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut out = vec![0.0f32; self.dimensions];
        for (i, word) in text.split_whitespace().enumerate() {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() as usize + i) % self.dimensions;
            out[bucket] += 1.0;
        }
        let norm: f32 = out.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut out {
                *v /= norm;
            }
        }
        out
    }
}

#[async_trait]
impl EmbeddingClient for ScriptedEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(vector) = self.overrides.get(text) {
            return Ok(vector.clone());
        }
        Ok(self.hash_embed(text))
    }
}

/// Replays a fixed queue of JSON responses, one per `complete_json`
/// call, regardless of the prompt. Panics (via an error) once the
/// queue is exhausted so a test surfaces an unexpected extra call.
pub struct ScriptedLlmClient {
    responses: RwLock<Vec<Value>>,
}

impl ScriptedLlmClient {
    pub fn new(responses: Vec<Value>) -> Self {
        let mut responses = responses;
        responses.reverse();
        Self { responses: RwLock::new(responses) }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete_json(&self, _system_prompt: &str, _user_message: &str, _schema: &Value, _options: &CompletionOptions) -> Result<Value> {
        let mut responses = self.responses.write().unwrap();
        responses.pop().ok_or_else(|| EngineError::DependencyUnavailable("scripted LLM client ran out of responses".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_round_trips_a_note_write() {
        let store = InMemoryGraphStore::new();
        let batch = GraphWriteBatch {
            note: Some(("USER likes Rust".to_string(), Utc::now())),
            entities_to_create: vec![crate::graph::EntityCreate {
                name: "Rust".to_string(),
                entity_type: EntityType::Technology,
                description: Some("A systems language".to_string()),
                embedding: Some(vec![1.0, 0.0]),
                is_well_known: true,
            }],
            about_edges: vec![crate::graph::AboutCreate { memory_index: 0, target: AboutCreateTarget::NewEntity { entity_index: 0 } }],
            memories_to_create: vec![crate::graph::MemoryCreate { content: "USER likes Rust".to_string(), embedding: Some(vec![1.0, 0.0]), valid_at: Utc::now() }],
            extracted_from_for_all_memories: true,
            mentions: vec![AboutCreateTarget::NewEntity { entity_index: 0 }],
            ..Default::default()
        };
        let result = store.commit(batch).await.unwrap();
        assert_eq!(result.created_entity_ids.len(), 1);
        assert_eq!(result.created_memory_ids.len(), 1);

        let refs = store.about_refs_for_memories(&result.created_memory_ids).await.unwrap();
        assert_eq!(refs[&result.created_memory_ids[0]][0].name, "Rust");
    }

    #[tokio::test]
    async fn scripted_llm_client_replays_in_order_then_errors() {
        let client = ScriptedLlmClient::new(vec![serde_json::json!({"a": 1}), serde_json::json!({"a": 2})]);
        let options = CompletionOptions { temperature: 0.2, max_tokens: 100 };
        let first = client.complete_json("sys", "user", &serde_json::json!({}), &options).await.unwrap();
        assert_eq!(first, serde_json::json!({"a": 1}));
        let second = client.complete_json("sys", "user", &serde_json::json!({}), &options).await.unwrap();
        assert_eq!(second, serde_json::json!({"a": 2}));
        let third = client.complete_json("sys", "user", &serde_json::json!({}), &options).await;
        assert!(third.is_err());
    }

    #[tokio::test]
    async fn scripted_embedding_client_is_deterministic() {
        let client = ScriptedEmbeddingClient::new(16);
        let a = client.embed("hello world").await.unwrap();
        let b = client.embed("hello world").await.unwrap();
        assert_eq!(a, b);
    }
}
