//! The graph store contract (design §6 and §4.7).
//!
//! This is the only graph surface the engine depends on. Any backing
//! store — a real graph database with vector/full-text indexes and a
//! personalized-PageRank primitive — satisfies this trait; the engine
//! never constructs SQL, Cypher, or any other query language itself.
//!
//! Transactions are modeled as a single data value ([`GraphWriteBatch`])
//! rather than a closure over a write handle: `dyn GraphStore` needs to
//! be usable as a trait object behind `Arc<dyn GraphStore>` (the
//! process-wide, thread-safe handle the design calls for), and a
//! generic `execute_transaction<F>(&self, f: F)` method would not be
//! object-safe. The consolidation pipeline plans the whole write ahead
//! of time anyway (§4.6 step 4), so handing the store one value to
//! apply atomically is a faithful, idiomatic translation of "fn
//! receives a write-only handle and either every operation commits or
//! none does" — ordering guarantees (§5.2) are the store's
//! responsibility to honor when applying the batch, not the caller's.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::Result;
use crate::model::{Entity, EntityType, Memory, Note, User};

/// Which node label a search/PPR call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLabel {
    Memory,
    Entity,
}

/// Shared options for the three search primitives.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    /// When true, exclude memories with `invalid_at` set (§3 invariant 4).
    /// Ignored for Entity searches, which have no validity concept.
    pub valid_only: bool,
}

/// One scored hit from vector/full-text/hybrid search over Memory nodes.
#[derive(Debug, Clone)]
pub struct MemoryHit {
    pub memory: Memory,
    pub score: f32,
}

/// One scored hit from hybrid search over Entity nodes.
#[derive(Debug, Clone)]
pub struct EntityHit {
    pub entity: Entity,
    pub score: f32,
}

/// A reference to an entity (or the User) that a memory is ABOUT, as
/// returned by the bulk `about` read. The literal name `"USER"` marks
/// the User target; TRACE substitutes the real display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AboutRef {
    pub id: String,
    pub name: String,
}

/// One hop of an invalidation chain, bounded to depth 2 by the caller.
#[derive(Debug, Clone)]
pub struct InvalidationNode {
    pub id: String,
    pub content: String,
    pub valid_at: Option<DateTime<Utc>>,
    pub invalid_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub invalidated: Vec<InvalidationNode>,
}

/// Entity details keyed by id, with the `isUser` flag the design calls
/// for.
#[derive(Debug, Clone)]
pub struct EntityDetails {
    pub id: String,
    pub name: String,
    pub entity_type: Option<EntityType>,
    pub description: Option<String>,
    pub is_well_known: bool,
    pub is_user: bool,
}

/// An entity slated for creation within a write batch.
#[derive(Debug, Clone)]
pub struct EntityCreate {
    pub name: String,
    pub entity_type: EntityType,
    pub description: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub is_well_known: bool,
}

/// An update to an existing entity's mutable fields (name/description/
/// embedding only — `entity_type` and `is_well_known` never change).
#[derive(Debug, Clone, Default)]
pub struct EntityUpdate {
    pub entity_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub embedding: Option<Vec<f32>>,
}

/// A memory slated for creation within a write batch.
#[derive(Debug, Clone)]
pub struct MemoryCreate {
    pub content: String,
    pub embedding: Option<Vec<f32>>,
    pub valid_at: DateTime<Utc>,
}

/// One ABOUT edge to create, keyed by the create-batch's memory index
/// rather than a not-yet-assigned memory id.
#[derive(Debug, Clone)]
pub struct AboutCreate {
    pub memory_index: usize,
    pub target: AboutCreateTarget,
}

#[derive(Debug, Clone)]
pub enum AboutCreateTarget {
    Entity { entity_id: String },
    /// References an entity being created in the same batch, by index
    /// into `entities_to_create`.
    NewEntity { entity_index: usize },
    User,
}

/// One INVALIDATES edge to create, referencing the new memory by
/// batch index and the superseded memory by its existing id.
#[derive(Debug, Clone)]
pub struct InvalidatesCreate {
    pub memory_index: usize,
    pub target_memory_id: String,
    pub reason: String,
}

/// An optional update to the User singleton, applied before entities
/// and memories within the same batch.
#[derive(Debug, Clone, Default)]
pub struct UserUpsert {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub embedding: Option<Vec<f32>>,
}

/// Everything the consolidation pipeline plans to write, applied as
/// one all-or-nothing unit (design §4.6 step 4, §5.2 write ordering).
#[derive(Debug, Clone, Default)]
pub struct GraphWriteBatch {
    pub user_upsert: Option<UserUpsert>,
    pub note: Option<(String, DateTime<Utc>)>,
    pub entities_to_create: Vec<EntityCreate>,
    pub entities_to_update: Vec<EntityUpdate>,
    pub memories_to_create: Vec<MemoryCreate>,
    pub about_edges: Vec<AboutCreate>,
    /// Extracted-from edges, one per created memory (by memory index);
    /// the note id is resolved by the store once it creates the note.
    pub extracted_from_for_all_memories: bool,
    pub invalidates_edges: Vec<InvalidatesCreate>,
    /// Distinct entity ids/new-entity-indices the note mentions.
    pub mentions: Vec<AboutCreateTarget>,
}

/// The result of committing a [`GraphWriteBatch`]: the ids the store
/// assigned to newly created nodes, in the same order they were
/// requested.
#[derive(Debug, Clone, Default)]
pub struct CommitResult {
    pub note_id: Option<String>,
    pub created_entity_ids: Vec<String>,
    pub created_memory_ids: Vec<String>,
}

/// The abstract graph store contract. See design §6 for the full
/// operation list this mirrors.
#[async_trait]
pub trait GraphStore: Send + Sync {
    // ---- Node CRUD -------------------------------------------------
    async fn create_or_merge_entity(
        &self,
        name: &str,
        entity_type: EntityType,
        is_well_known: bool,
    ) -> Result<Entity>;

    async fn get_entity_by_id(&self, id: &str) -> Result<Option<Entity>>;
    async fn get_entity_by_name(&self, name: &str) -> Result<Option<Entity>>;
    async fn get_memory_by_id(&self, id: &str) -> Result<Option<Memory>>;

    async fn update_entity(&self, update: &EntityUpdate) -> Result<()>;

    // ---- User singleton ---------------------------------------------
    async fn get_user(&self) -> Result<Option<User>>;
    async fn get_or_create_user(&self, default_name: &str) -> Result<User>;
    async fn update_user(&self, upsert: &UserUpsert) -> Result<()>;

    // ---- Search primitives -------------------------------------------
    async fn search_vector(
        &self,
        label: NodeLabel,
        vector: &[f32],
        k: usize,
        options: SearchOptions,
    ) -> Result<Vec<MemoryHit>>;

    async fn search_fulltext(
        &self,
        label: NodeLabel,
        query: &str,
        k: usize,
        options: SearchOptions,
    ) -> Result<Vec<MemoryHit>>;

    async fn search_hybrid_entities(
        &self,
        query: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<EntityHit>>;

    // ---- Graph algorithms ----------------------------------------------
    /// Personalized PageRank seeded at `source_entity_ids`, filtered to
    /// valid memories.
    async fn personalized_page_rank(
        &self,
        source_entity_ids: &[String],
        damping: f64,
        iterations: usize,
        limit: usize,
    ) -> Result<Vec<(Memory, f64)>>;

    /// ANCHOR's structural signal: each entity's graph degree (count of
    /// incident edges of any kind).
    async fn entity_degrees(&self, entity_ids: &[String]) -> Result<HashMap<String, u64>>;

    // ---- Bulk reads -----------------------------------------------------
    async fn about_refs_for_memories(&self, memory_ids: &[String]) -> Result<HashMap<String, Vec<AboutRef>>>;

    async fn invalidation_chain(&self, memory_id: &str, max_depth: usize) -> Result<Vec<InvalidationNode>>;

    async fn provenance_note_for_memory(&self, memory_id: &str) -> Result<Option<Note>>;

    /// Keyed by id rather than display name: TRACE substitutes the
    /// User's real display name into `MemoryOutput::about`, so a
    /// name-keyed lookup would miss the User (and any entity whose
    /// display name changed since the memory was written).
    async fn entity_details_by_id(&self, ids: &[String]) -> Result<HashMap<String, EntityDetails>>;

    // ---- Transactions -----------------------------------------------------
    async fn commit(&self, batch: GraphWriteBatch) -> Result<CommitResult>;
}
