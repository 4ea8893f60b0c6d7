//! # Memento Core
//!
//! A personal-memory engine that sits between a chat client and an
//! LLM, maintaining a knowledge graph of entities, memories, and notes
//! and running two pipelines:
//!
//! - **Consolidation** (`consolidation::consolidate`): turns one note
//!   into graph writes, extracting entities and memories, reconciling
//!   them against what the graph already knows, and committing the
//!   result atomically.
//! - **Retrieval** (`retrieval::retrieve`): answers a query with a
//!   ranked set of memories and their surrounding context, through
//!   five stages — LAND, ANCHOR, EXPAND, DISTILL, TRACE.
//!
//! The engine never talks to a graph database, an embedding provider,
//! or an LLM directly. It depends on three abstract collaborators —
//! [`graph::GraphStore`], [`embedding_client::EmbeddingClient`], and
//! [`llm::LlmClient`] — so any concrete backend can be swapped in
//! behind `Arc<dyn ...>` without touching pipeline logic. The
//! `testing` feature bundles reference in-memory implementations of
//! all three for the test suite and the `memento-shell` demo.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod config;
pub mod stats;

pub mod model;
pub mod math;
pub mod weighting;

pub mod graph;
pub mod embedding_client;
pub mod llm;

pub mod agent;
pub mod agents;

pub mod retrieval;
pub mod consolidation;
pub mod format;

#[cfg(any(test, feature = "testing"))]
#[cfg_attr(docsrs, doc(cfg(feature = "testing")))]
pub mod testing;

pub use config::{AgentConfig, ConsolidationConfig, RetrievalConfig};
pub use consolidation::{consolidate, ConsolidationOutcome, ConsolidationResult};
pub use error::{EngineError, Result};
pub use retrieval::{retrieve, RetrievalOutput};
pub use stats::RunStats;

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::config::{AgentConfig, ConsolidationConfig, RetrievalConfig};
    pub use crate::consolidation::{consolidate, ConsolidationOutcome, ConsolidationResult};
    pub use crate::embedding_client::EmbeddingClient;
    pub use crate::error::{EngineError, Result};
    pub use crate::graph::GraphStore;
    pub use crate::llm::LlmClient;
    pub use crate::retrieval::{retrieve, RetrievalOutput};
    pub use crate::stats::RunStats;

    #[cfg(any(test, feature = "testing"))]
    pub use crate::testing::{InMemoryGraphStore, ScriptedEmbeddingClient, ScriptedLlmClient};
}
