//! Engine-wide error type.
//!
//! One enum per the six semantic error kinds in the design: malformed
//! input, agent schema/alignment failures, and the two graph failure
//! modes plus a generic dependency failure for the embedding/LLM
//! clients. Variants carry enough context to name the agent or
//! collaborator at fault without leaking internal representations.

use thiserror::Error;

/// Errors surfaced by the consolidation and retrieval pipelines.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed note or query: empty content, non-ISO timestamp, etc.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An agent's LLM call returned structurally invalid JSON after
    /// every strategy and retry.
    #[error("agent '{agent}' returned invalid output: {cause}")]
    AgentSchema { agent: &'static str, cause: String },

    /// An agent returned a response whose shape doesn't line up with
    /// its input: wrong list length, or a decision naming an entity
    /// absent from the input list.
    #[error("agent '{agent}' misaligned with its input: {cause}")]
    AgentAlignment { agent: &'static str, cause: String },

    /// The graph client reported a transient failure (connection loss,
    /// deadlock, timeout) and its own retries were exhausted.
    #[error("graph store unavailable: {0}")]
    GraphTransient(String),

    /// The graph client rejected a write due to a constraint violation
    /// (e.g. a uniqueness constraint). Never retried.
    #[error("graph constraint violated: {0}")]
    GraphConstraint(String),

    /// The embedding or LLM client failed after its own internal
    /// retries.
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),
}

/// Result type used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;
