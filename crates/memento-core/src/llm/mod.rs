//! The abstract LLM collaborator (design §4.5, §4.7, §6).
//!
//! Every consolidation agent and the HyDE step call through this one
//! trait. The contract is deliberately narrow — a system prompt, a
//! rendered user message, a JSON schema the response must validate
//! against, and a few sampling knobs — because the agent runner
//! (`crate::agent`) owns retries, alignment checks, and error framing;
//! the client's only job is to produce *some* JSON and hand it back.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Sampling/shape knobs for one completion call.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A structured-JSON completion collaborator.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Ask the model to produce JSON conforming to `schema`, given a
    /// system prompt and a rendered user message. Implementations are
    /// free to enforce `schema` via provider-native structured output
    /// or by instructing the model and trusting its response — either
    /// way, returning syntactically invalid JSON is this method's
    /// failure mode, not the caller's; callers validate semantics
    /// (schema conformance, field alignment) themselves.
    async fn complete_json(
        &self,
        system_prompt: &str,
        user_message: &str,
        schema: &Value,
        options: &CompletionOptions,
    ) -> Result<Value>;
}
