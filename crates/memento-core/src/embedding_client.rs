//! The abstract embedding collaborator (design §4.7, §6).
//!
//! The engine never talks to an embedding provider directly; it only
//! ever asks `dyn EmbeddingClient` for vectors. Dimensionality is a
//! property of the concrete client, not something the engine checks —
//! it treats embeddings as opaque `Vec<f32>` and only ever compares
//! vectors that came from the same client.

use async_trait::async_trait;

use crate::error::Result;

/// Produces embedding vectors for text. Implementations decide model,
/// dimensionality, batching strategy, and retry behavior.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Default implementation calls [`EmbeddingClient::embed`] once per
    /// item; clients backed by a batch-capable API should override this.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}
