//! `memento` — a thin CLI shell over `memento-core`'s consolidation
//! and retrieval pipelines.
//!
//! This binary wires the engine's three abstract collaborators to the
//! bundled in-memory/scripted reference implementations
//! (`memento_core::testing`, gated behind the crate's `testing`
//! feature) so the pipelines can be driven from a terminal without a
//! real graph database, embedding provider, or LLM. Production
//! deployments are expected to implement `GraphStore`, `EmbeddingClient`,
//! and `LlmClient` against real backends and link `memento-core`
//! directly; this shell is a demo and scripting surface, not a server.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use memento_core::config::{ConsolidationConfig, RetrievalConfig};
use memento_core::testing::{InMemoryGraphStore, ScriptedEmbeddingClient, ScriptedLlmClient};
use memento_core::{consolidate, retrieve, ConsolidationOutcome};

#[derive(Parser)]
#[command(name = "memento", version, about = "Consolidation and retrieval over a personal knowledge graph")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Consolidate a note against a scripted LLM/embedding session.
    Consolidate {
        /// The note text to consolidate.
        note: String,
        /// Path to a JSON file holding the ordered array of LLM
        /// responses this run will replay (entity-extract,
        /// entity-resolver, memory-extract, memory-resolver, in order,
        /// with an optional hyde response first if branch A retrieves
        /// existing context).
        #[arg(long)]
        script: PathBuf,
    },
    /// Retrieve memories for a query against an empty in-memory graph.
    Retrieve {
        /// The query text.
        query: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let graph = InMemoryGraphStore::new();
    let embedder = ScriptedEmbeddingClient::new(256);

    match cli.command {
        Command::Consolidate { note, script } => {
            let raw = std::fs::read_to_string(&script)?;
            let responses: Vec<serde_json::Value> = serde_json::from_str(&raw)?;
            let llm = ScriptedLlmClient::new(responses);
            let config = ConsolidationConfig::default();
            let result = consolidate(&graph, &embedder, &llm, &note, chrono::Utc::now(), &config).await?;
            match result.outcome {
                ConsolidationOutcome::Written { note_id, created_entity_ids, created_memory_ids } => {
                    println!("wrote note {note_id}: {} entities, {} memories", created_entity_ids.len(), created_memory_ids.len());
                }
                ConsolidationOutcome::Skipped { reason } => println!("skipped: {reason}"),
            }
            println!("{:?}", result.stats);
        }
        Command::Retrieve { query } => {
            let query_embedding = {
                use memento_core::prelude::EmbeddingClient;
                embedder.embed(&query).await?
            };
            let config = RetrievalConfig::default();
            let (output, stats) = retrieve(&graph, &query, &query_embedding, &config).await?;
            let rendered = memento_core::format::render(&output, chrono::Utc::now());
            println!("{rendered}");
            println!("{stats:?}");
        }
    }

    Ok(())
}
