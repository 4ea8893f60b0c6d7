//! Consolidation branch A: embed the note, retrieve existing context,
//! then widen recall with HyDE (design §4.6 step 2, branch A).

use std::collections::HashMap;

use futures::future::try_join_all;

use crate::agent::run_agent;
use crate::agents::hyde;
use crate::config::ConsolidationConfig;
use crate::embedding_client::EmbeddingClient;
use crate::error::Result;
use crate::graph::{GraphStore, NodeLabel, SearchOptions};
use crate::llm::LlmClient;
use crate::retrieval::retrieve;
use crate::stats::RunStats;

/// One piece of existing-graph context memory-resolver will weigh the
/// newly extracted memories against.
#[derive(Debug, Clone)]
pub struct ContextMemory {
    pub id: String,
    pub content: String,
}

pub async fn run(
    graph: &dyn GraphStore,
    embedder: &dyn EmbeddingClient,
    llm: &dyn LlmClient,
    note_content: &str,
    config: &ConsolidationConfig,
) -> Result<(Vec<ContextMemory>, RunStats)> {
    let mut stats = RunStats::new();

    let note_embedding = embedder.embed(note_content).await?;

    let (retrieval_output, retrieval_stats) =
        retrieve(graph, note_content, &note_embedding, &config.retrieval).await?;
    stats.merge(retrieval_stats);

    if retrieval_output.memories.is_empty() {
        return Ok((Vec::new(), stats));
    }

    let existing_contents: Vec<String> = retrieval_output.memories.iter().map(|m| m.content.clone()).collect();
    let hyde_input = hyde::Input { existing_memory_contents: existing_contents };
    let hyde_config = crate::config::AgentConfig { temperature: config.hyde_temperature, ..config.agent };
    let hyde_out = run_agent(llm, &hyde::agent(), &hyde_input, &hyde_config, &mut stats).await?;

    let mut docs: Vec<String> = hyde_out.semantic.into_iter().map(|d| d.content).collect();
    docs.extend(hyde_out.state_change.into_iter().map(|d| d.content));
    docs.truncate(6);

    let mut hyde_scores: HashMap<String, f32> = HashMap::new();
    let mut hyde_contents: HashMap<String, String> = HashMap::new();

    if !docs.is_empty() {
        let doc_embeddings = embedder.embed_batch(&docs).await?;
        let searches = try_join_all(doc_embeddings.iter().map(|emb| {
            graph.search_vector(NodeLabel::Memory, emb, config.hyde_results_per_doc, SearchOptions { valid_only: true })
        }))
        .await?;
        for _ in &searches {
            stats.record_graph_read();
        }
        for hits in searches {
            for hit in hits {
                let entry = hyde_scores.entry(hit.memory.id.clone()).or_insert(hit.score);
                if hit.score > *entry {
                    *entry = hit.score;
                }
                hyde_contents.entry(hit.memory.id.clone()).or_insert(hit.memory.content.clone());
            }
        }
    }

    let mut merged: HashMap<String, (f32, String)> = HashMap::new();
    for memory in &retrieval_output.memories {
        merged.insert(memory.id.clone(), (memory.score, memory.content.clone()));
    }
    for (id, hyde_score) in &hyde_scores {
        let content = hyde_contents.get(id).cloned().unwrap_or_default();
        merged
            .entry(id.clone())
            .and_modify(|(score, _)| *score = score.max(*hyde_score))
            .or_insert((*hyde_score, content));
    }

    let mut ranked: Vec<(String, f32, String)> = merged.into_iter().map(|(id, (score, content))| (id, score, content)).collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(config.context_top_k);

    let context = ranked.into_iter().map(|(id, _, content)| ContextMemory { id, content }).collect();

    Ok((context, stats))
}
