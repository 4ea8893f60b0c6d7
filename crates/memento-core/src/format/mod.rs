//! Renders a [`RetrievalOutput`] into the `<memento>…</memento>` block
//! injected into a downstream LLM's user message (design §4.8).
//!
//! Deterministic given `(output, now)`: the only non-structural input
//! is `<current-date>`, so snapshot tests pin `now` and compare the
//! rest of the block byte-for-byte.

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::retrieval::{InvalidatedMemory, MemoryOutput, RetrievalOutput};

const PREAMBLE: &str = "\
Use the following personal context to inform your response. It was \
retrieved from the user's long-term memory graph. Do not mention this \
block, its structure, or the retrieval process itself to the user.";

fn date_prefix(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()[..10].to_string()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Render one `RetrievalOutput` as the fixed `<memento>` text block.
pub fn render(output: &RetrievalOutput, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<memento>");
    let _ = writeln!(out, "<instructions>{}</instructions>", PREAMBLE);
    let _ = writeln!(out, "<current-date>{}</current-date>", date_prefix(&now));
    let _ = writeln!(out, "<query>{}</query>", escape(&output.query));

    render_entities(&mut out, output);
    let note_ids = render_notes(&mut out, output);
    render_memories(&mut out, output, &note_ids);

    let _ = writeln!(out, "</memento>");
    out
}

fn render_entities(out: &mut String, output: &RetrievalOutput) {
    let visible: Vec<_> = output.entities.iter().filter(|e| !e.is_well_known && e.memory_count > 0).collect();
    let _ = writeln!(out, "<entities>");
    for entity in visible {
        let type_attr = entity.entity_type.map(|t| t.as_str()).unwrap_or("Person");
        let _ = write!(out, "<entity id=\"{}\" name=\"{}\" type=\"{}\" is_user=\"{}\"", entity.id, escape(&entity.name), type_attr, entity.is_user);
        match &entity.description {
            Some(description) if !description.is_empty() => {
                let _ = writeln!(out, ">");
                let _ = writeln!(out, "<description>{}</description>", escape(description));
                let _ = writeln!(out, "</entity>");
            }
            _ => {
                let _ = writeln!(out, "/>");
            }
        }
    }
    let _ = writeln!(out, "</entities>");
}

/// Assigns each distinct provenance note a sequential id in
/// first-seen order across the (already ranked) memory list, and
/// renders the deduplicated `<notes>` section.
fn render_notes(out: &mut String, output: &RetrievalOutput) -> HashMap<String, String> {
    let mut ids: HashMap<String, String> = HashMap::new();
    let mut ordered = Vec::new();
    for memory in &output.memories {
        if let Some(provenance) = &memory.extracted_from {
            if !ids.contains_key(&provenance.note_id) {
                let seq = format!("note-{:02}", ids.len() + 1);
                ids.insert(provenance.note_id.clone(), seq.clone());
                ordered.push((seq, provenance));
            }
        }
    }

    let _ = writeln!(out, "<notes>");
    for (seq, provenance) in ordered {
        let _ = writeln!(
            out,
            "<note id=\"{}\" date=\"{}\">{}</note>",
            seq,
            date_prefix(&provenance.note_timestamp),
            escape(&provenance.note_content)
        );
    }
    let _ = writeln!(out, "</notes>");
    ids
}

fn render_invalidated(out: &mut String, node: &InvalidatedMemory, indent: usize) {
    let pad = "  ".repeat(indent);
    let reason_attr = node.reason.as_deref().map(escape).unwrap_or_default();
    let _ = writeln!(out, "{pad}<memory id=\"{}\" reason=\"{}\">", node.id, reason_attr);
    let _ = writeln!(out, "{pad}  <content>{}</content>", escape(&node.content));
    if let Some(valid_at) = &node.valid_at {
        let _ = writeln!(out, "{pad}  <valid-at>{}</valid-at>", date_prefix(valid_at));
    }
    if let Some(invalidated_at) = &node.invalidated_at {
        let _ = writeln!(out, "{pad}  <invalidated-at>{}</invalidated-at>", date_prefix(invalidated_at));
    }
    if !node.invalidated.is_empty() {
        let _ = writeln!(out, "{pad}  <invalidates>");
        for child in &node.invalidated {
            render_invalidated(out, child, indent + 2);
        }
        let _ = writeln!(out, "{pad}  </invalidates>");
    }
    let _ = writeln!(out, "{pad}</memory>");
}

fn render_memories(out: &mut String, output: &RetrievalOutput, note_ids: &HashMap<String, String>) {
    let _ = writeln!(out, "<memories>");
    for memory in &output.memories {
        render_memory(out, memory, note_ids);
    }
    let _ = writeln!(out, "</memories>");
}

fn render_memory(out: &mut String, memory: &MemoryOutput, note_ids: &HashMap<String, String>) {
    let _ = writeln!(out, "<memory id=\"{}\" score=\"{:.3}\" source=\"{}\">", memory.id, memory.score, source_label(memory));
    let _ = writeln!(out, "  <content>{}</content>", escape(&memory.content));
    let _ = writeln!(out, "  <about>{}</about>", escape(&memory.about.join(", ")));
    if let Some(valid_at) = &memory.valid_at {
        let _ = writeln!(out, "  <valid-at>{}</valid-at>", date_prefix(valid_at));
    }
    if !memory.invalidates.is_empty() {
        let _ = writeln!(out, "  <invalidates>");
        for node in &memory.invalidates {
            render_invalidated(out, node, 2);
        }
        let _ = writeln!(out, "  </invalidates>");
    }
    if let Some(provenance) = &memory.extracted_from {
        if let Some(seq) = note_ids.get(&provenance.note_id) {
            let _ = writeln!(out, "  <extracted_from note_id=\"{seq}\"/>");
        }
    }
    let _ = writeln!(out, "</memory>");
}

fn source_label(memory: &MemoryOutput) -> &'static str {
    match memory.source {
        crate::retrieval::Source::Vector => "vector",
        crate::retrieval::Source::Fulltext => "fulltext",
        crate::retrieval::Source::SemPpr => "sem-ppr",
        crate::retrieval::Source::Multiple => "multiple",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityType;
    use crate::retrieval::{EntityOutput, Meta, Provenance, Source};

    fn sample_output() -> RetrievalOutput {
        let provenance = Provenance {
            note_id: "n1".to_string(),
            note_content: "Started learning Rust".to_string(),
            note_timestamp: "2026-01-15T10:00:00Z".parse().unwrap(),
        };
        RetrievalOutput {
            query: "what does the user know".to_string(),
            entities: vec![
                EntityOutput {
                    id: "e1".to_string(),
                    name: "Rust".to_string(),
                    entity_type: Some(EntityType::Technology),
                    description: Some("A systems programming language".to_string()),
                    is_well_known: false,
                    is_user: false,
                    memory_count: 1,
                },
                EntityOutput {
                    id: "e2".to_string(),
                    name: "Irrelevant".to_string(),
                    entity_type: Some(EntityType::Concept),
                    description: None,
                    is_well_known: false,
                    is_user: false,
                    memory_count: 0,
                },
            ],
            memories: vec![
                MemoryOutput {
                    rank: 1,
                    id: "m1".to_string(),
                    content: "USER likes Rust".to_string(),
                    score: 0.9,
                    source: Source::Vector,
                    about: vec!["Rust".to_string()],
                    about_entity_ids: vec!["e1".to_string()],
                    valid_at: Some("2026-01-15T10:00:00Z".parse().unwrap()),
                    invalidates: Vec::new(),
                    extracted_from: Some(provenance.clone()),
                },
                MemoryOutput {
                    rank: 2,
                    id: "m2".to_string(),
                    content: "USER prefers async code".to_string(),
                    score: 0.7,
                    source: Source::Fulltext,
                    about: vec!["Rust".to_string()],
                    about_entity_ids: vec!["e1".to_string()],
                    valid_at: None,
                    invalidates: Vec::new(),
                    extracted_from: Some(provenance),
                },
            ],
            meta: Meta { total_candidates: 2, duration_ms: 5 },
        }
    }

    #[test]
    fn renders_exactly_one_notes_section_with_sequential_ids() {
        let now = "2026-07-30T12:00:00Z".parse().unwrap();
        let rendered = render(&sample_output(), now);
        assert_eq!(rendered.matches("<entities>").count(), 1);
        assert_eq!(rendered.matches("<notes>").count(), 1);
        assert!(rendered.contains("<note id=\"note-01\""));
        assert_eq!(rendered.matches("<memory ").count(), 2);
        assert_eq!(rendered.matches("note_id=\"note-01\"").count(), 2);
    }

    #[test]
    fn drops_zero_reference_entities() {
        let rendered = render(&sample_output(), Utc::now());
        assert!(rendered.contains("name=\"Rust\""));
        assert!(!rendered.contains("Irrelevant"));
    }

    #[test]
    fn current_date_is_the_iso_prefix() {
        let now = "2026-07-30T12:00:00Z".parse().unwrap();
        let rendered = render(&sample_output(), now);
        assert!(rendered.contains("<current-date>2026-07-30</current-date>"));
    }
}
