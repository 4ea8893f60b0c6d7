//! memory-extract (design §4.5.3): turn a note into atomic,
//! first-person-free memory statements, each tagged with who it's
//! ABOUT and an optional effective validity time.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::agent::{Agent, AgentFailure};
use crate::model::EntityType;

/// A resolved entity as carried into memory-extract: just enough to
/// describe what's available to reference.
#[derive(Debug, Clone)]
pub struct ResolvedEntityRef {
    pub name: String,
    pub entity_type: EntityType,
    pub action: &'static str, // "CREATE" | "MATCH", for prompt context only
}

#[derive(Debug, Clone)]
pub struct Input {
    pub note_content: String,
    pub note_timestamp: DateTime<Utc>,
    pub resolved_entities: Vec<ResolvedEntityRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedMemory {
    pub content: String,
    pub about_entities: Vec<String>,
    pub valid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Output {
    pub memories: Vec<ExtractedMemory>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawMemory {
    content: String,
    #[serde(rename = "aboutEntities")]
    about_entities: Vec<String>,
    #[serde(rename = "validAt")]
    valid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawOutput {
    memories: Vec<RawMemory>,
}

const SYSTEM_PROMPT: &str = "\
Extract atomic factual memories from the note. Rewrite first-person pronouns \
(I, me, my) to the literal token USER. Each memory's aboutEntities must use \
the exact resolved entity names given, plus USER when the memory is implicitly \
about the user. Preserve temporal phrases in the content itself, but also \
compute validAt as an absolute timestamp relative to the note's timestamp when \
the content implies a specific effective time.";

fn schema() -> Value {
    json!({
        "type": "object",
        "required": ["memories"],
        "properties": {
            "memories": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["content", "aboutEntities"],
                    "properties": {
                        "content": {"type": "string"},
                        "aboutEntities": {"type": "array", "items": {"type": "string"}},
                        "validAt": {"type": ["string", "null"]}
                    }
                }
            }
        }
    })
}

fn format_input(input: &Input) -> String {
    let entities = input
        .resolved_entities
        .iter()
        .map(|e| format!("{} ({}, {})", e.name, e.entity_type, e.action))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Note timestamp: {}\nResolved entities: {}\n\nNote:\n{}",
        input.note_timestamp.to_rfc3339(),
        entities,
        input.note_content
    )
}

fn parse_output(raw: Value, input: &Input) -> Result<Output, AgentFailure> {
    let parsed: RawOutput =
        serde_json::from_value(raw).map_err(|e| AgentFailure::Schema(e.to_string()))?;

    let known_names: Vec<&str> = input.resolved_entities.iter().map(|e| e.name.as_str()).collect();

    for memory in &parsed.memories {
        for about in &memory.about_entities {
            if about == "USER" {
                continue;
            }
            if !known_names.iter().any(|n| n.eq_ignore_ascii_case(about)) {
                return Err(AgentFailure::Alignment(format!(
                    "memory-extract referenced unknown entity '{about}'"
                )));
            }
        }
    }

    Ok(Output {
        memories: parsed
            .memories
            .into_iter()
            .map(|m| ExtractedMemory { content: m.content, about_entities: m.about_entities, valid_at: m.valid_at })
            .collect(),
    })
}

pub fn agent() -> Agent<Input, Output> {
    Agent {
        name: "memory-extract",
        system_prompt: SYSTEM_PROMPT,
        schema: schema(),
        format_input,
        parse_output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> Input {
        Input {
            note_content: "I now use Rust".into(),
            note_timestamp: "2026-01-15T10:00:00Z".parse().unwrap(),
            resolved_entities: vec![ResolvedEntityRef { name: "Rust".into(), entity_type: EntityType::Technology, action: "CREATE" }],
        }
    }

    #[test]
    fn rejects_unknown_about_entity() {
        let raw = json!({"memories": [{"content": "USER uses Rust", "aboutEntities": ["Rust", "Python"]}]});
        let result = parse_output(raw, &input());
        assert!(matches!(result, Err(AgentFailure::Alignment(_))));
    }

    #[test]
    fn accepts_user_token_and_known_entities() {
        let raw = json!({"memories": [{"content": "USER uses Rust", "aboutEntities": ["USER", "Rust"], "validAt": null}]});
        let out = parse_output(raw, &input()).unwrap();
        assert_eq!(out.memories.len(), 1);
        assert_eq!(out.memories[0].about_entities, vec!["USER".to_string(), "Rust".to_string()]);
    }
}
