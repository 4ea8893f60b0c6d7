//! entity-extract (design §4.5.1): pull candidate entities and
//! user-biographical facts out of a note, never naming the user
//! themselves.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::agent::{Agent, AgentFailure};
use crate::model::EntityType;

use super::ExtractedEntity;

#[derive(Debug, Clone)]
pub struct Input {
    pub note_content: String,
    pub known_user_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawEntity {
    name: String,
    #[serde(rename = "type")]
    entity_type: EntityType,
    description: String,
    #[serde(rename = "isWellKnown")]
    is_well_known: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct RawOutput {
    entities: Vec<RawEntity>,
    #[serde(rename = "userBiographicalFacts")]
    user_biographical_facts: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub entities: Vec<ExtractedEntity>,
    pub user_biographical_facts: Option<String>,
}

const SYSTEM_PROMPT: &str = "\
You extract candidate entities from a personal note. Entities are people, \
organizations, projects, technologies, locations, events, or concepts — never \
the note's author. Never extract the user themselves, nor their known name if \
given. Classify each entity into exactly one of Person, Organization, Project, \
Technology, Location, Event, Concept. Descriptions are factual and \
dictionary-style, never opinions. Separately, note any biographical facts \
about the user themselves: role, affiliation, location, or expertise — never \
preferences or transient states.";

fn schema() -> Value {
    json!({
        "type": "object",
        "required": ["entities", "userBiographicalFacts"],
        "properties": {
            "entities": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["name", "type", "description", "isWellKnown"],
                    "properties": {
                        "name": {"type": "string"},
                        "type": {"enum": ["Person", "Organization", "Project", "Technology", "Location", "Event", "Concept"]},
                        "description": {"type": "string"},
                        "isWellKnown": {"type": "boolean"}
                    }
                }
            },
            "userBiographicalFacts": {"type": ["string", "null"]}
        }
    })
}

fn format_input(input: &Input) -> String {
    match &input.known_user_name {
        Some(name) => format!(
            "Known user name: {name}\n\nNote:\n{}",
            input.note_content
        ),
        None => format!("Known user name: (unknown)\n\nNote:\n{}", input.note_content),
    }
}

fn parse_output(raw: Value, input: &Input) -> Result<Output, AgentFailure> {
    let parsed: RawOutput =
        serde_json::from_value(raw).map_err(|e| AgentFailure::Schema(e.to_string()))?;

    if let Some(known_name) = &input.known_user_name {
        for entity in &parsed.entities {
            if entity.name.eq_ignore_ascii_case(known_name) {
                return Err(AgentFailure::Alignment(format!(
                    "entity-extract named the user themselves: {}",
                    entity.name
                )));
            }
        }
    }

    Ok(Output {
        entities: parsed
            .entities
            .into_iter()
            .map(|e| ExtractedEntity {
                name: e.name,
                entity_type: e.entity_type,
                description: e.description,
                is_well_known: e.is_well_known,
            })
            .collect(),
        user_biographical_facts: parsed.user_biographical_facts,
    })
}

pub fn agent() -> Agent<Input, Output> {
    Agent {
        name: "entity-extract",
        system_prompt: SYSTEM_PROMPT,
        schema: schema(),
        format_input,
        parse_output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_output_naming_the_known_user() {
        let input = Input { note_content: "I met Aziham for coffee".into(), known_user_name: Some("Aziham".into()) };
        let raw = json!({
            "entities": [{"name": "aziham", "type": "Person", "description": "a person", "isWellKnown": false}],
            "userBiographicalFacts": null
        });
        let result = parse_output(raw, &input);
        assert!(matches!(result, Err(AgentFailure::Alignment(_))));
    }

    #[test]
    fn accepts_well_formed_output() {
        let input = Input { note_content: "I use Rust at Acme".into(), known_user_name: None };
        let raw = json!({
            "entities": [{"name": "Rust", "type": "Technology", "description": "A systems programming language", "isWellKnown": true}],
            "userBiographicalFacts": "works at Acme"
        });
        let out = parse_output(raw, &input).unwrap();
        assert_eq!(out.entities.len(), 1);
        assert_eq!(out.user_biographical_facts.as_deref(), Some("works at Acme"));
    }
}
