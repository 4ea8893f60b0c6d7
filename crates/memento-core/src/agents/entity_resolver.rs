//! entity-resolver (design §4.5.2): for each extracted entity, decide
//! CREATE or MATCH against hybrid-search candidates, plus an optional
//! user-description merge.
//!
//! The design's open question flags a source bug: aligning resolver
//! output to input purely by position silently carries the wrong
//! entity's embedding forward if the LLM reorders names. This
//! implementation aligns by case-insensitive name instead, and
//! re-orders the result to match input order — a mismatch (missing
//! name, duplicate name, or extra name) is an `agent-alignment`
//! failure, not a best-effort repair.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::agent::{Agent, AgentFailure};
use crate::model::EntityType;

use super::{names_match, EntityAction};

#[derive(Debug, Clone)]
pub struct HybridMatch {
    pub id: String,
    pub name: String,
    pub entity_type: EntityType,
    pub description: Option<String>,
    pub similarity: f32,
}

#[derive(Debug, Clone)]
pub struct InputEntity {
    pub name: String,
    pub entity_type: EntityType,
    pub description: String,
    pub is_well_known: bool,
    pub query_embedding: Vec<f32>,
    pub matches: Vec<HybridMatch>,
}

#[derive(Debug, Clone)]
pub struct Input {
    pub entities: Vec<InputEntity>,
    pub user_description: Option<String>,
    pub biographical_facts: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDescriptionUpdate {
    #[serde(rename = "mergedDescription")]
    pub merged_description: String,
    #[serde(rename = "shouldUpdate")]
    pub should_update: bool,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub name: String,
    pub action: EntityAction,
}

#[derive(Debug, Clone)]
pub struct Output {
    pub resolutions: Vec<Resolution>,
    pub user_description_update: Option<UserDescriptionUpdate>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawResolution {
    name: String,
    #[serde(flatten)]
    action: EntityAction,
}

#[derive(Debug, Clone, Deserialize)]
struct RawOutput {
    resolutions: Vec<RawResolution>,
    #[serde(rename = "userDescriptionUpdate")]
    user_description_update: Option<UserDescriptionUpdate>,
}

const SYSTEM_PROMPT: &str = "\
For each candidate entity, decide whether it refers to an existing entity in \
the graph (MATCH) or is genuinely new (CREATE). Entities sharing a name but of \
different types are distinct entities. When uncertain, CREATE rather than \
guess a match. isWellKnown is only meaningful on CREATE; it is immutable once \
an entity exists. Also decide whether the user's stored description should be \
updated given any new biographical facts.";

fn schema() -> Value {
    json!({
        "type": "object",
        "required": ["resolutions", "userDescriptionUpdate"],
        "properties": {
            "resolutions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["name", "action"],
                    "properties": {
                        "name": {"type": "string"},
                        "action": {"enum": ["CREATE", "MATCH"]},
                        "matchedId": {"type": "string"},
                        "updateDescription": {"type": "boolean"}
                    }
                }
            },
            "userDescriptionUpdate": {
                "type": ["object", "null"],
                "properties": {
                    "mergedDescription": {"type": "string"},
                    "shouldUpdate": {"type": "boolean"},
                    "reason": {"type": "string"}
                }
            }
        }
    })
}

fn format_input(input: &Input) -> String {
    let mut out = String::new();
    if let Some(desc) = &input.user_description {
        out.push_str(&format!("Current user description: {desc}\n"));
    }
    if let Some(facts) = &input.biographical_facts {
        out.push_str(&format!("New biographical facts: {facts}\n"));
    }
    out.push_str("Entities:\n");
    for entity in &input.entities {
        out.push_str(&format!(
            "- {} ({}) \"{}\" wellKnown={} candidates={}\n",
            entity.name,
            entity.entity_type,
            entity.description,
            entity.is_well_known,
            entity
                .matches
                .iter()
                .map(|m| format!("{}[{}]~{:.2}", m.name, m.id, m.similarity))
                .collect::<Vec<_>>()
                .join(", "),
        ));
    }
    out
}

fn parse_output(raw: Value, input: &Input) -> Result<Output, AgentFailure> {
    let parsed: RawOutput =
        serde_json::from_value(raw).map_err(|e| AgentFailure::Schema(e.to_string()))?;

    if parsed.resolutions.len() != input.entities.len() {
        return Err(AgentFailure::Alignment(format!(
            "entity-resolver returned {} resolutions for {} input entities",
            parsed.resolutions.len(),
            input.entities.len()
        )));
    }

    let mut remaining = parsed.resolutions;
    let mut ordered = Vec::with_capacity(input.entities.len());

    for entity in &input.entities {
        let pos = remaining.iter().position(|r| names_match(&r.name, &entity.name));
        let Some(pos) = pos else {
            return Err(AgentFailure::Alignment(format!(
                "entity-resolver response missing a decision for '{}'",
                entity.name
            )));
        };
        let raw = remaining.remove(pos);
        ordered.push(Resolution { name: entity.name.clone(), action: raw.action });
    }

    Ok(Output { resolutions: ordered, user_description_update: parsed.user_description_update })
}

pub fn agent() -> Agent<Input, Output> {
    Agent {
        name: "entity-resolver",
        system_prompt: SYSTEM_PROMPT,
        schema: schema(),
        format_input,
        parse_output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str) -> InputEntity {
        InputEntity {
            name: name.to_string(),
            entity_type: EntityType::Technology,
            description: "".into(),
            is_well_known: false,
            query_embedding: vec![1.0, 0.0],
            matches: vec![],
        }
    }

    #[test]
    fn reorders_output_to_match_input_order_by_name() {
        let input = Input {
            entities: vec![entity("Rust"), entity("TypeScript")],
            user_description: None,
            biographical_facts: None,
        };
        // LLM returned them in the opposite order.
        let raw = json!({
            "resolutions": [
                {"name": "typescript", "action": "CREATE"},
                {"name": "rust", "action": "CREATE"}
            ],
            "userDescriptionUpdate": null
        });
        let out = parse_output(raw, &input).unwrap();
        assert_eq!(out.resolutions[0].name, "Rust");
        assert_eq!(out.resolutions[1].name, "TypeScript");
    }

    #[test]
    fn missing_decision_is_an_alignment_failure() {
        let input = Input { entities: vec![entity("Rust")], user_description: None, biographical_facts: None };
        let raw = json!({"resolutions": [], "userDescriptionUpdate": null});
        let result = parse_output(raw, &input);
        assert!(matches!(result, Err(AgentFailure::Alignment(_))));
    }
}
