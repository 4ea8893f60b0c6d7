//! memory-resolver (design §4.5.4): decide ADD / SKIP / INVALIDATE for
//! each extracted memory against the existing graph, sharing one
//! context of existing memories across all decisions rather than
//! searching per-memory.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::agent::{Agent, AgentFailure};

use super::MemoryAction;
use crate::agents::memory_extract::ExtractedMemory;

#[derive(Debug, Clone)]
pub struct ExistingMemoryRef {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct Input {
    pub extracted: Vec<ExtractedMemory>,
    pub existing: Vec<ExistingMemoryRef>,
}

#[derive(Debug, Clone)]
pub struct Output {
    pub resolutions: Vec<MemoryAction>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawOutput {
    resolutions: Vec<MemoryAction>,
}

const SYSTEM_PROMPT: &str = "\
For each extracted memory, decide ADD, SKIP, or INVALIDATE against the \
existing memories shown. A memory that restates existing knowledge is a \
duplicate: SKIP. A state change (job change, move, marriage, project \
completion) INVALIDATEs the prior matching memories with a reason. A later, \
more specific or corrected restatement of the same fact is also an \
INVALIDATE of the earlier form. Distinct event identifiers (e.g. consecutive \
years of the same recurring conference) are ADDs, never invalidations.";

fn schema() -> Value {
    json!({
        "type": "object",
        "required": ["resolutions"],
        "properties": {
            "resolutions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["action"],
                    "properties": {
                        "action": {"enum": ["ADD", "SKIP", "INVALIDATE"]},
                        "targets": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["existingMemoryId", "reason"],
                                "properties": {
                                    "existingMemoryId": {"type": "string"},
                                    "reason": {"type": "string"}
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}

fn format_input(input: &Input) -> String {
    let existing = input
        .existing
        .iter()
        .map(|m| format!("[{}] {}", m.id, m.content))
        .collect::<Vec<_>>()
        .join("\n");
    let extracted = input
        .extracted
        .iter()
        .enumerate()
        .map(|(i, m)| format!("{}. {} (about: {})", i + 1, m.content, m.about_entities.join(", ")))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Existing memories:\n{existing}\n\nExtracted memories:\n{extracted}")
}

fn parse_output(raw: Value, input: &Input) -> Result<Output, AgentFailure> {
    let parsed: RawOutput =
        serde_json::from_value(raw).map_err(|e| AgentFailure::Schema(e.to_string()))?;

    if parsed.resolutions.len() != input.extracted.len() {
        return Err(AgentFailure::Alignment(format!(
            "memory-resolver returned {} decisions for {} extracted memories",
            parsed.resolutions.len(),
            input.extracted.len()
        )));
    }

    for resolution in &parsed.resolutions {
        if let MemoryAction::Invalidate { targets } = resolution {
            if targets.is_empty() {
                return Err(AgentFailure::Alignment("INVALIDATE decision with no targets".into()));
            }
            for target in targets {
                if !input.existing.iter().any(|m| m.id == target.existing_memory_id) {
                    return Err(AgentFailure::Alignment(format!(
                        "memory-resolver targeted unknown memory id '{}'",
                        target.existing_memory_id
                    )));
                }
            }
        }
    }

    Ok(Output { resolutions: parsed.resolutions })
}

pub fn agent() -> Agent<Input, Output> {
    Agent {
        name: "memory-resolver",
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
            extracted: vec![ExtractedMemory { content: "USER prefers TypeScript".into(), about_entities: vec!["USER".into()], valid_at: None }],
            existing: vec![ExistingMemoryRef { id: "old-1".into(), content: "USER prefers JavaScript".into() }],
        }
    }

    #[test]
    fn invalidate_must_name_an_existing_memory() {
        let raw = json!({"resolutions": [{"action": "INVALIDATE", "targets": [{"existingMemoryId": "nope", "reason": "changed"}]}]});
        let result = parse_output(raw, &input());
        assert!(matches!(result, Err(AgentFailure::Alignment(_))));
    }

    #[test]
    fn accepts_valid_invalidate() {
        let raw = json!({"resolutions": [{"action": "INVALIDATE", "targets": [{"existingMemoryId": "old-1", "reason": "changed preference"}]}]});
        let out = parse_output(raw, &input()).unwrap();
        assert_eq!(out.resolutions.len(), 1);
        assert!(matches!(&out.resolutions[0], MemoryAction::Invalidate { targets } if targets[0].existing_memory_id == "old-1"));
    }

    #[test]
    fn mismatched_count_is_an_alignment_failure() {
        let raw = json!({"resolutions": []});
        let result = parse_output(raw, &input());
        assert!(matches!(result, Err(AgentFailure::Alignment(_))));
    }
}
