//! hyde (design §4.5.5): hypothetical-document embedding. Generates
//! paraphrases and opposite/evolved-state variants of retrieved
//! memories, to be embedded and searched for extra recall in
//! consolidation branch A.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::agent::{Agent, AgentFailure};

#[derive(Debug, Clone)]
pub struct Input {
    pub existing_memory_contents: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HydeDoc {
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RawOutput {
    semantic: Vec<HydeDoc>,
    #[serde(rename = "stateChange")]
    state_change: Vec<HydeDoc>,
}

#[derive(Debug, Clone)]
pub struct Output {
    pub semantic: Vec<HydeDoc>,
    pub state_change: Vec<HydeDoc>,
}

const SYSTEM_PROMPT: &str = "\
Given existing memories about the user, generate hypothetical documents that \
would match a deeper search of the same graph. Produce up to 3 'semantic' \
documents — paraphrases grounded in the given memories, using USER as the \
subject — and up to 3 'stateChange' documents expressing an opposite or \
evolved state of those same facts. Every document must be grounded in the \
input memories; do not invent unrelated facts.";

fn schema() -> Value {
    json!({
        "type": "object",
        "required": ["semantic", "stateChange"],
        "properties": {
            "semantic": {"type": "array", "items": {"type": "object", "required": ["content"], "properties": {"content": {"type": "string"}}}},
            "stateChange": {"type": "array", "items": {"type": "object", "required": ["content"], "properties": {"content": {"type": "string"}}}}
        }
    })
}

fn format_input(input: &Input) -> String {
    input
        .existing_memory_contents
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c))
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_output(raw: Value, _input: &Input) -> Result<Output, AgentFailure> {
    let parsed: RawOutput =
        serde_json::from_value(raw).map_err(|e| AgentFailure::Schema(e.to_string()))?;
    Ok(Output { semantic: parsed.semantic, state_change: parsed.state_change })
}

pub fn agent() -> Agent<Input, Output> {
    Agent {
        name: "hyde",
        system_prompt: SYSTEM_PROMPT,
        schema: schema(),
        format_input,
        parse_output,
    }
}
