//! The agent runner (design §4.5).
//!
//! An "agent" is plain data — a system prompt, a JSON schema, an input
//! formatter, and an output parser — not a trait object or a class
//! hierarchy. One generic runner formats the input, calls the LLM
//! client's structured-JSON completion, validates and aligns the
//! response against domain data, and retries on failure up to
//! `max_retries` times. This mirrors how the five consolidation agents
//! (`crate::agents`) differ only in *data*, never in control flow.

use serde_json::Value;

use crate::config::AgentConfig;
use crate::error::EngineError;
use crate::llm::{CompletionOptions, LlmClient};
use crate::stats::RunStats;

/// Why a raw completion failed to become a validated `O`.
pub enum AgentFailure {
    /// The response didn't conform to the agent's JSON schema at all
    /// (wrong shape, missing required field, wrong type).
    Schema(String),
    /// The response was well-formed JSON but referenced something that
    /// doesn't line up with the domain data it was given (an entity
    /// name not among the candidates, a memory id not in context).
    Alignment(String),
}

/// One agent definition: static configuration plus the two pure
/// functions that connect it to domain types `I` (input) and `O`
/// (validated output).
pub struct Agent<I, O> {
    pub name: &'static str,
    pub system_prompt: &'static str,
    pub schema: Value,
    pub format_input: fn(&I) -> String,
    pub parse_output: fn(Value, &I) -> Result<O, AgentFailure>,
}

/// Run `agent` against `input`, retrying schema/alignment failures up
/// to `config.max_retries` times. Transport-level failures from the
/// LLM client itself are not retried here — they propagate as
/// [`EngineError::DependencyUnavailable`] immediately, since a retry
/// loop around a dead connection just delays the inevitable.
pub async fn run_agent<I, O>(
    llm: &dyn LlmClient,
    agent: &Agent<I, O>,
    input: &I,
    config: &AgentConfig,
    stats: &mut RunStats,
) -> Result<O, EngineError> {
    let options = CompletionOptions { temperature: config.temperature, max_tokens: config.max_tokens };
    let user_message = (agent.format_input)(input);

    let mut last_failure = AgentFailure::Schema(String::new());

    for attempt in 0..=config.max_retries {
        stats.record_llm_call();
        let raw = llm
            .complete_json(agent.system_prompt, &user_message, &agent.schema, &options)
            .await?;

        match (agent.parse_output)(raw, input) {
            Ok(output) => return Ok(output),
            Err(failure) => {
                last_failure = failure;
                if attempt < config.max_retries {
                    stats.record_llm_retry();
                }
            }
        }
    }

    Err(match last_failure {
        AgentFailure::Schema(cause) => EngineError::AgentSchema { agent: agent.name, cause },
        AgentFailure::Alignment(cause) => EngineError::AgentAlignment { agent: agent.name, cause },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct AlwaysBad;

    #[async_trait]
    impl LlmClient for AlwaysBad {
        async fn complete_json(
            &self,
            _system_prompt: &str,
            _user_message: &str,
            _schema: &Value,
            _options: &CompletionOptions,
        ) -> crate::error::Result<Value> {
            Ok(json!({"unexpected": true}))
        }
    }

    fn test_agent() -> Agent<String, String> {
        Agent {
            name: "test-agent",
            system_prompt: "test",
            schema: json!({}),
            format_input: |i: &String| i.clone(),
            parse_output: |_v, _i| Err(AgentFailure::Schema("missing field".into())),
        }
    }

    #[tokio::test]
    async fn retries_up_to_max_then_fails_with_agent_name() {
        let llm = AlwaysBad;
        let agent = test_agent();
        let config = AgentConfig { max_retries: 2, ..AgentConfig::default() };
        let mut stats = RunStats::new();

        let result = run_agent(&llm, &agent, &"hello".to_string(), &config, &mut stats).await;
        assert!(matches!(result, Err(EngineError::AgentSchema { agent: "test-agent", .. })));
        assert_eq!(stats.llm_calls, 3);
        assert_eq!(stats.llm_retries, 2);
    }

    #[tokio::test]
    async fn alignment_failures_surface_as_agent_alignment() {
        struct AlwaysMisaligned;
        #[async_trait]
        impl LlmClient for AlwaysMisaligned {
            async fn complete_json(
                &self,
                _system_prompt: &str,
                _user_message: &str,
                _schema: &Value,
                _options: &CompletionOptions,
            ) -> crate::error::Result<Value> {
                Ok(json!({"unexpected": true}))
            }
        }

        let agent = Agent {
            name: "test-agent",
            system_prompt: "test",
            schema: json!({}),
            format_input: |i: &String| i.clone(),
            parse_output: |_v, _i| Err(AgentFailure::Alignment("id not among candidates".into())),
        };
        let config = AgentConfig { max_retries: 1, ..AgentConfig::default() };
        let mut stats = RunStats::new();

        let result = run_agent(&AlwaysMisaligned, &agent, &"hello".to_string(), &config, &mut stats).await;
        assert!(matches!(result, Err(EngineError::AgentAlignment { agent: "test-agent", .. })));
        assert_eq!(stats.llm_calls, 2);
        assert_eq!(stats.llm_retries, 1);
    }

    #[tokio::test]
    async fn succeeds_without_retry_when_parse_accepts_first_try() {
        struct Good;
        #[async_trait]
        impl LlmClient for Good {
            async fn complete_json(
                &self,
                _s: &str,
                _u: &str,
                _schema: &Value,
                _o: &CompletionOptions,
            ) -> crate::error::Result<Value> {
                Ok(json!({"ok": true}))
            }
        }

        let agent = Agent {
            name: "good-agent",
            system_prompt: "test",
            schema: json!({}),
            format_input: |i: &String| i.clone(),
            parse_output: |v: Value, _i: &String| Ok(v["ok"].as_bool().unwrap_or(false).to_string()),
        };
        let config = AgentConfig::default();
        let mut stats = RunStats::new();

        let result = run_agent(&Good, &agent, &"hi".to_string(), &config, &mut stats).await.unwrap();
        assert_eq!(result, "true");
        assert_eq!(stats.llm_calls, 1);
        assert_eq!(stats.llm_retries, 0);
    }
}
