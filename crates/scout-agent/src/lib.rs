//! Reasoning engines for Scout research sessions.
//!
//! Provides the `ReasoningEngine` contract and `AgentEngine`, which runs the
//! core loop: build request -> call LLM -> execute tool calls -> append
//! results -> repeat, emitting an `EngineEvent` at every step.

pub mod engine;
pub mod prompt_builder;

pub use engine::{EngineEvent, EngineOutcome, EnginePrompt, EventSink, ReasoningEngine};
pub use prompt_builder::SystemPromptBuilder;

use async_trait::async_trait;
use scout_llm::{LlmClient, Message, Request, ToolCallResult};
use scout_tools::truncation::{truncate_output, TruncationMode};
use scout_types::{Result, ScoutError};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Configuration for an [`AgentEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub model: String,
    /// Hard stop on LLM rounds per run, independent of any session turn cap.
    pub max_tool_rounds: usize,
    pub max_tokens: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5-20250929".to_string(),
            max_tool_rounds: 200,
            max_tokens: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Turn
// ---------------------------------------------------------------------------

/// A single entry in the conversation history.
#[derive(Debug, Clone)]
pub enum Turn {
    User {
        content: String,
    },
    Assistant {
        content: String,
        tool_calls: Vec<ToolCallResult>,
    },
    ToolResults {
        results: Vec<ToolResultEntry>,
    },
}

/// Result of executing a single tool call.
#[derive(Debug, Clone)]
pub struct ToolResultEntry {
    pub tool_call_id: String,
    pub tool_name: String,
    pub content: String,
    pub is_error: bool,
}

// ---------------------------------------------------------------------------
// AgentEngine
// ---------------------------------------------------------------------------

const MAX_TOOL_OUTPUT_CHARS: usize = 30_000;

/// LLM-driven engine: one turn is one LLM call plus the tool calls it requested.
pub struct AgentEngine {
    llm_client: LlmClient,
    config: EngineConfig,
}

impl AgentEngine {
    pub fn new(llm_client: LlmClient, config: EngineConfig) -> Self {
        Self { llm_client, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn run_loop(
        &self,
        prompt: &EnginePrompt,
        events: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<EngineOutcome> {
        let mut history = vec![Turn::User {
            content: prompt.user_prompt.clone(),
        }];
        let mut outcome = EngineOutcome::default();

        for round in 0..self.config.max_tool_rounds {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                return Ok(outcome);
            }

            let turn = round + 1;
            events.emit(EngineEvent::TurnStart { turn });

            let request = self.build_request(prompt, &history);
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    outcome.cancelled = true;
                    return Ok(outcome);
                }
                resp = self.llm_client.complete(&request) => resp?,
            };

            tracing::debug!(
                turn,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                finish_reason = ?response.finish_reason,
                tool_calls = response.tool_calls.len(),
                "LLM response received"
            );

            outcome.final_text = response.text.clone();
            if !response.text.is_empty() {
                events.emit(EngineEvent::MessageEnd {
                    text: response.text.clone(),
                });
            }
            history.push(Turn::Assistant {
                content: response.text.clone(),
                tool_calls: response.tool_calls.clone(),
            });

            let results = self
                .execute_tool_calls(prompt, &response.tool_calls, events, cancel)
                .await;
            let tool_calls = results.len();
            if !results.is_empty() {
                history.push(Turn::ToolResults { results });
            }

            outcome.turns = turn;
            events.emit(EngineEvent::TurnEnd { turn, tool_calls });

            // A turn without tool calls is natural completion.
            if response.tool_calls.is_empty() {
                return Ok(outcome);
            }
        }

        tracing::warn!(
            max_rounds = self.config.max_tool_rounds,
            "Max tool rounds reached, stopping loop"
        );
        Ok(outcome)
    }

    /// Build an LLM Request from the conversation history.
    fn build_request(&self, prompt: &EnginePrompt, history: &[Turn]) -> Request {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if !prompt.system_prompt.is_empty() {
            messages.push(Message::system(&prompt.system_prompt));
        }

        for turn in history {
            match turn {
                Turn::User { content } => messages.push(Message::user(content)),
                Turn::Assistant {
                    content,
                    tool_calls,
                } => messages.push(Message::assistant_turn(content, tool_calls)),
                Turn::ToolResults { results } => {
                    for result in results {
                        messages.push(Message::tool_result(
                            &result.tool_call_id,
                            &result.content,
                            result.is_error,
                        ));
                    }
                }
            }
        }

        let tools = prompt
            .tools
            .definitions()
            .into_iter()
            .map(|td| scout_llm::ToolDefinition {
                name: td.name,
                description: td.description,
                parameters: td.parameters,
            })
            .collect();

        let mut request = Request::new(self.config.model.clone(), messages);
        request.tools = tools;
        request.max_tokens = self.config.max_tokens;
        request
    }

    /// Execute tool calls in order. Stops early, without running the
    /// remaining calls, once the token is cancelled.
    async fn execute_tool_calls(
        &self,
        prompt: &EnginePrompt,
        tool_calls: &[ToolCallResult],
        events: &EventSink,
        cancel: &CancellationToken,
    ) -> Vec<ToolResultEntry> {
        let mut results = Vec::with_capacity(tool_calls.len());

        for tc in tool_calls {
            if cancel.is_cancelled() {
                break;
            }
            tracing::debug!(tool = %tc.name, id = %tc.id, "Executing tool call");
            events.emit(EngineEvent::ToolExecutionStart {
                call_id: tc.id.clone(),
                tool: tc.name.clone(),
                arguments: tc.arguments.clone(),
            });

            let outcome = prompt
                .tools
                .execute(
                    &tc.name,
                    tc.arguments.clone(),
                    prompt.workspace.as_ref(),
                    cancel,
                )
                .await;

            let (value, is_error) = match outcome {
                Ok(value) => (value, false),
                Err(e) => {
                    tracing::debug!(tool = %tc.name, error = %e, "Tool execution failed");
                    (serde_json::Value::String(format!("Error: {}", e)), true)
                }
            };

            events.emit(EngineEvent::ToolExecutionEnd {
                call_id: tc.id.clone(),
                tool: tc.name.clone(),
                result: value.clone(),
                is_error,
            });

            results.push(ToolResultEntry {
                tool_call_id: tc.id.clone(),
                tool_name: tc.name.clone(),
                content: truncate_output(
                    &render_tool_output(&value),
                    MAX_TOOL_OUTPUT_CHARS,
                    TruncationMode::HeadTail,
                ),
                is_error,
            });
        }

        results
    }
}

/// Text handed back to the LLM for a tool result.
fn render_tool_output(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl ReasoningEngine for AgentEngine {
    async fn run(
        &self,
        prompt: EnginePrompt,
        events: EventSink,
        cancel: CancellationToken,
    ) -> Result<EngineOutcome> {
        tracing::info!(model = %self.config.model, "Engine run started");
        events.emit(EngineEvent::AgentStart);

        let result = self.run_loop(&prompt, &events, &cancel).await;
        let cancelled = match &result {
            Ok(outcome) => outcome.cancelled,
            Err(ScoutError::Cancelled) => true,
            Err(_) => false,
        };
        events.emit(EngineEvent::AgentEnd { cancelled });

        match &result {
            Ok(outcome) => {
                tracing::info!(turns = outcome.turns, cancelled, "Engine run finished")
            }
            Err(e) => tracing::warn!(error = %e, "Engine run failed"),
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
