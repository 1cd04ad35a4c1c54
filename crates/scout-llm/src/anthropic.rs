use async_trait::async_trait;
use scout_types::{Result, ScoutError};
use serde_json::json;

use crate::{
    ContentPart, FinishReason, Message, ProviderAdapter, Request, Response, Role, ToolCallResult,
    ToolDefinition, Usage,
};

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 8192;

// ---------------------------------------------------------------------------
// AnthropicAdapter
// ---------------------------------------------------------------------------

/// Non-streaming adapter for the Anthropic Messages API.
#[derive(Debug)]
pub struct AnthropicAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicAdapter {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: "https://api.anthropic.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn from_env() -> Result<Self> {
        let key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| ScoutError::AuthError {
            provider: PROVIDER.into(),
        })?;
        Ok(Self::new(key))
    }
}

// ---------------------------------------------------------------------------
// Request translation (Unified → Anthropic JSON)
// ---------------------------------------------------------------------------

fn build_request_body(request: &Request) -> serde_json::Value {
    // System text goes top-level; the long research prompt is cached.
    let system_parts: Vec<serde_json::Value> = request
        .messages
        .iter()
        .filter(|m| m.role == Role::System)
        .flat_map(|m| {
            m.content.iter().filter_map(|p| match p {
                ContentPart::Text { text } => Some(json!({
                    "type": "text",
                    "text": text,
                    "cache_control": { "type": "ephemeral" }
                })),
                _ => None,
            })
        })
        .collect();

    let conversation: Vec<&Message> = request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .collect();

    let mut body = json!({
        "model": request.model,
        "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        "messages": convert_messages(&conversation),
    });

    if !system_parts.is_empty() {
        body["system"] = json!(system_parts);
    }

    if !request.tools.is_empty() {
        body["tools"] = json!(request
            .tools
            .iter()
            .map(convert_tool_definition)
            .collect::<Vec<_>>());
    }

    if let Some(temp) = request.temperature {
        body["temperature"] = json!(temp);
    }

    body
}

fn convert_messages(messages: &[&Message]) -> Vec<serde_json::Value> {
    let mut result: Vec<serde_json::Value> = Vec::new();

    for msg in messages {
        let content = convert_content_parts(&msg.content);
        match msg.role {
            Role::Assistant => {
                result.push(json!({ "role": "assistant", "content": content }));
            }
            // Tool results travel as user content; consecutive results share
            // one user message.
            Role::Tool => {
                if let Some(last) = result.last_mut() {
                    if last["role"] == "user" {
                        if let Some(arr) = last["content"].as_array_mut() {
                            arr.extend(content);
                            continue;
                        }
                    }
                }
                result.push(json!({ "role": "user", "content": content }));
            }
            Role::User => {
                result.push(json!({ "role": "user", "content": content }));
            }
            Role::System => {}
        }
    }

    result
}

fn convert_content_parts(parts: &[ContentPart]) -> Vec<serde_json::Value> {
    parts
        .iter()
        .map(|p| match p {
            ContentPart::Text { text } => json!({
                "type": "text",
                "text": text
            }),
            ContentPart::ToolCall {
                id,
                name,
                arguments,
            } => json!({
                "type": "tool_use",
                "id": id,
                "name": name,
                "input": arguments
            }),
            ContentPart::ToolResult {
                tool_call_id,
                content,
                is_error,
            } => {
                let mut v = json!({
                    "type": "tool_result",
                    "tool_use_id": tool_call_id,
                    "content": content
                });
                if *is_error {
                    v["is_error"] = json!(true);
                }
                v
            }
        })
        .collect()
}

fn convert_tool_definition(tool: &ToolDefinition) -> serde_json::Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.parameters
    })
}

// ---------------------------------------------------------------------------
// Response translation (Anthropic JSON → Unified Response)
// ---------------------------------------------------------------------------

fn parse_response(body: &serde_json::Value) -> Response {
    let finish_reason = match body["stop_reason"].as_str() {
        Some("max_tokens") => FinishReason::MaxTokens,
        Some("stop_sequence") => FinishReason::StopSequence,
        Some("tool_use") => FinishReason::ToolUse,
        _ => FinishReason::EndTurn,
    };

    let mut text_parts: Vec<&str> = Vec::new();
    let mut tool_calls: Vec<ToolCallResult> = Vec::new();

    for block in body["content"].as_array().into_iter().flatten() {
        match block["type"].as_str() {
            Some("text") => {
                if let Some(t) = block["text"].as_str() {
                    text_parts.push(t);
                }
            }
            Some("tool_use") => {
                tool_calls.push(ToolCallResult {
                    id: block["id"].as_str().unwrap_or_default().to_string(),
                    name: block["name"].as_str().unwrap_or_default().to_string(),
                    arguments: block["input"].clone(),
                });
            }
            _ => {}
        }
    }

    let usage_obj = &body["usage"];
    let input_tokens = usage_obj["input_tokens"].as_u64().unwrap_or(0);
    let output_tokens = usage_obj["output_tokens"].as_u64().unwrap_or(0);

    Response {
        id: body["id"].as_str().unwrap_or_default().to_string(),
        text: text_parts.join(""),
        tool_calls,
        usage: Usage {
            input_tokens,
            output_tokens,
            cache_read_tokens: usage_obj["cache_read_input_tokens"].as_u64(),
            cache_write_tokens: usage_obj["cache_creation_input_tokens"].as_u64(),
            total_tokens: input_tokens + output_tokens,
        },
        model: body["model"].as_str().unwrap_or_default().to_string(),
        finish_reason,
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn map_error(status: reqwest::StatusCode, body: &str) -> ScoutError {
    let status_u16 = status.as_u16();
    match status_u16 {
        429 => {
            let retry_ms = serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| v["error"]["retry_after"].as_f64())
                .map(|s| (s * 1000.0) as u64)
                .unwrap_or(1000);
            ScoutError::RateLimited {
                provider: PROVIDER.into(),
                retry_after_ms: retry_ms,
            }
        }
        401 | 403 => ScoutError::AuthError {
            provider: PROVIDER.into(),
        },
        _ => ScoutError::ProviderError {
            provider: PROVIDER.into(),
            status: status_u16,
            message: extract_error_message(body),
            retryable: matches!(status_u16, 500 | 502 | 503 | 529),
        },
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}

fn transport_error(e: reqwest::Error) -> ScoutError {
    ScoutError::ProviderError {
        provider: PROVIDER.into(),
        status: 0,
        message: e.to_string(),
        retryable: true,
    }
}

// ---------------------------------------------------------------------------
// ProviderAdapter implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    async fn complete(&self, request: &Request) -> Result<Response> {
        let body = build_request_body(request);

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let response_body = resp.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(map_error(status, &response_body));
        }

        let json: serde_json::Value =
            serde_json::from_str(&response_body).map_err(|e| ScoutError::ProviderError {
                provider: PROVIDER.into(),
                status: status.as_u16(),
                message: format!("Failed to parse response JSON: {e}"),
                retryable: false,
            })?;

        Ok(parse_response(&json))
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn default_model(&self) -> &str {
        "claude-sonnet-4-5-20250929"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
