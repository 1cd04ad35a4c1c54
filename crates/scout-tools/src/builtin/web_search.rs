use async_trait::async_trait;
use scout_sources::SearchAggregator;
use scout_types::{Result, ScoutError};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::tool::{optional_usize, required_str, Tool, ToolDefinition};
use crate::workspace::Workspace;

pub const DEFAULT_LIMIT: usize = 8;
pub const MAX_LIMIT: usize = 20;

/// Scholarly web search across the aggregator's ranked providers.
///
/// The result is `{query, results: [{title, url, snippet, provider}], providerErrors?}`.
pub struct WebSearchTool {
    aggregator: SearchAggregator,
}

impl WebSearchTool {
    pub fn new(aggregator: SearchAggregator) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "web_search".to_string(),
            description: "Search scholarly sources for papers related to a query. Returns titles, URLs and snippets."
                .to_string(),
            parameters: json!({
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results",
                        "default": DEFAULT_LIMIT,
                        "maximum": MAX_LIMIT
                    }
                }
            }),
        }
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _workspace: &dyn Workspace,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value> {
        let query = required_str(&arguments, "web_search", "query")?.trim();
        if query.is_empty() {
            return Err(ScoutError::ToolError {
                tool: "web_search".into(),
                message: "query must not be empty".into(),
            });
        }
        let limit = optional_usize(&arguments, "limit")
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT);

        let response = self.aggregator.search(query, limit, cancel).await?;
        tracing::info!(
            query,
            results = response.results.len(),
            provider_errors = response.provider_errors.len(),
            "Search complete"
        );

        let mut value = serde_json::to_value(&response)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("query".into(), json!(query));
        }
        Ok(value)
    }
}
