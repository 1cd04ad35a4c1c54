use std::collections::BTreeMap;

use async_trait::async_trait;
use scout_types::{Result, ScoutError};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::workspace::Workspace;

/// Definition of a tool that can be presented to an LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Trait for tools that can be invoked by a reasoning engine.
///
/// Results are structured JSON so downstream consumers can inspect them
/// without re-parsing text.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;
    async fn execute(
        &self,
        arguments: serde_json::Value,
        workspace: &dyn Workspace,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value>;
}

/// Registry that holds named tools and provides lookup.
///
/// Backed by an ordered map so definitions are presented in a stable order.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let def = tool.definition();
        self.tools.insert(def.name, Box::new(tool));
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.tools.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up `name` and run it. An unknown name is a [`ScoutError::ToolError`].
    pub async fn execute(
        &self,
        name: &str,
        arguments: serde_json::Value,
        workspace: &dyn Workspace,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value> {
        let tool = self.get(name).ok_or_else(|| ScoutError::ToolError {
            tool: name.to_string(),
            message: format!("Unknown tool '{}'", name),
        })?;
        tool.execute(arguments, workspace, cancel).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch a required string argument.
pub(crate) fn required_str<'a>(
    arguments: &'a serde_json::Value,
    tool: &str,
    key: &str,
) -> Result<&'a str> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ScoutError::ToolError {
            tool: tool.into(),
            message: format!("{} is required", key),
        })
}

/// Fetch an optional non-negative integer argument.
pub(crate) fn optional_usize(arguments: &serde_json::Value, key: &str) -> Option<usize> {
    arguments
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
}
