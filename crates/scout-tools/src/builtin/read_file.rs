use std::path::Path;

use async_trait::async_trait;
use scout_types::Result;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::tool::{optional_usize, required_str, Tool, ToolDefinition};
use crate::truncation::{truncate_output, TruncationMode};
use crate::workspace::Workspace;

const MAX_OUTPUT_CHARS: usize = 50_000;
const DEFAULT_LINE_LIMIT: usize = 2000;

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "read_file".to_string(),
            description: "Read a file inside the workspace. Returns content with line numbers."
                .to_string(),
            parameters: json!({
                "type": "object",
                "required": ["file_path"],
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path to the file, relative to the workspace root"
                    },
                    "offset": {
                        "type": "integer",
                        "description": "Line number to start reading from (1-based)"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of lines to read",
                        "default": DEFAULT_LINE_LIMIT
                    }
                }
            }),
        }
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        workspace: &dyn Workspace,
        _cancel: &CancellationToken,
    ) -> Result<serde_json::Value> {
        let file_path = required_str(&arguments, "read_file", "file_path")?;
        let offset = optional_usize(&arguments, "offset");
        let limit = optional_usize(&arguments, "limit").unwrap_or(DEFAULT_LINE_LIMIT);

        let content = workspace.read_file(Path::new(file_path)).await?;

        let lines: Vec<&str> = content.lines().collect();
        let start = offset.unwrap_or(1).saturating_sub(1).min(lines.len());
        let end = (start + limit).min(lines.len());
        let selected = &lines[start..end];

        let width = if end == 0 { 1 } else { end.to_string().len() };
        let numbered: Vec<String> = selected
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{:>width$} | {}", start + i + 1, line, width = width))
            .collect();

        // Callers page with `offset`, so keep the head.
        Ok(json!(truncate_output(
            &numbered.join("\n"),
            MAX_OUTPUT_CHARS,
            TruncationMode::Head
        )))
    }
}
