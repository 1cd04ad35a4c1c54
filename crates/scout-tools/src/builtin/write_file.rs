use std::path::Path;

use async_trait::async_trait;
use scout_types::Result;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::tool::{required_str, Tool, ToolDefinition};
use crate::workspace::Workspace;

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "write_file".to_string(),
            description: "Write content to a file inside the workspace, creating parent directories if needed."
                .to_string(),
            parameters: json!({
                "type": "object",
                "required": ["file_path", "content"],
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path to the file, relative to the workspace root"
                    },
                    "content": {
                        "type": "string",
                        "description": "Content to write to the file"
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
        let file_path = required_str(&arguments, "write_file", "file_path")?;
        let content = required_str(&arguments, "write_file", "content")?;

        workspace.write_file(Path::new(file_path), content).await?;
        tracing::debug!(path = file_path, bytes = content.len(), "Wrote file");

        Ok(json!(format!(
            "Successfully wrote {} bytes to {}",
            content.len(),
            file_path
        )))
    }
}
