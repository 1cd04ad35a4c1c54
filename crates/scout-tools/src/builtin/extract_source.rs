use async_trait::async_trait;
use scout_sources::Extractor;
use scout_types::Result;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::tool::{required_str, Tool, ToolDefinition};
use crate::workspace::Workspace;

/// Fetch a URL and return its normalized metadata, including the
/// `missingFields` hint.
pub struct ExtractSourceTool {
    extractor: Extractor,
}

impl ExtractSourceTool {
    pub fn new(extractor: Extractor) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl Tool for ExtractSourceTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "extract_source".to_string(),
            description: "Fetch a paper or web page and extract its title, authors, year, abstract and text. \
                          missingFields lists what could not be found."
                .to_string(),
            parameters: json!({
                "type": "object",
                "required": ["url"],
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "Absolute URL of the source"
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
        let url = required_str(&arguments, "extract_source", "url")?;
        let meta = self.extractor.extract(url.trim(), cancel).await?;
        Ok(serde_json::to_value(&meta)?)
    }
}
