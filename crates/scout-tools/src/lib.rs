//! Tools and the sandboxed workspace for Scout research sessions.
//!
//! Provides `Tool` trait, `ToolRegistry`, the `Workspace` trait with its
//! `LocalWorkspace` path sandbox, and the built-in tools (read_file,
//! write_file, web_search, extract_source).

pub mod builtin;
pub mod tool;
pub mod truncation;
pub mod workspace;

pub use builtin::{ExtractSourceTool, ReadFileTool, WebSearchTool, WriteFileTool};
pub use tool::{Tool, ToolDefinition, ToolRegistry};
pub use workspace::{resolve_within, LocalWorkspace, Workspace};

use scout_sources::{Extractor, SearchAggregator, SourceEndpoints};

/// Tool name of the search tool, whose results carry provenance.
pub const WEB_SEARCH: &str = "web_search";
/// Tool name of the extraction tool, whose results carry provenance.
pub const EXTRACT_SOURCE: &str = "extract_source";

/// The full research tool set: search, extraction, and sandboxed file I/O.
pub fn research_tools(client: reqwest::Client, endpoints: &SourceEndpoints) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(WebSearchTool::new(SearchAggregator::scholarly(
        client.clone(),
        endpoints,
    )));
    registry.register(ExtractSourceTool::new(Extractor::new(client, endpoints)));
    registry.register(ReadFileTool);
    registry.register(WriteFileTool);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scout_sources::SearchProvider;
    use scout_types::{ScoutError, SearchResult};
    use serde_json::json;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    /// A mock workspace that stores files in memory under `/ws`.
    struct MockWorkspace {
        files: Mutex<HashMap<PathBuf, String>>,
    }

    impl MockWorkspace {
        fn new() -> Self {
            Self {
                files: Mutex::new(HashMap::new()),
            }
        }

        fn with_file(self, path: &str, content: &str) -> Self {
            let resolved = self.resolve(Path::new(path)).unwrap();
            self.files
                .lock()
                .unwrap()
                .insert(resolved, content.to_string());
            self
        }
    }

    #[async_trait]
    impl Workspace for MockWorkspace {
        fn resolve(&self, path: &Path) -> scout_types::Result<PathBuf> {
            resolve_within(self.root(), path)
        }
        async fn read_file(&self, path: &Path) -> scout_types::Result<String> {
            let key = self.resolve(path)?;
            self.files
                .lock()
                .unwrap()
                .get(&key)
                .cloned()
                .ok_or_else(|| ScoutError::ToolError {
                    tool: "read_file".into(),
                    message: format!("File not found: {}", key.display()),
                })
        }
        async fn write_file(&self, path: &Path, content: &str) -> scout_types::Result<()> {
            let key = self.resolve(path)?;
            self.files.lock().unwrap().insert(key, content.to_string());
            Ok(())
        }
        async fn file_exists(&self, path: &Path) -> scout_types::Result<bool> {
            let key = self.resolve(path)?;
            Ok(self.files.lock().unwrap().contains_key(&key))
        }
        async fn create_dir_all(&self, path: &Path) -> scout_types::Result<()> {
            self.resolve(path).map(|_| ())
        }
        fn root(&self) -> &Path {
            Path::new("/ws")
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "echo".to_string(),
                description: "Echoes the input".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "text": { "type": "string" }
                    }
                }),
            }
        }

        async fn execute(
            &self,
            arguments: serde_json::Value,
            _workspace: &dyn Workspace,
            _cancel: &CancellationToken,
        ) -> scout_types::Result<serde_json::Value> {
            let text = arguments
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or("(empty)");
            Ok(json!(text))
        }
    }

    struct FixedProvider(Vec<SearchResult>);

    #[async_trait]
    impl SearchProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn search(
            &self,
            _query: &str,
            limit: usize,
            _cancel: &CancellationToken,
        ) -> scout_types::Result<Vec<SearchResult>> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    fn hit(n: usize) -> SearchResult {
        SearchResult {
            title: format!("Paper {}", n),
            url: format!("https://papers.example/{}", n),
            snippet: "snippet".into(),
            provider: "fixed".into(),
        }
    }

    #[test]
    fn registry_register_and_get() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());

        registry.register(EchoTool);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn registry_unregister() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        assert!(registry.unregister("echo"));
        assert!(!registry.unregister("echo"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn registry_execute_unknown_tool_is_tool_error() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute("missing", json!({}), &MockWorkspace::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScoutError::ToolError { ref tool, .. } if tool == "missing"));
    }

    #[tokio::test]
    async fn registry_execute_dispatches_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        let result = registry
            .execute(
                "echo",
                json!({"text": "hello"}),
                &MockWorkspace::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(result, json!("hello"));
    }

    #[test]
    fn research_tools_registers_the_full_set() {
        let registry = research_tools(reqwest::Client::new(), &SourceEndpoints::default());
        assert_eq!(
            registry.names(),
            vec!["extract_source", "read_file", "web_search", "write_file"]
        );
        for def in registry.definitions() {
            assert_eq!(def.parameters["type"], "object");
            assert!(!def.description.is_empty());
        }
    }

    #[tokio::test]
    async fn read_file_adds_line_numbers() {
        let ws = MockWorkspace::new().with_file("notes.txt", "line one\nline two\nline three");
        let result = ReadFileTool
            .execute(json!({"file_path": "notes.txt"}), &ws, &CancellationToken::new())
            .await
            .unwrap();
        let text = result.as_str().unwrap();
        assert!(text.contains("1 | line one"));
        assert!(text.contains("3 | line three"));
    }

    #[tokio::test]
    async fn read_file_offset_past_end_is_empty() {
        let ws = MockWorkspace::new().with_file("a.txt", "one\ntwo");
        let result = ReadFileTool
            .execute(
                json!({"file_path": "a.txt", "offset": 10}),
                &ws,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(result, json!(""));
    }

    #[tokio::test]
    async fn write_file_stores_content() {
        let ws = MockWorkspace::new();
        let result = WriteFileTool
            .execute(
                json!({"file_path": "reports/x/report.md", "content": "hello world"}),
                &ws,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(result.as_str().unwrap().contains("11 bytes"));

        let content = ws.read_file(Path::new("reports/x/report.md")).await.unwrap();
        assert_eq!(content, "hello world");
    }

    #[tokio::test]
    async fn write_file_outside_workspace_is_rejected() {
        let ws = MockWorkspace::new();
        let err = WriteFileTool
            .execute(
                json!({"file_path": "../../etc/passwd", "content": "x"}),
                &ws,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ScoutError::PathEscapesWorkspace { .. }));
    }

    #[tokio::test]
    async fn write_file_requires_content() {
        let err = WriteFileTool
            .execute(
                json!({"file_path": "a.md"}),
                &MockWorkspace::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("content is required"));
    }

    #[tokio::test]
    async fn web_search_result_carries_query_and_results() {
        let tool = WebSearchTool::new(
            SearchAggregator::new().with_provider(FixedProvider((1..=30).map(hit).collect())),
        );
        let result = tool
            .execute(
                json!({"query": "  attention  ", "limit": 3}),
                &MockWorkspace::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(result["query"], "attention");
        let results = result["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["url"], "https://papers.example/1");
        assert_eq!(results[0]["provider"], "fixed");
        assert!(result.get("providerErrors").is_none());
    }

    #[tokio::test]
    async fn web_search_limit_is_clamped() {
        let tool = WebSearchTool::new(
            SearchAggregator::new().with_provider(FixedProvider((1..=30).map(hit).collect())),
        );
        let result = tool
            .execute(
                json!({"query": "q", "limit": 500}),
                &MockWorkspace::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(
            result["results"].as_array().unwrap().len(),
            builtin::MAX_SEARCH_LIMIT
        );
    }

    #[tokio::test]
    async fn web_search_rejects_blank_query() {
        let tool = WebSearchTool::new(SearchAggregator::new());
        let err = tool
            .execute(json!({"query": "   "}), &MockWorkspace::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScoutError::ToolError { .. }));
    }
}
