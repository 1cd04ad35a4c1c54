//! Provenance harvesting from tool results.
//!
//! Only the search and extraction tools carry provenance. Their JSON results
//! are parsed into typed payloads; anything that does not fit is ignored.

use scout_sources::text::{clip_with_ellipsis, SNIPPET_MAX_CHARS};
use scout_tools::{EXTRACT_SOURCE, WEB_SEARCH};
use scout_types::SourceKind;
use serde::Deserialize;
use serde_json::Value;

use crate::sources::SourceObservation;

/// Result shape of the search tool.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchPayload {
    pub query: String,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub provider: String,
}

/// Result shape of the extraction tool. Extra fields are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionPayload {
    pub title: String,
    pub canonical_url: String,
    pub source_kind: SourceKind,
    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolPayload {
    Search(SearchPayload),
    Extraction(ExtractionPayload),
}

/// Parse a tool result, keyed by tool name.
///
/// Returns `None` for tools that carry no provenance and for results that
/// do not match the expected shape.
pub fn parse_tool_payload(tool: &str, result: &Value) -> Option<ToolPayload> {
    let parsed = match tool {
        WEB_SEARCH => SearchPayload::deserialize(result).map(ToolPayload::Search),
        EXTRACT_SOURCE => ExtractionPayload::deserialize(result).map(ToolPayload::Extraction),
        _ => return None,
    };
    match parsed {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::warn!(tool, error = %e, "Ignoring malformed tool result");
            None
        }
    }
}

impl ToolPayload {
    /// Source observations carried by this payload, in result order.
    pub fn observations(&self) -> Vec<SourceObservation> {
        match self {
            ToolPayload::Search(search) => search
                .results
                .iter()
                .map(|hit| {
                    let provenance = if hit.provider.is_empty() {
                        "search".to_string()
                    } else {
                        format!("search:{}", hit.provider)
                    };
                    SourceObservation::new(&hit.url)
                        .title(&hit.title)
                        .snippet(&hit.snippet)
                        .provenance(provenance)
                })
                .collect(),
            ToolPayload::Extraction(extraction) => {
                let mut obs = SourceObservation::new(&extraction.canonical_url)
                    .title(&extraction.title)
                    .provenance(format!("extract:{}", extraction.source_kind));
                if let Some(abstract_text) = &extraction.abstract_text {
                    obs = obs.snippet(clip_with_ellipsis(abstract_text, SNIPPET_MAX_CHARS));
                }
                vec![obs]
            }
        }
    }
}
