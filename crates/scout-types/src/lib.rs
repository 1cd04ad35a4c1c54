//! Shared types and errors for the Scout research engine.
//!
//! This crate provides the foundational types used across all other Scout crates:
//! - `ScoutError`: unified error taxonomy
//! - `SourceKind`: classification of a fetched document
//! - `ExtractedMetadata`: normalized metadata produced by the extraction pipeline
//! - `SearchResult`: one hit returned by the search aggregator
//! - `SourceReference`: one entry of a run's provenance table

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unified error type for all Scout subsystems.
#[derive(Debug, thiserror::Error)]
pub enum ScoutError {
    // === Input Validation ===
    #[error("Invalid seed URL '{url}': {reason}")]
    InvalidSeedUrl { url: String, reason: String },

    #[error("Path '{path}' escapes the workspace root")]
    PathEscapesWorkspace { path: String },

    // === Run Lifecycle ===
    #[error("A research run is already in progress")]
    RunInProgress,

    #[error("Turn cap exceeded: the run was stopped after {max_turns} turns")]
    TurnCapExceeded { max_turns: usize },

    #[error("Expected report artifact is missing: {path}")]
    ArtifactMissing { path: String },

    #[error("Operation cancelled")]
    Cancelled,

    // === Remote Fetch ===
    #[error("Fetch failed for {url}: HTTP {status}")]
    FetchFailed { url: String, status: u16 },

    #[error("No scholarly record found for '{id}'")]
    RecordNotFound { id: String },

    #[error("Could not parse {what}: {message}")]
    Unparseable { what: String, message: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Search failed: {}", errors.join("; "))]
    SearchFailed { errors: Vec<String> },

    // === LLM Provider Errors ===
    #[error("Provider {provider} returned HTTP {status}: {message}")]
    ProviderError {
        provider: String,
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    #[error("Authentication failed for provider {provider}")]
    AuthError { provider: String },

    // === Tool Errors ===
    #[error("Tool '{tool}' error: {message}")]
    ToolError { tool: String, message: String },

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl ScoutError {
    /// Returns `true` if the error came from a cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScoutError::Cancelled)
    }

    /// Returns `true` for the reasons a research run is aborted outright,
    /// as opposed to completing with an incomplete report.
    pub fn is_run_failure(&self) -> bool {
        matches!(
            self,
            ScoutError::TurnCapExceeded { .. }
                | ScoutError::ArtifactMissing { .. }
                | ScoutError::Cancelled
        )
    }

    /// Returns `true` for errors rejected before any run state was created.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ScoutError::InvalidSeedUrl { .. }
                | ScoutError::PathEscapesWorkspace { .. }
                | ScoutError::RunInProgress
        )
    }
}

/// A convenience alias for `Result<T, ScoutError>`.
pub type Result<T> = std::result::Result<T, ScoutError>;

// ---------------------------------------------------------------------------
// SourceKind
// ---------------------------------------------------------------------------

/// How a document was classified by the extraction pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Resolved through a scholarly repository's own record API.
    ScholarlyId,
    Pdf,
    Html,
    Other,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::ScholarlyId => "scholarly-id",
            SourceKind::Pdf => "pdf",
            SourceKind::Html => "html",
            SourceKind::Other => "other",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ExtractedMetadata
// ---------------------------------------------------------------------------

/// Optional metadata fields tracked in [`ExtractedMetadata::missing_fields`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetadataField {
    Authors,
    Year,
    Abstract,
    FullText,
}

/// Normalized metadata for one fetched source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedMetadata {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    pub source_kind: SourceKind,
    pub canonical_url: String,
    #[serde(default)]
    pub missing_fields: BTreeSet<MetadataField>,
}

impl ExtractedMetadata {
    /// Create metadata with only the mandatory fields populated.
    pub fn new(
        title: impl Into<String>,
        source_kind: SourceKind,
        canonical_url: impl Into<String>,
    ) -> Self {
        let mut meta = Self {
            title: title.into(),
            authors: Vec::new(),
            year: None,
            abstract_text: None,
            full_text: None,
            source_kind,
            canonical_url: canonical_url.into(),
            missing_fields: BTreeSet::new(),
        };
        meta.recompute_missing_fields();
        meta
    }

    /// Rebuild `missing_fields` from the current field values.
    ///
    /// Blank strings count as missing.
    pub fn recompute_missing_fields(&mut self) {
        let blank = |s: &Option<String>| s.as_deref().map_or(true, |v| v.trim().is_empty());

        let mut missing = BTreeSet::new();
        if self.authors.iter().all(|a| a.trim().is_empty()) {
            missing.insert(MetadataField::Authors);
        }
        if self.year.is_none() {
            missing.insert(MetadataField::Year);
        }
        if blank(&self.abstract_text) {
            missing.insert(MetadataField::Abstract);
        }
        if blank(&self.full_text) {
            missing.insert(MetadataField::FullText);
        }
        self.missing_fields = missing;
    }
}

// ---------------------------------------------------------------------------
// SearchResult
// ---------------------------------------------------------------------------

/// A single search hit in the common shape shared by all providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// Tag of the provider that produced this hit, e.g. `semantic-scholar`.
    pub provider: String,
}

// ---------------------------------------------------------------------------
// SourceReference
// ---------------------------------------------------------------------------

/// One source consulted during a research run, keyed by normalized URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReference {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Where the source came from: `seed`, `search:<provider>`, `extract:<kind>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    pub added_at: DateTime<Utc>,
}
