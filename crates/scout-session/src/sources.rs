//! The per-run source table and its `sources.json` sidecar record.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use scout_tools::Workspace;
use scout_types::{Result, SourceReference};
use serde::{Deserialize, Serialize};
use url::Url;

/// Provenance tag of the seed URL.
pub const SEED_PROVENANCE: &str = "seed";

/// One sighting of a URL, before it is merged into a [`SourceTable`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceObservation {
    pub url: String,
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub provenance: Option<String>,
}

impl SourceObservation {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    pub fn provenance(mut self, provenance: impl Into<String>) -> Self {
        self.provenance = Some(provenance.into());
        self
    }
}

/// What a merge did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Added,
    Updated,
    Unchanged,
    /// The URL could not be parsed as an absolute http(s) URL.
    Rejected,
}

/// Normalize a URL for use as a table key: parsed, fragment dropped.
pub fn normalize_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

/// Sources seen during one run, one entry per normalized URL, ordered by URL.
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    entries: BTreeMap<String, SourceReference>,
}

impl SourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an observation seen at `now`.
    ///
    /// The first sighting fixes `added_at`. Later sightings only fill fields
    /// that are still empty.
    pub fn merge(&mut self, observation: SourceObservation, now: DateTime<Utc>) -> MergeOutcome {
        let Some(key) = normalize_url(&observation.url) else {
            return MergeOutcome::Rejected;
        };
        let title = non_blank(observation.title);
        let snippet = non_blank(observation.snippet);
        let provenance = non_blank(observation.provenance);

        match self.entries.get_mut(&key) {
            Some(existing) => {
                let mut changed = fill(&mut existing.title, title);
                changed |= fill(&mut existing.snippet, snippet);
                changed |= fill(&mut existing.provenance, provenance);
                if changed {
                    MergeOutcome::Updated
                } else {
                    MergeOutcome::Unchanged
                }
            }
            None => {
                self.entries.insert(
                    key.clone(),
                    SourceReference {
                        url: key,
                        title,
                        provenance,
                        snippet,
                        added_at: now,
                    },
                );
                MergeOutcome::Added
            }
        }
    }

    pub fn get(&self, url: &str) -> Option<&SourceReference> {
        normalize_url(url).and_then(|key| self.entries.get(&key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, sorted by URL.
    pub fn to_vec(&self) -> Vec<SourceReference> {
        self.entries.values().cloned().collect()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn fill(slot: &mut Option<String>, value: Option<String>) -> bool {
    if slot.is_none() && value.is_some() {
        *slot = value;
        true
    } else {
        false
    }
}

// ---------------------------------------------------------------------------
// Sidecar record
// ---------------------------------------------------------------------------

/// The `sources.json` sidecar written next to each report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcesRecord {
    pub seed_url: String,
    pub sources: Vec<SourceReference>,
}

impl SourcesRecord {
    pub fn new(seed_url: impl Into<String>, table: &SourceTable) -> Self {
        Self {
            seed_url: seed_url.into(),
            sources: table.to_vec(),
        }
    }

    /// Write the record as pretty-printed JSON, sources sorted by URL.
    pub async fn save(&self, workspace: &dyn Workspace, path: &Path) -> Result<()> {
        let mut record = self.clone();
        record.sources.sort_by(|a, b| a.url.cmp(&b.url));
        let json = serde_json::to_string_pretty(&record)?;
        workspace.write_file(path, &json).await?;
        tracing::debug!(path = %path.display(), sources = record.sources.len(), "Sources record saved");
        Ok(())
    }

    pub async fn load(workspace: &dyn Workspace, path: &Path) -> Result<Self> {
        let json = workspace.read_file(path).await?;
        let record: SourcesRecord = serde_json::from_str(&json)?;
        tracing::debug!(path = %path.display(), sources = record.sources.len(), "Sources record loaded");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use scout_tools::LocalWorkspace;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn observation() -> SourceObservation {
        SourceObservation::new("https://papers.example/a")
            .title("Paper A")
            .snippet("About A")
            .provenance("search:arxiv")
    }

    #[test]
    fn merge_is_idempotent() {
        let mut table = SourceTable::new();
        assert_eq!(table.merge(observation(), at(0)), MergeOutcome::Added);
        let once = table.to_vec();

        assert_eq!(table.merge(observation(), at(10)), MergeOutcome::Unchanged);
        assert_eq!(table.to_vec(), once);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn merge_never_overwrites_populated_fields() {
        let mut table = SourceTable::new();
        table.merge(
            SourceObservation::new("https://papers.example/a").provenance("seed"),
            at(0),
        );
        table.merge(observation().title("Different title"), at(5));
        table.merge(observation(), at(9));

        let entry = table.get("https://papers.example/a").unwrap();
        assert_eq!(entry.title.as_deref(), Some("Different title"));
        assert_eq!(entry.snippet.as_deref(), Some("About A"));
        assert_eq!(entry.provenance.as_deref(), Some("seed"));
        assert_eq!(entry.added_at, at(0));
    }

    #[test]
    fn blank_fields_count_as_empty() {
        let mut table = SourceTable::new();
        table.merge(SourceObservation::new("https://x.example/").title("   "), at(0));
        assert_eq!(table.get("https://x.example/").unwrap().title, None);

        assert_eq!(
            table.merge(SourceObservation::new("https://x.example/").title("Real"), at(1)),
            MergeOutcome::Updated
        );
        assert_eq!(table.get("https://x.example/").unwrap().title.as_deref(), Some("Real"));
    }

    #[test]
    fn urls_are_normalized_before_keying() {
        let mut table = SourceTable::new();
        table.merge(SourceObservation::new("https://Papers.Example/a#section-2"), at(0));
        table.merge(SourceObservation::new("  https://papers.example/a  "), at(1));
        assert_eq!(table.len(), 1);
        assert_eq!(table.to_vec()[0].url, "https://papers.example/a");
    }

    #[test]
    fn unparseable_urls_are_rejected() {
        let mut table = SourceTable::new();
        assert_eq!(
            table.merge(SourceObservation::new("not a url"), at(0)),
            MergeOutcome::Rejected
        );
        assert_eq!(
            table.merge(SourceObservation::new("mailto:a@b.c"), at(0)),
            MergeOutcome::Rejected
        );
        assert!(table.is_empty());
    }

    #[test]
    fn entries_are_sorted_by_url() {
        let mut table = SourceTable::new();
        for url in ["https://c.example/", "https://a.example/", "https://b.example/"] {
            table.merge(SourceObservation::new(url), at(0));
        }
        let urls: Vec<_> = table.to_vec().into_iter().map(|s| s.url).collect();
        assert_eq!(
            urls,
            vec!["https://a.example/", "https://b.example/", "https://c.example/"]
        );
    }

    #[test]
    fn record_serializes_camel_case_with_rfc3339_timestamps() {
        let mut table = SourceTable::new();
        table.merge(observation(), at(0));
        let record = SourcesRecord::new("https://papers.example/a", &table);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["seedUrl"], "https://papers.example/a");
        let source = &json["sources"][0];
        assert_eq!(source["provenance"], "search:arxiv");
        assert_eq!(source["addedAt"], "2023-11-14T22:13:20Z");
    }

    #[tokio::test]
    async fn record_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let ws = LocalWorkspace::new(dir.path()).unwrap();
        let mut table = SourceTable::new();
        table.merge(
            SourceObservation::new("https://seed.example/").provenance(SEED_PROVENANCE),
            at(0),
        );
        table.merge(observation(), at(3));
        let record = SourcesRecord::new("https://seed.example/", &table);

        let path = Path::new("reports/x/sources.json");
        record.save(&ws, path).await.unwrap();
        let loaded = SourcesRecord::load(&ws, path).await.unwrap();
        assert_eq!(loaded, record);

        let raw = std::fs::read_to_string(dir.path().join(path)).unwrap();
        assert!(raw.contains("\n  \"sources\""), "pretty-printed");
    }
}
