//! Run configuration and the report template contract.

use std::path::PathBuf;
use std::time::Duration;

/// Settings for a [`ResearchController`](crate::ResearchController).
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    /// Workspace root. Every file the engine touches must live under it.
    pub workdir: PathBuf,
    /// Directory, relative to `workdir`, holding one subdirectory per report.
    pub reports_dir: PathBuf,
    /// Turn boundaries allowed before the run is cancelled and failed.
    pub max_turns: usize,
    /// How long an engine may keep running after the turn cap cancelled it
    /// before the controller abandons it.
    pub cap_grace_period: Duration,
    pub slug_max_len: usize,
    pub template: ReportTemplate,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            reports_dir: PathBuf::from("reports"),
            max_turns: 40,
            cap_grace_period: Duration::from_secs(30),
            slug_max_len: 80,
            template: ReportTemplate::default(),
        }
    }
}

impl ResearchConfig {
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_cap_grace_period(mut self, grace: Duration) -> Self {
        self.cap_grace_period = grace;
        self
    }
}

/// The heading layout every generated report must follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTemplate {
    /// Every heading line that must appear, in template order.
    pub required_headings: Vec<String>,
    /// The subset of `required_headings` whose bodies must be substantive.
    pub question_headings: Vec<String>,
    pub related_work_heading: String,
    pub references_heading: String,
    pub min_section_chars: usize,
}

impl Default for ReportTemplate {
    fn default() -> Self {
        let questions = [
            "## 1. What problem does the work address?",
            "## 2. How does the proposed approach work?",
            "## 3. What evidence supports the claims?",
            "## 4. What are the limitations and open questions?",
        ];
        let mut required = vec!["## Summary".to_string()];
        required.extend(questions.iter().map(|h| h.to_string()));
        required.push("## Related Work".to_string());
        required.push("## References".to_string());

        Self {
            required_headings: required,
            question_headings: questions.iter().map(|h| h.to_string()).collect(),
            related_work_heading: "## Related Work".to_string(),
            references_heading: "## References".to_string(),
            min_section_chars: 120,
        }
    }
}

impl ReportTemplate {
    /// Markdown skeleton of the template, used in the research prompt.
    pub fn skeleton(&self, title_hint: &str) -> String {
        let mut out = format!("# {}\n", title_hint);
        for heading in &self.required_headings {
            out.push('\n');
            out.push_str(heading);
            out.push('\n');
        }
        out
    }
}
