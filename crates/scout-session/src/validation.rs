//! Structural validation of generated reports.
//!
//! [`validate_report`] is a pure function of the report text and the
//! template; it performs no I/O and never fails.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ReportTemplate;

/// Snapshot of how well one report text satisfies the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportValidation {
    pub has_all_required_headings: bool,
    pub missing_headings: Vec<String>,
    pub has_sufficient_sections: bool,
    pub insufficient_sections: Vec<String>,
    pub related_work_has_comparison: bool,
    pub related_work_has_citation: bool,
    pub has_related_work_comparison: bool,
    pub has_reference_urls: bool,
    pub is_complete: bool,
}

static COMPARISON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(compare|compared|difference|differ|similar|whereas|unlike|in\s+contrast)\b")
        .expect("comparison regex")
});
static CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+(?:\s*[,\-–]\s*\d+)*\]").expect("citation regex"));
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("url regex"));

/// Depth of a markdown ATX heading line (`#`..`######` at the start of the
/// line, followed by a space).
fn heading_depth(line: &str) -> Option<usize> {
    let line = line.trim_end();
    let depth = line.chars().take_while(|&c| c == '#').count();
    if (1..=6).contains(&depth) && line[depth..].starts_with(' ') {
        Some(depth)
    } else {
        None
    }
}

/// Body text of the first section headed exactly `heading`, trimmed.
///
/// The body runs until the next heading of equal or shallower depth.
pub fn section_body(text: &str, heading: &str) -> Option<String> {
    let depth = heading_depth(heading).unwrap_or(1);
    let mut lines = text.lines();
    lines.by_ref().find(|line| line.trim_end() == heading)?;

    let body: Vec<&str> = lines
        .take_while(|line| heading_depth(line).map_or(true, |d| d > depth))
        .collect();
    Some(body.join("\n").trim().to_string())
}

fn has_heading(text: &str, heading: &str) -> bool {
    text.lines().any(|line| line.trim_end() == heading)
}

/// Validate a report against `template`.
pub fn validate_report(text: &str, template: &ReportTemplate) -> ReportValidation {
    let missing_headings: Vec<String> = template
        .required_headings
        .iter()
        .filter(|h| !has_heading(text, h))
        .cloned()
        .collect();

    let insufficient_sections: Vec<String> = template
        .question_headings
        .iter()
        .filter(|h| {
            section_body(text, h).map_or(true, |body| {
                body.chars().count() < template.min_section_chars
            })
        })
        .cloned()
        .collect();

    let related = section_body(text, &template.related_work_heading).unwrap_or_default();
    let related_work_has_comparison = COMPARISON_RE.is_match(&related);
    let related_work_has_citation = CITATION_RE.is_match(&related) || URL_RE.is_match(&related);

    let references = section_body(text, &template.references_heading).unwrap_or_default();
    let has_reference_urls = URL_RE.is_match(&references);

    let has_all_required_headings = missing_headings.is_empty();
    let has_sufficient_sections = insufficient_sections.is_empty();
    let has_related_work_comparison = related_work_has_comparison && related_work_has_citation;

    ReportValidation {
        has_all_required_headings,
        missing_headings,
        has_sufficient_sections,
        insufficient_sections,
        related_work_has_comparison,
        related_work_has_citation,
        has_related_work_comparison,
        has_reference_urls,
        is_complete: has_all_required_headings
            && has_sufficient_sections
            && has_related_work_comparison
            && has_reference_urls,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(topic: &str) -> String {
        format!(
            "This section discusses {topic} in enough depth to pass the sufficiency \
             check, describing the setting, the method and the consequences in detail."
        )
    }

    fn complete_report() -> String {
        format!(
            "# A Paper\n\n## Summary\nShort summary.\n\n\
             ## 1. What problem does the work address?\n{}\n\n\
             ## 2. How does the proposed approach work?\n{}\n\n\
             ## 3. What evidence supports the claims?\n{}\n\n\
             ## 4. What are the limitations and open questions?\n{}\n\n\
             ## Related Work\nCompared to prior retrieval models [1], this work differs in scope.\n\n\
             ## References\n[1] https://arxiv.org/abs/2001.00001\n",
            paragraph("the problem"),
            paragraph("the approach"),
            paragraph("the evidence"),
            paragraph("the limitations"),
        )
    }

    #[test]
    fn complete_report_passes_every_check() {
        let v = validate_report(&complete_report(), &ReportTemplate::default());
        assert!(v.has_all_required_headings, "{:?}", v.missing_headings);
        assert!(v.has_sufficient_sections, "{:?}", v.insufficient_sections);
        assert!(v.has_related_work_comparison);
        assert!(v.has_reference_urls);
        assert!(v.is_complete);
    }

    #[test]
    fn missing_related_work_is_listed() {
        let report = complete_report().replace("## Related Work", "## Background");
        let v = validate_report(&report, &ReportTemplate::default());
        assert_eq!(v.missing_headings, vec!["## Related Work".to_string()]);
        assert!(!v.has_all_required_headings);
        assert!(!v.has_related_work_comparison);
        assert!(!v.is_complete);
    }

    #[test]
    fn heading_match_is_case_sensitive() {
        let report = complete_report().replace("## Summary", "## summary");
        let v = validate_report(&report, &ReportTemplate::default());
        assert_eq!(v.missing_headings, vec!["## Summary".to_string()]);
    }

    #[test]
    fn short_question_section_is_insufficient() {
        let report = complete_report().replace(&paragraph("the evidence"), "Too short.");
        let v = validate_report(&report, &ReportTemplate::default());
        assert!(v.has_all_required_headings);
        assert_eq!(
            v.insufficient_sections,
            vec!["## 3. What evidence supports the claims?".to_string()]
        );
        assert!(!v.is_complete);
    }

    #[test]
    fn subheadings_stay_inside_their_section() {
        let report = complete_report().replace(
            &paragraph("the approach"),
            "### Architecture\nAn encoder.\n### Training\nA loss function that is explained in \
             great detail, with the objective, the optimizer, and every hyperparameter listed.",
        );
        let body = section_body(&report, "## 2. How does the proposed approach work?").unwrap();
        assert!(body.starts_with("### Architecture"));
        assert!(body.contains("### Training"));
        assert!(!body.contains("## 3."));
    }

    #[test]
    fn section_ends_at_shallower_heading() {
        let text = "## Related Work\nUnlike X [2].\n# Appendix\nhttps://example.com";
        assert_eq!(section_body(text, "## Related Work").unwrap(), "Unlike X [2].");
    }

    #[test]
    fn related_work_needs_both_comparison_and_citation() {
        let template = ReportTemplate::default();
        let no_citation = complete_report().replace("[1], this", "this");
        let v = validate_report(&no_citation, &template);
        assert!(v.related_work_has_comparison);
        assert!(!v.related_work_has_citation);
        assert!(!v.has_related_work_comparison);

        let no_comparison = complete_report()
            .replace("Compared to", "Following")
            .replace("differs in", "extends");
        let v = validate_report(&no_comparison, &template);
        assert!(!v.related_work_has_comparison);
        assert!(v.related_work_has_citation);
    }

    #[test]
    fn comparison_words_match_on_word_boundaries() {
        assert!(COMPARISON_RE.is_match("In Contrast to BERT"));
        assert!(COMPARISON_RE.is_match("whereas the baseline"));
        assert!(!COMPARISON_RE.is_match("dissimilarity"));
        assert!(!COMPARISON_RE.is_match("comparative study"));
    }

    #[test]
    fn citation_forms() {
        for ok in ["[1]", "[2, 3]", "[4-7]", "[1,2,3]"] {
            assert!(CITATION_RE.is_match(ok), "{ok}");
        }
        for bad in ["[a]", "[]", "[1a]"] {
            assert!(!CITATION_RE.is_match(bad), "{bad}");
        }
    }

    #[test]
    fn url_in_related_work_counts_as_citation() {
        let report = complete_report().replace("[1], this", "(https://example.org/x), this");
        let v = validate_report(&report, &ReportTemplate::default());
        assert!(v.related_work_has_citation);
    }

    #[test]
    fn references_without_urls_fail() {
        let report = complete_report().replace("https://arxiv.org/abs/2001.00001", "Doe et al. 2020");
        let v = validate_report(&report, &ReportTemplate::default());
        assert!(!v.has_reference_urls);
        assert!(!v.is_complete);
    }

    #[test]
    fn only_references_missing_is_listed_alone() {
        let report = complete_report().replace("## References\n", "");
        let v = validate_report(&report, &ReportTemplate::default());
        assert_eq!(v.missing_headings, vec!["## References".to_string()]);
        assert!(!v.has_reference_urls);
        assert!(!v.is_complete);
    }

    #[test]
    fn references_reading_see_our_website_have_no_urls() {
        let report = complete_report().replace("[1] https://arxiv.org/abs/2001.00001", "see our website");
        assert_eq!(section_body(&report, "## References").unwrap(), "see our website");
        let v = validate_report(&report, &ReportTemplate::default());
        assert!(v.has_all_required_headings);
        assert!(!v.has_reference_urls);
        assert!(!v.is_complete);
    }

    #[test]
    fn in_contrast_with_numbered_citation_passes_related_work() {
        let report = complete_report().replace(
            "Compared to prior retrieval models [1], this work differs in scope.",
            "In contrast to [3], our method..",
        );
        let v = validate_report(&report, &ReportTemplate::default());
        assert!(v.related_work_has_comparison);
        assert!(v.related_work_has_citation);
        assert!(v.has_related_work_comparison);
        assert!(v.is_complete);
    }

    #[test]
    fn indented_heading_lines_are_not_headings() {
        let report = complete_report().replace("## References", "    ## References");
        let v = validate_report(&report, &ReportTemplate::default());
        assert_eq!(v.missing_headings, vec!["## References".to_string()]);
        assert_eq!(heading_depth("    ## References"), None);
        assert_eq!(heading_depth("## References  "), Some(2));
    }

    #[test]
    fn trailing_whitespace_after_a_heading_is_ignored() {
        let report = complete_report().replace("## Summary\n", "## Summary   \n");
        let v = validate_report(&report, &ReportTemplate::default());
        assert!(v.has_all_required_headings);
    }

    #[test]
    fn empty_report_reports_everything_missing() {
        let template = ReportTemplate::default();
        let v = validate_report("", &template);
        assert_eq!(v.missing_headings, template.required_headings);
        assert_eq!(v.insufficient_sections, template.question_headings);
        assert!(!v.is_complete);
    }

    #[test]
    fn heading_depth_requires_space() {
        assert_eq!(heading_depth("## Title"), Some(2));
        assert_eq!(heading_depth("#hashtag"), None);
        assert_eq!(heading_depth("####### seven"), None);
        assert_eq!(heading_depth("plain"), None);
    }
}
