//! Prompts that steer the reasoning engine toward a template-conformant report.

use std::path::Path;

use scout_agent::SystemPromptBuilder;
use scout_tools::ToolDefinition;

use crate::config::ReportTemplate;

const BASE_PROMPT: &str = "You are a careful research assistant. You read a seed document, \
gather related work with the tools provided, and write a structured, well-cited report. \
Never invent sources: every claim about another work must come from a tool result.";

/// System prompt for one research run.
pub fn research_system_prompt(
    template: &ReportTemplate,
    report_path: &Path,
    tools: &[ToolDefinition],
) -> String {
    let task = format!(
        "1. Call `extract_source` on the seed URL to read the paper.\n\
         2. Use `web_search` to find closely related work, then `extract_source` on the most relevant hits.\n\
         3. Write the finished report with `write_file` to `{}`.\n\
         4. Stop once the report is written.",
        report_path.display()
    );

    let rules = format!(
        "Use exactly these heading lines, spelled as shown, in this order:\n\n```markdown\n{}```\n\n\
         - Each numbered question section must contain at least {} characters of substantive prose.\n\
         - In Related Work, explicitly compare the seed paper with others (compared to, unlike, whereas, in contrast) \
         and cite them with numeric brackets like [1] or [2, 3].\n\
         - Under References, list every cited work with its full URL (https://...).\n\
         - If extraction reports `missingFields`, say what could not be determined instead of guessing.",
        template.skeleton("<paper title>"),
        template.min_section_chars
    );

    SystemPromptBuilder::new()
        .with_base(BASE_PROMPT)
        .with_goal("Produce a validated research report about the seed document.")
        .with_task(&task)
        .with_tools(tools)
        .with_section("Report Template", &rules)
        .build()
}

/// The first user message of a run.
pub fn initial_user_prompt(seed_url: &str, report_path: &Path) -> String {
    format!(
        "Research this document and write the report to `{}`:\n\n{}",
        report_path.display(),
        seed_url
    )
}
