//! Markdown report to standalone HTML.

use pulldown_cmark::{html, Options, Parser};

const STYLE: &str = "body{max-width:46rem;margin:2rem auto;padding:0 1rem;\
font-family:system-ui,sans-serif;line-height:1.55}\
pre,code{background:#f4f4f4}table{border-collapse:collapse}\
td,th{border:1px solid #ccc;padding:.25rem .5rem}";

/// Title of a report: its first `# ` heading, if any.
pub fn report_title(markdown: &str) -> Option<String> {
    markdown
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Render `markdown` as a complete HTML document.
///
/// `fallback_title` is used when the report has no top-level heading.
pub fn render_html(markdown: &str, fallback_title: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_FOOTNOTES;
    let parser = Parser::new_ext(markdown, options);
    let mut body = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut body, parser);

    let title = report_title(markdown).unwrap_or_else(|| fallback_title.to_string());
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_text(&title),
        STYLE,
        body
    )
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
