/*!
 * Reader-facing export of a project.
 *
 * Every block contributes its translation, or its source text while it is
 * still untranslated, so a partial run still exports a complete document.
 */

use std::fmt;

use super::model::{Block, BlockType, Project};

/// Output document format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Markdown,
    Html,
    Txt,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Html => "html",
            ExportFormat::Txt => "txt",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Markdown => write!(f, "markdown"),
            ExportFormat::Html => write!(f, "html"),
            ExportFormat::Txt => write!(f, "txt"),
        }
    }
}

/// Default file name: `<title>_<target language>.<ext>`
pub fn file_name(project: &Project, format: ExportFormat) -> String {
    let title = project.metadata.title.trim();
    let title = if title.is_empty() { "fanfic" } else { title };
    let stem: String = format!("{}_{}", title, project.metadata.target_language)
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("{}.{}", stem, format.extension())
}

/// Render the whole project as one document
pub fn render(project: &Project, format: ExportFormat) -> String {
    match format {
        ExportFormat::Markdown => render_markdown(project),
        ExportFormat::Html => render_html(project),
        ExportFormat::Txt => render_txt(project),
    }
}

fn display_text(block: &Block) -> &str {
    if block.translated.is_empty() {
        &block.original
    } else {
        &block.translated
    }
}

/// Drop leading markdown heading marks and whitespace
fn strip_heading(text: &str) -> &str {
    text.trim_start_matches(|c: char| c == '#' || c.is_whitespace())
}

fn render_markdown(project: &Project) -> String {
    let metadata = &project.metadata;
    let source = if metadata.url.is_empty() { "N/A" } else { &metadata.url };
    let mut out = format!(
        "# {}\n**Author:** {}\n**Source:** {}\n---\n\n",
        metadata.title, metadata.author, source
    );

    for block in &project.blocks {
        match block.block_type {
            BlockType::Header => out.push_str(&format!("## {}\n\n", strip_heading(display_text(block)))),
            BlockType::Separator => out.push_str("---\n\n"),
            BlockType::Text => out.push_str(&format!("{}\n\n", display_text(block))),
        }
    }
    out
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn render_html(project: &Project) -> String {
    let title = escape_html(&project.metadata.title);
    let mut out = format!(
        "<html><head><meta charset=\"utf-8\"><title>{}</title></head><body>\n<h1>{}</h1>\n",
        title, title
    );

    for block in &project.blocks {
        let text = escape_html(strip_heading(display_text(block)));
        match block.block_type {
            BlockType::Header => out.push_str(&format!("<h2>{}</h2>\n", text)),
            BlockType::Separator => out.push_str("<hr/>\n"),
            BlockType::Text => out.push_str(&format!("<p>{}</p>\n", text.replace('\n', "<br/>"))),
        }
    }
    out.push_str("</body></html>\n");
    out
}

fn render_txt(project: &Project) -> String {
    let mut out = format!("{}\n\n", project.metadata.title);
    for block in &project.blocks {
        let text = strip_heading(display_text(block));
        match block.block_type {
            BlockType::Header => out.push_str(&format!("\n[ {} ]\n\n", text)),
            _ => out.push_str(&format!("{}\n\n", text)),
        }
    }
    out
}
