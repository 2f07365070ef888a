//! Suggestion display: `AnalysisResult` → HTML panel.
//!
//! DESIGN
//! ======
//! Pure rendering. Collapse flags live in [`DisplayState`], which is view
//! state owned by the workspace and never part of the analysis result.
//! Model-authored text is treated as untrusted: markdown goes through
//! `pulldown-cmark` with raw HTML turned back into text, everything else is
//! escaped.

use std::collections::BTreeSet;
use std::fmt::Write;

use pulldown_cmark::{Event, Options, Parser, html};
use serde::Serialize;

use super::advisor::{AnalysisResult, Category, Suggestion};

/// Per-category collapse flags. Categories start expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayState {
    collapsed: BTreeSet<Category>,
}

impl DisplayState {
    #[must_use]
    pub fn is_expanded(&self, category: Category) -> bool {
        !self.collapsed.contains(&category)
    }

    /// Flip a category and return its new expanded flag.
    pub fn toggle(&mut self, category: Category) -> bool {
        if !self.collapsed.remove(&category) {
            self.collapsed.insert(category);
        }
        self.is_expanded(category)
    }

    /// Categories currently expanded, in display order.
    #[must_use]
    pub fn expanded(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| self.is_expanded(*c))
            .collect()
    }
}

/// Categories that have at least one suggestion, in display order.
#[must_use]
pub fn visible_categories(result: &AnalysisResult) -> Vec<(Category, &[Suggestion])> {
    result.iter().filter(|(_, s)| !s.is_empty()).collect()
}

/// Render the suggestions panel.
#[must_use]
pub fn render_suggestions(result: &AnalysisResult, state: &DisplayState) -> String {
    if result.is_empty() {
        return ALL_CLEAR.to_string();
    }

    let mut out = String::from(r#"<div class="suggestions">"#);
    for (category, suggestions) in visible_categories(result) {
        let expanded = state.is_expanded(category);
        let _ = write!(
            out,
            r#"<section class="category category--{key}" data-category="{key}"><button type="button" class="category__toggle" data-toggle="{key}" aria-expanded="{expanded}"><span class="category__icon category__icon--{key}" aria-hidden="true"></span><h3>{label} ({count})</h3></button>"#,
            key = category.key(),
            label = escape_html(category.label()),
            count = suggestions.len(),
        );
        if expanded {
            out.push_str(r#"<div class="category__items">"#);
            for suggestion in suggestions {
                render_card(&mut out, suggestion);
            }
            out.push_str("</div>");
        }
        out.push_str("</section>");
    }
    out.push_str("</div>");
    out
}

fn render_card(out: &mut String, suggestion: &Suggestion) {
    let _ = write!(
        out,
        r#"<article class="suggestion"><h4>{}</h4><div class="suggestion__description">{}</div>"#,
        escape_html(&suggestion.title),
        render_markdown_html(&suggestion.description),
    );
    if let Some(snippet) = suggestion
        .code_snippet
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        out.push_str(&render_snippet(snippet));
    }
    out.push_str("</article>");
}

/// Fenced snippets render as markdown; bare code goes into an escaped block.
fn render_snippet(snippet: &str) -> String {
    let snippet = snippet.replace("\\`\\`\\`", "```");
    if snippet.contains("```") {
        format!(r#"<div class="suggestion__snippet">{}</div>"#, render_markdown_html(&snippet))
    } else {
        format!(r#"<pre class="suggestion__snippet"><code>{}</code></pre>"#, escape_html(&snippet))
    }
}

fn render_markdown_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    // Raw HTML from model output is shown as text, never interpreted.
    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

pub(crate) fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const ALL_CLEAR: &str = r#"<div class="suggestions suggestions--empty all-clear"><h3>Great Job!</h3><p>The AI didn't find any specific areas for improvement based on your goal. Your code looks solid!</p></div>"#;

#[cfg(test)]
#[path = "display_test.rs"]
mod tests;
