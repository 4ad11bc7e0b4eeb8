//! CLI output formatting for content models.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. The primary display
//! for every model is its title and positional index, with the id and source
//! path shown as indented context lines. The id is what `show`, `set`, and
//! `destroy` accept, so it is always printed when the model is persisted.
//!
//! # Output Format
//!
//! ## List
//!
//! ```text
//! Posts (2)
//! 001 Second Post
//!     Id: X3Bvc3RzLzIwMjAtMDItMDEtc2Vjb25kLXBvc3QubWQ
//!     Source: _posts/2020-02-01-second-post.md
//!     Date: 2020-02-01 00:00:00
//! 002 (_posts/2020-01-01-untitled.md)
//!     ...
//! ```
//!
//! ## Show
//!
//! ```text
//! post First Post
//!     Id: X3Bvc3RzLzIwMjAtMDEtMDEtZmlyc3QtcG9zdC5tZA
//!     Source: _posts/2020-01-01-first-post.md
//!     Date: 2020-01-01 00:00:00
//! Attributes
//!     title: First Post
//!     tags: ["intro"]
//! Content
//!     The first post.
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::model::ContentModel;
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_yaml::{Mapping, Value};

const CONTENT_PREVIEW_LINES: usize = 8;
const VALUE_WIDTH: usize = 72;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{head}...")
    }
}

/// One-line rendering of an attribute value.
///
/// Scalars print bare; lists and mappings print in JSON flow style, which is
/// also valid YAML.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "~".to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "<unprintable>".to_string()),
    }
}

/// Model title: `title`, then `name`, then the relative path in parens.
fn display_title(model: &ContentModel) -> String {
    ["title", "name"]
        .iter()
        .map(|key| model.fetch(key, Value::Null))
        .find(|value| !value.is_null())
        .map(|value| format_value(&value))
        .unwrap_or_else(|| format!("({})", model.relative_path().unwrap_or_default()))
}

/// Indented `Id:`, `Source:`, and `Date:` lines.
fn context_lines(model: &ContentModel, depth: usize) -> Vec<String> {
    let pad = indent(depth);
    let mut lines = Vec::new();
    if let Some(id) = model.id() {
        lines.push(format!("{pad}Id: {id}"));
    }
    match model.relative_path() {
        Some(path) if !path.is_empty() => lines.push(format!("{pad}Source: {path}")),
        _ => lines.push(format!("{pad}Source: (unsaved)")),
    }
    lines.push(format!(
        "{pad}Date: {}",
        model.posted_datetime().format("%Y-%m-%d %H:%M:%S")
    ));
    lines
}

fn heading(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// List
// ============================================================================

/// Format the models of one collection as an indexed inventory.
pub fn format_model_list(label: &str, models: &[ContentModel]) -> Vec<String> {
    let mut lines = vec![format!("{} ({})", heading(label), models.len())];
    for (i, model) in models.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), display_title(model)));
        lines.extend(context_lines(model, 1));
    }
    lines
}

pub fn print_model_list(label: &str, models: &[ContentModel]) {
    for line in format_model_list(label, models) {
        println!("{}", line);
    }
}

// ============================================================================
// Show
// ============================================================================

/// Format one model: header, context, attributes, and a content preview.
pub fn format_model(model: &ContentModel) -> Vec<String> {
    let mut lines = vec![format!("{} {}", model.kind(), display_title(model))];
    lines.extend(context_lines(model, 1));

    let attributes = model.attributes();
    if !attributes.is_empty() {
        lines.push("Attributes".to_string());
        for (key, value) in &attributes {
            lines.push(format!(
                "{}{}: {}",
                indent(1),
                format_value(key),
                truncate(&format_value(value), VALUE_WIDTH)
            ));
        }
    }

    let content = model.content().unwrap_or_default();
    let content = content.trim();
    if !content.is_empty() {
        lines.push("Content".to_string());
        let body: Vec<&str> = content.lines().collect();
        for line in body.iter().take(CONTENT_PREVIEW_LINES) {
            lines.push(format!("{}{}", indent(1), line));
        }
        if body.len() > CONTENT_PREVIEW_LINES {
            lines.push(format!(
                "{}... ({} more lines)",
                indent(1),
                body.len() - CONTENT_PREVIEW_LINES
            ));
        }
    }
    lines
}

pub fn print_model(model: &ContentModel) {
    for line in format_model(model) {
        println!("{}", line);
    }
}

/// Machine-readable view of a model, printed by `show --json`.
#[derive(Debug, Serialize)]
pub struct ModelView {
    pub id: Option<String>,
    pub kind: &'static str,
    pub relative_path: Option<String>,
    pub posted_datetime: NaiveDateTime,
    pub persisted: bool,
    pub attributes: Mapping,
    pub content: Option<String>,
}

impl ModelView {
    pub fn new(model: &ContentModel) -> Self {
        Self {
            id: model.id(),
            kind: model.kind().name(),
            relative_path: model.relative_path(),
            posted_datetime: model.posted_datetime(),
            persisted: model.persisted(),
            attributes: model.attributes(),
            content: model.content(),
        }
    }
}

pub fn model_json(model: &ContentModel) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ModelView::new(model))
}

// ============================================================================
// Mutations
// ============================================================================

/// Confirmation for `new` and `set`.
pub fn format_saved(model: &ContentModel, saved: bool) -> Vec<String> {
    if !saved {
        return vec![format!("Not saved: {}", display_title(model))];
    }
    let mut lines = vec![format!("Saved {} {}", model.kind(), display_title(model))];
    lines.extend(context_lines(model, 1));
    lines
}

/// Confirmation for `destroy`. `source` is the path the file had.
pub fn format_destroyed(source: &str, destroyed: bool) -> Vec<String> {
    if destroyed {
        vec![format!("Deleted {source}")]
    } else {
        vec![format!("Not deleted: {source}")]
    }
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrderDirection;
    use crate::test_helpers::*;

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("short", 40), "short");
        assert_eq!(truncate("ééééé", 3), "ééé...");
        assert_eq!(truncate("", 3), "");
    }

    #[test]
    fn format_value_scalars_and_collections() {
        assert_eq!(format_value(&Value::from("hi")), "hi");
        assert_eq!(format_value(&Value::from(3)), "3");
        assert_eq!(format_value(&Value::Null), "~");
        let tags: Value = serde_yaml::from_str("[a, b]").unwrap();
        assert_eq!(format_value(&tags), r#"["a","b"]"#);
    }

    #[test]
    fn heading_capitalizes() {
        assert_eq!(heading("posts"), "Posts");
        assert_eq!(heading(""), "");
    }

    #[test]
    fn list_shows_index_title_and_context() {
        let tmp = setup_fixtures();
        let site = fixture_site(&tmp);
        let models =
            ContentModel::find_all_ordered("posts", &site, "posted_datetime", OrderDirection::Asc)
                .unwrap();
        let lines = format_model_list("posts", &models);

        assert_eq!(lines[0], "Posts (3)");
        assert_eq!(lines[1], "001 First Post");
        assert!(lines[2].starts_with("    Id: "));
        assert_eq!(lines[3], "    Source: _posts/2020-01-01-first-post.md");
        assert_eq!(lines[4], "    Date: 2020-01-01 00:00:00");
        assert_eq!(lines[5], "002 Second Post");
    }

    #[test]
    fn untitled_models_show_their_path() {
        let tmp = setup_fixtures();
        let site = fixture_site(&tmp);
        let model = ContentModel::new_in_pages(&site);
        assert_eq!(display_title(&model), "()");

        let authors = site.collection("authors").unwrap();
        let jane = ContentModel::find_in_collection("_authors/jane.yml", authors).unwrap();
        assert_eq!(display_title(&jane), "Jane Doe");
    }

    #[test]
    fn show_lists_attributes_and_content() {
        let tmp = setup_fixtures();
        let site = fixture_site(&tmp);
        let model = ContentModel::find("_posts/2020-01-01-first-post.md", "posts", &site)
            .unwrap()
            .unwrap();
        let lines = format_model(&model);

        assert_eq!(lines[0], "post First Post");
        assert!(lines.contains(&"Attributes".to_string()));
        assert!(lines.contains(&"    tags: [\"intro\"]".to_string()));
        assert!(lines.contains(&"    weight: 30".to_string()));
        assert_eq!(lines.last().unwrap(), "    The first post.");
    }

    #[test]
    fn json_view_carries_identity_and_data() {
        let tmp = setup_fixtures();
        let site = fixture_site(&tmp);
        let model = ContentModel::find_in_pages("about.md", &site).unwrap();
        let json: serde_json::Value = serde_json::from_str(&model_json(&model).unwrap()).unwrap();

        assert_eq!(json["kind"], "page");
        assert_eq!(json["relative_path"], "about.md");
        assert_eq!(json["persisted"], true);
        assert_eq!(json["attributes"]["title"], "About");
        assert_eq!(json["id"], serde_json::Value::from(model.id().unwrap()));
        assert!(json["posted_datetime"].is_string());
    }

    #[test]
    fn unsaved_context_and_confirmations() {
        let tmp = setup_fixtures();
        let site = fixture_site(&tmp);
        let model = ContentModel::new_in_pages(&site);
        let lines = context_lines(&model, 1);
        assert_eq!(lines[0], "    Source: (unsaved)");

        assert_eq!(format_saved(&model, false), vec!["Not saved: ()"]);
        assert_eq!(
            format_destroyed("about.md", true),
            vec!["Deleted about.md"]
        );
        assert_eq!(
            format_destroyed("about.md", false),
            vec!["Not deleted: about.md"]
        );
    }
}
