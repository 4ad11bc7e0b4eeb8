//! Front matter detection and YAML mapping helpers.
//!
//! A body-bearing document opens with a delimited block of YAML, then the
//! free-form body:
//!
//! ```text
//! ---
//! title: Hello World
//! tags: [intro]
//! ---
//!
//! The body starts here.
//! ```
//!
//! Pure-data documents (`.yml`, `.yaml`) have no delimiters and no
//! body: the whole file is the mapping.
//!
//! Attribute names are always strings. YAML allows any scalar as a key, so
//! [`stringify_keys`] normalizes parsed data before it is compared against the
//! live attributes of a model.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// The opening block: a `---` line, the YAML, and a closing `---` or `...` line.
static FRONT_MATTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?ms)\A(---\s*\n.*?\n?)^((---|\.\.\.)\s*$\n?)")
        .expect("front matter pattern must compile")
});

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("expected a mapping of attributes, found {0}")]
    NotAMapping(&'static str),
}

/// Split a document into its front matter block and its body.
///
/// Returns `None` when the text does not start with a delimited block.
/// The returned block still carries its leading `---` line, which YAML
/// treats as a document start marker.
pub fn split(text: &str) -> Option<(&str, &str)> {
    let captures = FRONT_MATTER_RE.captures(text)?;
    let block = captures.get(1)?.as_str();
    let body = &text[captures.get(0)?.end()..];
    Some((block, body))
}

/// Whether `text` opens with a front matter block.
pub fn has_front_matter(text: &str) -> bool {
    FRONT_MATTER_RE.is_match(text)
}

/// Parse YAML into an attribute mapping with string keys.
///
/// An empty document parses to an empty mapping. Any other non-mapping
/// document (a bare scalar or a list) is rejected.
pub fn parse_mapping(yaml: &str) -> Result<Mapping, FrontMatterError> {
    let value: Value = serde_yaml::from_str(yaml)?;
    match stringify_keys(value) {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        other => Err(FrontMatterError::NotAMapping(kind_name(&other))),
    }
}

/// Serialize a mapping as the `---`-prefixed YAML document written to disk.
pub fn to_yaml(mapping: &Mapping) -> Result<String, FrontMatterError> {
    let body = serde_yaml::to_string(mapping)?;
    Ok(format!("---\n{body}"))
}

/// Render a body-bearing document: front matter, closing delimiter, blank line, body.
pub fn render_document(mapping: &Mapping, body: &str) -> Result<String, FrontMatterError> {
    Ok(format!("{}---\n\n{}", to_yaml(mapping)?, body))
}

/// Recursively convert every mapping key to a string.
pub fn stringify_keys(value: Value) -> Value {
    match value {
        Value::Mapping(mapping) => Value::Mapping(stringify_mapping(mapping)),
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(stringify_keys).collect()),
        Value::Tagged(tagged) => {
            let tagged = *tagged;
            Value::Tagged(Box::new(serde_yaml::value::TaggedValue {
                tag: tagged.tag,
                value: stringify_keys(tagged.value),
            }))
        }
        other => other,
    }
}

/// [`stringify_keys`] for a mapping already unwrapped from its [`Value`].
pub fn stringify_mapping(mapping: Mapping) -> Mapping {
    mapping
        .into_iter()
        .map(|(key, value)| (Value::String(key_to_string(&key)), stringify_keys(value)))
        .collect()
}

/// The string form of a mapping key.
pub fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Human-readable name of a value's YAML type, for messages.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_separates_block_and_body() {
        let text = "---\ntitle: Hello\n---\n\nBody text\n";
        let (block, body) = split(text).unwrap();
        assert_eq!(block, "---\ntitle: Hello\n");
        // the blank separator line belongs to the delimiter
        assert_eq!(body, "Body text\n");
    }

    #[test]
    fn split_accepts_dot_terminator() {
        let text = "---\ntitle: Hello\n...\nBody";
        let (block, body) = split(text).unwrap();
        assert_eq!(block, "---\ntitle: Hello\n");
        assert_eq!(body, "Body");
    }

    #[test]
    fn split_accepts_empty_block() {
        let (block, body) = split("---\n---\nBody").unwrap();
        assert_eq!(parse_mapping(block).unwrap(), Mapping::new());
        assert_eq!(body, "Body");
    }

    #[test]
    fn split_requires_leading_delimiter() {
        assert!(split("title: Hello\n---\nBody").is_none());
        assert!(split("Just a body").is_none());
        assert!(!has_front_matter("\n---\ntitle: x\n---\n"));
    }

    #[test]
    fn parse_mapping_reads_block_with_marker() {
        let mapping = parse_mapping("---\ntitle: Hello\ncount: 3\n").unwrap();
        assert_eq!(mapping.get("title"), Some(&Value::String("Hello".into())));
        assert_eq!(mapping.get("count"), Some(&Value::Number(3.into())));
    }

    #[test]
    fn parse_mapping_rejects_scalar_document() {
        let err = parse_mapping("just a string").unwrap_err();
        assert!(matches!(err, FrontMatterError::NotAMapping("string")));
    }

    #[test]
    fn parse_mapping_stringifies_keys() {
        let mapping = parse_mapping("1: one\ntrue: yes\nnested:\n  2: two\n").unwrap();
        assert!(mapping.contains_key("1"));
        assert!(mapping.contains_key("true"));
        let nested = mapping.get("nested").unwrap().as_mapping().unwrap();
        assert!(nested.contains_key("2"));
    }

    #[test]
    fn folded_scalars_collapse_newlines() {
        let yaml = "folded: >\n  This string of text\n  will ignore newlines.\nclean: >-\n  No trailing\n  newline\n";
        let mapping = parse_mapping(yaml).unwrap();
        assert_eq!(
            mapping.get("folded").unwrap().as_str(),
            Some("This string of text will ignore newlines.\n")
        );
        assert_eq!(
            mapping.get("clean").unwrap().as_str(),
            Some("No trailing newline")
        );
    }

    #[test]
    fn literal_scalars_keep_newlines() {
        let mapping = parse_mapping("poem: |\n  line one\n  line two\n").unwrap();
        assert_eq!(
            mapping.get("poem").unwrap().as_str(),
            Some("line one\nline two\n")
        );
    }

    #[test]
    fn render_document_layout() {
        let mut mapping = Mapping::new();
        mapping.insert("title".into(), "Hello".into());
        let rendered = render_document(&mapping, "Body\n").unwrap();
        assert_eq!(rendered, "---\ntitle: Hello\n---\n\nBody\n");
    }

    #[test]
    fn rendered_document_splits_back() {
        let mut mapping = Mapping::new();
        mapping.insert("title".into(), "Hello".into());
        mapping.insert("draft".into(), true.into());
        let rendered = render_document(&mapping, "Body").unwrap();
        let (block, body) = split(&rendered).unwrap();
        assert_eq!(parse_mapping(block).unwrap(), mapping);
        assert_eq!(body, "Body");
    }

    #[test]
    fn key_to_string_for_scalars() {
        assert_eq!(key_to_string(&Value::String("a".into())), "a");
        assert_eq!(key_to_string(&Value::Number(42.into())), "42");
        assert_eq!(key_to_string(&Value::Bool(false)), "false");
        assert_eq!(key_to_string(&Value::Null), "");
    }
}
