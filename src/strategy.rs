//! Content strategy: which kind of model wraps a document.
//!
//! Every collection label maps to a [`ContentKind`]. The registry is shared by
//! the whole process. It is seeded on first use with the built-in kinds:
//!
//! | Label | Kind |
//! |-------|------|
//! | `pages` | [`ContentKind::Page`] |
//! | `posts` | [`ContentKind::Post`] |
//!
//! Anything else resolves to [`ContentKind::Model`] unless registered.
//! Documents without a collection are pages and resolve through the `pages`
//! label. Labels are compared literally (case-sensitive).

use crate::site::Document;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Label used for documents that belong to no collection.
pub const PAGES_LABEL: &str = "pages";

/// The variant of content model wrapping a document.
///
/// Variants carry no behavior of their own; they tag a model so callers can
/// pick presentation-specific defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentKind {
    /// Generic model, used when no variant is registered for a label.
    #[default]
    Model,
    Page,
    Post,
}

impl ContentKind {
    pub fn name(self) -> &'static str {
        match self {
            ContentKind::Model => "model",
            ContentKind::Page => "page",
            ContentKind::Post => "post",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static STRATEGIES: Lazy<RwLock<HashMap<String, ContentKind>>> = Lazy::new(|| {
    let mut strategies = HashMap::new();
    strategies.insert(PAGES_LABEL.to_string(), ContentKind::Page);
    strategies.insert("posts".to_string(), ContentKind::Post);
    RwLock::new(strategies)
});

/// Process-wide registry of label → [`ContentKind`].
pub struct ContentStrategy;

impl ContentStrategy {
    /// Wrap documents of the `label` collection in `kind` models.
    ///
    /// Registering a label again replaces the previous kind.
    pub fn register(kind: ContentKind, label: &str) {
        debug!(%kind, label, "registering content strategy");
        STRATEGIES.write().insert(label.to_string(), kind);
    }

    /// Kind for `label`, falling back to [`ContentKind::Model`].
    pub fn resolve_for_label(label: &str) -> ContentKind {
        STRATEGIES.read().get(label).copied().unwrap_or_default()
    }

    /// Kind for a document: its collection's label, or `pages` without one.
    pub fn resolve_for_document(document: &Document) -> ContentKind {
        let label = document
            .collection()
            .map(|c| c.label.as_str())
            .unwrap_or(PAGES_LABEL);
        Self::resolve_for_label(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::CollectionMeta;
    use chrono::Local;
    use std::path::PathBuf;

    fn document_in(label: Option<&str>) -> Document {
        let collection = label.map(|label| CollectionMeta {
            label: label.to_string(),
            directory: PathBuf::from("/site/src").join(format!("_{label}")),
        });
        Document::new_unsaved(PathBuf::from("/site/src"), collection, Local::now())
    }

    #[test]
    fn builtin_labels_resolve() {
        assert_eq!(ContentStrategy::resolve_for_label("pages"), ContentKind::Page);
        assert_eq!(ContentStrategy::resolve_for_label("posts"), ContentKind::Post);
    }

    #[test]
    fn unknown_label_falls_back_to_model() {
        assert_eq!(
            ContentStrategy::resolve_for_label("strategy-test-unknown"),
            ContentKind::Model
        );
    }

    #[test]
    fn labels_are_case_sensitive() {
        assert_eq!(ContentStrategy::resolve_for_label("Posts"), ContentKind::Model);
    }

    #[test]
    fn document_without_collection_resolves_as_page() {
        let document = document_in(None);
        assert_eq!(
            ContentStrategy::resolve_for_document(&document),
            ContentKind::Page
        );
    }

    #[test]
    fn document_uses_its_collection_label() {
        assert_eq!(
            ContentStrategy::resolve_for_document(&document_in(Some("posts"))),
            ContentKind::Post
        );
        assert_eq!(
            ContentStrategy::resolve_for_document(&document_in(Some("strategy-test-recipes"))),
            ContentKind::Model
        );
    }

    #[test]
    fn last_registration_wins() {
        ContentStrategy::register(ContentKind::Page, "strategy-test-notes");
        ContentStrategy::register(ContentKind::Post, "strategy-test-notes");
        assert_eq!(
            ContentStrategy::resolve_for_label("strategy-test-notes"),
            ContentKind::Post
        );
    }
}
