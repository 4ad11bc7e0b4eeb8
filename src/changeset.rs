//! Dirty-attribute tracking for content models.

use std::collections::BTreeSet;

/// Names of the attributes assigned on a model since it was built or last saved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeChangeset {
    changes: BTreeSet<String>,
}

impl AttributeChangeset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `attr` as changed. Recording it again has no effect.
    pub fn will_change(&mut self, attr: &str) {
        if !self.changes.contains(attr) {
            self.changes.insert(attr.to_string());
        }
    }

    pub fn changes(&self) -> &BTreeSet<String> {
        &self.changes
    }

    pub fn contains(&self, attr: &str) -> bool {
        self.changes.contains(attr)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn clear(&mut self) {
        self.changes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        assert!(AttributeChangeset::new().is_empty());
    }

    #[test]
    fn records_distinct_names() {
        let mut changeset = AttributeChangeset::new();
        changeset.will_change("title");
        changeset.will_change("tags");
        changeset.will_change("title");
        let names: Vec<&str> = changeset.changes().iter().map(String::as_str).collect();
        assert_eq!(names, vec!["tags", "title"]);
    }

    #[test]
    fn clear_empties_for_later_observers() {
        let mut changeset = AttributeChangeset::new();
        changeset.will_change("title");
        assert!(changeset.contains("title"));
        changeset.clear();
        assert!(changeset.changes().is_empty());
        assert!(!changeset.contains("title"));
    }
}
