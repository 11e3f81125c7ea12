use std::collections::HashMap;

use crate::sequence::BasedSequence;

/// Destination registered by a link reference definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTarget {
    pub url: BasedSequence,
    pub title: Option<BasedSequence>,
}

/// Link reference definitions keyed by normalized label.
///
/// The first definition of a label wins; later duplicates are ignored.
#[derive(Debug, Clone, Default)]
pub struct ReferenceMap {
    entries: HashMap<String, ReferenceTarget>,
}

/// Normalizes a reference label for matching: trims, collapses internal
/// whitespace to one space and case-folds.
pub fn normalize_label(label: &str) -> String {
    let collapsed = label.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase().to_uppercase()
}

impl ReferenceMap {
    /// Registers a definition. Returns false when the label was already
    /// defined.
    pub fn insert(&mut self, label: &str, target: ReferenceTarget) -> bool {
        let key = normalize_label(label);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, target);
        true
    }

    pub fn get(&self, label: &str) -> Option<&ReferenceTarget> {
        self.entries.get(&normalize_label(label))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
