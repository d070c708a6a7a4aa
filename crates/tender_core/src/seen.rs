use std::collections::HashSet;

use crate::normalize_url_for_dedupe;

/// Normalised urls already emitted during this run.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    keys: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `url`; returns false if an equivalent url was seen before.
    pub fn insert_url(&mut self, url: &str) -> bool {
        self.keys.insert(normalize_url_for_dedupe(url))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
