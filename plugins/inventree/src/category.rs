use std::collections::HashMap;

use crate::api::Category;

/// Category path (`Electronics/Resistors`) to category id.
///
/// Built once while the plugin is configured and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    by_path: HashMap<String, i64>,
}

impl CategoryIndex {
    pub fn new(categories: impl IntoIterator<Item = Category>) -> Self {
        Self {
            by_path: categories
                .into_iter()
                .map(|c| (c.pathstring, c.pk))
                .collect(),
        }
    }

    pub fn get(&self, path: &str) -> Option<i64> {
        self.by_path.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// Resolve a comma separated list of paths, in order.
    ///
    /// Unknown paths are skipped with a warning.
    pub fn resolve(&self, paths: &str) -> Vec<i64> {
        paths
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .filter_map(|path| {
                let id = self.get(path);
                if id.is_none() {
                    tracing::warn!(category = %path, "unknown category, skipping");
                }
                id
            })
            .collect()
    }
}
