//! Persisted tool-resource shape.
//!
//! This is the externally persisted contract other subsystems (prompt
//! storage) read and write: a mapping from category name to an ordered list
//! of authoritative file identifiers. Categories with no identifiers are
//! omitted entirely.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::attachment::FileId;
use super::category::ResourceCategory;

/// File identifiers persisted under one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResourceEntry {
    pub file_ids: Vec<FileId>,
}

/// Mapping from category to persisted file identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolResourceMap(BTreeMap<ResourceCategory, ToolResourceEntry>);

impl ToolResourceMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an identifier under a category, ignoring duplicates within
    /// that category.
    pub fn insert(&mut self, category: ResourceCategory, file_id: FileId) {
        let entry = self.0.entry(category).or_default();
        if !entry.file_ids.contains(&file_id) {
            entry.file_ids.push(file_id);
        }
    }

    /// Identifiers persisted under a category, if any.
    #[must_use]
    pub fn get(&self, category: ResourceCategory) -> Option<&ToolResourceEntry> {
        self.0.get(&category)
    }

    /// Whether any category holds at least one identifier.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|entry| entry.file_ids.is_empty())
    }

    /// Total number of persisted identifiers across categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.values().map(|entry| entry.file_ids.len()).sum()
    }

    /// Iterate categories and their entries in stable order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceCategory, &ToolResourceEntry)> {
        self.0.iter().map(|(category, entry)| (*category, entry))
    }
}

impl FromIterator<(ResourceCategory, Vec<FileId>)> for ToolResourceMap {
    fn from_iter<T: IntoIterator<Item = (ResourceCategory, Vec<FileId>)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (category, file_ids) in iter {
            for file_id in file_ids {
                map.insert(category, file_id);
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_deduplicates_within_category() {
        let mut map = ToolResourceMap::new();
        map.insert(ResourceCategory::Search, FileId::from("abc"));
        map.insert(ResourceCategory::Search, FileId::from("abc"));
        map.insert(ResourceCategory::ImageEdit, FileId::from("abc"));

        assert_eq!(map.get(ResourceCategory::Search).unwrap().file_ids.len(), 1);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn empty_categories_are_omitted_from_json() {
        let mut map = ToolResourceMap::new();
        map.insert(ResourceCategory::Search, FileId::from("abc"));

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "search": { "file_ids": ["abc"] } })
        );
    }

    #[test]
    fn deserializes_persisted_shape() {
        let map: ToolResourceMap = serde_json::from_value(serde_json::json!({
            "search": { "file_ids": ["abc", "def"] },
            "image_edit": { "file_ids": ["img-1"] },
        }))
        .unwrap();

        assert_eq!(map.len(), 3);
        assert_eq!(
            map.get(ResourceCategory::Search).unwrap().file_ids,
            vec![FileId::from("abc"), FileId::from("def")]
        );
    }
}
