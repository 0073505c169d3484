//! Backup files: export and import of the whole library.
//!
//! Format (JSON):
//!
//! ```text
//! {
//!   "categories": [...],
//!   "items": [...],
//!   "exportDate": "2024-05-01T09:30:00.000Z",
//!   "version": "1.2"
//! }
//! ```
//!
//! Only `categories` and `items` are required on import. Everything else is
//! informational.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::domain::{Category, CategoryId, ItemId, LibraryItem};
use crate::library::tree::Library;

/// Backup format version written on export
pub const BACKUP_VERSION: &str = "1.2";

/// Why an import was rejected
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not a library backup: missing '{0}'")]
    MissingKey(&'static str),

    #[error("Duplicate category id: {0}")]
    DuplicateCategory(CategoryId),

    #[error("Duplicate item id: {0}")]
    DuplicateItem(ItemId),

    #[error("Category {category} points to missing parent {parent}")]
    DanglingParent {
        category: CategoryId,
        parent: CategoryId,
    },

    #[error("Item {item} points to missing category {category}")]
    DanglingCategory { item: ItemId, category: CategoryId },

    #[error("Category {0} is its own ancestor")]
    Cycle(CategoryId),

    #[error("Blank category name: {0}")]
    BlankName(CategoryId),
}

/// On-disk backup envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub categories: Vec<Category>,

    pub items: Vec<LibraryItem>,

    #[serde(
        default,
        deserialize_with = "informational",
        skip_serializing_if = "Option::is_none"
    )]
    pub export_date: Option<String>,

    #[serde(
        default,
        deserialize_with = "informational",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,
}

/// Keep a string field, ignore any other JSON type
fn informational<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        _ => Ok(None),
    }
}

impl Backup {
    /// Snapshot a library for export
    pub fn from_library(library: &Library, now: DateTime<Utc>) -> Self {
        Self {
            categories: library.categories.clone(),
            items: library.items.clone(),
            export_date: Some(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            version: Some(BACKUP_VERSION.to_string()),
        }
    }

    /// Pretty-printed JSON for the backup file
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a backup file.
    ///
    /// Both `categories` and `items` must be present; the result is then
    /// checked for tree integrity before it is accepted.
    pub fn parse(text: &str) -> Result<Self, ImportError> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        for key in ["categories", "items"] {
            if value.get(key).map_or(true, serde_json::Value::is_null) {
                return Err(ImportError::MissingKey(key));
            }
        }

        let backup: Backup = serde_json::from_value(value)?;
        backup.validate()?;
        Ok(backup)
    }

    /// Check ids are unique, references resolve, and parents form a forest
    pub fn validate(&self) -> Result<(), ImportError> {
        let mut parents: HashMap<&CategoryId, Option<&CategoryId>> = HashMap::new();
        for category in &self.categories {
            if category.name.trim().is_empty() {
                return Err(ImportError::BlankName(category.id.clone()));
            }
            if parents
                .insert(&category.id, category.parent_id.as_ref())
                .is_some()
            {
                return Err(ImportError::DuplicateCategory(category.id.clone()));
            }
        }

        for category in &self.categories {
            if let Some(parent) = &category.parent_id {
                if !parents.contains_key(parent) {
                    return Err(ImportError::DanglingParent {
                        category: category.id.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        // Walk up from every category; revisiting a node means a cycle
        let mut acyclic: HashSet<&CategoryId> = HashSet::new();
        for category in &self.categories {
            let mut chain: HashSet<&CategoryId> = HashSet::new();
            let mut current = Some(&category.id);

            while let Some(id) = current {
                if acyclic.contains(id) {
                    break;
                }
                if !chain.insert(id) {
                    return Err(ImportError::Cycle(id.clone()));
                }
                current = parents.get(id).copied().flatten();
            }

            acyclic.extend(chain);
        }

        let mut item_ids: HashSet<&ItemId> = HashSet::new();
        for item in &self.items {
            if !item_ids.insert(&item.id) {
                return Err(ImportError::DuplicateItem(item.id.clone()));
            }
            if !parents.contains_key(&item.category_id) {
                return Err(ImportError::DanglingCategory {
                    item: item.id.clone(),
                    category: item.category_id.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn into_library(self) -> Library {
        Library::from_parts(self.categories, self.items)
    }
}

/// `library_backup_YYYY-MM-DD.json`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("library_backup_{}.json", date.format("%Y-%m-%d"))
}

/// Write a backup of `library` into `dir`, returning the file path
pub async fn export_to_dir(library: &Library, dir: &Path) -> anyhow::Result<PathBuf> {
    use anyhow::Context;

    let now = Utc::now();
    let path = dir.join(export_file_name(now.date_naive()));
    let json = Backup::from_library(library, now).to_json()?;

    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create backup directory: {}", dir.display()))?;
    fs::write(&path, json)
        .await
        .with_context(|| format!("Failed to write backup: {}", path.display()))?;

    info!(
        path = %path.display(),
        categories = library.categories.len(),
        items = library.items.len(),
        "Exported backup"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::tree::NewItem;

    fn sample_library() -> Library {
        let mut library = Library::new();
        let root = library.add_category(None, "Root").unwrap();
        let child = library.add_category(Some(&root), "Child").unwrap();
        library
            .create_item(Some(&child), NewItem::new("Doc", "body"))
            .unwrap();
        library
    }

    #[test]
    fn test_export_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(export_file_name(date), "library_backup_2024-03-09.json");
    }

    #[test]
    fn test_envelope_fields() {
        let backup = Backup::from_library(&sample_library(), Utc::now());
        let json: serde_json::Value = serde_json::from_str(&backup.to_json().unwrap()).unwrap();

        assert_eq!(json["version"], BACKUP_VERSION);
        assert!(json["exportDate"].as_str().unwrap().ends_with('Z'));
        assert_eq!(json["categories"].as_array().unwrap().len(), 2);
        assert_eq!(json["items"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_export_then_parse_preserves_data() {
        let library = sample_library();
        let text = Backup::from_library(&library, Utc::now()).to_json().unwrap();

        let restored = Backup::parse(&text).unwrap().into_library();
        assert_eq!(restored, library);
    }

    #[test]
    fn test_empty_collections_are_valid() {
        let backup = Backup::parse(r#"{"categories": [], "items": []}"#).unwrap();
        assert!(backup.into_library().is_empty());
    }

    #[test]
    fn test_missing_keys_rejected() {
        assert!(matches!(
            Backup::parse(r#"{"foo": 1}"#),
            Err(ImportError::MissingKey("categories"))
        ));
        assert!(matches!(
            Backup::parse(r#"{"categories": []}"#),
            Err(ImportError::MissingKey("items"))
        ));
        assert!(matches!(Backup::parse("not json"), Err(ImportError::Json(_))));
    }

    #[test]
    fn test_non_string_metadata_is_ignored() {
        let backup =
            Backup::parse(r#"{"categories": [], "items": [], "version": 2, "exportDate": 1700000000000}"#)
                .unwrap();
        assert!(backup.version.is_none());
        assert!(backup.export_date.is_none());
    }

    #[test]
    fn test_dangling_references_rejected() {
        let orphan = r#"{"categories": [{"id": "a", "name": "A", "parentId": "ghost", "order": 0}], "items": []}"#;
        assert!(matches!(
            Backup::parse(orphan),
            Err(ImportError::DanglingParent { .. })
        ));

        let stray_item = r#"{
            "categories": [{"id": "a", "name": "A", "parentId": null, "order": 0}],
            "items": [{"id": "i", "categoryId": "b", "title": "t", "content": "", "createdAt": 0}]
        }"#;
        assert!(matches!(
            Backup::parse(stray_item),
            Err(ImportError::DanglingCategory { .. })
        ));
    }

    #[test]
    fn test_cycle_rejected() {
        let cyclic = r#"{"categories": [
            {"id": "a", "name": "A", "parentId": "b", "order": 0},
            {"id": "b", "name": "B", "parentId": "a", "order": 0}
        ], "items": []}"#;
        assert!(matches!(Backup::parse(cyclic), Err(ImportError::Cycle(_))));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let dupes = r#"{"categories": [
            {"id": "a", "name": "A", "parentId": null, "order": 0},
            {"id": "a", "name": "A again", "parentId": null, "order": 1}
        ], "items": []}"#;
        assert!(matches!(
            Backup::parse(dupes),
            Err(ImportError::DuplicateCategory(_))
        ));
    }
}
