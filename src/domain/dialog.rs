//! Dialogs the front end can open, and the alerts the core raises.
//!
//! Each dialog variant carries only what its confirm action needs.

use serde::{Deserialize, Serialize};

use super::category::CategoryId;
use super::item::ItemId;

/// A user-facing message (title + body)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn no_category_selected() -> Self {
        Self::new("Notice", "Select a category first.")
    }

    pub fn empty_title() -> Self {
        Self::new("Notice", "Enter a title.")
    }

    pub fn storage_full() -> Self {
        Self::new(
            "Storage full",
            "Local storage is full. Use export to back up your library.",
        )
    }

    pub fn import_succeeded() -> Self {
        Self::new("Restore complete", "Your library was restored successfully.")
    }

    pub fn import_failed() -> Self {
        Self::new("Error", "This is not a valid library backup file.")
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// A modal dialog, keyed by kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Dialog {
    /// Ask for a name, then add a category under `parent_id`
    AddCategory { parent_id: Option<CategoryId> },

    /// Ask for a new name, prefilled with the current one
    EditCategory { id: CategoryId, current_name: String },

    /// Confirm a cascade delete
    DeleteCategory { id: CategoryId, name: String },

    /// Pick a target category for an item
    MoveItem { item_id: ItemId },

    /// Confirm deleting an item
    DeleteItem { item_id: ItemId },

    /// Informational message, closes on confirm
    Alert(Notice),
}

/// What the user answered when confirming a dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogAnswer {
    /// Free text (category names)
    Text(String),

    /// A category picked from a list
    Category(CategoryId),

    /// Plain confirmation
    Confirm,
}

impl Dialog {
    /// Dialog heading
    pub fn title(&self) -> String {
        match self {
            Dialog::AddCategory { parent_id: None } => "Add top-level category".to_string(),
            Dialog::AddCategory { parent_id: Some(_) } => "Add subcategory".to_string(),
            Dialog::EditCategory { .. } => "Rename category".to_string(),
            Dialog::DeleteCategory { .. } => "Delete category".to_string(),
            Dialog::MoveItem { .. } => "Move item".to_string(),
            Dialog::DeleteItem { .. } => "Delete item".to_string(),
            Dialog::Alert(notice) => notice.title.clone(),
        }
    }

    /// Body text shown above the inputs, if any
    pub fn message(&self) -> Option<String> {
        match self {
            Dialog::DeleteCategory { name, .. } => Some(format!(
                "'{}' and everything inside it will be deleted.",
                name
            )),
            Dialog::MoveItem { .. } => Some("Choose the destination category.".to_string()),
            Dialog::DeleteItem { .. } => Some("Permanently remove this item?".to_string()),
            Dialog::Alert(notice) => Some(notice.message.clone()),
            Dialog::AddCategory { .. } | Dialog::EditCategory { .. } => None,
        }
    }

    /// Text to prefill the name input with
    pub fn initial_text(&self) -> Option<&str> {
        match self {
            Dialog::EditCategory { current_name, .. } => Some(current_name),
            Dialog::AddCategory { .. } => Some(""),
            _ => None,
        }
    }

    /// Whether confirming requires a category choice
    pub fn needs_category_choice(&self) -> bool {
        matches!(self, Dialog::MoveItem { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialog_titles() {
        assert_eq!(
            Dialog::AddCategory { parent_id: None }.title(),
            "Add top-level category"
        );
        assert_eq!(
            Dialog::AddCategory {
                parent_id: Some(CategoryId::from("root-1"))
            }
            .title(),
            "Add subcategory"
        );
        assert_eq!(Dialog::Alert(Notice::storage_full()).title(), "Storage full");
    }

    #[test]
    fn test_delete_message_names_category() {
        let dialog = Dialog::DeleteCategory {
            id: CategoryId::from("c1"),
            name: "Drafts".to_string(),
        };
        assert!(dialog.message().unwrap().contains("'Drafts'"));
    }

    #[test]
    fn test_edit_dialog_prefills_name() {
        let dialog = Dialog::EditCategory {
            id: CategoryId::from("c1"),
            current_name: "Old".to_string(),
        };
        assert_eq!(dialog.initial_text(), Some("Old"));
        assert!(!dialog.needs_category_choice());
        assert!(Dialog::MoveItem {
            item_id: ItemId::from("i1")
        }
        .needs_category_choice());
    }

    #[test]
    fn test_dialog_serializes_tagged() {
        let json = serde_json::to_value(Dialog::DeleteItem {
            item_id: ItemId::from("i1"),
        })
        .unwrap();
        assert_eq!(json["type"], "delete_item");
        assert_eq!(json["item_id"], "i1");
    }
}
