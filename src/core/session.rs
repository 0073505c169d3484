//! The library session: one explicit store object for the front end.
//!
//! A `Session` owns the in-memory [`Library`] plus the state the core needs
//! to track between commands (selection, expanded categories, the new-item
//! draft, the edit buffer). Every command that mutates categories or items
//! writes both collections back to storage. Persistence is best-effort: a
//! failed write never rolls back the in-memory change.
//!
//! Front ends observe the session through [`Session::subscribe`] and read
//! state through [`Session::snapshot`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::storage::{StateStorage, StorageError, StorageKey};
use crate::config::DEFAULT_CATEGORY_NAME;
use crate::domain::{Category, CategoryId, Dialog, DialogAnswer, ItemId, LibraryItem, Notice};
use crate::library::{backup, Backup, Direction, ImportError, IngestedFile, Library, LibraryError, NewItem, Removal};

const EVENT_CAPACITY: usize = 64;

/// Emitted after commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Categories or items changed
    Changed,

    /// Something the user should be told about
    Alert(Notice),
}

/// Currently selected category and item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub category: Option<CategoryId>,
    pub item: Option<ItemId>,
}

/// Title/content being prepared for a new item
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub title: String,
    pub content: String,
    pub upload: Option<IngestedFile>,
}

/// Working copy of an item being edited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBuffer {
    pub item_id: ItemId,
    pub title: String,
    pub content: String,
}

/// Handle for one in-flight upload read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket(u64);

/// Settings applied when a session opens
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Name of the root category created for an empty store
    pub default_category_name: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            default_category_name: DEFAULT_CATEGORY_NAME.to_string(),
        }
    }
}

/// Read-only view handed to renderers
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub library: &'a Library,
    pub selection: &'a Selection,
    pub expanded: &'a HashSet<CategoryId>,
}

impl Snapshot<'_> {
    pub fn is_expanded(&self, id: &CategoryId) -> bool {
        self.expanded.contains(id)
    }

    pub fn selected_category(&self) -> Option<&Category> {
        self.selection
            .category
            .as_ref()
            .and_then(|id| self.library.category(id))
    }

    pub fn selected_item(&self) -> Option<&LibraryItem> {
        self.selection
            .item
            .as_ref()
            .and_then(|id| self.library.item(id))
    }
}

/// The library store with its persistence and UI-facing state
pub struct Session<S: StateStorage> {
    storage: S,
    library: Library,
    selection: Selection,
    expanded: HashSet<CategoryId>,
    draft: Draft,
    edit: Option<EditBuffer>,
    upload_generation: u64,
    events: broadcast::Sender<SessionEvent>,
}

impl<S: StateStorage> Session<S> {
    /// Load saved state, or seed a fresh library with one root category.
    ///
    /// Saved collections are taken as-is. A stored category list that is
    /// present but empty is respected and does not get a default root.
    pub async fn open(storage: S, options: SessionOptions) -> Result<Self, StorageError> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let saved_categories = storage.load(StorageKey::Categories).await?;
        let items: Vec<LibraryItem> = match storage.load(StorageKey::Items).await? {
            Some(text) => serde_json::from_str(&text)?,
            None => Vec::new(),
        };

        let mut session = Self {
            storage,
            library: Library::new(),
            selection: Selection::default(),
            expanded: HashSet::new(),
            draft: Draft::default(),
            edit: None,
            upload_generation: 0,
            events,
        };

        match saved_categories {
            Some(text) => {
                let categories: Vec<Category> = serde_json::from_str(&text)?;
                debug!(
                    categories = categories.len(),
                    items = items.len(),
                    "Loaded library"
                );
                session.library = Library::from_parts(categories, items);
            }
            None => {
                let root = Category::new(options.default_category_name, None, 0);
                info!(category = %root.id, "Creating default category");

                session.selection.category = Some(root.id.clone());
                session.expanded.insert(root.id.clone());
                session.library = Library::from_parts(vec![root], items);
                session.persist().await;
            }
        }

        Ok(session)
    }

    /// Receive change and alert events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            library: &self.library,
            selection: &self.selection,
            expanded: &self.expanded,
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn is_expanded(&self, id: &CategoryId) -> bool {
        self.expanded.contains(id)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn alert(&self, notice: Notice) {
        debug!(title = %notice.title, "Alert");
        self.emit(SessionEvent::Alert(notice));
    }

    /// Write both collections; a quota failure alerts the user, anything
    /// else is only logged.
    async fn persist(&mut self) {
        if let Err(e) = self.write_snapshot().await {
            if e.is_quota_exceeded() {
                warn!(error = %e, "Snapshot not saved");
                self.alert(Notice::storage_full());
            } else {
                warn!(error = %e, "Failed to save snapshot");
            }
        }
        self.emit(SessionEvent::Changed);
    }

    async fn write_snapshot(&self) -> Result<(), StorageError> {
        let categories = serde_json::to_string(&self.library.categories)?;
        let items = serde_json::to_string(&self.library.items)?;

        self.storage.save(StorageKey::Categories, &categories).await?;
        self.storage.save(StorageKey::Items, &items).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Selection & expansion
    // ------------------------------------------------------------------

    /// Select a category (or clear with `None`)
    pub fn select_category(&mut self, id: Option<CategoryId>) {
        self.selection.category = id.filter(|id| self.library.category(id).is_some());
    }

    /// Select an item; its category becomes the selected category too
    pub fn select_item(&mut self, id: &ItemId) -> bool {
        let Some(item) = self.library.item(id) else {
            return false;
        };
        self.selection.category = Some(item.category_id.clone());
        self.selection.item = Some(id.clone());
        self.edit = None;
        true
    }

    pub fn clear_item_selection(&mut self) {
        self.selection.item = None;
    }

    pub fn toggle_expanded(&mut self, id: &CategoryId) {
        if !self.expanded.remove(id) {
            self.expanded.insert(id.clone());
        }
    }

    pub fn set_expanded(&mut self, id: &CategoryId, expanded: bool) {
        if expanded {
            self.expanded.insert(id.clone());
        } else {
            self.expanded.remove(id);
        }
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    /// Add a category; blank names are ignored
    pub async fn add_category(&mut self, parent_id: Option<&CategoryId>, name: &str) -> Option<CategoryId> {
        match self.library.add_category(parent_id, name) {
            Ok(id) => {
                if let Some(parent) = parent_id {
                    self.expanded.insert(parent.clone());
                }
                self.persist().await;
                Some(id)
            }
            Err(e) => {
                debug!(error = %e, "Category not added");
                None
            }
        }
    }

    /// Rename a category; blank names are ignored
    pub async fn rename_category(&mut self, id: &CategoryId, new_name: &str) -> bool {
        match self.library.rename_category(id, new_name) {
            Ok(()) => {
                self.persist().await;
                true
            }
            Err(e) => {
                debug!(error = %e, "Category not renamed");
                false
            }
        }
    }

    /// Cascade delete, clearing any selection that pointed into the subtree
    pub async fn delete_category(&mut self, id: &CategoryId) -> Removal {
        let removal = self.library.delete_category(id);
        if removal.is_empty() {
            return removal;
        }

        let category_gone = self
            .selection
            .category
            .as_ref()
            .is_some_and(|c| removal.contains_category(c));
        let item_gone = self
            .selection
            .item
            .as_ref()
            .is_some_and(|i| removal.contains_item(i));

        if category_gone {
            self.selection = Selection::default();
        } else if item_gone {
            self.selection.item = None;
        }

        if let Some(edit) = &self.edit {
            if removal.contains_item(&edit.item_id) {
                self.edit = None;
            }
        }

        self.expanded.retain(|c| !removal.contains_category(c));
        self.persist().await;
        removal
    }

    pub async fn reorder_category(&mut self, id: &CategoryId, direction: Direction) -> bool {
        let moved = self.library.reorder_category(id, direction);
        if moved {
            self.persist().await;
        }
        moved
    }

    pub fn item_count(&self, id: &CategoryId) -> usize {
        self.library.item_count(id)
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    /// Create an item.
    ///
    /// Validation failures (no category, blank title) are reported as an
    /// alert and leave the library untouched.
    pub async fn create_item(&mut self, category_id: Option<&CategoryId>, new_item: NewItem) -> Option<ItemId> {
        match self.library.create_item(category_id, new_item) {
            Ok(id) => {
                if let Some(category) = category_id {
                    self.expanded.insert(category.clone());
                    self.selection.category = Some(category.clone());
                }
                self.selection.item = Some(id.clone());
                self.persist().await;
                Some(id)
            }
            Err(e) => {
                let notice = match e {
                    LibraryError::NoCategorySelected | LibraryError::UnknownCategory(_) => {
                        Notice::no_category_selected()
                    }
                    LibraryError::EmptyTitle => Notice::empty_title(),
                    other => Notice::new("Notice", other.to_string()),
                };
                self.alert(notice);
                None
            }
        }
    }

    /// Save the draft into the selected category, then reset the draft
    pub async fn save_draft(&mut self) -> Option<ItemId> {
        let category = self.selection.category.clone();

        let mut new_item = NewItem::new(self.draft.title.clone(), self.draft.content.clone());
        if let Some(upload) = &self.draft.upload {
            new_item = new_item.with_attachment(upload.attachment.clone());
        }

        let id = self.create_item(category.as_ref(), new_item).await?;
        self.draft = Draft::default();
        Some(id)
    }

    pub async fn edit_item(&mut self, id: &ItemId, new_title: &str, new_content: &str) -> bool {
        match self.library.edit_item(id, new_title, new_content) {
            Ok(()) => {
                self.persist().await;
                true
            }
            Err(e) => {
                debug!(error = %e, "Item not edited");
                false
            }
        }
    }

    pub async fn move_item(&mut self, id: &ItemId, target: &CategoryId) -> bool {
        match self.library.move_item(id, target) {
            Ok(()) => {
                if self.selection.item.as_ref() == Some(id) {
                    self.selection.category = Some(target.clone());
                }
                self.persist().await;
                true
            }
            Err(e) => {
                debug!(error = %e, "Item not moved");
                false
            }
        }
    }

    pub async fn delete_item(&mut self, id: &ItemId) -> bool {
        if self.library.delete_item(id).is_none() {
            return false;
        }
        if self.selection.item.as_ref() == Some(id) {
            self.selection.item = None;
        }
        if self.edit.as_ref().is_some_and(|e| &e.item_id == id) {
            self.edit = None;
        }
        self.persist().await;
        true
    }

    // ------------------------------------------------------------------
    // Draft & uploads
    // ------------------------------------------------------------------

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn set_draft_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_draft_content(&mut self, content: impl Into<String>) {
        self.draft.content = content.into();
    }

    /// Start an upload read; only the latest ticket's result is kept
    pub fn begin_upload(&mut self) -> UploadTicket {
        self.upload_generation += 1;
        UploadTicket(self.upload_generation)
    }

    /// Apply a finished upload read to the draft.
    ///
    /// Returns `false` and discards the file when a newer upload started
    /// after this ticket was issued.
    pub fn finish_upload(&mut self, ticket: UploadTicket, file: IngestedFile) -> bool {
        if ticket.0 != self.upload_generation {
            debug!(ticket = ticket.0, latest = self.upload_generation, "Dropping stale upload");
            return false;
        }

        self.draft.title = file.title.clone();
        self.draft.content = file.content.clone();
        self.draft.upload = Some(file);
        true
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// Load an item's current values into the edit buffer
    pub fn begin_edit(&mut self, id: &ItemId) -> bool {
        let Some(item) = self.library.item(id) else {
            return false;
        };
        self.edit = Some(EditBuffer {
            item_id: id.clone(),
            title: item.title.clone(),
            content: item.content.clone(),
        });
        true
    }

    pub fn edit_buffer(&self) -> Option<&EditBuffer> {
        self.edit.as_ref()
    }

    pub fn edit_buffer_mut(&mut self) -> Option<&mut EditBuffer> {
        self.edit.as_mut()
    }

    /// Write the edit buffer back to its item
    pub async fn commit_edit(&mut self) -> bool {
        let Some(edit) = self.edit.take() else {
            return false;
        };
        self.edit_item(&edit.item_id, &edit.title, &edit.content).await
    }

    pub fn cancel_edit(&mut self) {
        self.edit = None;
    }

    // ------------------------------------------------------------------
    // Backup
    // ------------------------------------------------------------------

    /// Write the current state to a dated backup file in `dir`
    pub async fn export_backup(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        backup::export_to_dir(&self.library, dir).await
    }

    /// Replace everything with the contents of a backup file.
    ///
    /// On failure nothing changes. Either way the user gets an alert.
    pub async fn import_backup(&mut self, text: &str) -> Result<(), ImportError> {
        let backup = match Backup::parse(text) {
            Ok(backup) => backup,
            Err(e) => {
                warn!(error = %e, "Rejected backup");
                self.alert(Notice::import_failed());
                return Err(e);
            }
        };

        info!(
            categories = backup.categories.len(),
            items = backup.items.len(),
            "Restoring backup"
        );
        self.library = backup.into_library();
        self.prune_dangling_state();
        self.persist().await;
        self.alert(Notice::import_succeeded());
        Ok(())
    }

    fn prune_dangling_state(&mut self) {
        let library = &self.library;

        if let Some(id) = &self.selection.category {
            if library.category(id).is_none() {
                self.selection.category = None;
            }
        }
        if let Some(id) = &self.selection.item {
            if library.item(id).is_none() {
                self.selection.item = None;
            }
        }
        self.expanded.retain(|id| library.category(id).is_some());
        if let Some(edit) = &self.edit {
            if library.item(&edit.item_id).is_none() {
                self.edit = None;
            }
        }
    }

    // ------------------------------------------------------------------
    // Dialogs
    // ------------------------------------------------------------------

    /// Run the command behind a confirmed dialog.
    ///
    /// Returns whether anything changed. An answer of the wrong shape for
    /// the dialog is ignored.
    pub async fn resolve_dialog(&mut self, dialog: Dialog, answer: DialogAnswer) -> bool {
        match (dialog, answer) {
            (Dialog::AddCategory { parent_id }, DialogAnswer::Text(name)) => {
                self.add_category(parent_id.as_ref(), &name).await.is_some()
            }
            (Dialog::EditCategory { id, .. }, DialogAnswer::Text(name)) => {
                self.rename_category(&id, &name).await
            }
            (Dialog::DeleteCategory { id, .. }, DialogAnswer::Confirm) => {
                !self.delete_category(&id).await.is_empty()
            }
            (Dialog::MoveItem { item_id }, DialogAnswer::Category(target)) => {
                self.move_item(&item_id, &target).await
            }
            (Dialog::DeleteItem { item_id }, DialogAnswer::Confirm) => self.delete_item(&item_id).await,
            (Dialog::Alert(_), _) => false,
            (dialog, answer) => {
                debug!(?dialog, ?answer, "Answer does not fit dialog");
                false
            }
        }
    }
}
