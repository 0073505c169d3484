//! The category tree and the items attached to it.
//!
//! Both collections are flat vectors. Child lists are derived on demand by
//! indexing categories on `parent_id`, so rename/reorder never rebuild
//! nested structures. Traversals carry a visited set and terminate even on
//! malformed (cyclic) data.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::{Category, CategoryId, FileAttachment, ItemId, LibraryItem};

/// Errors returned by library mutations. None of them leave a partial change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryError {
    #[error("Name must not be empty")]
    EmptyName,

    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("No category selected")]
    NoCategorySelected,

    #[error("Category not found: {0}")]
    UnknownCategory(CategoryId),

    #[error("Item not found: {0}")]
    UnknownItem(ItemId),

    #[error("Sibling order is already at its maximum")]
    OrderOverflow,
}

/// Direction for sibling reordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// What a cascade delete removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Removal {
    /// The deleted category and all of its descendants
    pub categories: Vec<CategoryId>,

    /// Items owned by any deleted category
    pub items: Vec<ItemId>,
}

impl Removal {
    pub fn contains_category(&self, id: &CategoryId) -> bool {
        self.categories.contains(id)
    }

    pub fn contains_item(&self, id: &ItemId) -> bool {
        self.items.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.items.is_empty()
    }
}

/// Input for a new item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewItem {
    pub title: String,
    pub content: String,
    pub attachment: Option<FileAttachment>,
}

impl NewItem {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: FileAttachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// One line of the rendered tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow<'a> {
    pub category: &'a Category,

    /// 0 for roots
    pub depth: usize,

    /// Items in this category and all of its descendants
    pub item_count: usize,

    pub has_children: bool,

    pub expanded: bool,
}

/// In-memory library: categories forming a forest, items attached to them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    /// All categories, in insertion order
    pub categories: Vec<Category>,

    /// All items, most recent first
    pub items: Vec<LibraryItem>,
}

impl Library {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing collections without validation
    pub fn from_parts(categories: Vec<Category>, items: Vec<LibraryItem>) -> Self {
        Self { categories, items }
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    /// Get a category by ID
    pub fn category(&self, id: &CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| &c.id == id)
    }

    /// Add a category as the last child of `parent_id` (or as the last root).
    pub fn add_category(
        &mut self,
        parent_id: Option<&CategoryId>,
        name: &str,
    ) -> Result<CategoryId, LibraryError> {
        if name.trim().is_empty() {
            return Err(LibraryError::EmptyName);
        }
        if let Some(parent) = parent_id {
            if self.category(parent).is_none() {
                return Err(LibraryError::UnknownCategory(parent.clone()));
            }
        }

        let order = self
            .categories
            .iter()
            .filter(|c| c.parent_id.as_ref() == parent_id)
            .map(|c| c.order)
            .max()
            .map_or(Some(0), |max| max.checked_add(1))
            .ok_or(LibraryError::OrderOverflow)?;

        let category = Category::new(name, parent_id.cloned(), order);
        let id = category.id.clone();
        debug!(category = %id, order, "Adding category");
        self.categories.push(category);

        Ok(id)
    }

    /// Rename a category in place
    pub fn rename_category(&mut self, id: &CategoryId, new_name: &str) -> Result<(), LibraryError> {
        if new_name.trim().is_empty() {
            return Err(LibraryError::EmptyName);
        }

        let category = self
            .categories
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| LibraryError::UnknownCategory(id.clone()))?;
        category.name = new_name.to_string();

        Ok(())
    }

    /// Delete a category, its whole subtree, and every item inside it.
    ///
    /// Deleting an unknown id removes nothing.
    pub fn delete_category(&mut self, id: &CategoryId) -> Removal {
        if self.category(id).is_none() {
            return Removal::default();
        }

        let mut doomed: HashSet<CategoryId> = self.descendants(id).into_iter().collect();
        doomed.insert(id.clone());

        let mut removal = Removal::default();

        self.categories.retain(|c| {
            let keep = !doomed.contains(&c.id);
            if !keep {
                removal.categories.push(c.id.clone());
            }
            keep
        });

        self.items.retain(|i| {
            let keep = !doomed.contains(&i.category_id);
            if !keep {
                removal.items.push(i.id.clone());
            }
            keep
        });

        debug!(
            category = %id,
            categories = removal.categories.len(),
            items = removal.items.len(),
            "Cascade delete"
        );

        removal
    }

    /// Swap `order` with the adjacent sibling in `direction`.
    ///
    /// Returns `false` (and changes nothing) when the category is already
    /// first (moving up) or last (moving down), or does not exist.
    pub fn reorder_category(&mut self, id: &CategoryId, direction: Direction) -> bool {
        let Some(target) = self.category(id) else {
            return false;
        };

        let peers = self.children(target.parent_id.as_ref());
        let Some(idx) = peers.iter().position(|c| &c.id == id) else {
            return false;
        };

        let neighbour = match direction {
            Direction::Up if idx > 0 => peers[idx - 1],
            Direction::Down if idx + 1 < peers.len() => peers[idx + 1],
            _ => return false,
        };

        let (target_order, neighbour_order) = (peers[idx].order, neighbour.order);
        let neighbour_id = neighbour.id.clone();

        for category in &mut self.categories {
            if &category.id == id {
                category.order = neighbour_order;
            } else if category.id == neighbour_id {
                category.order = target_order;
            }
        }

        true
    }

    /// Categories under `parent_id`, sorted by `order`.
    ///
    /// The sort is stable, so equal orders keep insertion order.
    pub fn children(&self, parent_id: Option<&CategoryId>) -> Vec<&Category> {
        let mut children: Vec<&Category> = self
            .categories
            .iter()
            .filter(|c| c.parent_id.as_ref() == parent_id)
            .collect();
        children.sort_by_key(|c| c.order);
        children
    }

    /// Top-level categories, sorted by `order`
    pub fn roots(&self) -> Vec<&Category> {
        self.children(None)
    }

    /// All categories below `id` (not including `id` itself), depth-first.
    pub fn descendants(&self, id: &CategoryId) -> Vec<CategoryId> {
        let index = self.child_index();
        walk(&index, id).into_iter().cloned().collect()
    }

    /// Names from the root down to `id`
    pub fn path(&self, id: &CategoryId) -> Vec<&str> {
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.category(id);

        while let Some(category) = current {
            if !seen.insert(&category.id) {
                break;
            }
            names.push(category.name.as_str());
            current = category.parent_id.as_ref().and_then(|p| self.category(p));
        }

        names.reverse();
        names
    }

    /// Items directly in `id` plus items in every descendant category
    pub fn item_count(&self, id: &CategoryId) -> usize {
        let mut scope: HashSet<CategoryId> = self.descendants(id).into_iter().collect();
        scope.insert(id.clone());

        self.items
            .iter()
            .filter(|i| scope.contains(&i.category_id))
            .count()
    }

    /// Flatten the forest in display order.
    ///
    /// Children of a category are listed only when `is_expanded` returns true
    /// for it.
    pub fn rows<F>(&self, is_expanded: F) -> Vec<TreeRow<'_>>
    where
        F: Fn(&CategoryId) -> bool,
    {
        let index = self.child_index();
        let direct = self.direct_counts();
        let mut rows = Vec::new();
        let mut visited: HashSet<&CategoryId> = HashSet::new();

        // (category, depth), children pushed in reverse so they pop in order
        let mut stack: Vec<(&Category, usize)> =
            self.roots().into_iter().rev().map(|c| (c, 0)).collect();

        while let Some((category, depth)) = stack.pop() {
            if !visited.insert(&category.id) {
                continue;
            }

            let children = index.get(&category.id).map(Vec::as_slice).unwrap_or(&[]);
            let expanded = is_expanded(&category.id);

            let item_count = std::iter::once(&category.id)
                .chain(walk(&index, &category.id))
                .map(|id| direct.get(id).copied().unwrap_or(0))
                .sum();

            rows.push(TreeRow {
                category,
                depth,
                item_count,
                has_children: !children.is_empty(),
                expanded,
            });

            if expanded {
                for child in children.iter().rev() {
                    stack.push((*child, depth + 1));
                }
            }
        }

        rows
    }

    /// parent id → children sorted by `order`
    fn child_index(&self) -> HashMap<&CategoryId, Vec<&Category>> {
        let mut index: HashMap<&CategoryId, Vec<&Category>> = HashMap::new();
        for category in &self.categories {
            if let Some(parent) = &category.parent_id {
                index.entry(parent).or_default().push(category);
            }
        }
        for children in index.values_mut() {
            children.sort_by_key(|c| c.order);
        }
        index
    }

    /// category id → number of items directly inside it
    fn direct_counts(&self) -> HashMap<&CategoryId, usize> {
        let mut counts = HashMap::new();
        for item in &self.items {
            *counts.entry(&item.category_id).or_insert(0) += 1;
        }
        counts
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    /// Get an item by ID
    pub fn item(&self, id: &ItemId) -> Option<&LibraryItem> {
        self.items.iter().find(|i| &i.id == id)
    }

    /// Items directly inside a category, most recent first
    pub fn items_in(&self, category_id: &CategoryId) -> Vec<&LibraryItem> {
        self.items
            .iter()
            .filter(|i| &i.category_id == category_id)
            .collect()
    }

    /// Create an item in `category_id` and put it at the front of the list
    pub fn create_item(
        &mut self,
        category_id: Option<&CategoryId>,
        new_item: NewItem,
    ) -> Result<ItemId, LibraryError> {
        let category_id = category_id.ok_or(LibraryError::NoCategorySelected)?;
        if self.category(category_id).is_none() {
            return Err(LibraryError::UnknownCategory(category_id.clone()));
        }
        if new_item.title.trim().is_empty() {
            return Err(LibraryError::EmptyTitle);
        }

        let mut item = LibraryItem::new(category_id.clone(), new_item.title, new_item.content);
        if let Some(attachment) = new_item.attachment {
            item = item.with_attachment(attachment);
        }

        let id = item.id.clone();
        debug!(item = %id, category = %category_id, "Creating item");
        self.items.insert(0, item);

        Ok(id)
    }

    /// Replace an item's title and content
    pub fn edit_item(
        &mut self,
        id: &ItemId,
        new_title: &str,
        new_content: &str,
    ) -> Result<(), LibraryError> {
        let item = self.item_mut(id)?;
        item.title = new_title.to_string();
        item.content = new_content.to_string();
        Ok(())
    }

    /// Reassign an item to another existing category
    pub fn move_item(&mut self, id: &ItemId, target: &CategoryId) -> Result<(), LibraryError> {
        if self.category(target).is_none() {
            return Err(LibraryError::UnknownCategory(target.clone()));
        }

        let item = self.item_mut(id)?;
        item.category_id = target.clone();
        Ok(())
    }

    /// Remove an item by ID
    pub fn delete_item(&mut self, id: &ItemId) -> Option<LibraryItem> {
        let pos = self.items.iter().position(|i| &i.id == id)?;
        Some(self.items.remove(pos))
    }

    fn item_mut(&mut self, id: &ItemId) -> Result<&mut LibraryItem, LibraryError> {
        self.items
            .iter_mut()
            .find(|i| &i.id == id)
            .ok_or_else(|| LibraryError::UnknownItem(id.clone()))
    }

    /// Check if the library holds nothing
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.items.is_empty()
    }
}

/// Depth-first walk below `root` over a parent index, guarded by a visited set
fn walk<'a>(
    index: &HashMap<&'a CategoryId, Vec<&'a Category>>,
    root: &'a CategoryId,
) -> Vec<&'a CategoryId> {
    let mut visited: HashSet<&CategoryId> = HashSet::new();
    visited.insert(root);

    let mut found = Vec::new();
    let mut stack = vec![root];

    while let Some(current) = stack.pop() {
        for child in index.get(current).into_iter().flatten() {
            if visited.insert(&child.id) {
                found.push(&child.id);
                stack.push(&child.id);
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library_with_root() -> (Library, CategoryId) {
        let mut library = Library::new();
        let root = library.add_category(None, "Root").unwrap();
        (library, root)
    }

    fn order_of(library: &Library, id: &CategoryId) -> i64 {
        library.category(id).unwrap().order
    }

    #[test]
    fn test_sibling_orders_increment() {
        let (mut library, root) = library_with_root();
        let a = library.add_category(Some(&root), "A").unwrap();
        let b = library.add_category(Some(&root), "B").unwrap();

        assert_eq!(order_of(&library, &root), 0);
        assert_eq!(order_of(&library, &a), 0);
        assert_eq!(order_of(&library, &b), 1);
    }

    #[test]
    fn test_order_follows_max_not_count() {
        let (mut library, root) = library_with_root();
        let a = library.add_category(Some(&root), "A").unwrap();
        library.categories.iter_mut().find(|c| c.id == a).unwrap().order = 7;

        let b = library.add_category(Some(&root), "B").unwrap();
        assert_eq!(order_of(&library, &b), 8);
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let (mut library, root) = library_with_root();
        let before = library.clone();

        assert_eq!(library.add_category(Some(&root), "   "), Err(LibraryError::EmptyName));
        assert_eq!(library.rename_category(&root, "\t"), Err(LibraryError::EmptyName));
        assert_eq!(library, before);
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let mut library = Library::new();
        let missing = CategoryId::from("nope");

        assert_eq!(
            library.add_category(Some(&missing), "Orphan"),
            Err(LibraryError::UnknownCategory(missing))
        );
        assert!(library.categories.is_empty());
    }

    #[test]
    fn test_rename_in_place() {
        let (mut library, root) = library_with_root();
        library.rename_category(&root, "Books").unwrap();
        assert_eq!(library.category(&root).unwrap().name, "Books");
    }

    #[test]
    fn test_reorder_swaps_adjacent_orders() {
        let (mut library, root) = library_with_root();
        let a = library.add_category(Some(&root), "A").unwrap();
        let b = library.add_category(Some(&root), "B").unwrap();

        assert!(library.reorder_category(&b, Direction::Up));
        assert_eq!(order_of(&library, &a), 1);
        assert_eq!(order_of(&library, &b), 0);

        let names: Vec<_> = library.children(Some(&root)).iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_reorder_at_edges_is_noop() {
        let (mut library, root) = library_with_root();
        let a = library.add_category(Some(&root), "A").unwrap();
        let b = library.add_category(Some(&root), "B").unwrap();
        let before = library.clone();

        assert!(!library.reorder_category(&a, Direction::Up));
        assert!(!library.reorder_category(&b, Direction::Down));
        assert!(!library.reorder_category(&root, Direction::Up));
        assert_eq!(library, before);
    }

    #[test]
    fn test_reorder_keeps_gaps() {
        let (mut library, root) = library_with_root();
        let a = library.add_category(Some(&root), "A").unwrap();
        let b = library.add_category(Some(&root), "B").unwrap();
        library.categories.iter_mut().find(|c| c.id == b).unwrap().order = 10;

        library.reorder_category(&a, Direction::Down);
        assert_eq!(order_of(&library, &a), 10);
        assert_eq!(order_of(&library, &b), 0);
    }

    #[test]
    fn test_cascade_delete() {
        let (mut library, root) = library_with_root();
        let other = library.add_category(None, "Other").unwrap();
        let child = library.add_category(Some(&root), "Child").unwrap();
        let grandchild = library.add_category(Some(&child), "Grandchild").unwrap();

        let i1 = library.create_item(Some(&child), NewItem::new("I1", "")).unwrap();
        let i2 = library.create_item(Some(&grandchild), NewItem::new("I2", "")).unwrap();
        let keep = library.create_item(Some(&other), NewItem::new("Keep", "")).unwrap();

        let removal = library.delete_category(&root);

        assert_eq!(removal.categories.len(), 3);
        assert!(removal.contains_category(&grandchild));
        assert!(removal.contains_item(&i1));
        assert!(removal.contains_item(&i2));
        assert_eq!(library.categories.len(), 1);
        assert_eq!(library.items.len(), 1);
        assert!(library.item(&keep).is_some());
    }

    #[test]
    fn test_delete_unknown_category() {
        let (mut library, _) = library_with_root();
        let removal = library.delete_category(&CategoryId::from("ghost"));
        assert!(removal.is_empty());
        assert_eq!(library.categories.len(), 1);
    }

    #[test]
    fn test_item_count_is_recursive() {
        let (mut library, root) = library_with_root();
        let child = library.add_category(Some(&root), "Child").unwrap();
        let leaf = library.add_category(Some(&child), "Leaf").unwrap();

        library.create_item(Some(&root), NewItem::new("a", "")).unwrap();
        library.create_item(Some(&child), NewItem::new("b", "")).unwrap();
        library.create_item(Some(&child), NewItem::new("c", "")).unwrap();

        assert_eq!(library.item_count(&root), 3);
        assert_eq!(library.item_count(&child), 2);
        assert_eq!(library.item_count(&leaf), 0);
    }

    #[test]
    fn test_descendants_terminate_on_cycle() {
        let a = Category::new("A", Some(CategoryId::from("b")), 0).with_id("a");
        let b = Category::new("B", Some(CategoryId::from("a")), 0).with_id("b");
        let library = Library::from_parts(vec![a, b], Vec::new());

        let found = library.descendants(&CategoryId::from("a"));
        assert_eq!(found, vec![CategoryId::from("b")]);
        assert_eq!(library.path(&CategoryId::from("a")).len(), 2);
    }

    #[test]
    fn test_create_item_validation() {
        let (mut library, root) = library_with_root();

        assert_eq!(
            library.create_item(None, NewItem::new("Title", "")),
            Err(LibraryError::NoCategorySelected)
        );
        assert_eq!(
            library.create_item(Some(&root), NewItem::new("  ", "body")),
            Err(LibraryError::EmptyTitle)
        );

        let ghost = CategoryId::from("ghost");
        assert_eq!(
            library.create_item(Some(&ghost), NewItem::new("", "body")),
            Err(LibraryError::UnknownCategory(ghost.clone()))
        );
        assert!(library.items.is_empty());
    }

    #[test]
    fn test_add_after_max_order_is_rejected() {
        let root = Category::new("Root", None, i64::MAX).with_id("r");
        let mut library = Library::from_parts(vec![root], Vec::new());
        let before = library.clone();

        assert_eq!(
            library.add_category(None, "Next"),
            Err(LibraryError::OrderOverflow)
        );
        assert_eq!(library, before);

        // Other sibling sets are unaffected
        assert!(library.add_category(Some(&CategoryId::from("r")), "Child").is_ok());
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Up.to_string(), "up");
        assert_eq!(Direction::Down.to_string(), "down");
    }

    #[test]
    fn test_items_are_prepended() {
        let (mut library, root) = library_with_root();
        let first = library.create_item(Some(&root), NewItem::new("first", "")).unwrap();
        let second = library.create_item(Some(&root), NewItem::new("second", "")).unwrap();

        let ids: Vec<_> = library.items_in(&root).iter().map(|i| i.id.clone()).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn test_edit_move_delete_item() {
        let (mut library, root) = library_with_root();
        let other = library.add_category(None, "Other").unwrap();
        let id = library.create_item(Some(&root), NewItem::new("draft", "v1")).unwrap();

        library.edit_item(&id, "final", "v2").unwrap();
        assert_eq!(library.item(&id).unwrap().title, "final");
        assert_eq!(library.item(&id).unwrap().content, "v2");

        library.move_item(&id, &other).unwrap();
        assert_eq!(library.item(&id).unwrap().category_id, other);

        let missing = CategoryId::from("missing");
        assert_eq!(
            library.move_item(&id, &missing),
            Err(LibraryError::UnknownCategory(missing))
        );

        assert!(library.delete_item(&id).is_some());
        assert!(library.delete_item(&id).is_none());
    }

    #[test]
    fn test_rows_respect_expansion() {
        let (mut library, root) = library_with_root();
        let child = library.add_category(Some(&root), "Child").unwrap();
        library.add_category(Some(&child), "Grandchild").unwrap();
        library.add_category(None, "Second root").unwrap();
        library.create_item(Some(&child), NewItem::new("doc", "")).unwrap();

        let collapsed = library.rows(|_| false);
        assert_eq!(collapsed.len(), 2);
        assert_eq!(collapsed[0].item_count, 1);
        assert!(collapsed[0].has_children);

        let expanded = library.rows(|_| true);
        let names: Vec<_> = expanded.iter().map(|r| (r.category.name.as_str(), r.depth)).collect();
        assert_eq!(
            names,
            vec![("Root", 0), ("Child", 1), ("Grandchild", 2), ("Second root", 0)]
        );
    }
}
