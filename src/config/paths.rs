//! Canonical file locations for persisted library state.
//!
//! Single source of truth - import this instead of hardcoding paths.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use libris::config::paths;
//!
//! let categories = paths::categories_file()?;
//! ```

use std::path::{Path, PathBuf};

use anyhow::Result;

/// File holding the category collection
pub const CATEGORIES_FILE: &str = "categories.json";

/// File holding the item collection
pub const ITEMS_FILE: &str = "items.json";

/// Advisory lock taken while a snapshot is written
pub const LOCK_FILE: &str = ".lock";

/// Get the libris home directory (~/.libris)
pub fn libris_home() -> Result<PathBuf> {
    crate::config::libris_home()
}

/// ~/.libris/categories.json
pub fn categories_file() -> Result<PathBuf> {
    Ok(libris_home()?.join(CATEGORIES_FILE))
}

/// ~/.libris/items.json
pub fn items_file() -> Result<PathBuf> {
    Ok(libris_home()?.join(ITEMS_FILE))
}

/// Lock file inside an arbitrary state directory
pub fn lock_file_in(home: &Path) -> PathBuf {
    home.join(LOCK_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_files_are_distinct() {
        assert_ne!(CATEGORIES_FILE, ITEMS_FILE);
        assert!(CATEGORIES_FILE.ends_with(".json"));
        assert!(ITEMS_FILE.ends_with(".json"));
    }

    #[test]
    fn test_lock_file_in_home() {
        let lock = lock_file_in(Path::new("/tmp/libris"));
        assert_eq!(lock, PathBuf::from("/tmp/libris/.lock"));
    }
}
