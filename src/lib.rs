//! libris - Personal document library organised as a category tree
//!
//! Documents ("items") live in categories; categories nest into a forest
//! with an explicit sibling order. State is kept as two JSON documents
//! under a local home directory and can be exported to, or restored from,
//! a single backup file.
//!
//! # Architecture
//!
//! - A [`Library`] holds the flat category and item lists and implements
//!   every tree operation (add, rename, cascade delete, reorder, counts).
//! - A [`Session`] wraps a library with selection state and writes both
//!   collections through a [`StateStorage`] backend after each change.
//! - Front ends render from [`Session::snapshot`] and learn about changes
//!   and alerts through [`Session::subscribe`].
//!
//! # Modules
//!
//! - `domain`: Data structures (Category, LibraryItem, Dialog)
//! - `library`: Tree operations, upload ingestion, backups
//! - `core`: Storage backends and the session
//! - `config`: Layered configuration
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Build a tree
//! libris category add Papers
//! libris item add --category cat-1a2b --file paper.pdf
//!
//! # Look at it
//! libris tree
//!
//! # Back up and restore
//! libris export --output ./backups
//! libris import ./backups/library_backup_2026-10-19.json
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod library;

// Re-export main types at crate root for convenience
pub use core::{FileStorage, MemoryStorage, Session, SessionEvent, SessionOptions, StateStorage};
pub use domain::{Category, CategoryId, Dialog, DialogAnswer, ItemId, LibraryItem, Notice};
pub use library::{Backup, Direction, IngestedFile, Library, NewItem};
