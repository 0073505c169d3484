//! The document library: category tree, items, uploads and backups.
//!
//! # Storage Layout
//!
//! ```text
//! ~/.libris/
//! ├── categories.json    # Flat list of categories (parentId + order)
//! ├── items.json         # Flat list of items, most recent first
//! └── .lock              # Held while a snapshot is being written
//! ```
//!
//! Backups are single JSON files named `library_backup_<date>.json`.

pub mod backup;
pub mod ingest;
pub mod tree;

pub use backup::{export_file_name, Backup, ImportError, BACKUP_VERSION};
pub use ingest::{IngestError, IngestedFile, UploadKind};
pub use tree::{Direction, Library, LibraryError, NewItem, Removal, TreeRow};
