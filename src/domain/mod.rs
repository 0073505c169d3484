//! Domain types for the library.
//!
//! This module contains the core data structures:
//! - Category: folder nodes linked by parent id
//! - LibraryItem: documents owned by one category
//! - Dialog / Notice: what the front end shows the user

pub mod category;
pub mod dialog;
pub mod item;

// Re-export commonly used types
pub use category::{Category, CategoryId};
pub use dialog::{Dialog, DialogAnswer, Notice};
pub use item::{to_data_url, FileAttachment, ItemId, LibraryItem};
