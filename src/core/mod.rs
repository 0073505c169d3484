//! Core runtime: persistence backends and the library session.
//!
//! This module contains:
//! - StateStorage: Async key/value seam with file and in-memory backends
//! - Session: The store object front ends drive

pub mod session;
pub mod storage;

// Re-export commonly used types
pub use session::{
    Draft, EditBuffer, Selection, Session, SessionEvent, SessionOptions, Snapshot, UploadTicket,
};
pub use storage::{FileStorage, MemoryStorage, StateStorage, StorageError, StorageKey};
