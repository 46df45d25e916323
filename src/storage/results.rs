//! Storage result types
//!
//! Defines result structures returned by storage operations.

/// A file currently present in the storage directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
}
