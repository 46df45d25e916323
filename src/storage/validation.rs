//! Path validation
//!
//! Stored names arrive from untrusted URL path segments. Every lookup goes
//! through `validate_stored_name` before the filesystem is touched.

use crate::error::StorageError;

/// Longest file name most filesystems accept, in bytes.
pub const MAX_NAME_LENGTH: usize = 255;

/// Checks that `name` can only refer to an entry directly inside the
/// storage directory.
///
/// Rejects empty names, names over `MAX_NAME_LENGTH` bytes, anything
/// containing `..`, a path separator or NUL, and hidden names (temporary
/// uploads are hidden).
pub fn validate_stored_name(name: &str) -> Result<(), StorageError> {
    let reason = if name.is_empty() {
        "empty name"
    } else if name.len() > MAX_NAME_LENGTH {
        "name too long"
    } else if name.contains("..") {
        "path traversal"
    } else if name.contains(['/', '\\']) {
        "path separator"
    } else if name.contains('\0') {
        "NUL byte"
    } else if name.starts_with('.') {
        "hidden name"
    } else {
        return Ok(());
    };

    Err(StorageError::InvalidName(format!("{name:?}: {reason}")))
}

/// Returns true for directory entries that are never reported as stored
/// files.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}
