//! File system storage management
//!
//! Handles stored-name generation, path validation and the storage manager
//! that owns the upload directory.

pub mod filesystem;
pub mod naming;
pub mod operations;
pub mod results;
pub mod validation;

pub use naming::ALLOWED_EXTENSIONS;
pub use operations::{DEFAULT_MAX_FILE_SIZE, StorageManager};
pub use results::StoredFile;
pub use validation::validate_stored_name;
