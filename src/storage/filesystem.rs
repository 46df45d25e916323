//! File system helpers
//!
//! Directory bootstrap and temporary-file housekeeping for the storage
//! directory.

use log::{info, warn};
use std::io::Result;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;

/// Prefix and suffix of in-progress upload files.
pub const TEMP_PREFIX: &str = ".upload-";
pub const TEMP_SUFFIX: &str = ".part";

/// Temporary files untouched for this long are treated as abandoned. Younger
/// ones may belong to another process sharing the directory.
pub const STALE_UPLOAD_AGE: Duration = Duration::from_secs(60 * 60);

/// Creates `path` (and parents) if missing and returns its canonical form.
pub async fn ensure_directory(path: &Path) -> Result<PathBuf> {
    fs::create_dir_all(path).await?;
    fs::canonicalize(path).await
}

/// Path of the temporary file used while receiving upload `token`.
pub fn temp_path(root: &Path, token: u64) -> PathBuf {
    root.join(format!("{TEMP_PREFIX}{token}{TEMP_SUFFIX}"))
}

/// Removes temporary upload files left behind by an interrupted process.
///
/// Only files last modified more than `max_age` ago are removed. Returns how
/// many were removed.
pub async fn sweep_temp_files(root: &Path, max_age: Duration) -> Result<usize> {
    let mut removed = 0;
    let mut entries = fs::read_dir(root).await?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !(name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)) {
            continue;
        }

        let modified = match entry.metadata().await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                warn!("Failed to inspect upload file {}: {}", name, e);
                continue;
            }
        };
        // A clock set backwards yields Err; keep the file.
        match SystemTime::now().duration_since(modified) {
            Ok(age) if age >= max_age => {}
            _ => continue,
        }

        match fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to remove stale upload {}: {}", name, e),
        }
    }

    if removed > 0 {
        info!("Removed {} stale upload file(s) from {}", removed, root.display());
    }

    Ok(removed)
}
