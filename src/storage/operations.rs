//! Storage operations
//!
//! The storage manager owns the upload directory. Accepting, listing,
//! resolving and removing stored files all go through it.

use log::{error, info, warn};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::error::StorageError;
use crate::storage::filesystem::{STALE_UPLOAD_AGE, ensure_directory, sweep_temp_files, temp_path};
use crate::storage::naming::{TokenSource, allowed_extension, stored_name};
use crate::storage::results::StoredFile;
use crate::storage::validation::{is_hidden, validate_stored_name};

/// Default upload ceiling: 10 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

const BUFFER_SIZE: usize = 8192;
const MAX_NAME_ATTEMPTS: usize = 3;

/// Owner of the storage directory.
#[derive(Debug)]
pub struct StorageManager {
    root: PathBuf,
    max_file_size: u64,
    tokens: TokenSource,
}

impl StorageManager {
    /// Opens the storage directory, creating it if needed.
    ///
    /// Temporary files abandoned by interrupted uploads are removed; recent
    /// ones are left for whichever process is still writing them.
    pub async fn open(root: impl AsRef<Path>, max_file_size: u64) -> Result<Self, StorageError> {
        let root = ensure_directory(root.as_ref()).await?;
        sweep_temp_files(&root, STALE_UPLOAD_AGE).await?;

        info!(
            "Storage directory: {} (max upload {} bytes)",
            root.display(),
            max_file_size
        );

        Ok(Self {
            root,
            max_file_size,
            tokens: TokenSource::new(),
        })
    }

    /// Canonical absolute path of the storage directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Stores the contents of `reader` under a fresh stored name derived from
    /// `original_name` and returns that name.
    ///
    /// Bytes go to a hidden temporary file first and are renamed into place
    /// only once the whole stream has been received within the size limit.
    pub async fn accept<R>(&self, reader: R, original_name: &str) -> Result<String, StorageError>
    where
        R: AsyncRead,
    {
        if let Err(e) = allowed_extension(original_name) {
            warn!("Rejected upload {:?}: {}", original_name, e);
            return Err(e);
        }

        let token = self.tokens.next();
        let name = stored_name(token, original_name).inspect_err(|e| {
            warn!("Rejected upload {:?}: {}", original_name, e);
        })?;

        tokio::pin!(reader);
        let temp = temp_path(&self.root, token);

        let size = match self.receive(reader, &temp).await {
            Ok(size) => size,
            Err(e) => {
                discard(&temp).await;
                return Err(e);
            }
        };

        let name = match self.publish(&temp, name, original_name).await {
            Ok(name) => name,
            Err(e) => {
                discard(&temp).await;
                return Err(e);
            }
        };

        info!("Stored {:?} as {} ({} bytes)", original_name, name, size);
        Ok(name)
    }

    /// Convenience wrapper around [`accept`](Self::accept) for in-memory data.
    pub async fn accept_bytes(&self, bytes: &[u8], original_name: &str) -> Result<String, StorageError> {
        self.accept(bytes, original_name).await
    }

    /// Names of all stored files, read fresh from disk.
    pub async fn list(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .map(|file| file.name)
            .collect())
    }

    /// Stored files with their sizes, sorted by name.
    pub async fn entries(&self) -> Result<Vec<StoredFile>, StorageError> {
        let mut entries = fs::read_dir(&self.root).await.inspect_err(|e| {
            error!("Failed to list {}: {}", self.root.display(), e);
        })?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if is_hidden(&name) {
                continue;
            }

            // Entries may disappear between read_dir and metadata.
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if metadata.is_file() {
                files.push(StoredFile {
                    name,
                    size: metadata.len(),
                });
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Absolute path of the stored file `name`.
    pub async fn resolve(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_stored_name(name).inspect_err(|e| warn!("Refused lookup: {}", e))?;

        let path = self.root.join(name);
        self.check_regular_file(&path, name).await?;
        Ok(path)
    }

    /// Opens the stored file `name` for reading.
    ///
    /// A file removed between the lookup and the open is reported as
    /// `NotFound`.
    pub async fn open_file(&self, name: &str) -> Result<(File, StoredFile), StorageError> {
        let path = self.resolve(name).await?;

        let file = File::open(&path).await.map_err(|e| not_found_or_io(e, name))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| not_found_or_io(e, name))?
            .len();

        Ok((
            file,
            StoredFile {
                name: name.to_string(),
                size,
            },
        ))
    }

    /// Deletes the stored file `name`.
    pub async fn remove(&self, name: &str) -> Result<(), StorageError> {
        validate_stored_name(name).inspect_err(|e| warn!("Refused delete: {}", e))?;

        let path = self.root.join(name);
        self.check_regular_file(&path, name).await?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted {}", name);
                Ok(())
            }
            Err(e) => {
                let e = not_found_or_io(e, name);
                if matches!(e, StorageError::Io(_)) {
                    error!("Failed to delete {}: {}", path.display(), e);
                }
                Err(e)
            }
        }
    }

    /// Copies `reader` into a new temporary file, enforcing the size limit.
    async fn receive<R>(&self, mut reader: R, temp: &Path) -> Result<u64, StorageError>
    where
        R: AsyncRead + Unpin,
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(temp)
            .await
            .inspect_err(|e| error!("Failed to create {}: {}", temp.display(), e))?;

        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut total = 0u64;

        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }

            // Check before writing so an oversized upload never lands on disk in full.
            total += n as u64;
            if total > self.max_file_size {
                warn!(
                    "Upload exceeded {} bytes, discarding {}",
                    self.max_file_size,
                    temp.display()
                );
                return Err(StorageError::PayloadTooLarge {
                    limit: self.max_file_size,
                });
            }

            file.write_all(&buffer[..n]).await.inspect_err(|e| {
                error!("Failed to write {}: {}", temp.display(), e);
            })?;
        }

        file.flush().await?;
        Ok(total)
    }

    /// Renames the finished temporary file to its stored name.
    ///
    /// If another process already holds the name, a new token is drawn.
    async fn publish(
        &self,
        temp: &Path,
        mut name: String,
        original_name: &str,
    ) -> Result<String, StorageError> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let target = self.root.join(&name);
            if !fs::try_exists(&target).await? {
                fs::rename(temp, &target).await.inspect_err(|e| {
                    error!("Failed to move upload into {}: {}", target.display(), e);
                })?;
                return Ok(name);
            }

            warn!("Stored name {} already taken, drawing a new one", name);
            name = stored_name(self.tokens.next(), original_name)?;
        }

        Err(StorageError::Io(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free stored name for {original_name:?}"),
        )))
    }

    async fn check_regular_file(&self, path: &Path, name: &str) -> Result<(), StorageError> {
        // symlink_metadata so links are never followed out of the directory.
        match fs::symlink_metadata(path).await {
            Ok(metadata) if metadata.is_file() => Ok(()),
            Ok(_) => Err(StorageError::NotFound(name.to_string())),
            Err(e) => Err(not_found_or_io(e, name)),
        }
    }
}

fn not_found_or_io(e: io::Error, name: &str) -> StorageError {
    if e.kind() == ErrorKind::NotFound {
        StorageError::NotFound(name.to_string())
    } else {
        StorageError::Io(e)
    }
}

async fn discard(temp: &Path) {
    if let Err(e) = fs::remove_file(temp).await {
        if e.kind() != ErrorKind::NotFound {
            error!("Failed to remove temporary file {}: {}", temp.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::SystemTime;
    use tempfile::TempDir;

    async fn manager(temp: &TempDir) -> StorageManager {
        StorageManager::open(temp.path().join("uploads"), DEFAULT_MAX_FILE_SIZE)
            .await
            .unwrap()
    }

    fn dir_entries(manager: &StorageManager) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(manager.root())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_accept_resolve_remove_scenario() {
        let temp = TempDir::new().unwrap();
        let storage = manager(&temp).await;

        let name = storage.accept_bytes(b"hello", "My Report.txt").await.unwrap();
        assert!(Regex::new(r"^\d+-My_Report\.txt$").unwrap().is_match(&name));

        let path = storage.resolve(&name).await.unwrap();
        assert!(path.is_absolute());
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");

        storage.remove(&name).await.unwrap();
        assert!(matches!(
            storage.resolve(&name).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(storage.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_identical_names_get_distinct_stored_names() {
        let temp = TempDir::new().unwrap();
        let storage = manager(&temp).await;

        let first = storage.accept_bytes(b"one", "same.png").await.unwrap();
        let second = storage.accept_bytes(b"two", "same.png").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(storage.list().await.unwrap(), vec![first.clone(), second.clone()]);
        assert_eq!(std::fs::read(storage.resolve(&first).await.unwrap()).unwrap(), b"one");
        assert_eq!(std::fs::read(storage.resolve(&second).await.unwrap()).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_unsupported_type_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let storage = manager(&temp).await;

        for original in ["virus.exe", "Makefile", ".txt", "page.html"] {
            let result = storage.accept_bytes(b"data", original).await;
            assert!(matches!(result, Err(StorageError::UnsupportedType(_))));
        }

        assert!(dir_entries(&storage).is_empty());
    }

    #[tokio::test]
    async fn test_payload_too_large_leaves_no_file() {
        let temp = TempDir::new().unwrap();
        let storage = manager(&temp).await;

        let data = vec![7u8; DEFAULT_MAX_FILE_SIZE as usize + 1];
        let result = storage.accept_bytes(&data, "big.pdf").await;

        assert!(matches!(
            result,
            Err(StorageError::PayloadTooLarge { limit }) if limit == DEFAULT_MAX_FILE_SIZE
        ));
        assert!(dir_entries(&storage).is_empty());
    }

    #[tokio::test]
    async fn test_exact_limit_is_accepted() {
        let temp = TempDir::new().unwrap();
        let storage = StorageManager::open(temp.path(), 16).await.unwrap();

        let name = storage.accept_bytes(&[1u8; 16], "edge.gif").await.unwrap();
        assert_eq!(storage.entries().await.unwrap()[0].size, 16);
        assert!(storage.accept_bytes(&[1u8; 17], "edge.gif").await.is_err());
        assert_eq!(storage.list().await.unwrap(), vec![name]);
    }

    #[tokio::test]
    async fn test_failed_source_leaves_no_file() {
        let temp = TempDir::new().unwrap();
        let storage = manager(&temp).await;

        let reader = failing_reader();
        let result = storage.accept(reader, "broken.txt").await;

        assert!(matches!(result, Err(StorageError::Io(_))));
        assert!(dir_entries(&storage).is_empty());
    }

    // Yields some bytes, then fails like a dropped connection.
    fn failing_reader() -> impl AsyncRead {
        let chunks: Vec<io::Result<&'static [u8]>> = vec![
            Ok(&b"partial data"[..]),
            Err(io::Error::new(ErrorKind::ConnectionReset, "connection reset")),
        ];
        tokio_util::io::StreamReader::new(futures_util::stream::iter(chunks))
    }

    #[tokio::test]
    async fn test_traversal_names_are_rejected() {
        let temp = TempDir::new().unwrap();
        let storage = manager(&temp).await;
        std::fs::write(temp.path().join("outside.txt"), b"secret").unwrap();

        for name in ["../outside.txt", "..", "/etc/passwd", r"..\outside.txt"] {
            assert!(matches!(
                storage.resolve(name).await,
                Err(StorageError::InvalidName(_))
            ));
            assert!(matches!(
                storage.remove(name).await,
                Err(StorageError::InvalidName(_))
            ));
        }

        assert!(temp.path().join("outside.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_and_directory_entries_are_not_found() {
        let temp = TempDir::new().unwrap();
        let storage = manager(&temp).await;
        std::fs::create_dir(storage.root().join("subdir")).unwrap();

        assert!(matches!(
            storage.resolve("123-nothing.txt").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.remove("subdir").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(storage.root().join("subdir").is_dir());
        assert!(storage.list().await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_are_not_followed() {
        let temp = TempDir::new().unwrap();
        let storage = manager(&temp).await;
        let outside = temp.path().join("outside.txt");
        std::fs::write(&outside, b"secret").unwrap();
        std::os::unix::fs::symlink(&outside, storage.root().join("1-link.txt")).unwrap();

        assert!(matches!(
            storage.resolve("1-link.txt").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(storage.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_twice_reports_not_found() {
        let temp = TempDir::new().unwrap();
        let storage = manager(&temp).await;
        let name = storage.accept_bytes(b"x", "a.jpg").await.unwrap();

        storage.remove(&name).await.unwrap();
        assert!(matches!(
            storage.remove(&name).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_reflects_external_changes() {
        let temp = TempDir::new().unwrap();
        let storage = manager(&temp).await;
        let name = storage.accept_bytes(b"x", "a.docx").await.unwrap();

        std::fs::remove_file(storage.root().join(&name)).unwrap();
        std::fs::write(storage.root().join("99-dropped.txt"), b"yz").unwrap();

        assert_eq!(
            storage.entries().await.unwrap(),
            vec![StoredFile {
                name: "99-dropped.txt".into(),
                size: 2
            }]
        );
    }

    #[tokio::test]
    async fn test_open_file_reports_size() {
        let temp = TempDir::new().unwrap();
        let storage = manager(&temp).await;
        let name = storage.accept_bytes(b"abc", "c.txt").await.unwrap();

        let (mut file, info) = storage.open_file(&name).await.unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await.unwrap();

        assert_eq!(info.size, 3);
        assert_eq!(contents, b"abc");
    }

    #[tokio::test]
    async fn test_open_sweeps_stale_uploads() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("uploads");
        std::fs::create_dir_all(&root).unwrap();
        let stale = temp_path(&root, 5);
        std::fs::write(&stale, b"stale").unwrap();
        std::fs::File::options()
            .write(true)
            .open(&stale)
            .unwrap()
            .set_modified(SystemTime::now() - STALE_UPLOAD_AGE * 2)
            .unwrap();
        std::fs::write(temp_path(&root, 6), b"fresh").unwrap();

        let storage = StorageManager::open(&root, DEFAULT_MAX_FILE_SIZE).await.unwrap();

        assert!(!stale.exists());
        assert!(temp_path(&root, 6).exists());
    }

    #[tokio::test]
    async fn test_second_manager_keeps_in_flight_upload() {
        let temp = TempDir::new().unwrap();
        let first = Arc::new(manager(&temp).await);
        let (mut client, server) = tokio::io::duplex(64);

        let upload = {
            let first = Arc::clone(&first);
            tokio::spawn(async move { first.accept(server, "shared.txt").await })
        };
        client.write_all(b"first").await.unwrap();
        client.flush().await.unwrap();
        // Wait until the temp file is on disk.
        while dir_entries(&first).is_empty() {
            tokio::task::yield_now().await;
        }

        let second = StorageManager::open(first.root(), DEFAULT_MAX_FILE_SIZE).await.unwrap();
        client.write_all(b"second").await.unwrap();
        drop(client);

        let name = upload.await.unwrap().unwrap();
        assert_eq!(
            std::fs::read(second.resolve(&name).await.unwrap()).unwrap(),
            b"firstsecond"
        );
    }

    #[tokio::test]
    async fn test_concurrent_accepts_get_distinct_names() {
        let temp = TempDir::new().unwrap();
        let storage = Arc::new(manager(&temp).await);

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let storage = Arc::clone(&storage);
                tokio::spawn(async move { storage.accept_bytes(b"x", "same.png").await })
            })
            .collect();

        let mut names = HashSet::new();
        for task in tasks {
            names.insert(task.await.unwrap().unwrap());
        }

        assert_eq!(names.len(), 16);
        assert_eq!(storage.list().await.unwrap().len(), 16);
    }
}
