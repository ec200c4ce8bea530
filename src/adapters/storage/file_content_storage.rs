//! Filesystem content storage adapter.
//!
//! Storage references are paths relative to a root directory. Absolute paths
//! and `..` components are rejected so a catalog row cannot point outside
//! the root.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs::File;

use crate::ports::{ContentStorage, ContentStorageError, StoredContent};

/// Reads content files from a directory tree.
#[derive(Debug, Clone)]
pub struct FileContentStorage {
    root: PathBuf,
}

impl FileContentStorage {
    /// Create a storage rooted at `root`.
    ///
    /// # Example
    /// ```ignore
    /// let storage = FileContentStorage::new("./data/packs");
    /// ```
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Resolve a storage reference to a path under the root.
    fn resolve(&self, storage_ref: &str) -> Result<PathBuf, ContentStorageError> {
        let relative = Path::new(storage_ref);
        if storage_ref.is_empty() {
            return Err(ContentStorageError::InvalidReference(storage_ref.to_string()));
        }
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ContentStorageError::InvalidReference(storage_ref.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ContentStorage for FileContentStorage {
    async fn open(&self, storage_ref: &str) -> Result<StoredContent, ContentStorageError> {
        let path = self.resolve(storage_ref)?;
        let not_found_or_io = |e: std::io::Error| match e.kind() {
            ErrorKind::NotFound => ContentStorageError::NotFound(storage_ref.to_string()),
            _ => ContentStorageError::Io(e.to_string()),
        };

        let file = File::open(&path).await.map_err(not_found_or_io)?;
        let metadata = file.metadata().await.map_err(not_found_or_io)?;
        // Directories open fine on unix but fail on first read
        if !metadata.is_file() {
            return Err(ContentStorageError::NotFound(storage_ref.to_string()));
        }

        Ok(StoredContent {
            reader: Box::pin(file),
            len: Some(metadata.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::fs;
    use tokio::io::AsyncReadExt;

    async fn read_all(content: StoredContent) -> Vec<u8> {
        let mut reader = content.reader;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await.unwrap();
        bytes
    }

    #[tokio::test]
    async fn open_streams_nested_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("packs")).await.unwrap();
        fs::write(dir.path().join("packs/kick.mp3"), b"ID3data").await.unwrap();

        let storage = FileContentStorage::new(dir.path());
        let content = storage.open("packs/kick.mp3").await.unwrap();

        assert_eq!(content.len, Some(7));
        assert_eq!(read_all(content).await, b"ID3data");
    }

    #[tokio::test]
    async fn large_file_streams_intact() {
        let dir = TempDir::new().unwrap();
        let payload: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(dir.path().join("big.zip"), &payload).await.unwrap();

        let storage = FileContentStorage::new(dir.path());
        let content = storage.open("big.zip").await.unwrap();

        assert_eq!(content.len, Some(payload.len() as u64));
        assert_eq!(read_all(content).await, payload);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let storage = FileContentStorage::new(dir.path());

        assert_eq!(
            storage.open("packs/none.mp3").await.unwrap_err(),
            ContentStorageError::NotFound("packs/none.mp3".to_string())
        );
    }

    #[tokio::test]
    async fn directory_is_not_found() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("packs")).await.unwrap();
        let storage = FileContentStorage::new(dir.path());

        assert_eq!(
            storage.open("packs").await.unwrap_err(),
            ContentStorageError::NotFound("packs".to_string())
        );
    }

    #[tokio::test]
    async fn parent_traversal_is_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = FileContentStorage::new(dir.path());

        assert!(matches!(
            storage.open("../etc/passwd").await,
            Err(ContentStorageError::InvalidReference(_))
        ));
        assert!(matches!(
            storage.open("/etc/passwd").await,
            Err(ContentStorageError::InvalidReference(_))
        ));
    }
}
