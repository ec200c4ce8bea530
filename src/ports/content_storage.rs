//! Content storage port.
//!
//! Resolves a catalog item's `storage_ref` to a byte stream. The access
//! decision is made before this port is touched.

use async_trait::async_trait;
use std::fmt;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Readable handle on a stored file.
pub type ContentReader = Pin<Box<dyn AsyncRead + Send>>;

/// An opened content file, ready to be streamed to the client.
pub struct StoredContent {
    pub reader: ContentReader,
    /// Size in bytes, when the backend knows it up front.
    pub len: Option<u64>,
}

impl fmt::Debug for StoredContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredContent")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// Port for reading stored content files.
///
/// # Contract
///
/// Implementations must:
/// - Reject references that escape their storage root
/// - Return `NotFound` rather than an I/O error for missing files
/// - Fail at `open` time, not mid-stream, when the file is absent
#[async_trait]
pub trait ContentStorage: Send + Sync {
    /// Open the file behind `storage_ref` for streaming.
    async fn open(&self, storage_ref: &str) -> Result<StoredContent, ContentStorageError>;
}

/// Errors from content storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentStorageError {
    #[error("Stored file not found: {0}")]
    NotFound(String),

    #[error("Invalid storage reference: {0}")]
    InvalidReference(String),

    #[error("IO error: {0}")]
    Io(String),
}
