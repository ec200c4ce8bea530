//! In-memory content storage adapter.
//!
//! Holds file bytes keyed by storage reference and streams them from a
//! cursor. Useful for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ports::{ContentStorage, ContentStorageError, StoredContent};

#[derive(Debug, Clone, Default)]
pub struct InMemoryContentStorage {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryContentStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, storage_ref: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.write().await.insert(storage_ref.into(), bytes.into());
    }
}

#[async_trait]
impl ContentStorage for InMemoryContentStorage {
    async fn open(&self, storage_ref: &str) -> Result<StoredContent, ContentStorageError> {
        let bytes = self
            .files
            .read()
            .await
            .get(storage_ref)
            .cloned()
            .ok_or_else(|| ContentStorageError::NotFound(storage_ref.to_string()))?;

        Ok(StoredContent {
            len: Some(bytes.len() as u64),
            reader: Box::pin(Cursor::new(bytes)),
        })
    }
}
