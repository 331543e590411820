//! In-memory blob storage.
//!
//! Used by tests and the `memory` backend mode. Uploaded blobs live in a map
//! keyed by path; URLs mimic the `https://host/{bucket}/{path}` shape of the
//! real backend so path recovery behaves identically. `public_url` always
//! answers `None`, which forces the signed-URL fallback path to be exercised.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use super::{ObjectStorage, StorageError};

const FAKE_HOST: &str = "https://blobs.invalid";
const FAKE_BUCKET: &str = "meridian-test";

/// In-process blob store.
#[derive(Default)]
pub struct MemoryStorage {
    blobs: RwLock<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a blob exists at `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.blobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(path)
    }

    /// Number of stored blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.blobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_owned(), (bytes, content_type.to_owned()));
        Ok(format!("{FAKE_HOST}/{FAKE_BUCKET}/{path}"))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.blobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path);
        Ok(())
    }

    async fn public_url(&self, _path: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, StorageError> {
        Ok(format!(
            "{FAKE_HOST}/{FAKE_BUCKET}/{path}?expires={}",
            ttl.as_secs()
        ))
    }
}
