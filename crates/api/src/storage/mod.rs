//! Object storage boundary.
//!
//! Blobs (product images, carousel images, document files) live in an object
//! store reached through the [`ObjectStorage`] trait: upload bytes, delete by
//! path, and turn a path into either a permanent public URL or a time-limited
//! signed URL.
//!
//! Backends: [`memory::MemoryStorage`] for tests and the `memory` backend
//! mode, [`gcs::GcsStorage`] for Google Cloud Storage.

pub mod gcs;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the object storage boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Transport-level failure reaching the storage service.
    #[error("storage transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The storage service rejected the request.
    #[error("storage rejected request: {0}")]
    Rejected(String),

    /// Credential acquisition failed.
    #[error("storage credential error: {0}")]
    Credentials(String),

    /// Signed-URL minting failed.
    #[error("signed URL error: {0}")]
    Signing(String),
}

/// Blob store the catalog writes images and files to.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload bytes under `path` and return the URL to store on the record.
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// Delete the blob at `path`. Deleting an absent blob succeeds.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Permanent public URL for `path`, if the backend offers one.
    async fn public_url(&self, path: &str) -> Result<Option<String>, StorageError>;

    /// Time-limited signed URL granting access to `path` for `ttl`.
    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, StorageError>;
}

/// Recover the blob path from a stored URL.
///
/// Records store full URLs (what [`ObjectStorage::upload`] returned), but
/// deletes and signing work on paths. URLs of the form
/// `https://host/{bucket}/{path...}` lose their first path segment; bare
/// paths pass through unchanged; query strings are stripped.
#[must_use]
pub fn blob_path_from_url(url: &str) -> String {
    let Ok(parsed) = url::Url::parse(url) else {
        // Not a URL - already a bare blob path.
        return url.split('?').next().unwrap_or(url).to_owned();
    };

    let mut segments: Vec<&str> = parsed
        .path_segments()
        .map(|segments| segments.collect())
        .unwrap_or_default();
    if segments.len() > 1 {
        segments.remove(0); // bucket
    }
    segments.join("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_path_from_public_url() {
        let path =
            blob_path_from_url("https://storage.googleapis.com/my-bucket/products/p1/img.jpg");
        assert_eq!(path, "products/p1/img.jpg");
    }

    #[test]
    fn test_blob_path_strips_query() {
        let path = blob_path_from_url(
            "https://storage.googleapis.com/my-bucket/documents/a.pdf?X-Goog-Signature=abc",
        );
        assert_eq!(path, "documents/a.pdf");
    }

    #[test]
    fn test_blob_path_passthrough_for_bare_path() {
        assert_eq!(
            blob_path_from_url("documents/manual.pdf"),
            "documents/manual.pdf"
        );
    }
}
