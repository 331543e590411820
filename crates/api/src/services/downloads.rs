//! Gated download resolver.
//!
//! Turns a document id plus whatever credentials the request carried into a
//! URL the client gets redirected to. Terminal states:
//!
//! - ungated document with an absolute http(s) `file_url`: that URL, verbatim
//! - ungated blob: the permanent public URL if the backend has one, else a
//!   60-minute signed URL
//! - gated document with a valid credential: a 15-minute signed URL
//! - gated document without one: [`DownloadError::Unauthorized`]
//!
//! A credential is either the request's bearer token or a `token` query
//! parameter; the query form exists so plain `<a href>` downloads work
//! without header control. Both verify against the same [`TokenService`] and
//! carry no session context.

use std::time::Duration;

use meridian_core::DocumentId;
use thiserror::Error;

use crate::models::DocumentRepository;
use crate::storage::{ObjectStorage, StorageError, blob_path_from_url};
use crate::store::{DocumentStore, StoreError};

use super::token::TokenService;

/// Signed-URL lifetime for ungated blobs without a public URL.
const PUBLIC_LINK_TTL: Duration = Duration::from_secs(60 * 60);
/// Signed-URL lifetime for gated downloads.
const GATED_LINK_TTL: Duration = Duration::from_secs(15 * 60);

/// Ways a download resolution can fail.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// No document with that id.
    #[error("document not found")]
    NotFound,

    /// Gated document and no valid credential.
    #[error("login required to download this document")]
    Unauthorized,

    /// The document row has no file attached.
    #[error("document has no file")]
    MissingFile,

    /// Store failure while loading the document.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Storage failure while minting a URL.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Resolves document downloads to redirect targets.
pub struct DownloadResolver<'a> {
    documents: DocumentRepository<'a>,
    storage: &'a dyn ObjectStorage,
    tokens: &'a TokenService,
}

impl<'a> DownloadResolver<'a> {
    #[must_use]
    pub const fn new(
        store: &'a dyn DocumentStore,
        storage: &'a dyn ObjectStorage,
        tokens: &'a TokenService,
    ) -> Self {
        Self {
            documents: DocumentRepository::new(store, storage),
            storage,
            tokens,
        }
    }

    /// Resolve the URL to redirect a download request to.
    ///
    /// `bearer` is the request's bearer token, if any; `token_param` the
    /// `token` query parameter, if any.
    ///
    /// # Errors
    ///
    /// See [`DownloadError`] for the terminal failure states.
    pub async fn resolve(
        &self,
        id: &DocumentId,
        bearer: Option<&str>,
        token_param: Option<&str>,
    ) -> Result<String, DownloadError> {
        let document = self
            .documents
            .get(id)
            .await?
            .ok_or(DownloadError::NotFound)?;

        let file_url = document.file_url.ok_or(DownloadError::MissingFile)?;

        if !document.requires_login {
            if is_absolute_http(&file_url) {
                return Ok(file_url);
            }
            // Stored as a bare blob path.
            if let Some(public) = self.storage.public_url(&file_url).await? {
                return Ok(public);
            }
            return Ok(self.storage.signed_url(&file_url, PUBLIC_LINK_TTL).await?);
        }

        if !self.is_authorized(bearer, token_param) {
            return Err(DownloadError::Unauthorized);
        }

        let path = blob_path_from_url(&file_url);
        Ok(self.storage.signed_url(&path, GATED_LINK_TTL).await?)
    }

    /// Either credential independently grants access.
    fn is_authorized(&self, bearer: Option<&str>, token_param: Option<&str>) -> bool {
        bearer.is_some_and(|t| self.tokens.verify(t).is_ok())
            || token_param.is_some_and(|t| self.tokens.verify(t).is_ok())
    }
}

fn is_absolute_http(candidate: &str) -> bool {
    url::Url::parse(candidate)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use meridian_core::UserId;
    use secrecy::SecretString;

    use crate::models::Document;
    use crate::storage::memory::MemoryStorage;
    use crate::store::memory::MemoryStore;

    use super::*;

    fn tokens() -> TokenService {
        TokenService::new(&SecretString::from(
            "an-adequately-long-test-signing-secret",
        ))
    }

    async fn saved(store: &MemoryStore, storage: &MemoryStorage, doc: &mut Document) -> DocumentId {
        DocumentRepository::new(store, storage)
            .save(doc)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_absent_document_is_not_found() {
        let store = MemoryStore::new();
        let storage = MemoryStorage::new();
        let tokens = tokens();
        let resolver = DownloadResolver::new(&store, &storage, &tokens);

        let result = resolver
            .resolve(&DocumentId::new("no-such-doc"), None, None)
            .await;
        assert!(matches!(result, Err(DownloadError::NotFound)));
    }

    #[tokio::test]
    async fn test_public_absolute_url_redirects_verbatim() {
        let store = MemoryStore::new();
        let storage = MemoryStorage::new();
        let tokens = tokens();

        let mut doc = Document::new("Catalog", false);
        doc.file_url = Some("https://example.com/catalog.pdf?v=2".to_owned());
        let id = saved(&store, &storage, &mut doc).await;

        let resolver = DownloadResolver::new(&store, &storage, &tokens);
        let url = resolver.resolve(&id, None, None).await.unwrap();
        assert_eq!(url, "https://example.com/catalog.pdf?v=2");
    }

    #[tokio::test]
    async fn test_public_blob_path_falls_back_to_signed_url() {
        let store = MemoryStore::new();
        let storage = MemoryStorage::new();
        let tokens = tokens();

        // MemoryStorage has no public URLs, forcing the signed fallback.
        let mut doc = Document::new("Manual", false);
        doc.file_url = Some("documents/manual.pdf".to_owned());
        let id = saved(&store, &storage, &mut doc).await;

        let resolver = DownloadResolver::new(&store, &storage, &tokens);
        let url = resolver.resolve(&id, None, None).await.unwrap();
        assert!(url.contains("documents/manual.pdf"));
        assert!(url.contains("expires=3600"), "60-minute link: {url}");
    }

    #[tokio::test]
    async fn test_gated_without_credential_is_unauthorized() {
        let store = MemoryStore::new();
        let storage = MemoryStorage::new();
        let tokens = tokens();

        let mut doc = Document::new("Price list", true);
        doc.file_url = Some("documents/prices.pdf".to_owned());
        let id = saved(&store, &storage, &mut doc).await;

        let resolver = DownloadResolver::new(&store, &storage, &tokens);
        assert!(matches!(
            resolver.resolve(&id, None, None).await,
            Err(DownloadError::Unauthorized)
        ));
        assert!(matches!(
            resolver.resolve(&id, Some("garbage"), Some("garbage")).await,
            Err(DownloadError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_gated_token_param_grants_short_lived_url() {
        let store = MemoryStore::new();
        let storage = MemoryStorage::new();
        let tokens = tokens();

        let mut doc = Document::new("Price list", true);
        doc.file_url = Some("documents/prices.pdf".to_owned());
        let id = saved(&store, &storage, &mut doc).await;

        let token = tokens.issue(&UserId::new("u-1")).unwrap();
        let resolver = DownloadResolver::new(&store, &storage, &tokens);

        let url = resolver.resolve(&id, None, Some(&token)).await.unwrap();
        assert!(url.contains("expires=900"), "15-minute link: {url}");

        // Bearer header works the same way.
        let via_bearer = resolver.resolve(&id, Some(&token), None).await.unwrap();
        assert!(via_bearer.contains("expires=900"));
    }

    #[tokio::test]
    async fn test_gated_full_url_is_reduced_to_blob_path() {
        let store = MemoryStore::new();
        let storage = MemoryStorage::new();
        let tokens = tokens();

        let mut doc = Document::new("Price list", true);
        doc.file_url = Some("https://blobs.invalid/bucket/documents/prices.pdf".to_owned());
        let id = saved(&store, &storage, &mut doc).await;

        let token = tokens.issue(&UserId::new("u-1")).unwrap();
        let resolver = DownloadResolver::new(&store, &storage, &tokens);

        let url = resolver.resolve(&id, None, Some(&token)).await.unwrap();
        assert!(url.contains("/documents/prices.pdf?"), "signed path: {url}");
    }

    #[tokio::test]
    async fn test_document_without_file_is_missing_file() {
        let store = MemoryStore::new();
        let storage = MemoryStorage::new();
        let tokens = tokens();

        let mut doc = Document::new("Empty", false);
        let id = saved(&store, &storage, &mut doc).await;

        let resolver = DownloadResolver::new(&store, &storage, &tokens);
        assert!(matches!(
            resolver.resolve(&id, None, None).await,
            Err(DownloadError::MissingFile)
        ));
    }
}
