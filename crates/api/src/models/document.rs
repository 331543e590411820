//! Downloadable documents (manuals, datasheets, price lists).
//!
//! A document row points at a stored file via `file_url` and carries a
//! `requires_login` gate. Ungated documents are listed to everyone; gated
//! ones only to authenticated callers. Access to the file itself goes through
//! the download resolver, never through this module - listings withhold the
//! raw `file_url` so the gate cannot be sidestepped.

use chrono::{DateTime, Utc};
use meridian_core::DocumentId;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::storage::{ObjectStorage, StorageError, blob_path_from_url};
use crate::store::{Collection, DocumentStore, Fields, Record, StoreError};

const COLLECTION: &str = "documents";

/// A downloadable document.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: Option<DocumentId>,
    pub title: String,
    /// URL of the stored file, an external link, or a bare blob path.
    pub file_url: Option<String>,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    /// Gated documents need an authenticated caller to download.
    pub requires_login: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Document {
    #[must_use]
    pub fn new(title: impl Into<String>, requires_login: bool) -> Self {
        Self {
            id: None,
            title: title.into(),
            file_url: None,
            file_size: None,
            file_type: None,
            requires_login,
            created_at: None,
            updated_at: None,
        }
    }

    fn from_record(record: &Record) -> Self {
        Self {
            id: Some(DocumentId::new(record.id.clone())),
            title: record.string_or_empty("title"),
            file_url: record.opt_string("file_url"),
            file_size: record.fields.get("file_size").and_then(serde_json::Value::as_i64),
            file_type: record.opt_string("file_type"),
            requires_login: record.bool_or("requires_login", false),
            created_at: record.timestamp("created_at"),
            updated_at: record.timestamp("updated_at"),
        }
    }

    fn to_fields(&self) -> Fields {
        super::fields_of(json!({
            "title": self.title,
            "file_url": self.file_url,
            "file_size": self.file_size,
            "file_type": self.file_type,
            "requires_login": self.requires_login,
        }))
    }

    /// Listing shape. The raw `file_url` is withheld; callers fetch files
    /// through the download endpoint.
    #[must_use]
    pub fn listing(&self) -> DocumentListing {
        DocumentListing {
            id: self.id.clone(),
            title: self.title.clone(),
            file_size: self.file_size,
            file_type: self.file_type.clone(),
            requires_login: self.requires_login,
            has_file: self.file_url.is_some(),
            created_at: self.created_at,
        }
    }
}

/// Document response shape for listings.
#[derive(Debug, Serialize)]
pub struct DocumentListing {
    pub id: Option<DocumentId>,
    pub title: String,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub requires_login: bool,
    pub has_file: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Accessor for the `documents` collection.
pub struct DocumentRepository<'a> {
    storage: &'a dyn ObjectStorage,
    documents: Collection<'a>,
}

impl<'a> DocumentRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore, storage: &'a dyn ObjectStorage) -> Self {
        Self {
            storage,
            documents: Collection::new(store, COLLECTION),
        }
    }

    /// Document by id.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn get(&self, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        let record = self.documents.get(id.as_str()).await?;
        Ok(record.as_ref().map(Document::from_record))
    }

    /// Documents downloadable without authentication.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn public(&self) -> Result<Vec<Document>, StoreError> {
        let records = self
            .documents
            .filter(&[("requires_login", json!(false))])
            .await?;
        Ok(records.iter().map(Document::from_record).collect())
    }

    /// Gated documents, listed only to authenticated callers.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn private(&self) -> Result<Vec<Document>, StoreError> {
        let records = self
            .documents
            .filter(&[("requires_login", json!(true))])
            .await?;
        Ok(records.iter().map(Document::from_record).collect())
    }

    /// Insert or update, writing the assigned id back.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn save(&self, document: &mut Document) -> Result<DocumentId, StoreError> {
        let id = self
            .documents
            .upsert(
                document.id.as_ref().map(DocumentId::as_str),
                document.to_fields(),
            )
            .await?;
        let id = DocumentId::new(id);
        document.id = Some(id.clone());
        Ok(id)
    }

    /// Delete a document row and its stored file.
    ///
    /// The blob goes first; a blob failure is logged and the row delete
    /// proceeds.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        if let Some(record) = self.documents.get(id.as_str()).await? {
            let document = Document::from_record(&record);
            if let Some(url) = &document.file_url {
                let path = blob_path_from_url(url);
                if let Err(error) = self.storage.delete(&path).await {
                    tracing::warn!(document_id = %id, %error, "document blob delete failed, removing row anyway");
                }
            }
        }
        self.documents.delete(id.as_str()).await
    }

    /// Upload file bytes and return the stored URL.
    ///
    /// The blob path keeps the original file extension so downloads keep a
    /// meaningful name.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn upload_file_bytes(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| format!(".{ext}"))
            .unwrap_or_default();
        let path = format!("documents/{}{extension}", Uuid::new_v4());
        self.storage.upload(&path, bytes, content_type).await
    }
}
