//! Document store gateway.
//!
//! The catalog keeps every entity in a schemaless, collection-of-documents
//! store reached through the [`DocumentStore`] trait. Two backends exist:
//!
//! - [`memory::MemoryStore`] - in-process maps, used by tests and the
//!   `memory` backend mode
//! - [`firestore::FirestoreStore`] - Cloud Firestore over its REST v1 API
//!
//! [`Collection`] is the per-entity accessor the model layer works with. It
//! stamps write timestamps and splits membership queries into batches of at
//! most [`MEMBERSHIP_BATCH_LIMIT`] values, because the backing store rejects
//! wider `IN` predicates.
//!
//! The gateway never validates foreign keys or uniqueness - that is the
//! caller's responsibility.

pub mod firestore;
pub mod memory;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Field map of a single document.
pub type Fields = Map<String, Value>;

/// Store-imposed ceiling on membership (`IN`) predicate width.
pub const MEMBERSHIP_BATCH_LIMIT: usize = 10;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure reaching the store.
    #[error("store transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store rejected the request.
    #[error("store rejected request: {0}")]
    Rejected(String),

    /// Update target does not exist.
    #[error("document {collection}/{id} does not exist")]
    Missing {
        /// Collection the document was expected in.
        collection: String,
        /// Document id.
        id: String,
    },

    /// Membership predicate wider than the store allows.
    #[error("membership query over {0} values exceeds the {MEMBERSHIP_BATCH_LIMIT}-value ceiling")]
    MembershipTooWide(usize),

    /// A stored record could not be interpreted.
    #[error("malformed record in {collection}: {reason}")]
    Corrupt {
        /// Collection holding the record.
        collection: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Credential acquisition for the store failed.
    #[error("store credential error: {0}")]
    Credentials(String),
}

/// A document read back from the store: the store-assigned id plus fields.
#[derive(Debug, Clone)]
pub struct Record {
    /// Store-assigned document id.
    pub id: String,
    /// Document fields.
    pub fields: Fields,
}

impl Record {
    /// String field, if present and a string.
    #[must_use]
    pub fn str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// String field as an owned `String`, defaulting to empty.
    #[must_use]
    pub fn string_or_empty(&self, key: &str) -> String {
        self.str(key).unwrap_or_default().to_owned()
    }

    /// Optional owned string field.
    #[must_use]
    pub fn opt_string(&self, key: &str) -> Option<String> {
        self.str(key).map(str::to_owned)
    }

    /// Boolean field with a default for absent or non-boolean values.
    #[must_use]
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.fields
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    /// Numeric field coerced to `f64`.
    #[must_use]
    pub fn f64(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    /// Numeric field coerced to `i64`, with a default.
    #[must_use]
    pub fn i64_or(&self, key: &str, default: i64) -> i64 {
        self.fields
            .get(key)
            .and_then(Value::as_i64)
            .unwrap_or(default)
    }

    /// Timestamp field stored as an RFC 3339 string.
    #[must_use]
    pub fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.str(key)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Minimal per-collection document store contract.
///
/// Equality-only conjunctive filters; no inequalities, ranges, or OR.
/// Result order is unspecified unless the caller sorts afterward.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Single-document lookup by primary key.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError>;

    /// Equality-predicate conjunctive filter.
    async fn query(
        &self,
        collection: &str,
        filters: &[(&str, Value)],
    ) -> Result<Vec<Record>, StoreError>;

    /// Membership filter: documents whose `field` is one of `values`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MembershipTooWide`] when `values` exceeds
    /// [`MEMBERSHIP_BATCH_LIMIT`]; callers chunk via
    /// [`Collection::filter_in`].
    async fn query_in(
        &self,
        collection: &str,
        field: &str,
        values: &[Value],
    ) -> Result<Vec<Record>, StoreError>;

    /// Every document in the collection.
    async fn list(&self, collection: &str) -> Result<Vec<Record>, StoreError>;

    /// Create a new document; the store assigns and returns its id.
    async fn insert(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Overwrite the named fields on an existing document.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Delete a document. Deleting an absent document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Per-entity accessor over a [`DocumentStore`].
///
/// Model repositories hold one `Collection` per backing collection. Writes
/// going through [`Collection::upsert`] get their timestamps stamped here so
/// every backend behaves the same.
#[derive(Clone, Copy)]
pub struct Collection<'a> {
    store: &'a dyn DocumentStore,
    name: &'static str,
}

impl<'a> Collection<'a> {
    /// Create an accessor for the named collection.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore, name: &'static str) -> Self {
        Self { store, name }
    }

    /// Collection name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Get a document by id.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn get(&self, id: &str) -> Result<Option<Record>, StoreError> {
        self.store.get(self.name, id).await
    }

    /// Equality-filter the collection.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn filter(&self, filters: &[(&str, Value)]) -> Result<Vec<Record>, StoreError> {
        self.store.query(self.name, filters).await
    }

    /// Membership filter over arbitrarily many candidate values.
    ///
    /// Splits `values` into batches of at most [`MEMBERSHIP_BATCH_LIMIT`],
    /// merges the results, and deduplicates by document id, so the result is
    /// the union with no duplicates.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn filter_in(
        &self,
        field: &str,
        values: &[String],
    ) -> Result<Vec<Record>, StoreError> {
        let mut merged = Vec::new();
        let mut seen = HashSet::new();

        for batch in values.chunks(MEMBERSHIP_BATCH_LIMIT) {
            let batch_values: Vec<Value> =
                batch.iter().map(|v| Value::String(v.clone())).collect();
            for record in self.store.query_in(self.name, field, &batch_values).await? {
                if seen.insert(record.id.clone()) {
                    merged.push(record);
                }
            }
        }

        Ok(merged)
    }

    /// Every document in the collection.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn all(&self) -> Result<Vec<Record>, StoreError> {
        self.store.list(self.name).await
    }

    /// Insert or update a document.
    ///
    /// With an id, overwrites the named fields and stamps `updated_at`.
    /// Without one, stamps both `created_at` and `updated_at` and returns
    /// the store-assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Missing`] when updating an id that no longer
    /// exists; otherwise propagates store failures.
    pub async fn upsert(&self, id: Option<&str>, mut fields: Fields) -> Result<String, StoreError> {
        let now = Utc::now().to_rfc3339();
        fields.insert("updated_at".to_owned(), Value::String(now.clone()));

        match id {
            Some(id) => {
                self.store.update(self.name, id, fields).await?;
                Ok(id.to_owned())
            }
            None => {
                fields.insert("created_at".to_owned(), Value::String(now));
                self.store.insert(self.name, fields).await
            }
        }
    }

    /// Delete a document. Deleting an absent document succeeds.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(self.name, id).await
    }
}
