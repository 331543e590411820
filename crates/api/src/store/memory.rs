//! In-memory document store.
//!
//! Backs the `memory` backend mode and the test suite. Collections are plain
//! maps guarded by a `RwLock`; ids are freshly generated UUIDs. Iteration
//! order follows the id ordering of the map, which callers must treat as
//! unspecified, matching the contract of the real store.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::{DocumentStore, Fields, MEMBERSHIP_BATCH_LIMIT, Record, StoreError};

/// In-process document store.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Fields>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read_matching<F>(&self, collection: &str, predicate: F) -> Vec<Record>
    where
        F: Fn(&Fields) -> bool,
    {
        let guard = self.collections.read().unwrap_or_else(|e| e.into_inner());
        guard
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, fields)| predicate(fields))
                    .map(|(id, fields)| Record {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError> {
        let guard = self.collections.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Record {
                id: id.to_owned(),
                fields: fields.clone(),
            }))
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[(&str, Value)],
    ) -> Result<Vec<Record>, StoreError> {
        Ok(self.read_matching(collection, |fields| {
            filters
                .iter()
                .all(|(key, value)| fields.get(*key) == Some(value))
        }))
    }

    async fn query_in(
        &self,
        collection: &str,
        field: &str,
        values: &[Value],
    ) -> Result<Vec<Record>, StoreError> {
        if values.len() > MEMBERSHIP_BATCH_LIMIT {
            return Err(StoreError::MembershipTooWide(values.len()));
        }

        Ok(self.read_matching(collection, |fields| {
            fields.get(field).is_some_and(|v| values.contains(v))
        }))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
        Ok(self.read_matching(collection, |_| true))
    }

    async fn insert(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut guard = self.collections.write().unwrap_or_else(|e| e.into_inner());
        guard
            .entry(collection.to_owned())
            .or_default()
            .insert(id.clone(), fields);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let mut guard = self.collections.write().unwrap_or_else(|e| e.into_inner());
        let doc = guard
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::Missing {
                collection: collection.to_owned(),
                id: id.to_owned(),
            })?;

        for (key, value) in fields {
            doc.insert(key, value);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut guard = self.collections.write().unwrap_or_else(|e| e.into_inner());
        if let Some(docs) = guard.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_insert_get_roundtrip() {
        let store = MemoryStore::new();
        let id = store
            .insert("things", fields(&[("name", json!("a")), ("n", json!(3))]))
            .await
            .unwrap();

        let record = store.get("things", &id).await.unwrap().unwrap();
        assert_eq!(record.str("name"), Some("a"));
        assert_eq!(record.i64_or("n", 0), 3);
    }

    #[tokio::test]
    async fn test_get_unknown_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("things", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_is_conjunctive() {
        let store = MemoryStore::new();
        store
            .insert("things", fields(&[("a", json!(1)), ("b", json!(1))]))
            .await
            .unwrap();
        store
            .insert("things", fields(&[("a", json!(1)), ("b", json!(2))]))
            .await
            .unwrap();

        let hits = store
            .query("things", &[("a", json!(1)), ("b", json!(2))])
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_update_overwrites_named_fields_only() {
        let store = MemoryStore::new();
        let id = store
            .insert("things", fields(&[("a", json!(1)), ("b", json!(2))]))
            .await
            .unwrap();

        store
            .update("things", &id, fields(&[("a", json!(9))]))
            .await
            .unwrap();

        let record = store.get("things", &id).await.unwrap().unwrap();
        assert_eq!(record.i64_or("a", 0), 9);
        assert_eq!(record.i64_or("b", 0), 2);
    }

    #[tokio::test]
    async fn test_update_missing_errors() {
        let store = MemoryStore::new();
        let result = store.update("things", "nope", Fields::new()).await;
        assert!(matches!(result, Err(StoreError::Missing { .. })));
    }
}
