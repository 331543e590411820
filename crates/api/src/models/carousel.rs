//! Homepage carousel entries.
//!
//! Each entry is a banner image with an optional link. The public listing
//! only serves active entries, sorted by `order_num`; the store cannot order
//! for us, so sorting happens after the read.

use chrono::{DateTime, Utc};
use meridian_core::CarouselId;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::storage::{ObjectStorage, StorageError, blob_path_from_url};
use crate::store::{Collection, DocumentStore, Fields, Record, StoreError};

const COLLECTION: &str = "carousels";

/// One carousel entry.
#[derive(Debug, Clone)]
pub struct Carousel {
    pub id: Option<CarouselId>,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    /// Position in the rotation, ascending.
    pub order_num: i64,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Carousel {
    #[must_use]
    pub fn new(title: impl Into<String>, order_num: i64) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: None,
            image_url: None,
            link_url: None,
            order_num,
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    fn from_record(record: &Record) -> Self {
        Self {
            id: Some(CarouselId::new(record.id.clone())),
            title: record.string_or_empty("title"),
            description: record.opt_string("description"),
            image_url: record.opt_string("image_url"),
            link_url: record.opt_string("link_url"),
            order_num: record.i64_or("order_num", 0),
            is_active: record.bool_or("is_active", false),
            created_at: record.timestamp("created_at"),
            updated_at: record.timestamp("updated_at"),
        }
    }

    fn to_fields(&self) -> Fields {
        super::fields_of(json!({
            "title": self.title,
            "description": self.description,
            "image_url": self.image_url,
            "link_url": self.link_url,
            "order_num": self.order_num,
            "is_active": self.is_active,
        }))
    }

    /// Listing shape.
    #[must_use]
    pub fn view(&self) -> CarouselView {
        CarouselView {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            image_url: self.image_url.clone(),
            link_url: self.link_url.clone(),
            order_num: self.order_num,
        }
    }
}

/// Carousel response shape.
#[derive(Debug, Serialize)]
pub struct CarouselView {
    pub id: Option<CarouselId>,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub order_num: i64,
}

/// Accessor for the `carousels` collection.
pub struct CarouselRepository<'a> {
    storage: &'a dyn ObjectStorage,
    carousels: Collection<'a>,
}

impl<'a> CarouselRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore, storage: &'a dyn ObjectStorage) -> Self {
        Self {
            storage,
            carousels: Collection::new(store, COLLECTION),
        }
    }

    /// Entry by id.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn get(&self, id: &CarouselId) -> Result<Option<Carousel>, StoreError> {
        let record = self.carousels.get(id.as_str()).await?;
        Ok(record.as_ref().map(Carousel::from_record))
    }

    /// Active entries in rotation order.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn active_ordered(&self) -> Result<Vec<Carousel>, StoreError> {
        let records = self.carousels.filter(&[("is_active", json!(true))]).await?;
        let mut entries: Vec<Carousel> = records.iter().map(Carousel::from_record).collect();
        entries.sort_by_key(|entry| entry.order_num);
        Ok(entries)
    }

    /// Insert or update, writing the assigned id back.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn save(&self, carousel: &mut Carousel) -> Result<CarouselId, StoreError> {
        let id = self
            .carousels
            .upsert(
                carousel.id.as_ref().map(CarouselId::as_str),
                carousel.to_fields(),
            )
            .await?;
        let id = CarouselId::new(id);
        carousel.id = Some(id.clone());
        Ok(id)
    }

    /// Delete an entry and its banner blob.
    ///
    /// The blob goes first; a blob failure is logged and the row delete
    /// proceeds.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn delete(&self, id: &CarouselId) -> Result<(), StoreError> {
        if let Some(record) = self.carousels.get(id.as_str()).await? {
            let carousel = Carousel::from_record(&record);
            if let Some(url) = &carousel.image_url {
                let path = blob_path_from_url(url);
                if let Err(error) = self.storage.delete(&path).await {
                    tracing::warn!(carousel_id = %id, %error, "carousel blob delete failed, removing row anyway");
                }
            }
        }
        self.carousels.delete(id.as_str()).await
    }

    /// Upload banner bytes and return the stored URL.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn upload_image_bytes(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let path = format!("carousels/{}.jpg", Uuid::new_v4());
        self.storage.upload(&path, bytes, content_type).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::storage::memory::MemoryStorage;
    use crate::store::memory::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_active_ordered_sorts_and_filters() {
        let store = MemoryStore::new();
        let storage = MemoryStorage::new();
        let repo = CarouselRepository::new(&store, &storage);

        let mut second = Carousel::new("Second", 2);
        repo.save(&mut second).await.unwrap();
        let mut first = Carousel::new("First", 1);
        repo.save(&mut first).await.unwrap();
        let mut hidden = Carousel::new("Hidden", 0);
        hidden.is_active = false;
        repo.save(&mut hidden).await.unwrap();

        let entries = repo.active_ordered().await.unwrap();
        let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["First", "Second"]);
    }

    #[tokio::test]
    async fn test_delete_removes_banner_blob() {
        let store = MemoryStore::new();
        let storage = MemoryStorage::new();
        let repo = CarouselRepository::new(&store, &storage);

        let url = repo
            .upload_image_bytes(vec![1, 2], "image/jpeg")
            .await
            .unwrap();
        let mut entry = Carousel::new("Banner", 1);
        entry.image_url = Some(url);
        let id = repo.save(&mut entry).await.unwrap();

        repo.delete(&id).await.unwrap();

        assert!(repo.get(&id).await.unwrap().is_none());
        assert!(storage.is_empty());
    }
}
