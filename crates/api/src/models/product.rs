//! Products and their images.
//!
//! A product sits under exactly one subcategory. Images are their own
//! collection keyed back to the product; at most one per product is expected
//! to carry the main flag, but the store does not enforce that, so the
//! main-image lookup tolerates zero or several flagged rows.
//!
//! Stored prices collapse to `None` unless they are finite and positive -
//! see [`meridian_core::Price::from_stored`].

use chrono::{DateTime, Utc};
use meridian_core::{Price, ProductId, ProductImageId, SubCategoryId};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::storage::{ObjectStorage, StorageError, blob_path_from_url};
use crate::store::{Collection, DocumentStore, Fields, Record, StoreError};

const PRODUCT_COLLECTION: &str = "products";
const IMAGE_COLLECTION: &str = "product_images";

/// A catalog product.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: Option<ProductId>,
    pub sub_category_id: SubCategoryId,
    pub name: String,
    pub model: Option<String>,
    pub description: Option<String>,
    pub specifications: Option<String>,
    pub price: Option<Price>,
    pub is_featured: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    #[must_use]
    pub fn new(sub_category_id: SubCategoryId, name: impl Into<String>) -> Self {
        Self {
            id: None,
            sub_category_id,
            name: name.into(),
            model: None,
            description: None,
            specifications: None,
            price: None,
            is_featured: false,
            created_at: None,
            updated_at: None,
        }
    }

    fn from_record(record: &Record) -> Result<Self, StoreError> {
        let sub_category_id =
            record
                .opt_string("sub_category_id")
                .ok_or_else(|| StoreError::Corrupt {
                    collection: PRODUCT_COLLECTION.to_owned(),
                    reason: format!("product {} has no subcategory id", record.id),
                })?;

        Ok(Self {
            id: Some(ProductId::new(record.id.clone())),
            sub_category_id: SubCategoryId::new(sub_category_id),
            name: record.string_or_empty("name"),
            model: record.opt_string("model"),
            description: record.opt_string("description"),
            specifications: record.opt_string("specifications"),
            price: Price::from_stored(record.f64("price")),
            is_featured: record.bool_or("is_featured", false),
            created_at: record.timestamp("created_at"),
            updated_at: record.timestamp("updated_at"),
        })
    }

    fn to_fields(&self) -> Fields {
        super::fields_of(json!({
            "sub_category_id": self.sub_category_id.as_str(),
            "name": self.name,
            "model": self.model,
            "description": self.description,
            "specifications": self.specifications,
            "price": self.price.map(Price::as_f64),
            "is_featured": self.is_featured,
        }))
    }
}

/// An image attached to a product.
#[derive(Debug, Clone)]
pub struct ProductImage {
    pub id: Option<ProductImageId>,
    pub product_id: ProductId,
    pub image_url: Option<String>,
    pub image_type: Option<String>,
    pub is_main: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductImage {
    #[must_use]
    pub fn new(product_id: ProductId, image_url: Option<String>, is_main: bool) -> Self {
        Self {
            id: None,
            product_id,
            image_url,
            image_type: None,
            is_main,
            created_at: None,
            updated_at: None,
        }
    }

    fn from_record(record: &Record) -> Result<Self, StoreError> {
        let product_id = record
            .opt_string("product_id")
            .ok_or_else(|| StoreError::Corrupt {
                collection: IMAGE_COLLECTION.to_owned(),
                reason: format!("image {} has no product id", record.id),
            })?;

        Ok(Self {
            id: Some(ProductImageId::new(record.id.clone())),
            product_id: ProductId::new(product_id),
            image_url: record.opt_string("image_url"),
            image_type: record.opt_string("image_type"),
            is_main: record.bool_or("is_main", false),
            created_at: record.timestamp("created_at"),
            updated_at: record.timestamp("updated_at"),
        })
    }

    fn to_fields(&self) -> Fields {
        super::fields_of(json!({
            "product_id": self.product_id.as_str(),
            "image_url": self.image_url,
            "image_type": self.image_type,
            "is_main": self.is_main,
        }))
    }
}

/// Image response shape.
#[derive(Debug, Serialize)]
pub struct ProductImageView {
    pub id: Option<ProductImageId>,
    pub product_id: ProductId,
    pub image_url: Option<String>,
    pub is_main: bool,
}

impl From<&ProductImage> for ProductImageView {
    fn from(image: &ProductImage) -> Self {
        Self {
            id: image.id.clone(),
            product_id: image.product_id.clone(),
            image_url: image.image_url.clone(),
            is_main: image.is_main,
        }
    }
}

/// Accessor for products and their images.
pub struct ProductRepository<'a> {
    storage: &'a dyn ObjectStorage,
    products: Collection<'a>,
    images: Collection<'a>,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore, storage: &'a dyn ObjectStorage) -> Self {
        Self {
            storage,
            products: Collection::new(store, PRODUCT_COLLECTION),
            images: Collection::new(store, IMAGE_COLLECTION),
        }
    }

    /// Product by id.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn get(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        let record = self.products.get(id.as_str()).await?;
        record.as_ref().map(Product::from_record).transpose()
    }

    /// Products flagged as featured.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn featured(&self) -> Result<Vec<Product>, StoreError> {
        let records = self
            .products
            .filter(&[("is_featured", json!(true))])
            .await?;
        records.iter().map(Product::from_record).collect()
    }

    /// Products filed under one subcategory.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn by_subcategory(&self, sub_id: &SubCategoryId) -> Result<Vec<Product>, StoreError> {
        let records = self
            .products
            .filter(&[("sub_category_id", json!(sub_id.as_str()))])
            .await?;
        records.iter().map(Product::from_record).collect()
    }

    /// Products filed under any of the given subcategories.
    ///
    /// Batched underneath, so the slice may be arbitrarily long.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn by_subcategories(
        &self,
        sub_ids: &[SubCategoryId],
    ) -> Result<Vec<Product>, StoreError> {
        let values: Vec<String> = sub_ids.iter().map(|id| id.as_str().to_owned()).collect();
        let records = self.products.filter_in("sub_category_id", &values).await?;
        records.iter().map(Product::from_record).collect()
    }

    /// Case-insensitive substring search over name, model, and description.
    ///
    /// The store has no text search, so this scans the whole collection. An
    /// empty query matches every product.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn search(&self, query: &str) -> Result<Vec<Product>, StoreError> {
        let needle = query.to_lowercase();
        let mut hits = Vec::new();

        for record in self.products.all().await? {
            let product = Product::from_record(&record)?;
            let haystacks = [
                Some(product.name.as_str()),
                product.model.as_deref(),
                product.description.as_deref(),
            ];
            if haystacks
                .iter()
                .flatten()
                .any(|text| text.to_lowercase().contains(&needle))
            {
                hits.push(product);
            }
        }

        Ok(hits)
    }

    /// Insert or update a product, writing the assigned id back.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn save(&self, product: &mut Product) -> Result<ProductId, StoreError> {
        let id = self
            .products
            .upsert(
                product.id.as_ref().map(ProductId::as_str),
                product.to_fields(),
            )
            .await?;
        let id = ProductId::new(id);
        product.id = Some(id.clone());
        Ok(id)
    }

    /// Delete a product and its images, blobs included.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn delete(&self, id: &ProductId) -> Result<(), StoreError> {
        for image in self.images_of(id).await? {
            if let Some(image_id) = &image.id {
                self.delete_image(image_id).await?;
            }
        }
        self.products.delete(id.as_str()).await
    }

    /// Delete every product under a subcategory. Used by category cascades.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn delete_by_subcategory(&self, sub_id: &SubCategoryId) -> Result<(), StoreError> {
        for product in self.by_subcategory(sub_id).await? {
            if let Some(product_id) = &product.id {
                self.delete(product_id).await?;
            }
        }
        Ok(())
    }

    /// All images of a product.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn images_of(&self, product_id: &ProductId) -> Result<Vec<ProductImage>, StoreError> {
        let records = self
            .images
            .filter(&[("product_id", json!(product_id.as_str()))])
            .await?;
        records.iter().map(ProductImage::from_record).collect()
    }

    /// Image by id.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn get_image(&self, id: &ProductImageId) -> Result<Option<ProductImage>, StoreError> {
        let record = self.images.get(id.as_str()).await?;
        record.as_ref().map(ProductImage::from_record).transpose()
    }

    /// The image to show for a product.
    ///
    /// Prefers a row with the main flag; otherwise falls back to whichever
    /// image the store returns first, which is unspecified.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn main_image(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<ProductImage>, StoreError> {
        let flagged = self
            .images
            .filter(&[
                ("product_id", json!(product_id.as_str())),
                ("is_main", json!(true)),
            ])
            .await?;
        if let Some(record) = flagged.first() {
            return ProductImage::from_record(record).map(Some);
        }

        let any = self
            .images
            .filter(&[("product_id", json!(product_id.as_str()))])
            .await?;
        any.first().map(ProductImage::from_record).transpose()
    }

    /// Insert or update an image row, writing the assigned id back.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn save_image(&self, image: &mut ProductImage) -> Result<ProductImageId, StoreError> {
        let id = self
            .images
            .upsert(image.id.as_ref().map(ProductImageId::as_str), image.to_fields())
            .await?;
        let id = ProductImageId::new(id);
        image.id = Some(id.clone());
        Ok(id)
    }

    /// Delete an image row and its blob.
    ///
    /// The blob goes first; a blob failure is logged and the row delete
    /// proceeds, so the row never outlives a half-failed cascade.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn delete_image(&self, id: &ProductImageId) -> Result<(), StoreError> {
        if let Some(record) = self.images.get(id.as_str()).await? {
            let image = ProductImage::from_record(&record)?;
            if let Some(url) = &image.image_url {
                let path = blob_path_from_url(url);
                if let Err(error) = self.storage.delete(&path).await {
                    tracing::warn!(image_id = %id, %error, "image blob delete failed, removing row anyway");
                }
            }
        }
        self.images.delete(id.as_str()).await
    }

    /// Upload image bytes for a product and return the stored URL.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn upload_image_bytes(
        &self,
        product_id: &ProductId,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let path = format!("products/{product_id}/{}.jpg", Uuid::new_v4());
        self.storage.upload(&path, bytes, content_type).await
    }
}
