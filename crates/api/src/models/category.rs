//! Category tree: main categories and their subcategories.
//!
//! Two levels only. Subcategories reference their parent by id; the store
//! does not check the reference, so a subcategory pointing at a deleted main
//! category is possible and simply never shows up in tree listings.
//!
//! Deletes cascade downward: removing a main category removes its
//! subcategories, and removing a subcategory removes the products (and
//! product images, blobs included) filed under it.

use chrono::{DateTime, Utc};
use meridian_core::{MainCategoryId, SubCategoryId};
use serde::Serialize;
use serde_json::json;

use crate::storage::ObjectStorage;
use crate::store::{Collection, DocumentStore, Fields, Record, StoreError};

use super::product::ProductRepository;

const MAIN_COLLECTION: &str = "main_categories";
const SUB_COLLECTION: &str = "sub_categories";

/// Top-level category.
#[derive(Debug, Clone)]
pub struct MainCategory {
    pub id: Option<MainCategoryId>,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MainCategory {
    #[must_use]
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description,
            created_at: None,
            updated_at: None,
        }
    }

    fn from_record(record: &Record) -> Self {
        Self {
            id: Some(MainCategoryId::new(record.id.clone())),
            name: record.string_or_empty("name"),
            description: record.opt_string("description"),
            created_at: record.timestamp("created_at"),
            updated_at: record.timestamp("updated_at"),
        }
    }

    fn to_fields(&self) -> Fields {
        super::fields_of(json!({
            "name": self.name,
            "description": self.description,
        }))
    }
}

/// Second-level category, filed under a [`MainCategory`].
#[derive(Debug, Clone)]
pub struct SubCategory {
    pub id: Option<SubCategoryId>,
    pub main_category_id: MainCategoryId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SubCategory {
    #[must_use]
    pub fn new(
        main_category_id: MainCategoryId,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            id: None,
            main_category_id,
            name: name.into(),
            description,
            created_at: None,
            updated_at: None,
        }
    }

    fn from_record(record: &Record) -> Result<Self, StoreError> {
        let parent = record
            .opt_string("main_category_id")
            .ok_or_else(|| StoreError::Corrupt {
                collection: SUB_COLLECTION.to_owned(),
                reason: format!("subcategory {} has no parent id", record.id),
            })?;

        Ok(Self {
            id: Some(SubCategoryId::new(record.id.clone())),
            main_category_id: MainCategoryId::new(parent),
            name: record.string_or_empty("name"),
            description: record.opt_string("description"),
            created_at: record.timestamp("created_at"),
            updated_at: record.timestamp("updated_at"),
        })
    }

    fn to_fields(&self) -> Fields {
        super::fields_of(json!({
            "main_category_id": self.main_category_id.as_str(),
            "name": self.name,
            "description": self.description,
        }))
    }
}

/// A main category with its subcategories, as served by the tree listing.
#[derive(Debug, Serialize)]
pub struct CategoryTreeNode {
    pub id: Option<MainCategoryId>,
    pub name: String,
    pub description: Option<String>,
    pub subcategories: Vec<SubCategoryView>,
}

/// Subcategory response shape.
#[derive(Debug, Serialize)]
pub struct SubCategoryView {
    pub id: Option<SubCategoryId>,
    pub main_category_id: MainCategoryId,
    pub name: String,
    pub description: Option<String>,
}

impl From<&SubCategory> for SubCategoryView {
    fn from(sub: &SubCategory) -> Self {
        Self {
            id: sub.id.clone(),
            main_category_id: sub.main_category_id.clone(),
            name: sub.name.clone(),
            description: sub.description.clone(),
        }
    }
}

/// Accessor for both category collections.
pub struct CategoryRepository<'a> {
    store: &'a dyn DocumentStore,
    storage: &'a dyn ObjectStorage,
    main: Collection<'a>,
    sub: Collection<'a>,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore, storage: &'a dyn ObjectStorage) -> Self {
        Self {
            store,
            storage,
            main: Collection::new(store, MAIN_COLLECTION),
            sub: Collection::new(store, SUB_COLLECTION),
        }
    }

    /// Every main category.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn all_main(&self) -> Result<Vec<MainCategory>, StoreError> {
        let records = self.main.all().await?;
        Ok(records.iter().map(MainCategory::from_record).collect())
    }

    /// Main category by id.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn get_main(&self, id: &MainCategoryId) -> Result<Option<MainCategory>, StoreError> {
        let record = self.main.get(id.as_str()).await?;
        Ok(record.as_ref().map(MainCategory::from_record))
    }

    /// Subcategory by id.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn get_sub(&self, id: &SubCategoryId) -> Result<Option<SubCategory>, StoreError> {
        let record = self.sub.get(id.as_str()).await?;
        record.as_ref().map(SubCategory::from_record).transpose()
    }

    /// Subcategories filed under one main category.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn subcategories_of(
        &self,
        main_id: &MainCategoryId,
    ) -> Result<Vec<SubCategory>, StoreError> {
        let records = self
            .sub
            .filter(&[("main_category_id", json!(main_id.as_str()))])
            .await?;
        records.iter().map(SubCategory::from_record).collect()
    }

    /// The full two-level tree: every main category with its subcategories.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn tree(&self) -> Result<Vec<CategoryTreeNode>, StoreError> {
        let mains = self.all_main().await?;
        let mut nodes = Vec::with_capacity(mains.len());

        for main in mains {
            let subs = match &main.id {
                Some(id) => self.subcategories_of(id).await?,
                None => Vec::new(),
            };
            nodes.push(CategoryTreeNode {
                id: main.id,
                name: main.name,
                description: main.description,
                subcategories: subs.iter().map(SubCategoryView::from).collect(),
            });
        }

        Ok(nodes)
    }

    /// Insert or update a main category, writing the assigned id back.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn save_main(&self, category: &mut MainCategory) -> Result<MainCategoryId, StoreError> {
        let id = self
            .main
            .upsert(
                category.id.as_ref().map(MainCategoryId::as_str),
                category.to_fields(),
            )
            .await?;
        let id = MainCategoryId::new(id);
        category.id = Some(id.clone());
        Ok(id)
    }

    /// Insert or update a subcategory, writing the assigned id back.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn save_sub(&self, category: &mut SubCategory) -> Result<SubCategoryId, StoreError> {
        let id = self
            .sub
            .upsert(
                category.id.as_ref().map(SubCategoryId::as_str),
                category.to_fields(),
            )
            .await?;
        let id = SubCategoryId::new(id);
        category.id = Some(id.clone());
        Ok(id)
    }

    /// Delete a main category and everything under it.
    ///
    /// Subcategories go first (each cascading into its products), then the
    /// main category row. A failure partway leaves the remaining children in
    /// place; rerunning the delete finishes the job.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn delete_main(&self, id: &MainCategoryId) -> Result<(), StoreError> {
        for sub in self.subcategories_of(id).await? {
            if let Some(sub_id) = &sub.id {
                self.delete_sub(sub_id).await?;
            }
        }
        self.main.delete(id.as_str()).await
    }

    /// Delete a subcategory and the products filed under it.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn delete_sub(&self, id: &SubCategoryId) -> Result<(), StoreError> {
        let products = ProductRepository::new(self.store, self.storage);
        products.delete_by_subcategory(id).await?;
        self.sub.delete(id.as_str()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::storage::memory::MemoryStorage;
    use crate::store::memory::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_tree_groups_subcategories_under_parent() {
        let store = MemoryStore::new();
        let storage = MemoryStorage::new();
        let repo = CategoryRepository::new(&store, &storage);

        let mut tools = MainCategory::new("Tools", None);
        let tools_id = repo.save_main(&mut tools).await.unwrap();
        let mut garden = MainCategory::new("Garden", None);
        let garden_id = repo.save_main(&mut garden).await.unwrap();

        let mut drills = SubCategory::new(tools_id.clone(), "Drills", None);
        repo.save_sub(&mut drills).await.unwrap();
        let mut saws = SubCategory::new(tools_id.clone(), "Saws", None);
        repo.save_sub(&mut saws).await.unwrap();

        let tree = repo.tree().await.unwrap();
        assert_eq!(tree.len(), 2);

        let tools_node = tree
            .iter()
            .find(|n| n.id.as_ref() == Some(&tools_id))
            .unwrap();
        assert_eq!(tools_node.subcategories.len(), 2);

        let garden_node = tree
            .iter()
            .find(|n| n.id.as_ref() == Some(&garden_id))
            .unwrap();
        assert!(garden_node.subcategories.is_empty());
    }

    #[tokio::test]
    async fn test_delete_main_cascades_into_subcategories() {
        let store = MemoryStore::new();
        let storage = MemoryStorage::new();
        let repo = CategoryRepository::new(&store, &storage);

        let mut main = MainCategory::new("Tools", None);
        let main_id = repo.save_main(&mut main).await.unwrap();
        let mut sub = SubCategory::new(main_id.clone(), "Drills", None);
        let sub_id = repo.save_sub(&mut sub).await.unwrap();

        repo.delete_main(&main_id).await.unwrap();

        assert!(repo.get_main(&main_id).await.unwrap().is_none());
        assert!(repo.get_sub(&sub_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        let storage = MemoryStorage::new();
        let repo = CategoryRepository::new(&store, &storage);

        let id = MainCategoryId::new("never-existed");
        assert!(repo.delete_main(&id).await.is_ok());
    }
}
