//! Category management and the paginated thread listing of a category.

use std::sync::Arc;

use async_trait::async_trait;
use domains::naming::category_key;
use domains::{
    Anchor, Category, CategoryPage, CategoryRepository, DomainError, Result, Thread,
    ThreadRepository, ThreadScope,
};
use uuid::Uuid;

use crate::windowing::{fetch_window, OrdinalSource, PageLimits};

/// Threads of one scope, most recent activity first.
struct ThreadsInScope<'a> {
    threads: &'a dyn ThreadRepository,
    scope: ThreadScope,
}

#[async_trait]
impl OrdinalSource for ThreadsInScope<'_> {
    type Item = Thread;

    async fn total(&self) -> Result<u64> {
        self.threads.count(self.scope).await
    }

    async fn slice(&self, from: u64, limit: u64) -> Result<Vec<Thread>> {
        self.threads.slice(self.scope, from, limit).await
    }
}

pub struct CategoryService {
    categories: Arc<dyn CategoryRepository>,
    threads: Arc<dyn ThreadRepository>,
    limits: PageLimits,
}

impl CategoryService {
    pub fn new(
        categories: Arc<dyn CategoryRepository>,
        threads: Arc<dyn ThreadRepository>,
        limits: PageLimits,
    ) -> Self {
        Self {
            categories,
            threads,
            limits,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn create(&self, name: Option<&str>, color: Option<&str>) -> Result<Category> {
        let category = Category::new(name, color)?;
        if self.categories.find_by_key(&category.key).await?.is_some() {
            return Err(DomainError::CategoryAlreadyExists);
        }
        let category = self.categories.insert(category).await?;
        tracing::info!(category_id = %category.id, key = %category.key, "category created");
        Ok(category)
    }

    pub async fn list(&self) -> Result<Vec<Category>> {
        self.categories.list().await
    }

    /// Case-insensitive lookup by name or key.
    pub async fn resolve(&self, name: &str) -> Result<Category> {
        self.categories
            .find_by_key(&category_key(name))
            .await?
            .ok_or(DomainError::InvalidCategory)
    }

    /// One window of the threads in `name`, or of every thread for `ALL`.
    #[tracing::instrument(skip(self))]
    pub async fn threads(
        &self,
        name: &str,
        anchor: Anchor,
        limit: Option<i64>,
    ) -> Result<CategoryPage> {
        let limit = self.limits.resolve(limit)?;
        let (category, scope) = if category_key(name) == Category::ALL_KEY {
            (None, ThreadScope::All)
        } else {
            let category = self.resolve(name).await?;
            let scope = ThreadScope::Category(category.id);
            (Some(category), scope)
        };

        let source = ThreadsInScope {
            threads: self.threads.as_ref(),
            scope,
        };
        let window = fetch_window(&source, anchor, limit).await?;

        Ok(CategoryPage {
            category,
            threads: window.items,
            meta: window.meta.into(),
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        name: Option<&str>,
        color: Option<&str>,
    ) -> Result<Category> {
        let current = self.find(id).await?;
        let updated = current.renamed(name, color)?;
        if updated.key != current.key {
            if let Some(existing) = self.categories.find_by_key(&updated.key).await? {
                if existing.id != id {
                    return Err(DomainError::CategoryAlreadyExists);
                }
            }
        }
        self.categories.update(updated).await
    }

    /// Deletes a category, moving its threads into the fallback category.
    /// Returns the number of threads moved.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<u64> {
        let category = self.find(id).await?;
        if category.is_fallback() {
            return Err(DomainError::invalid_parameter(
                "id",
                "cannot delete the fallback category",
            ));
        }

        let fallback = self.fallback().await?;
        let moved = self.categories.delete_reassigning(category.id, fallback.id).await?;
        tracing::info!(category_id = %id, fallback_id = %fallback.id, moved, "category deleted");
        Ok(moved)
    }

    async fn find(&self, id: Uuid) -> Result<Category> {
        self.categories
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::invalid_parameter("id", "category does not exist"))
    }

    async fn fallback(&self) -> Result<Category> {
        let key = category_key(Category::FALLBACK_NAME);
        if let Some(category) = self.categories.find_by_key(&key).await? {
            return Ok(category);
        }
        match self
            .categories
            .insert(Category::new(Some(Category::FALLBACK_NAME), None)?)
            .await
        {
            Ok(category) => Ok(category),
            // Another request created it first.
            Err(DomainError::CategoryAlreadyExists) => self
                .categories
                .find_by_key(&key)
                .await?
                .ok_or_else(|| DomainError::not_found("category", key)),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockCategoryRepository, MockThreadRepository};

    fn service(categories: MockCategoryRepository, threads: MockThreadRepository) -> CategoryService {
        CategoryService::new(Arc::new(categories), Arc::new(threads), PageLimits::default())
    }

    #[tokio::test]
    async fn duplicate_key_is_rejected_before_insert() {
        let mut categories = MockCategoryRepository::new();
        categories
            .expect_find_by_key()
            .returning(|_| Ok(Some(Category::new(Some("category"), None).unwrap())));
        categories.expect_insert().never();

        let err = service(categories, MockThreadRepository::new())
            .create(Some("CATEGORY"), None)
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::CategoryAlreadyExists);
    }

    #[tokio::test]
    async fn unknown_category_listing() {
        let mut categories = MockCategoryRepository::new();
        categories.expect_find_by_key().returning(|_| Ok(None));
        let mut threads = MockThreadRepository::new();
        threads.expect_count().never();

        let err = service(categories, threads)
            .threads("non-existent", Anchor::From(0), None)
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::InvalidCategory);
    }

    #[tokio::test]
    async fn all_listing_skips_category_lookup() {
        let mut categories = MockCategoryRepository::new();
        categories.expect_find_by_key().never();
        let mut threads = MockThreadRepository::new();
        threads
            .expect_count()
            .withf(|scope| *scope == ThreadScope::All)
            .returning(|_| Ok(0));
        threads.expect_slice().never();

        let page = service(categories, threads)
            .threads("all", Anchor::From(0), None)
            .await
            .unwrap();
        assert!(page.category.is_none());
        assert!(page.threads.is_empty());
        assert_eq!(page.meta.next_url, None);
    }

    #[tokio::test]
    async fn fallback_cannot_be_deleted() {
        let other = Category::new(Some("Other"), None).unwrap();
        let id = other.id;
        let mut categories = MockCategoryRepository::new();
        categories
            .expect_find_by_id()
            .returning(move |_| Ok(Some(other.clone())));
        categories.expect_delete_reassigning().never();

        let err = service(categories, MockThreadRepository::new())
            .delete(id)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::invalid_parameter("id", "cannot delete the fallback category")
        );
    }
}
