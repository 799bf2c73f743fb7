// Category business logic

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::categories::models::{CategoryRequest, CategoryResponse};
use crate::categories::repository::CategoryRepository;
use crate::error::{ServiceError, ServiceResult};
use crate::pagination::{PagedList, PaginationParams};

pub struct CategoryService {
    categories: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoryRepository>) -> Self {
        Self { categories }
    }

    pub async fn list(
        &self,
        pagination: PaginationParams,
    ) -> ServiceResult<PagedList<CategoryResponse>> {
        let page = pagination.normalize();
        let (categories, total) = self.categories.list(page).await?;
        debug!("Listed {} of {} categories", categories.len(), total);
        Ok(PagedList::new(categories, page, total).map(CategoryResponse::from))
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<CategoryResponse> {
        self.categories
            .find_by_id(id)
            .await?
            .map(CategoryResponse::from)
            .ok_or_else(|| ServiceError::not_found("Category", id))
    }

    pub async fn create(&self, request: CategoryRequest) -> ServiceResult<CategoryResponse> {
        request.validate()?;
        let name = request.name.trim();

        if self.categories.find_by_name(name).await?.is_some() {
            warn!("Attempt to create duplicate category: {}", name);
            return Err(ServiceError::already_exists("Category", name));
        }

        let category = self.categories.insert(name).await?;
        info!("Created category {}", category.id);
        Ok(category.into())
    }

    pub async fn update(&self, id: Uuid, request: CategoryRequest) -> ServiceResult<CategoryResponse> {
        request.validate()?;
        let name = request.name.trim();

        let existing = self
            .categories
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Category", id))?;

        if existing.name == name {
            return Ok(existing.into());
        }

        if let Some(other) = self.categories.find_by_name(name).await? {
            if other.id != id {
                warn!("Attempt to rename category {} to existing name {}", id, name);
                return Err(ServiceError::already_exists("Category", name));
            }
        }

        let category = self
            .categories
            .update(id, name)
            .await?
            .ok_or_else(|| ServiceError::not_found("Category", id))?;
        info!("Updated category {}", id);
        Ok(category.into())
    }

    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        if self.categories.find_by_id(id).await?.is_none() {
            return Err(ServiceError::not_found("Category", id));
        }
        if !self.categories.delete(id).await? {
            return Err(ServiceError::not_found("Category", id));
        }
        info!("Deleted category {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{seed_event, InMemoryStore};

    fn service(store: &Arc<InMemoryStore>) -> CategoryService {
        CategoryService::new(store.clone())
    }

    fn request(name: &str) -> CategoryRequest {
        CategoryRequest {
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(&store);

        let created = service.create(request("  Concerts ")).await.unwrap();
        assert_eq!(created.name, "Concerts");
        assert_eq!(service.get(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts_case_insensitively() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(&store);
        service.create(request("Concerts")).await.unwrap();

        let err = service.create(request("concerts")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_update_rules() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(&store);
        let concerts = service.create(request("Concerts")).await.unwrap();
        service.create(request("Sports")).await.unwrap();

        // Unchanged name is a no-op
        assert_eq!(
            service.update(concerts.id, request("Concerts")).await.unwrap(),
            concerts
        );

        let err = service
            .update(concerts.id, request("Sports"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        let renamed = service.update(concerts.id, request("Music")).await.unwrap();
        assert_eq!(renamed.name, "Music");

        let err = service
            .update(Uuid::new_v4(), request("Other"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RecordNotFound);
    }

    #[tokio::test]
    async fn test_delete_in_use_category_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(&store);
        let category = service.create(request("Concerts")).await.unwrap();
        seed_event(&store, category.id, 10).await;

        let err = service.delete(category.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_delete_missing_category() {
        let store = Arc::new(InMemoryStore::new());
        let err = service(&store).delete(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RecordNotFound);
        assert_eq!(err.message().split(' ').next(), Some("Category"));
    }

    #[tokio::test]
    async fn test_list_is_paged() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(&store);
        for name in ["B", "A", "C"] {
            service.create(request(name)).await.unwrap();
        }

        let page = service.list(PaginationParams::new(1, 2)).await.unwrap();
        let names: Vec<_> = page.items.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(page.total_items, 3);
        assert!(page.has_next);
    }
}
