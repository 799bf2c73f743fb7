// Category persistence

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::categories::models::Category;
use crate::error::{is_foreign_key_violation, is_unique_violation, ServiceError, ServiceResult};
use crate::pagination::Page;

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Categories ordered by name, plus the total count
    async fn list(&self, page: Page) -> ServiceResult<(Vec<Category>, u64)>;

    async fn find_by_id(&self, id: Uuid) -> ServiceResult<Option<Category>>;

    /// Case-insensitive exact match
    async fn find_by_name(&self, name: &str) -> ServiceResult<Option<Category>>;

    async fn insert(&self, name: &str) -> ServiceResult<Category>;

    async fn update(&self, id: Uuid, name: &str) -> ServiceResult<Option<Category>>;

    /// Fails with InvalidInput while events still reference the category
    async fn delete(&self, id: Uuid) -> ServiceResult<bool>;
}

#[derive(Clone)]
pub struct PgCategoryRepository {
    pool: PgPool,
}

impl PgCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_write_error(err: sqlx::Error, name: &str) -> ServiceError {
    if is_unique_violation(&err) {
        ServiceError::already_exists("Category", name)
    } else {
        ServiceError::from(err)
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn list(&self, page: Page) -> ServiceResult<(Vec<Category>, u64)> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;

        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name FROM categories ORDER BY name LIMIT $1 OFFSET $2",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((categories, total.0.max(0) as u64))
    }

    async fn find_by_id(&self, id: Uuid) -> ServiceResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    async fn find_by_name(&self, name: &str) -> ServiceResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name FROM categories WHERE LOWER(name) = LOWER($1)",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn insert(&self, name: &str) -> ServiceResult<Category> {
        sqlx::query_as::<_, Category>("INSERT INTO categories (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, name))
    }

    async fn update(&self, id: Uuid, name: &str) -> ServiceResult<Option<Category>> {
        sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, name))
    }

    async fn delete(&self, id: Uuid) -> ServiceResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    ServiceError::invalid_input("Category is still used by events")
                } else {
                    ServiceError::from(e)
                }
            })?;
        Ok(result.rows_affected() > 0)
    }
}
