use crate::domain::{
    models::category::{Category, CategoryCount},
    ports::CategoryRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

pub struct SqliteCategoryRepo {
    pool: SqlitePool,
}

impl SqliteCategoryRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for SqliteCategoryRepo {
    async fn create(&self, category: &Category) -> Result<Category, AppError> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (id, name, created_at) VALUES (?, ?, ?) RETURNING *"
        )
            .bind(&category.id).bind(&category.name).bind(category.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Category>, AppError> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list(&self) -> Result<Vec<Category>, AppError> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name ASC")
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_with_counts(&self, upcoming_from: Option<DateTime<Utc>>) -> Result<Vec<CategoryCount>, AppError> {
        match upcoming_from {
            Some(from) => sqlx::query_as::<_, CategoryCount>(
                "SELECT c.id, c.name, COUNT(e.id) AS event_count
                 FROM categories c
                 JOIN events e ON e.category_id = c.id AND e.status = 'published' AND e.start_at >= ?
                 GROUP BY c.id, c.name
                 HAVING COUNT(e.id) > 0
                 ORDER BY c.name ASC"
            )
                .bind(from)
                .fetch_all(&self.pool).await.map_err(AppError::Database),
            None => sqlx::query_as::<_, CategoryCount>(
                "SELECT c.id, c.name, COUNT(e.id) AS event_count
                 FROM categories c
                 LEFT JOIN events e ON e.category_id = c.id
                 GROUP BY c.id, c.name
                 ORDER BY c.name ASC"
            )
                .fetch_all(&self.pool).await.map_err(AppError::Database),
        }
    }
}
