use crate::domain::{
    models::user::{User, UserFilter, UserRole, UserStatus, UserSummary},
    ports::UserRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

pub struct SqliteUserRepo {
    pool: SqlitePool,
}

impl SqliteUserRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepo {
    async fn create(&self, user: &User) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, first_name, last_name, email, phone, password_hash, role, status, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&user.id).bind(&user.first_name).bind(&user.last_name).bind(&user.email)
            .bind(&user.phone).bind(&user.password_hash).bind(user.role.as_str()).bind(user.status.as_str())
            .bind(&user.created_by).bind(user.created_at).bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER(?)")
            .bind(email.trim())
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn email_taken(&self, email: &str, exclude_id: Option<&str>) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE LOWER(email) = LOWER(?) AND id != COALESCE(?, '')"
        )
            .bind(email.trim())
            .bind(exclude_id)
            .fetch_one(&self.pool).await.map_err(AppError::Database)?;
        Ok(count > 0)
    }

    async fn update_profile(&self, user: &User) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET first_name = ?, last_name = ?, email = ?, phone = ?, updated_at = ?
             WHERE id = ?
             RETURNING *"
        )
            .bind(&user.first_name).bind(&user.last_name).bind(&user.email).bind(&user.phone)
            .bind(Utc::now()).bind(&user.id)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash).bind(Utc::now()).bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn update_status(&self, id: &str, status: UserStatus) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET status = ?, updated_at = ? WHERE id = ? AND role != 'admin'")
            .bind(status.as_str()).bind(Utc::now()).bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_by_role(&self, role: UserRole) -> Result<i64, AppError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role.as_str())
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_with_stats(&self, filter: &UserFilter) -> Result<Vec<UserSummary>, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT u.*,
                    COUNT(b.id) AS booking_count,
                    COALESCE(SUM(CASE WHEN b.status = 'confirmed' THEN b.total_cents ELSE 0 END), 0) AS total_spent,
                    MAX(b.created_at) AS last_booking_at
             FROM users u
             LEFT JOIN bookings b ON b.user_id = u.id
             WHERE 1 = 1"
        );
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            qb.push(" AND (u.first_name LIKE ").push_bind(pattern.clone())
                .push(" OR u.last_name LIKE ").push_bind(pattern.clone())
                .push(" OR u.email LIKE ").push_bind(pattern)
                .push(")");
        }
        if let Some(role) = filter.role {
            qb.push(" AND u.role = ").push_bind(role.as_str());
        }
        if let Some(status) = filter.status {
            qb.push(" AND u.status = ").push_bind(status.as_str());
        }
        if let Some(from) = filter.created_from {
            qb.push(" AND u.created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.created_to {
            qb.push(" AND u.created_at < ").push_bind(to);
        }
        qb.push(" GROUP BY u.id ORDER BY u.created_at DESC");

        qb.build_query_as::<UserSummary>()
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}
