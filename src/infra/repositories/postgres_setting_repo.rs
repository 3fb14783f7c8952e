use crate::domain::{models::setting::SettingRow, ports::SettingRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

pub struct PostgresSettingRepo {
    pool: PgPool,
}

impl PostgresSettingRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl SettingRepository for PostgresSettingRepo {
    async fn all(&self) -> Result<Vec<SettingRow>, AppError> {
        sqlx::query_as::<_, SettingRow>("SELECT setting_key, setting_value FROM settings ORDER BY setting_key")
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn upsert_many(&self, pairs: &[(String, String)], updated_by: &str) -> Result<(), AppError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        for (key, value) in pairs {
            sqlx::query(
                "INSERT INTO settings (setting_key, setting_value, updated_by, updated_at) VALUES ($1, $2, $3, $4)
                 ON CONFLICT(setting_key) DO UPDATE SET
                    setting_value = excluded.setting_value,
                    updated_by = excluded.updated_by,
                    updated_at = excluded.updated_at"
            )
                .bind(key).bind(value).bind(updated_by).bind(now)
                .execute(&mut *tx).await.map_err(AppError::Database)?;
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }
}
