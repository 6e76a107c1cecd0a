use async_trait::async_trait;
use sqlx::PgPool;

use crate::api_keys::repo_types::ApiKey;
use crate::error::StoreError;

#[async_trait]
pub trait ApiKeyRepo: Send + Sync {
    /// Fails with `StoreError::Duplicate` when the key string already exists.
    async fn insert(
        &self,
        label: Option<&str>,
        key: &str,
        administrator: bool,
    ) -> Result<ApiKey, StoreError>;
    /// All keys ordered by id.
    async fn list(&self) -> Result<Vec<ApiKey>, StoreError>;
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgApiKeyRepo {
    db: PgPool,
}

impl PgApiKeyRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ApiKeyRepo for PgApiKeyRepo {
    async fn insert(
        &self,
        label: Option<&str>,
        key: &str,
        administrator: bool,
    ) -> Result<ApiKey, StoreError> {
        sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys (label, key, administrator)
            VALUES ($1, $2, $3)
            RETURNING id, label, key, administrator, created_at
            "#,
        )
        .bind(label)
        .bind(key)
        .bind(administrator)
        .fetch_one(&self.db)
        .await
        .map_err(|e| StoreError::on_write(e, "API key"))
    }

    async fn list(&self) -> Result<Vec<ApiKey>, StoreError> {
        let keys = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, label, key, administrator, created_at
            FROM api_keys
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(keys)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
