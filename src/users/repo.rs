use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::StoreError;
use crate::users::repo_types::{User, UserChanges};

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with `StoreError::Duplicate` when the username is taken.
    async fn insert(
        &self,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;
    /// All users ordered by username.
    async fn list(&self) -> Result<Vec<User>, StoreError>;
    /// Returns false when no row has this id.
    async fn update(&self, id: i64, changes: &UserChanges) -> Result<bool, StoreError>;
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
    async fn touch_last_login(&self, id: i64) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn insert(
        &self,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, is_admin)
            VALUES ($1, $2, $3)
            RETURNING id, username, password_hash, is_admin, created_at, last_login
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(is_admin)
        .fetch_one(&self.db)
        .await
        .map_err(|e| StoreError::on_write(e, "username"))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, is_admin, created_at, last_login
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, is_admin, created_at, last_login
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, is_admin, created_at, last_login
            FROM users
            ORDER BY username
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn update(&self, id: i64, changes: &UserChanges) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
               SET username = COALESCE($2, username),
                   password_hash = COALESCE($3, password_hash),
                   is_admin = COALESCE($4, is_admin)
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.username.as_deref())
        .bind(changes.password_hash.as_deref())
        .bind(changes.is_admin)
        .execute(&self.db)
        .await
        .map_err(|e| StoreError::on_write(e, "username"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn touch_last_login(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
