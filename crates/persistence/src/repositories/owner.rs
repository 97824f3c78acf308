//! Owner repository for database operations.

use sqlx::PgPool;

use crate::entities::OwnerEntity;

/// Repository for owner-related database operations.
#[derive(Debug, Clone)]
pub struct OwnerRepository {
    pool: PgPool,
}

impl OwnerRepository {
    /// Creates a new OwnerRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an owner. Fails with a unique violation if the username exists.
    pub async fn create(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<OwnerEntity, sqlx::Error> {
        sqlx::query_as::<_, OwnerEntity>(
            r#"
            INSERT INTO owners (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
    }

    /// Find an owner by username.
    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<OwnerEntity>, sqlx::Error> {
        sqlx::query_as::<_, OwnerEntity>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM owners
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    /// Find an owner by id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<OwnerEntity>, sqlx::Error> {
        sqlx::query_as::<_, OwnerEntity>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM owners
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}
