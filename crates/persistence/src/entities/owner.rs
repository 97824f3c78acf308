//! Owner entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::Owner;
use sqlx::FromRow;

/// Database row mapping for the owners table.
#[derive(Debug, Clone, FromRow)]
pub struct OwnerEntity {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<OwnerEntity> for Owner {
    fn from(entity: OwnerEntity) -> Self {
        Self {
            id: entity.id,
            username: entity.username,
            password_hash: entity.password_hash,
            created_at: entity.created_at,
        }
    }
}
