//! Device entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::Device;
use sqlx::FromRow;

/// Database row mapping for the devices table.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceEntity {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub registration_token: Option<String>,
    pub public_key: Option<String>,
    pub is_active: bool,
    pub last_check_in: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<DeviceEntity> for Device {
    fn from(entity: DeviceEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            owner_id: entity.owner_id,
            registration_token: entity.registration_token,
            public_key: entity.public_key,
            is_active: entity.is_active,
            last_check_in: entity.last_check_in,
            created_at: entity.created_at,
        }
    }
}
