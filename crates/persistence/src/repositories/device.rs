//! Device repository for database operations.

use chrono::Utc;
use sqlx::PgPool;

use crate::entities::DeviceEntity;

/// Repository for device-related database operations.
#[derive(Debug, Clone)]
pub struct DeviceRepository {
    pool: PgPool,
}

impl DeviceRepository {
    /// Creates a new DeviceRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a device in the pending state with a fresh registration token.
    pub async fn create_pending(
        &self,
        owner_id: i64,
        name: &str,
        registration_token: &str,
    ) -> Result<DeviceEntity, sqlx::Error> {
        sqlx::query_as::<_, DeviceEntity>(
            r#"
            INSERT INTO devices (name, owner_id, registration_token, is_active)
            VALUES ($1, $2, $3, FALSE)
            RETURNING id, name, owner_id, registration_token, public_key,
                      is_active, last_check_in, created_at
            "#,
        )
        .bind(name)
        .bind(owner_id)
        .bind(registration_token)
        .fetch_one(&self.pool)
        .await
    }

    /// Redeem a registration token, activating the device.
    ///
    /// The whole transition is one conditional UPDATE keyed on the token, so
    /// two concurrent activations with the same token cannot both succeed:
    /// the first consumes the token, the second matches no row and gets
    /// `None`.
    pub async fn activate(
        &self,
        token: &str,
        public_key: &str,
        name: &str,
    ) -> Result<Option<DeviceEntity>, sqlx::Error> {
        sqlx::query_as::<_, DeviceEntity>(
            r#"
            UPDATE devices
            SET public_key = $2,
                is_active = TRUE,
                registration_token = NULL,
                name = $3
            WHERE registration_token = $1 AND is_active = FALSE
            RETURNING id, name, owner_id, registration_token, public_key,
                      is_active, last_check_in, created_at
            "#,
        )
        .bind(token)
        .bind(public_key)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
    }

    /// Find a device by id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<DeviceEntity>, sqlx::Error> {
        sqlx::query_as::<_, DeviceEntity>(
            r#"
            SELECT id, name, owner_id, registration_token, public_key,
                   is_active, last_check_in, created_at
            FROM devices
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Find all devices belonging to an owner, sorted by name.
    pub async fn find_by_owner(&self, owner_id: i64) -> Result<Vec<DeviceEntity>, sqlx::Error> {
        sqlx::query_as::<_, DeviceEntity>(
            r#"
            SELECT id, name, owner_id, registration_token, public_key,
                   is_active, last_check_in, created_at
            FROM devices
            WHERE owner_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Record a device check-in for liveness display.
    /// Returns the number of rows affected (0 if the device does not exist).
    pub async fn update_last_check_in(&self, device_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE devices
            SET last_check_in = $2
            WHERE id = $1
            "#,
        )
        .bind(device_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete a device owned by the given owner.
    /// Queued commands go with it via ON DELETE CASCADE.
    /// Returns the number of rows deleted (0 if not found or not owned).
    pub async fn delete(&self, device_id: i64, owner_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM devices
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(device_id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
