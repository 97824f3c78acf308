//! Command queue repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::entities::CommandEntity;

/// Repository for the per-device command queue.
#[derive(Debug, Clone)]
pub struct CommandRepository {
    pool: PgPool,
}

impl CommandRepository {
    /// Creates a new CommandRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue a command. `payload` is ciphertext by the time it gets here.
    pub async fn create(
        &self,
        device_id: i64,
        command_type: &str,
        payload: &str,
        due_at: Option<DateTime<Utc>>,
    ) -> Result<CommandEntity, sqlx::Error> {
        sqlx::query_as::<_, CommandEntity>(
            r#"
            INSERT INTO commands (device_id, command_type, payload, due_at, is_sent)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING id, device_id, command_type, payload, due_at,
                      is_sent, failure_reason, created_at
            "#,
        )
        .bind(device_id)
        .bind(command_type)
        .bind(payload)
        .bind(due_at)
        .fetch_one(&self.pool)
        .await
    }

    /// Find a command by id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<CommandEntity>, sqlx::Error> {
        sqlx::query_as::<_, CommandEntity>(
            r#"
            SELECT id, device_id, command_type, payload, due_at,
                   is_sent, failure_reason, created_at
            FROM commands
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// All undelivered commands for a device that are due, oldest first.
    ///
    /// Due means `due_at` is null or has passed; a command whose `due_at`
    /// equals the current instant is already eligible.
    pub async fn pending_for_device(
        &self,
        device_id: i64,
    ) -> Result<Vec<CommandEntity>, sqlx::Error> {
        sqlx::query_as::<_, CommandEntity>(
            r#"
            SELECT id, device_id, command_type, payload, due_at,
                   is_sent, failure_reason, created_at
            FROM commands
            WHERE device_id = $1
              AND is_sent = FALSE
              AND (due_at IS NULL OR due_at <= NOW())
            ORDER BY created_at ASC
            "#,
        )
        .bind(device_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Mark a command delivered, compare-and-set on `is_sent`.
    ///
    /// Returns true only for the caller that actually flipped the flag; a
    /// command concurrently claimed by another poll yields false, so each
    /// command is handed out at most once.
    pub async fn mark_sent(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE commands
            SET is_sent = TRUE
            WHERE id = $1 AND is_sent = FALSE
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a failure reason and mark the command sent.
    ///
    /// Idempotent: repeat calls keep the first recorded reason (COALESCE) and
    /// never flip `is_sent` back. Returns false if the command id is unknown.
    pub async fn mark_failed(&self, id: i64, reason: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE commands
            SET is_sent = TRUE,
                failure_reason = COALESCE(failure_reason, $2)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Full command history for a device, newest first.
    pub async fn list_for_device(
        &self,
        device_id: i64,
    ) -> Result<Vec<CommandEntity>, sqlx::Error> {
        sqlx::query_as::<_, CommandEntity>(
            r#"
            SELECT id, device_id, command_type, payload, due_at,
                   is_sent, failure_reason, created_at
            FROM commands
            WHERE device_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(device_id)
        .fetch_all(&self.pool)
        .await
    }
}
