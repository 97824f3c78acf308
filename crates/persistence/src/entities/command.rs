//! Command entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Command, UnknownCommandType};
use sqlx::FromRow;

/// Database row mapping for the commands table.
///
/// `command_type` stays a raw string at this layer; the conversion into
/// [`domain::models::CommandType`] is the only fallible step.
#[derive(Debug, Clone, FromRow)]
pub struct CommandEntity {
    pub id: i64,
    pub device_id: i64,
    pub command_type: String,
    pub payload: String,
    pub due_at: Option<DateTime<Utc>>,
    pub is_sent: bool,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CommandEntity> for Command {
    type Error = UnknownCommandType;

    fn try_from(entity: CommandEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            device_id: entity.device_id,
            command_type: entity.command_type.parse()?,
            payload: entity.payload,
            due_at: entity.due_at,
            is_sent: entity.is_sent,
            failure_reason: entity.failure_reason,
            created_at: entity.created_at,
        })
    }
}
