//! Command domain model and the action payload union.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

/// Category of remote action a command carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Media,
    Volume,
    Brightness,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::Media => "media",
            CommandType::Volume => "volume",
            CommandType::Brightness => "brightness",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized command type strings.
#[derive(Debug, Error)]
#[error("Unknown command type: {0}")]
pub struct UnknownCommandType(pub String);

impl FromStr for CommandType {
    type Err = UnknownCommandType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "media" => Ok(CommandType::Media),
            "volume" => Ok(CommandType::Volume),
            "brightness" => Ok(CommandType::Brightness),
            other => Err(UnknownCommandType(other.to_string())),
        }
    }
}

/// One unit of work destined for exactly one device.
///
/// `payload` is ciphertext end to end; the server stores and forwards it
/// without ever holding the plaintext or a decryption key. Once `is_sent`
/// flips to true it never resets, and `failure_reason` is only ever set
/// alongside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: i64,
    pub device_id: i64,
    #[serde(rename = "type")]
    pub command_type: CommandType,
    pub payload: String,
    pub due_at: Option<DateTime<Utc>>,
    pub is_sent: bool,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Media transport actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaAction {
    Next,
    Previous,
    PlayPause,
    Stop,
}

/// Volume actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeAction {
    Set,
    Increase,
    Decrease,
    Mute,
    Unmute,
}

/// Brightness actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrightnessAction {
    Set,
    Increase,
    Decrease,
}

/// Decrypted command payload, tagged by command type.
///
/// The wire shape is externally tagged, e.g.
/// `{"volume":{"action":"set","value":40}}`, which is also the canonical
/// encoding fed to the payload cipher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionPayload {
    Media {
        action: MediaAction,
    },
    Volume {
        action: VolumeAction,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<u8>,
    },
    Brightness {
        action: BrightnessAction,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<u8>,
    },
}

/// Error type for payload validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Payload does not match command type {expected}")]
    TypeMismatch { expected: CommandType },

    #[error("{0} value must be between 0 and 100, got {1}")]
    ValueOutOfRange(CommandType, u8),

    #[error("{0} 'set' requires a value")]
    MissingValue(CommandType),
}

impl ActionPayload {
    /// The command type this payload belongs to.
    pub fn command_type(&self) -> CommandType {
        match self {
            ActionPayload::Media { .. } => CommandType::Media,
            ActionPayload::Volume { .. } => CommandType::Volume,
            ActionPayload::Brightness { .. } => CommandType::Brightness,
        }
    }

    /// Validate value bounds and action/value consistency.
    pub fn validate(&self) -> Result<(), PayloadError> {
        match self {
            ActionPayload::Media { .. } => Ok(()),
            ActionPayload::Volume { action, value } => {
                if *action == VolumeAction::Set && value.is_none() {
                    return Err(PayloadError::MissingValue(CommandType::Volume));
                }
                check_range(CommandType::Volume, *value)
            }
            ActionPayload::Brightness { action, value } => {
                if *action == BrightnessAction::Set && value.is_none() {
                    return Err(PayloadError::MissingValue(CommandType::Brightness));
                }
                check_range(CommandType::Brightness, *value)
            }
        }
    }

    /// Ensure the payload variant matches the declared command type.
    pub fn check_type(&self, expected: CommandType) -> Result<(), PayloadError> {
        if self.command_type() == expected {
            Ok(())
        } else {
            Err(PayloadError::TypeMismatch { expected })
        }
    }

    /// Canonical byte encoding used for encryption.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Inverse of [`ActionPayload::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

fn check_range(command_type: CommandType, value: Option<u8>) -> Result<(), PayloadError> {
    match value {
        Some(v) if v > 100 => Err(PayloadError::ValueOutOfRange(command_type, v)),
        _ => Ok(()),
    }
}

/// Request payload for enqueuing a command.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueCommandRequest {
    pub device_id: i64,
    #[serde(rename = "type")]
    pub command_type: CommandType,
    pub payload: ActionPayload,
    pub due_at: Option<DateTime<Utc>>,
}

/// Request payload for reporting command failure.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReportFailureRequest {
    #[validate(length(
        min = 1,
        max = 500,
        message = "Failure reason must be between 1 and 500 characters"
    ))]
    pub failure_reason: String,
}
