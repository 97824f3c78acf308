//! Owner domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// An authenticated principal who manages one or more devices.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Request payload for owner signup and login.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username must be between 3 and 50 characters"
    ))]
    pub username: String,

    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    pub password: String,
}

/// Response for a successful signup or login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub owner_id: i64,
    pub username: String,
    pub token: String,
    pub expires_in: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_serialization_hides_hash() {
        let owner = Owner {
            id: 1,
            username: "alice".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&owner).unwrap();
        assert!(json.contains("\"username\":\"alice\""));
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("passwordHash"));
    }

    #[test]
    fn test_credentials_validation() {
        let ok = CredentialsRequest {
            username: "alice".to_string(),
            password: "long enough password".to_string(),
        };
        assert!(ok.validate().is_ok());

        let short_password = CredentialsRequest {
            username: "alice".to_string(),
            password: "short".to_string(),
        };
        assert!(short_password.validate().is_err());

        let short_username = CredentialsRequest {
            username: "al".to_string(),
            password: "long enough password".to_string(),
        };
        assert!(short_username.validate().is_err());
    }
}
