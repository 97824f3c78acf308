//! Device domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Seconds after the last check-in during which a device counts as online.
pub const ONLINE_WINDOW_SECS: i64 = 60;

/// A remote endpoint capable of executing commands.
///
/// A device is either pending activation (registration token set, inactive)
/// or activated (public key set, active) — never both. The transition happens
/// exactly once, when the token is redeemed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    #[serde(skip_serializing)]
    pub registration_token: Option<String>,
    #[serde(skip_serializing)]
    pub public_key: Option<String>,
    pub is_active: bool,
    pub last_check_in: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Device {
    /// Whether the device checked in recently enough to count as online.
    ///
    /// Advisory only, for owner-facing display; not used for delivery
    /// correctness.
    pub fn is_online(&self, now: DateTime<Utc>) -> bool {
        self.last_check_in
            .is_some_and(|t| (now - t).num_seconds() < ONLINE_WINDOW_SECS)
    }
}

/// Request payload for issuing a device registration.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IssueRegistrationRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Device name must be between 1 and 100 characters"
    ))]
    pub name: String,
}

/// Response for a freshly issued registration.
///
/// The token is shown exactly once here and is not retrievable afterwards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRegistrationResponse {
    pub device_id: i64,
    pub registration_token: String,
}

/// Request payload for device activation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActivateDeviceRequest {
    #[validate(length(min = 1, message = "Registration token is required"))]
    pub token: String,

    #[validate(length(min = 1, message = "Public key is required"))]
    pub public_key: String,

    #[validate(length(
        min = 1,
        max = 100,
        message = "Device name must be between 1 and 100 characters"
    ))]
    pub name: String,
}

/// Response for a successful activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateDeviceResponse {
    pub device_id: i64,
    pub name: String,
}

/// Device summary for owner listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    pub online: bool,
    pub last_check_in: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DeviceSummary {
    pub fn from_device(device: Device, now: DateTime<Utc>) -> Self {
        let online = device.is_online(now);
        Self {
            id: device.id,
            name: device.name,
            is_active: device.is_active,
            online,
            last_check_in: device.last_check_in,
            created_at: device.created_at,
        }
    }
}
