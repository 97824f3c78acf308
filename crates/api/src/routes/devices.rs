//! Device endpoint handlers: registration, activation, listing, liveness.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::OwnerAuth;
use domain::models::{
    ActivateDeviceRequest, ActivateDeviceResponse, Device, DeviceSummary,
    IssueRegistrationRequest, IssueRegistrationResponse,
};
use persistence::repositories::DeviceRepository;

/// Response for device listing.
#[derive(Debug, Serialize)]
pub struct ListDevicesResponse {
    pub devices: Vec<DeviceSummary>,
}

/// Issue a registration for a new device.
///
/// POST /api/v1/devices
///
/// The returned token is displayed to the owner exactly once; it is never
/// included in any later response.
pub async fn issue_registration(
    State(state): State<AppState>,
    Extension(auth): Extension<OwnerAuth>,
    Json(request): Json<IssueRegistrationRequest>,
) -> Result<(StatusCode, Json<IssueRegistrationResponse>), ApiError> {
    request.validate()?;

    let repo = DeviceRepository::new(state.pool.clone());
    let token = shared::token::generate_registration_token();

    let device = repo
        .create_pending(auth.owner_id, &request.name, &token)
        .await?;

    info!(
        device_id = device.id,
        owner_id = auth.owner_id,
        "Device registration issued"
    );

    Ok((
        StatusCode::CREATED,
        Json(IssueRegistrationResponse {
            device_id: device.id,
            registration_token: token,
        }),
    ))
}

/// Activate a pending device by redeeming its registration token.
///
/// POST /api/v1/devices/activate
///
/// No session required: the single-use token is the credential. The error for
/// an unknown and for an already-consumed token is identical, so a caller
/// learns only that activation failed.
pub async fn activate_device(
    State(state): State<AppState>,
    Json(request): Json<ActivateDeviceRequest>,
) -> Result<Json<ActivateDeviceResponse>, ApiError> {
    request.validate()?;

    shared::crypto::parse_public_key(&request.public_key)
        .map_err(|e| ApiError::Validation(format!("Invalid public key: {}", e)))?;

    let repo = DeviceRepository::new(state.pool.clone());

    let device = repo
        .activate(&request.token, &request.public_key, &request.name)
        .await?
        .ok_or_else(|| ApiError::NotFound("Activation failed".to_string()))?;

    info!(device_id = device.id, "Device activated");

    Ok(Json(ActivateDeviceResponse {
        device_id: device.id,
        name: device.name,
    }))
}

/// List the requesting owner's devices.
///
/// GET /api/v1/devices
pub async fn list_devices(
    State(state): State<AppState>,
    Extension(auth): Extension<OwnerAuth>,
) -> Result<Json<ListDevicesResponse>, ApiError> {
    let repo = DeviceRepository::new(state.pool.clone());
    let now = Utc::now();

    let devices = repo
        .find_by_owner(auth.owner_id)
        .await?
        .into_iter()
        .map(|entity| DeviceSummary::from_device(Device::from(entity), now))
        .collect();

    Ok(Json(ListDevicesResponse { devices }))
}

/// Delete one of the requesting owner's devices, cascading to its commands.
///
/// DELETE /api/v1/devices/:device_id
pub async fn delete_device(
    State(state): State<AppState>,
    Extension(auth): Extension<OwnerAuth>,
    Path(device_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let repo = DeviceRepository::new(state.pool.clone());

    let deleted = repo.delete(device_id, auth.owner_id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("Device not found".to_string()));
    }

    info!(device_id, owner_id = auth.owner_id, "Device deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Record a device check-in.
///
/// POST /api/v1/devices/:device_id/check-in
///
/// Liveness display only; delivery correctness never depends on this.
pub async fn check_in(
    State(state): State<AppState>,
    Path(device_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let repo = DeviceRepository::new(state.pool.clone());

    let updated = repo.update_last_check_in(device_id).await?;
    if updated == 0 {
        return Err(ApiError::NotFound("Device not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
