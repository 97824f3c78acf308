//! Command endpoint handlers: enqueue, history, polling, failure reports.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{record_command_failure, record_commands_delivered};
use crate::middleware::OwnerAuth;
use domain::models::{Command, EnqueueCommandRequest, ReportFailureRequest};
use persistence::entities::DeviceEntity;
use persistence::repositories::{CommandRepository, DeviceRepository};

/// Enqueue a command for a device.
///
/// POST /api/v1/commands
///
/// The payload is encrypted under the device public key before it touches
/// storage; this handler is the last point where the plaintext exists on the
/// server side.
pub async fn enqueue_command(
    State(state): State<AppState>,
    Extension(auth): Extension<OwnerAuth>,
    Json(request): Json<EnqueueCommandRequest>,
) -> Result<(StatusCode, Json<Command>), ApiError> {
    let device_repo = DeviceRepository::new(state.pool.clone());
    let command_repo = CommandRepository::new(state.pool.clone());

    let device = find_owned_device(&device_repo, request.device_id, auth.owner_id).await?;

    if !device.is_active {
        return Err(ApiError::Conflict(
            "Device is not activated yet".to_string(),
        ));
    }

    request
        .payload
        .check_type(request.command_type)
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    request
        .payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    // Guaranteed by the pending/active invariant; a violation here is data
    // corruption, not caller error.
    let public_key = device
        .public_key
        .as_deref()
        .ok_or_else(|| ApiError::Internal("Active device has no public key".to_string()))?;

    let plaintext = request
        .payload
        .to_bytes()
        .map_err(|e| ApiError::Internal(format!("Payload encoding failed: {}", e)))?;
    let ciphertext = shared::crypto::encrypt_payload(public_key, &plaintext)?;

    let entity = command_repo
        .create(
            device.id,
            request.command_type.as_str(),
            &ciphertext,
            request.due_at,
        )
        .await?;

    let command = Command::try_from(entity)
        .map_err(|e| ApiError::Internal(format!("Stored command is invalid: {}", e)))?;

    info!(
        command_id = command.id,
        device_id = device.id,
        command_type = %command.command_type,
        "Command enqueued"
    );

    Ok((StatusCode::CREATED, Json(command)))
}

/// List a device's command history, newest first.
///
/// GET /api/v1/devices/:device_id/commands
///
/// This is where a failed command's `failureReason` becomes visible to the
/// owner.
pub async fn list_commands(
    State(state): State<AppState>,
    Extension(auth): Extension<OwnerAuth>,
    Path(device_id): Path<i64>,
) -> Result<Json<Vec<Command>>, ApiError> {
    let device_repo = DeviceRepository::new(state.pool.clone());
    let command_repo = CommandRepository::new(state.pool.clone());

    find_owned_device(&device_repo, device_id, auth.owner_id).await?;

    let commands = command_repo
        .list_for_device(device_id)
        .await?
        .into_iter()
        .map(Command::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::Internal(format!("Stored command is invalid: {}", e)))?;

    Ok(Json(commands))
}

/// Deliver due, undelivered commands to a polling device.
///
/// GET /api/v1/commands/poll/:device_id
///
/// Every command included in the response is marked sent first, so delivery
/// is at most once: a command lost between this response and device-side
/// execution is not redelivered. The mark step is a compare-and-set, which
/// keeps two concurrent polls from both delivering the same command — the
/// loser simply drops it from its response.
pub async fn poll_commands(
    State(state): State<AppState>,
    Path(device_id): Path<i64>,
) -> Result<Json<Vec<Command>>, ApiError> {
    let device_repo = DeviceRepository::new(state.pool.clone());
    let command_repo = CommandRepository::new(state.pool.clone());

    device_repo
        .find_by_id(device_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Device not found".to_string()))?;

    let pending = command_repo.pending_for_device(device_id).await?;

    let mut delivered = Vec::with_capacity(pending.len());
    for entity in pending {
        if command_repo.mark_sent(entity.id).await? {
            let mut command = Command::try_from(entity)
                .map_err(|e| ApiError::Internal(format!("Stored command is invalid: {}", e)))?;
            command.is_sent = true;
            delivered.push(command);
        }
    }

    if !delivered.is_empty() {
        record_commands_delivered(delivered.len());
        info!(device_id, count = delivered.len(), "Commands delivered");
    }

    Ok(Json(delivered))
}

/// Record a device-side execution failure.
///
/// PATCH /api/v1/commands/:command_id/failure
///
/// Idempotent; the first recorded reason wins.
pub async fn report_failure(
    State(state): State<AppState>,
    Path(command_id): Path<i64>,
    Json(request): Json<ReportFailureRequest>,
) -> Result<StatusCode, ApiError> {
    request.validate()?;

    let command_repo = CommandRepository::new(state.pool.clone());

    let found = command_repo
        .mark_failed(command_id, &request.failure_reason)
        .await?;
    if !found {
        return Err(ApiError::NotFound("Command not found".to_string()));
    }

    record_command_failure();
    info!(
        command_id,
        reason = %request.failure_reason,
        "Command failure reported"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Look up a device and verify it belongs to the requesting owner.
async fn find_owned_device(
    repo: &DeviceRepository,
    device_id: i64,
    owner_id: i64,
) -> Result<DeviceEntity, ApiError> {
    let device = repo
        .find_by_id(device_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Device not found".to_string()))?;

    if device.owner_id != owner_id {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }

    Ok(device)
}
