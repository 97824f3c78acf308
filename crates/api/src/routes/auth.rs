//! Owner authentication routes: signup and login.

use axum::{extract::State, http::StatusCode, Json};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::{AuthResponse, CredentialsRequest};
use persistence::repositories::OwnerRepository;

/// Create an owner account.
///
/// POST /api/v1/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    request.validate()?;

    let repo = OwnerRepository::new(state.pool.clone());

    let password_hash = shared::password::hash_password(&request.password)?;

    let owner = repo
        .create(&request.username, &password_hash)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.code().as_deref() == Some("23505") => {
                ApiError::Conflict("Username already taken".to_string())
            }
            other => ApiError::from(other),
        })?;

    let token = state.jwt.generate_token(owner.id)?;

    info!(owner_id = owner.id, "Owner account created");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            owner_id: owner.id,
            username: owner.username,
            token,
            expires_in: state.jwt.expiry_secs,
        }),
    ))
}

/// Exchange owner credentials for a session token.
///
/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    request.validate()?;

    let repo = OwnerRepository::new(state.pool.clone());

    // The same rejection for unknown usernames and wrong passwords, so the
    // endpoint does not reveal which usernames exist.
    let owner = repo
        .find_by_username(&request.username)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !shared::password::verify_password(&request.password, &owner.password_hash)? {
        return Err(invalid_credentials());
    }

    let token = state.jwt.generate_token(owner.id)?;

    Ok(Json(AuthResponse {
        owner_id: owner.id,
        username: owner.username,
        token,
        expires_in: state.jwt.expiry_secs,
    }))
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid username or password".to_string())
}
