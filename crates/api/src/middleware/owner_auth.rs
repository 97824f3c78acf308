//! Owner JWT authentication middleware.
//!
//! Owner-facing routes require a Bearer session token; device-facing routes
//! (activation, polling, failure reports) do not go through this middleware.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app::AppState;

/// Authenticated owner information extracted from the session token.
#[derive(Debug, Clone, Copy)]
pub struct OwnerAuth {
    pub owner_id: i64,
}

/// Middleware that requires an owner session token.
///
/// Validates the Bearer token in the Authorization header and stores the
/// owner id in request extensions for downstream handlers.
pub async fn require_owner_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => return unauthorized_response("Missing or invalid Authorization header"),
    };

    let claims = match state.jwt.validate_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Session token rejected: {}", e);
            return unauthorized_response("Invalid or expired token");
        }
    };

    let owner_id = match claims.owner_id() {
        Ok(id) => id,
        Err(_) => return unauthorized_response("Invalid or expired token"),
    };

    req.extensions_mut().insert(OwnerAuth { owner_id });
    next.run(req).await
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}
