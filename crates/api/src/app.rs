use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_owner_auth, security_headers_middleware, trace_id,
};
use crate::routes::{auth, commands, devices, health};
use shared::jwt::JwtConfig;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
}

pub fn create_app(config: Config, pool: PgPool) -> anyhow::Result<Router> {
    let jwt = JwtConfig::new(
        &config.jwt.private_key,
        &config.jwt.public_key,
        config.jwt.session_expiry_secs,
        config.jwt.leeway_secs,
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize session tokens: {}", e))?;

    let config = Arc::new(config);
    let state = AppState {
        pool,
        config: config.clone(),
        jwt: Arc::new(jwt),
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Owner-facing routes (require a session token)
    let owner_routes = Router::new()
        .route(
            "/api/v1/devices",
            post(devices::issue_registration).get(devices::list_devices),
        )
        .route("/api/v1/devices/:device_id", delete(devices::delete_device))
        .route(
            "/api/v1/devices/:device_id/commands",
            get(commands::list_commands),
        )
        .route("/api/v1/commands", post(commands::enqueue_command))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_owner_auth,
        ));

    // Device-facing routes. Activation authenticates via the single-use
    // registration token; the polling endpoints treat the unguessable device
    // id as a bearer capability, mirroring the reference protocol.
    let device_routes = Router::new()
        .route("/api/v1/devices/activate", post(devices::activate_device))
        .route("/api/v1/devices/:device_id/check-in", post(devices::check_in))
        .route("/api/v1/commands/poll/:device_id", get(commands::poll_commands))
        .route(
            "/api/v1/commands/:command_id/failure",
            patch(commands::report_failure),
        );

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/v1/auth/signup", post(auth::signup))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // Merge all routes
    let router = Router::new()
        .merge(public_routes)
        .merge(owner_routes)
        .merge(device_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state);

    Ok(router)
}
