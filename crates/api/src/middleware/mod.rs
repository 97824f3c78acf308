//! HTTP middleware components.

pub mod logging;
pub mod metrics;
pub mod owner_auth;
pub mod security_headers;
pub mod trace_id;

pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
pub use owner_auth::{require_owner_auth, OwnerAuth};
pub use security_headers::security_headers_middleware;
pub use trace_id::trace_id;
