//! Agent error taxonomy.

use domain::models::CommandType;
use thiserror::Error;

/// Error type for agent operations.
///
/// Decryption, unsupported-action, and executor failures are per-command:
/// they are reported upstream and never abort the poll loop. Network errors
/// are transient and retried on the next tick.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Payload decryption failed: {0}")]
    Decryption(#[from] shared::crypto::CryptoError),

    #[error("Decrypted payload is malformed: {0}")]
    MalformedPayload(String),

    #[error("Payload does not match command type {0}")]
    PayloadTypeMismatch(CommandType),

    #[error("{0} module is disabled")]
    UnsupportedAction(CommandType),

    #[error("Executor failed: {0}")]
    Executor(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server rejected request with status {status}: {message}")]
    Api { status: u16, message: String },
}
