//! HTTP client for the deskctl server API.

use domain::models::{ActivateDeviceRequest, ActivateDeviceResponse, Command, ReportFailureRequest};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::AgentError;

/// Error body returned by the server.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[allow(dead_code)]
    error: String,
    message: String,
}

/// Client for the server's device-facing endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the given server base URL.
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Redeem a registration token for an activated device identity.
    pub async fn activate(
        &self,
        token: &str,
        public_key: &str,
        name: &str,
    ) -> Result<ActivateDeviceResponse, AgentError> {
        let response = self
            .http
            .post(format!("{}/api/v1/devices/activate", self.base_url))
            .json(&ActivateDeviceRequest {
                token: token.to_string(),
                public_key: public_key.to_string(),
                name: name.to_string(),
            })
            .send()
            .await?;

        Self::parse(response).await
    }

    /// Record a liveness check-in.
    pub async fn check_in(&self, device_id: i64) -> Result<(), AgentError> {
        let response = self
            .http
            .post(format!(
                "{}/api/v1/devices/{}/check-in",
                self.base_url, device_id
            ))
            .send()
            .await?;

        Self::expect_success(response).await
    }

    /// Fetch due commands. Everything returned is already marked sent by the
    /// server, so whatever this call yields must be executed or failed now —
    /// there is no second delivery.
    pub async fn poll(&self, device_id: i64) -> Result<Vec<Command>, AgentError> {
        let response = self
            .http
            .get(format!(
                "{}/api/v1/commands/poll/{}",
                self.base_url, device_id
            ))
            .send()
            .await?;

        Self::parse(response).await
    }

    /// Report a per-command execution failure.
    pub async fn report_failure(&self, command_id: i64, reason: &str) -> Result<(), AgentError> {
        let response = self
            .http
            .patch(format!(
                "{}/api/v1/commands/{}/failure",
                self.base_url, command_id
            ))
            .json(&ReportFailureRequest {
                failure_reason: reason.to_string(),
            })
            .send()
            .await?;

        Self::expect_success(response).await
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, AgentError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::api_error(status, response).await)
        }
    }

    async fn expect_success(response: reqwest::Response) -> Result<(), AgentError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::api_error(status, response).await)
        }
    }

    async fn api_error(status: StatusCode, response: reqwest::Response) -> AgentError {
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };
        AgentError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:8080/");
        assert_eq!(client.base_url, "http://localhost:8080");
    }
}
