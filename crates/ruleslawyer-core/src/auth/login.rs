use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::client::join_url;
use crate::api::error::LOGIN_FAILED;
use crate::api::ApiError;

use super::SessionState;

/// Authentication endpoint
const LOGIN_PATH: &str = "/auth/login";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    detail: Option<serde_json::Value>,
}

/// Extract `detail` from an error body when it is a plain string
fn failure_reason(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.detail)
        .and_then(|d| d.as_str().map(str::to_string))
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| LOGIN_FAILED.to_string())
}

/// Exchanges a username/password for a bearer token and commits it to the session.
#[derive(Clone)]
pub struct LoginFlow {
    client: Client,
    base_url: String,
    session: Arc<SessionState>,
}

impl LoginFlow {
    pub fn new(client: Client, base_url: impl Into<String>, session: Arc<SessionState>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            session,
        }
    }

    /// Authenticate and store the issued token.
    ///
    /// Failures never touch the session: a rejected login yields
    /// [`ApiError::LoginFailed`] with the server's `detail`, and a request that
    /// never got a response yields [`ApiError::Transport`].
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        if self.session.is_initializing() {
            return Err(ApiError::NotInitialized);
        }

        let url = join_url(&self.base_url, LOGIN_PATH);
        debug!(username, "Sending login request");

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let reason = failure_reason(&body);
            warn!(%status, reason = %reason, "Login rejected");
            return Err(ApiError::LoginFailed(reason));
        }

        let token = serde_json::from_str::<TokenResponse>(&body)
            .ok()
            .and_then(|r| r.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                warn!(%status, "Login response is missing access_token");
                ApiError::LoginFailed("Malformed login response: missing access_token".to_string())
            })?;

        if let Err(e) = self.session.set_authenticated(token) {
            warn!(error = %e, "Failed to persist token");
        }
        info!(username, "Login successful");
        Ok(())
    }

    /// Sign out locally. The server keeps no revocation list, so no request is made.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.session.clear()?;
        Ok(())
    }
}
