//! Authenticated request gateway for the Rules Lawyer API.
//!
//! Every call that may need authentication goes through [`ApiClient::request`],
//! which attaches the session's bearer token and turns a 401 into a cleared
//! session plus [`ApiError::AuthenticationRejected`].

use std::sync::Arc;

use reqwest::{header, Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::auth::SessionState;

use super::challenge::BearerChallenge;
use super::error::AUTHENTICATION_REQUIRED;
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Question-answering endpoint
const QUERY_PATH: &str = "/query";

/// Token verification endpoint
const VERIFY_PATH: &str = "/auth/verify";

/// Liveness endpoint
const HEALTH_PATH: &str = "/health";

/// Content type of every payload the gateway sends
const JSON_CONTENT_TYPE: &str = "application/json";

/// Join a path onto the base URL. Absolute URLs pass through untouched.
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Per-call description of an outgoing request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub headers: header::HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: header::HeaderName, value: header::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifyResponse {
    pub username: String,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Gateway for the Rules Lawyer API.
/// Clone is cheap - reqwest::Client and the session are both shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<SessionState>,
}

impl ApiClient {
    pub fn new(client: Client, base_url: impl Into<String>, session: Arc<SessionState>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    /// Caller headers layered over the JSON content type, then the bearer token.
    fn build_headers(
        &self,
        caller: header::HeaderMap,
        token: Option<&str>,
    ) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static(JSON_CONTENT_TYPE),
        );
        headers.extend(caller);

        if let Some(token) = token {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::UnusableToken)?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Send a request, attaching the bearer token when the session holds one.
    ///
    /// A 401 clears the session before this returns and yields
    /// [`ApiError::AuthenticationRejected`]. Every other response is returned
    /// as-is; interpreting its status and body is up to the caller.
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Response, ApiError> {
        if self.session.is_initializing() {
            return Err(ApiError::NotInitialized);
        }

        let token = self.session.token();
        let headers = self.build_headers(options.headers, token.as_deref())?;
        let url = join_url(&self.base_url, path);
        debug!(method = %options.method, path, authenticated = token.is_some(), "Dispatching request");

        let mut builder = self.client.request(options.method, &url).headers(headers);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(ref body) = options.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(self.reject(path, &response));
        }

        debug!(path, status = %response.status(), "Response received");
        Ok(response)
    }

    /// Clear the session for a 401 and build the error to surface.
    fn reject(&self, path: &str, response: &Response) -> ApiError {
        let challenge = response
            .headers()
            .get_all(header::WWW_AUTHENTICATE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(BearerChallenge::parse);

        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to remove stored token");
        }

        let code = challenge
            .as_ref()
            .and_then(|c| c.error.clone())
            .filter(|c| !c.is_empty());
        let message = challenge
            .as_ref()
            .and_then(|c| c.reason())
            .unwrap_or(AUTHENTICATION_REQUIRED)
            .to_string();
        warn!(path, code = ?code, reason = %message, "Authentication rejected");

        ApiError::AuthenticationRejected { code, message }
    }

    /// Read a successful JSON body, or turn a failure status into an error.
    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &body));
        }
        serde_json::from_str(&body).map_err(|e| {
            ApiError::InvalidResponse(format!("{}: {}", e, ApiError::truncate_body(&body)))
        })
    }

    /// Ask a free-text question and return the server's answer.
    ///
    /// A body without a non-empty `answer` field is returned as raw JSON text.
    pub async fn ask(&self, question: &str) -> Result<String, ApiError> {
        if question.trim().is_empty() {
            return Err(ApiError::EmptyQuestion);
        }

        let response = self
            .request(QUERY_PATH, RequestOptions::get().with_query("question", question))
            .await?;
        let body: serde_json::Value = Self::read_json(response).await?;

        Ok(match body
            .get("answer")
            .and_then(|a| a.as_str())
            .filter(|a| !a.is_empty())
        {
            Some(answer) => answer.to_string(),
            None => body.to_string(),
        })
    }

    /// Check the current token with the server
    pub async fn verify(&self) -> Result<VerifyResponse, ApiError> {
        let response = self.request(VERIFY_PATH, RequestOptions::get()).await?;
        Self::read_json(response).await
    }

    /// Check server liveness without credentials
    pub async fn health(&self) -> Result<HealthResponse, ApiError> {
        let url = join_url(&self.base_url, HEALTH_PATH);
        let response = self.client.get(&url).send().await?;
        Self::read_json(response).await
    }
}
