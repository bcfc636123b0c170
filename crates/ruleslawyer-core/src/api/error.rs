use thiserror::Error;

/// Fallback message for a 401 without a usable challenge
pub const AUTHENTICATION_REQUIRED: &str = "Authentication required";

/// Fallback message for a rejected login without a `detail`
pub const LOGIN_FAILED: &str = "Login failed";

#[derive(Error, Debug)]
pub enum ApiError {
    /// The server rejected the credential (401). The session has already
    /// been cleared by the time this is returned.
    #[error("{message}")]
    AuthenticationRejected {
        /// `error` code from the `WWW-Authenticate` challenge, if any
        code: Option<String>,
        message: String,
    },

    #[error("{0}")]
    LoginFailed(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The stored token cannot be encoded as an `Authorization` header value.
    /// Nothing was sent.
    #[error("Stored token contains characters that cannot be sent in a header")]
    UnusableToken,

    #[error("Session is still initializing")]
    NotInitialized,

    #[error("Question is empty")]
    EmptyQuestion,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        ApiError::InvalidResponse(format!("Status {}: {}", status, Self::truncate_body(body)))
    }

    /// True when the user has to go back through login
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::AuthenticationRejected { .. })
    }
}
