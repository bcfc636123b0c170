//! The surface the front end talks to.
//!
//! `RulesLawyer` owns the session and hands it to the gateway and login flow.
//! Front ends never see the credential store or the raw token.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response};
use tokio::sync::watch;
use tracing::debug;

use crate::api::{ApiClient, ApiError, HealthResponse, RequestOptions, VerifyResponse};
use crate::auth::{CredentialStore, LoginFlow, SessionSnapshot, SessionState};
use crate::config::Config;

pub struct RulesLawyer {
    session: Arc<SessionState>,
    api: ApiClient,
    auth: LoginFlow,
}

impl RulesLawyer {
    /// Build with a default HTTP client (no timeout)
    pub fn new(base_url: impl Into<String>, store: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, base_url, store))
    }

    /// Build around an existing HTTP client; the gateway and login flow share its pool
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let base_url = base_url.into();
        let session = Arc::new(SessionState::new(store));
        Self {
            api: ApiClient::new(client.clone(), base_url.clone(), session.clone()),
            auth: LoginFlow::new(client, base_url, session.clone()),
            session,
        }
    }

    /// Build from config: base URL, credential backend and optional timeout
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let base_url = config.base_url();
        debug!(%base_url, backend = ?config.credential_backend, "Building client from config");
        Ok(Self::with_client(builder.build()?, base_url, config.credential_store()?))
    }

    /// Load the stored token. Must run before any login or request.
    pub fn initialize(&self) -> Result<(), ApiError> {
        self.session.initialize()?;
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn is_initializing(&self) -> bool {
        self.session.is_initializing()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.session.subscribe()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        self.auth.login(username, password).await
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.auth.logout()
    }

    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Response, ApiError> {
        self.api.request(path, options).await
    }

    pub async fn ask(&self, question: &str) -> Result<String, ApiError> {
        self.api.ask(question).await
    }

    pub async fn verify(&self) -> Result<VerifyResponse, ApiError> {
        self.api.verify().await
    }

    pub async fn health(&self) -> Result<HealthResponse, ApiError> {
        self.api.health().await
    }
}
