use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::watch;
use tracing::{debug, info};

use super::CredentialStore;

/// Where the session sits in its lifecycle.
///
/// `Initializing` is left exactly once, by [`SessionState::initialize`], and
/// never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Initializing,
    Unauthenticated,
    Authenticated,
}

/// Observable view of the session, published on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub initializing: bool,
}

impl SessionSnapshot {
    fn initializing() -> Self {
        Self {
            token: None,
            initializing: true,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        if self.initializing {
            SessionStatus::Initializing
        } else if self.is_authenticated() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Unauthenticated
        }
    }
}

/// In-memory authentication state backed by a [`CredentialStore`].
///
/// Every transition updates the in-memory value first and persists second.
/// Neither step awaits, so observers never see a half-applied transition.
/// Share it with `Arc`; the gateway and login flow both hold a reference.
pub struct SessionState {
    store: Arc<dyn CredentialStore>,
    state: watch::Sender<SessionSnapshot>,
}

impl SessionState {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::initializing());
        Self { store, state }
    }

    /// Read the persisted token and leave the initializing state.
    ///
    /// A store that cannot be read leaves the session unauthenticated and the
    /// error is returned to the caller.
    pub fn initialize(&self) -> Result<()> {
        if !self.is_initializing() {
            bail!("Session already initialized");
        }

        let loaded = self.store.load();
        let token = match &loaded {
            Ok(token) => token.clone(),
            Err(_) => None,
        };
        debug!(has_token = token.is_some(), "Session loaded");

        self.state.send_modify(|s| {
            s.token = token;
            s.initializing = false;
        });

        loaded.map(|_| ())
    }

    /// Record a freshly issued token.
    pub fn set_authenticated(&self, token: String) -> Result<()> {
        self.state.send_modify(|s| s.token = Some(token.clone()));
        info!("Session authenticated");
        self.store.save(&token)
    }

    /// Drop the token, in memory and in the store.
    pub fn clear(&self) -> Result<()> {
        self.state.send_modify(|s| s.token = None);
        info!("Session cleared");
        self.store.clear()
    }

    /// Get the bearer token if one is held
    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_initializing(&self) -> bool {
        self.state.borrow().initializing
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Watch the session; the receiver sees every later transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }
}
