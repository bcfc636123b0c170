//! Authentication module for managing the bearer token lifecycle.
//!
//! This module provides:
//! - `CredentialStore`: Persistence of the token (keychain, file or memory)
//! - `SessionState`: Observable in-memory session derived from the store
//! - `LoginFlow`: Exchanges a username/password for a token
//!
//! Tokens carry no client-side expiry. The server reports expiry with a 401
//! and the gateway clears the session in response.

pub mod credentials;
pub mod login;
pub mod session;

pub use credentials::{CredentialStore, FileStore, KeyringStore, MemoryStore, TOKEN_KEY};
pub use login::LoginFlow;
pub use session::{SessionSnapshot, SessionState, SessionStatus};
