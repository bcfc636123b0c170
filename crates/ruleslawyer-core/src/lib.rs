//! Core library for the Rules Lawyer client.
//!
//! Handles the bearer-token session: persisting the token, attaching it to
//! requests, and dropping it when the server rejects it.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;

pub use api::{ApiClient, ApiError, BearerChallenge, RequestOptions};
pub use auth::{
    CredentialStore, FileStore, KeyringStore, LoginFlow, MemoryStore, SessionSnapshot,
    SessionState, SessionStatus,
};
pub use client::RulesLawyer;
pub use config::{Config, CredentialBackend};
