//! Authenticated request gateway for the Rules Lawyer API.
//!
//! This module provides the `ApiClient`, which attaches the session's bearer
//! token to every call and clears the session when the server answers 401.
//!
//! Rejections carry the reason from the RFC 6750 `WWW-Authenticate`
//! challenge when the server sends one.

pub mod challenge;
pub mod client;
pub mod error;

pub use challenge::BearerChallenge;
pub use client::{ApiClient, HealthResponse, RequestOptions, VerifyResponse};
pub use error::ApiError;
