//! Core library for the Erasmos session lifecycle.
//!
//! This crate provides:
//! - `auth`: bearer credential decoding and on-disk session persistence
//! - `api`: the HTTP client used to renew a bearer credential
//! - `session`: the `SessionLifecycleCoordinator` that warns before expiry,
//!   auto-refreshes, and forces logout when a credential runs out
//! - `config`: application configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod session;

pub use api::{ApiClient, ApiError};
pub use auth::{Credential, Session, SessionData};
pub use config::Config;
pub use session::{
    RefreshOutcome, SessionError, SessionHandle, SessionHooks, SessionLifecycleCoordinator,
    SessionPhase, SessionTimings, SessionView, SessionWarningState,
};
