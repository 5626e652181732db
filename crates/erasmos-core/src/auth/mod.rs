//! Authentication module for bearer credentials and persisted sessions.
//!
//! This module provides:
//! - `Credential`: read-only view of a JWT bearer token (expiry and principal)
//! - `Session`: the current credential persisted to the cache directory
//!
//! The client never verifies token signatures; it only reads the expiry.

pub mod session;
pub mod token;

pub use session::{Session, SessionData};
pub use token::{Claims, Credential, TokenError};
