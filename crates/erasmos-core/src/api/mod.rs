//! REST API client module for the Erasmos backend.
//!
//! Only the token renewal endpoint is used here. The backend accepts the
//! current bearer token and answers with a freshly issued one.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
