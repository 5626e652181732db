//! Read-only decoding of JWT bearer credentials.
//!
//! The backend issues HS256 JWTs carrying the user's id, email and role.
//! Only the payload is read here; signature checks belong to the server.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Malformed token: expected 3 segments, found {0}")]
    Malformed(usize),

    #[error("Token payload is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Token claims could not be parsed: {0}")]
    Claims(#[from] serde_json::Error),

    #[error("Token expiry out of range: {0}")]
    InvalidExpiry(i64),
}

/// User id as issued by the backend; numeric for database users, text otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrincipalId {
    Number(i64),
    Text(String),
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalId::Number(n) => write!(f, "{}", n),
            PrincipalId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
    #[serde(default, alias = "userId")]
    pub id: Option<PrincipalId>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// A decoded bearer credential. Holds the raw token alongside its claims.
#[derive(Debug, Clone)]
pub struct Credential {
    token: String,
    claims: Claims,
    expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn decode(token: &str) -> Result<Self, TokenError> {
        let segments: Vec<&str> = token.trim().split('.').collect();
        if segments.len() != 3 {
            return Err(TokenError::Malformed(segments.len()));
        }

        // Some issuers pad the payload despite the JWT rules
        let payload = segments[1].trim_end_matches('=');
        let bytes = URL_SAFE_NO_PAD.decode(payload)?;
        let claims: Claims = serde_json::from_slice(&bytes)?;

        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or(TokenError::InvalidExpiry(claims.exp))?;

        Ok(Self {
            token: token.trim().to_string(),
            claims,
            expires_at,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Time left before expiry, zero once expired
    pub fn remaining_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        (self.expires_at - now).max(chrono::Duration::zero())
    }
}

/// Build an unsigned token for tests.
#[cfg(test)]
pub(crate) fn test_token(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({
            "id": 42,
            "email": "associate@erasmos.gr",
            "role": "associate",
            "exp": exp
        })
        .to_string(),
    );
    format!("{}.{}.signature", header, payload)
}
