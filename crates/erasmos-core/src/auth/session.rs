use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::token::Credential;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl SessionData {
    /// Build session data from a decoded credential
    pub fn from_credential(credential: &Credential) -> Self {
        let claims = credential.claims();
        Self {
            token: credential.token().to_string(),
            user_id: claims.id.as_ref().map(|id| id.to_string()),
            email: claims.email.clone(),
            role: claims.role.clone(),
            saved_at: Utc::now(),
        }
    }

    /// Expiry read from the stored token; None if the token no longer decodes
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Credential::decode(&self.token).ok().map(|c| c.expires_at())
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at().map(|exp| exp <= Utc::now()).unwrap_or(true)
    }
}

pub struct Session {
    cache_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data: None,
        }
    }

    /// Load session from disk. Expired or undecodable tokens are ignored.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .context("Failed to read session file")?;
            let data: SessionData = serde_json::from_str(&contents)
                .context("Failed to parse session file")?;

            if !data.is_expired() {
                debug!(user = ?data.email, "Session loaded");
                self.data = Some(data);
                return Ok(true);
            }
            warn!(path = %path.display(), "Stored session is expired or malformed");
        }
        Ok(false)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// Clear session data
    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Update session with new data
    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    /// Get the bearer token if a session exists
    pub fn token(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.token.as_str())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.data.as_ref().and_then(|d| d.expires_at())
    }

    /// Check if session is valid (exists and not expired)
    pub fn is_valid(&self) -> bool {
        self.data.as_ref().map(|d| !d.is_expired()).unwrap_or(false)
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}
