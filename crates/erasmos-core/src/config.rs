//! Application configuration management.
//!
//! This module handles loading the application configuration,
//! which includes the backend URL and the session warning/refresh lead times.
//!
//! Configuration is stored at `~/.config/erasmos/config.json`. Environment
//! variables (optionally from a `.env` file) override the stored values.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::client::DEFAULT_API_BASE_URL;
use crate::session::SessionTimings;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "erasmos";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const ENV_API_URL: &str = "ERASMOS_API_URL";
const ENV_WARNING_LEAD: &str = "ERASMOS_WARNING_LEAD_SECS";
const ENV_AUTO_REFRESH_LEAD: &str = "ERASMOS_AUTO_REFRESH_LEAD_SECS";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub warning_lead_secs: u64,
    pub auto_refresh_lead_secs: u64,
    pub auto_refresh_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        let timings = SessionTimings::default();
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            warning_lead_secs: timings.warning_lead.as_secs(),
            auto_refresh_lead_secs: timings.auto_refresh_lead.as_secs(),
            auto_refresh_enabled: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override stored values from the environment. Unparseable numbers are ignored.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url;
        }
        for (key, slot) in [
            (ENV_WARNING_LEAD, &mut self.warning_lead_secs),
            (ENV_AUTO_REFRESH_LEAD, &mut self.auto_refresh_lead_secs),
        ] {
            if let Some(raw) = lookup(key) {
                match raw.trim().parse::<u64>() {
                    Ok(secs) => *slot = secs,
                    Err(e) => warn!(key = key, value = %raw, error = %e, "Ignoring invalid override"),
                }
            }
        }
    }

    pub fn timings(&self) -> SessionTimings {
        SessionTimings::default()
            .with_warning_lead_secs(self.warning_lead_secs)
            .with_auto_refresh_lead_secs(self.auto_refresh_lead_secs)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn test_defaults_match_session_timings() {
        let config = Config::default();
        assert_eq!(config.warning_lead_secs, 300);
        assert_eq!(config.auto_refresh_lead_secs, 120);
        assert!(config.auto_refresh_enabled);
        assert_eq!(config.timings().warning_lead, Duration::from_secs(300));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_URL, "https://erasmos.example/api"),
            (ENV_WARNING_LEAD, "600"),
            (ENV_AUTO_REFRESH_LEAD, "soon"),
        ]);
        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api_base_url, "https://erasmos.example/api");
        assert_eq!(config.warning_lead_secs, 600);
        assert_eq!(config.auto_refresh_lead_secs, 120);
    }

    #[test]
    fn test_partial_config_file() {
        let config: Config = serde_json::from_str(r#"{"auto_refresh_enabled": false}"#)
            .expect("partial config");
        assert!(!config.auto_refresh_enabled);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }
}
