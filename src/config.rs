//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the project URL and API key for the hosted database, the site origin the
//! shell assets are mirrored from, and the last signed-in admin email.
//!
//! Configuration is stored at `~/.config/citadesk/config.json`. The
//! `CITADESK_PROJECT_URL`, `CITADESK_API_KEY`, and `CITADESK_SITE_URL`
//! environment variables override the file.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "citadesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Base URL of the hosted database project
    pub project_url: Option<String>,
    /// Project API key (anon role)
    pub api_key: Option<String>,
    /// Origin the dashboard site is served from; shell assets are
    /// precached from here
    pub site_url: Option<String>,
    pub last_email: Option<String>,
    /// Set once the offline shell has been installed; the install
    /// affordance is hidden while this is true (standalone mode)
    #[serde(default)]
    pub installed: bool,
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
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("CITADESK_PROJECT_URL") {
            self.project_url = Some(url);
        }
        if let Ok(key) = std::env::var("CITADESK_API_KEY") {
            self.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("CITADESK_SITE_URL") {
            self.site_url = Some(url);
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir =
            dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Root directory for the versioned shell asset stores
    pub fn shell_store_root(&self) -> Result<PathBuf> {
        Ok(self.cache_dir()?.join("shell"))
    }

    /// Host of the database project, used to exempt its traffic from the
    /// shell cache. Empty when no project URL is configured.
    pub fn database_host(&self) -> String {
        self.project_url
            .as_deref()
            .and_then(|u| url::Url::parse(u).ok())
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_host_from_project_url() {
        let config = Config {
            project_url: Some("https://abcd1234.supabase.co".to_string()),
            ..Default::default()
        };
        assert_eq!(config.database_host(), "abcd1234.supabase.co");
    }

    #[test]
    fn test_database_host_unconfigured() {
        assert_eq!(Config::default().database_host(), "");
    }
}
