//! Configuration loading for the mail core
//!
//! Settings are resolved in order of priority:
//! 1. JSON file (~/.config/protonmail/mail.json, or an explicit path)
//! 2. Environment variables (`PROTON_API_BASE_URL`, `PROTON_APP_VERSION`)
//! 3. Built-in defaults

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config filename in the app config directory
const CONFIG_FILE: &str = "mail.json";

const DEFAULT_API_BASE_URL: &str = "https://mail.proton.me/api";
const DEFAULT_APP_VERSION: &str = "android-mail@1.0.0";

/// Settings for the API client and logging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Base URL of the REST API, without trailing slash
    pub api_base_url: String,
    /// Value sent in the `x-pm-appversion` header
    pub app_version: String,
    /// Global timeout for a single HTTP request
    pub request_timeout_secs: u64,
    /// Default log level name ("error" .. "trace")
    pub log_level: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            app_version: DEFAULT_APP_VERSION.to_string(),
            request_timeout_secs: 30,
            log_level: "info".to_string(),
        }
    }
}

impl MailConfig {
    /// Load configuration from the config directory, then the environment
    pub fn load() -> Result<Self> {
        if config::config_exists(CONFIG_FILE) {
            let mut loaded: MailConfig = config::load_json(CONFIG_FILE)?;
            loaded.normalize();
            return Ok(loaded);
        }

        Ok(Self::from_env())
    }

    /// Load configuration from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut loaded: MailConfig = config::load_json_file(path)?;
        loaded.normalize();
        Ok(loaded)
    }

    /// Parse configuration from a JSON string; missing fields use defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let mut loaded: MailConfig =
            serde_json::from_str(json).context("Failed to parse mail config JSON")?;
        loaded.normalize();
        Ok(loaded)
    }

    /// Defaults overridden by whichever environment variables are set
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(url) = std::env::var("PROTON_API_BASE_URL") {
            cfg.api_base_url = url;
        }
        if let Ok(version) = std::env::var("PROTON_APP_VERSION") {
            cfg.app_version = version;
        }
        cfg.normalize();
        cfg
    }

    /// Persist this configuration to the config directory
    pub fn save(&self) -> Result<()> {
        config::save_json(CONFIG_FILE, self)
    }

    /// Get the default config file path (~/.config/protonmail/mail.json)
    pub fn default_config_path() -> Option<PathBuf> {
        config::config_path(CONFIG_FILE)
    }

    /// Parsed log level, falling back to `Info` for unknown names
    pub fn log_level(&self) -> log::Level {
        self.log_level.parse().unwrap_or(log::Level::Info)
    }

    fn normalize(&mut self) {
        while self.api_base_url.ends_with('/') {
            self.api_base_url.pop();
        }
    }
}
