//! Configuration resolution.
//!
//! Values are layered, lowest priority first:
//! 1. Built-in defaults
//! 2. `settings.json` in the user config directory
//! 3. Environment variables
//! 4. Command-line flags (applied by the binary)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Placeholder URL shipped in `.env.example`; treated as "not configured"
pub const PLACEHOLDER_URL: &str = "https://your-project.supabase.co";
/// Placeholder key shipped in `.env.example`; treated as "not configured"
pub const PLACEHOLDER_KEY: &str = "your-anon-key";

pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Hosted backend credentials
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub anon_key: Option<String>,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            anon_key: Some(anon_key.into()),
        }
    }

    /// True when both values are present and neither is the shipped placeholder.
    /// Live vs mock mode hangs off this one check.
    pub fn is_configured(&self) -> bool {
        match (self.url.as_deref(), self.anon_key.as_deref()) {
            (Some(url), Some(key)) => {
                let (url, key) = (url.trim(), key.trim());
                !url.is_empty()
                    && !key.is_empty()
                    && url != PLACEHOLDER_URL
                    && key != PLACEHOLDER_KEY
            }
            _ => false,
        }
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> Option<&str> {
        self.url.as_deref().map(|u| u.trim().trim_end_matches('/'))
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    /// JSON file standing in for the browser's local storage
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default = "default_debounce_ms")]
    pub search_debounce_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            storage_path: default_storage_path(),
            log_level: default_log_level(),
            log_json: false,
            search_debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl AppConfig {
    /// Defaults, then the user settings file (if any), then the environment
    pub fn load() -> Result<Self> {
        let mut config = match settings_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Overlay environment values. The lookup is injected so tests don't touch the process env.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SUPABASE_URL") {
            self.backend.url = Some(url);
        }
        if let Some(key) = lookup("SUPABASE_ANON_KEY") {
            self.backend.anon_key = Some(key);
        }
        if let Some(path) = lookup("PET_RENTALS_STORAGE") {
            self.storage_path = PathBuf::from(path);
        }
        if let Some(level) = lookup("PET_RENTALS_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(flag) = lookup("PET_RENTALS_LOG_JSON") {
            self.log_json = matches!(flag.trim(), "1" | "true" | "yes");
        }
        if let Some(ms) = lookup("PET_RENTALS_DEBOUNCE_MS").and_then(|v| v.trim().parse().ok()) {
            self.search_debounce_ms = ms;
        }
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

/// `<config dir>/pet-rentals/settings.json`
pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("pet-rentals").join("settings.json"))
}

fn default_storage_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("pet-rentals"))
        .unwrap_or_else(|| PathBuf::from(".pet-rentals"))
        .join("local_storage.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}
