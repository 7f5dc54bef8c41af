//! Sync configuration.
//!
//! Loaded from `~/.config/calsync/config.toml` and passed around by value;
//! nothing reads settings mid-run.

use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

pub const DEFAULT_REMOTE_BASE_URL: &str = "http://127.0.0.1:5232";
pub const DEFAULT_REMOTE_USERNAME: &str = "user";
pub const DEFAULT_AUTO_SYNC_MINUTES: u64 = 60;
pub const DEFAULT_DATE_WINDOW_DAYS: i64 = 14;
pub const DEFAULT_LLM_PROVIDER: &str = "zhipu_agent";
pub const DEFAULT_LLM_AGENT_ID: &str = "1954810625930809344";

fn default_remote_base_url() -> String {
    DEFAULT_REMOTE_BASE_URL.to_string()
}

fn default_remote_username() -> String {
    DEFAULT_REMOTE_USERNAME.to_string()
}

fn default_auto_sync_minutes() -> u64 {
    DEFAULT_AUTO_SYNC_MINUTES
}

fn default_date_window_days() -> i64 {
    DEFAULT_DATE_WINDOW_DAYS
}

fn default_true() -> bool {
    true
}

fn default_llm_provider() -> String {
    DEFAULT_LLM_PROVIDER.to_string()
}

fn default_llm_agent_id() -> String {
    DEFAULT_LLM_AGENT_ID.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the remote calendar store (CalDAV server).
    #[serde(default = "default_remote_base_url")]
    pub remote_base_url: String,

    #[serde(default = "default_remote_username")]
    pub remote_username: String,

    /// Pre-formatted Authorization header value, sent verbatim when
    /// non-empty (e.g. `Basic dXNlcjpwYXNz`).
    #[serde(default)]
    pub remote_auth_header: String,

    #[serde(default = "default_auto_sync_minutes")]
    pub auto_sync_minutes: u64,

    /// Events are fetched from this many days in the past to this many in
    /// the future.
    #[serde(default = "default_date_window_days")]
    pub date_window_days: i64,

    #[serde(default = "default_true")]
    pub notifications_enabled: bool,

    /// Session cookie for the upstream portal, sent verbatim when
    /// non-empty.
    #[serde(default)]
    pub upstream_cookie: String,

    /// Parsing-service endpoint; empty means the built-in default.
    #[serde(default)]
    pub llm_api_url: String,

    #[serde(default)]
    pub llm_api_key: String,

    #[serde(default = "default_llm_provider")]
    pub llm_provider: String,

    #[serde(default = "default_llm_agent_id")]
    pub llm_agent_id: String,

    /// Override for the directory holding sync state and the lock file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_base_url: default_remote_base_url(),
            remote_username: default_remote_username(),
            remote_auth_header: String::new(),
            auto_sync_minutes: default_auto_sync_minutes(),
            date_window_days: default_date_window_days(),
            notifications_enabled: true,
            upstream_cookie: String::new(),
            llm_api_url: String::new(),
            llm_api_key: String::new(),
            llm_provider: default_llm_provider(),
            llm_agent_id: default_llm_agent_id(),
            data_dir: None,
        }
    }
}

impl SyncConfig {
    pub fn config_path() -> SyncResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SyncError::Config("Could not determine config directory".into()))?
            .join("calsync");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location, writing a commented template first
    /// if no config file exists yet.
    pub fn load() -> SyncResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> SyncResult<Self> {
        let config: SyncConfig = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Directory for sync state and the lock file.
    pub fn data_path(&self) -> SyncResult<PathBuf> {
        if let Some(dir) = &self.data_dir {
            let expanded = shellexpand::tilde(&dir.to_string_lossy()).into_owned();
            return Ok(PathBuf::from(expanded));
        }

        let data_dir = dirs::data_dir()
            .ok_or_else(|| SyncError::Config("Could not determine data directory".into()))?
            .join("calsync");

        Ok(data_dir)
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> SyncResult<()> {
        let contents = format!(
            "\
# calsync configuration

# Remote calendar store (a CalDAV server such as Radicale):
# remote_base_url = \"{DEFAULT_REMOTE_BASE_URL}\"
# remote_username = \"{DEFAULT_REMOTE_USERNAME}\"

# Pre-formatted Authorization header value, sent verbatim:
# remote_auth_header = \"Basic dXNlcjpwYXNz\"

# Session cookie for the upstream calendar portal:
# upstream_cookie = \"JSESSIONID=...\"

# Sync cadence and event window:
# auto_sync_minutes = {DEFAULT_AUTO_SYNC_MINUTES}
# date_window_days = {DEFAULT_DATE_WINDOW_DAYS}

# Desktop notifications from `calsync watch`:
# notifications_enabled = true

# Natural-language event parsing (`calsync add`):
# llm_api_key = \"\"
# llm_agent_id = \"{DEFAULT_LLM_AGENT_ID}\"

# Where sync state and the lock file live:
# data_dir = \"~/.local/share/calsync\"
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SyncError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| SyncError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
