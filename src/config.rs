//! Configuration loading and management
//!
//! Handles parsing of `dashsync.toml` and the environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Config file name looked up in the working directory
pub const CONFIG_FILE: &str = "dashsync.toml";

/// Remote base URL used when neither config nor env select one
pub const DEFAULT_API_URL: &str = "http://localhost:3001";

/// Env var selecting the remote base URL
pub const ENV_API_URL: &str = "DASHSYNC_API_URL";

/// Env var selecting the local storage directory
pub const ENV_DATA_DIR: &str = "DASHSYNC_DATA_DIR";

/// Env var selecting the server port
pub const ENV_PORT: &str = "PORT";

const MAX_TIMEOUT_SECS: u64 = 120;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API client configuration
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Local persistence configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// API server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Remote store client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the API, without the `/api` suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Local persistence configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the persisted collections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.remote.base_url = trim_base_url(&config.remote.base_url);
        config.validate()?;
        Ok(config)
    }

    /// Load `dashsync.toml` from a directory, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            match Self::load(&config_path) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!(path = %config_path.display(), "ignoring config: {err}");
                    Self::default()
                }
            }
        } else {
            Self::default()
        }
    }

    /// Apply `DASHSYNC_API_URL`, `DASHSYNC_DATA_DIR` and `PORT`
    pub fn apply_env(&mut self) -> crate::error::Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (env in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> crate::error::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|value| !value.trim().is_empty()) {
            self.remote.base_url = trim_base_url(&url);
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|value| !value.trim().is_empty()) {
            self.storage.dir = Some(PathBuf::from(dir.trim()));
        }
        if let Some(port) = lookup(ENV_PORT).filter(|value| !value.trim().is_empty()) {
            self.server.port = port.trim().parse().map_err(|_| {
                crate::error::Error::InvalidConfig(format!("{ENV_PORT}: invalid port '{port}'"))
            })?;
        }
        self.validate()
    }

    /// Directory used by the local store
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.storage.dir {
            return dir.clone();
        }
        directories::ProjectDirs::from("", "", "dashsync")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".dashsync"))
    }

    fn validate(&self) -> crate::error::Result<()> {
        self.remote.validate()
    }
}

impl RemoteConfig {
    fn validate(&self) -> crate::error::Result<()> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "remote.base_url cannot be empty".to_string(),
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(crate::error::Error::InvalidConfig(format!(
                "remote.base_url must be an http(s) URL, got '{url}'"
            )));
        }
        if self.timeout_secs == 0 || self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(crate::error::Error::InvalidConfig(format!(
                "remote.timeout_secs must be in 1..={MAX_TIMEOUT_SECS}"
            )));
        }
        Ok(())
    }
}

fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
