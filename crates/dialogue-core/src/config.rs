//! Gateway configuration loaded from TOML.
//!
//! Discovery order: an explicit path, then `./.dialogue/config.toml`, then
//! `config.toml` in the platform config directory. Missing files fall back to
//! defaults; an explicit path that cannot be read is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::{Authentication, remote::DEFAULT_REMOTE_URL};
use crate::error::{Error, Result};

pub const DEFAULT_API_KEY_ENV: &str = "DIALOGUE_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GatewayConfig {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteConfig {
    #[serde(default = "default_remote_url")]
    pub url: String,
    /// Environment variable holding the model proxy API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GatewaySettings {
    /// Zero disables the runner cache.
    #[serde(default)]
    pub runner_cache_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LoggingConfig {
    /// Write logs to a file in this directory instead of stdout
    pub dir: Option<PathBuf>,
}

fn default_remote_url() -> String {
    DEFAULT_REMOTE_URL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: default_remote_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Credentials read from `api_key_env`; an unset variable yields an empty key.
    pub fn authentication(&self) -> Authentication {
        Authentication {
            api_key: std::env::var(&self.api_key_env).unwrap_or_default(),
        }
    }
}

impl GatewayConfig {
    pub fn project_config() -> PathBuf {
        PathBuf::from(".dialogue").join("config.toml")
    }

    pub fn user_config() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "dialogue")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Candidate config files in discovery order.
    pub fn discover() -> Vec<PathBuf> {
        let mut paths = vec![Self::project_config()];
        if let Some(user) = Self::user_config() {
            paths.push(user);
        }
        paths
    }

    /// Load from `explicit`, or the first discovered file that exists, or defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::discover().into_iter().find(|path| path.exists()) {
            Some(path) => Self::from_file(&path),
            None => {
                debug!("No gateway config found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml(&contents)
            .map_err(|e| Error::Configuration(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "Loaded gateway config");
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Configuration(format!("Invalid config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let config = GatewayConfig::from_toml("").unwrap();
        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.remote.url, DEFAULT_REMOTE_URL);
        assert_eq!(config.gateway.runner_cache_capacity, 0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = GatewayConfig::from_toml(
            r#"
            [remote]
            url = "http://localhost:1959"

            [gateway]
            runner_cache_capacity = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.remote.url, "http://localhost:1959");
        assert_eq!(config.remote.api_key_env, DEFAULT_API_KEY_ENV);
        assert_eq!(config.remote.timeout(), Duration::from_secs(120));
        assert_eq!(config.gateway.runner_cache_capacity, 8);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GatewayConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn explicit_path_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind = \"0.0.0.0\"\nport = 9100").unwrap();

        let config = GatewayConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 9100);
    }

    #[test]
    fn invalid_toml_is_reported() {
        let err = GatewayConfig::from_toml("remote = [").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn project_config_is_discovered_first() {
        assert_eq!(
            GatewayConfig::discover()[0],
            PathBuf::from(".dialogue/config.toml")
        );
    }
}
