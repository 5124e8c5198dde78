//! Configuration management for Gale.
//!
//! This module handles loading, saving, and managing Gale configuration.
//!
//! ## Configuration File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/gale/config.toml` |
//! | macOS | `~/Library/Application Support/Gale/config.toml` |
//! | Windows | `%APPDATA%\Gale\config.toml` |
//!
//! The configuration is a snapshot: it is loaded once at startup and handed
//! to the core by value. Nothing in the core re-reads the file per request;
//! calling [`Config::load`] again is the explicit reload operation.

use std::collections::HashSet;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Main configuration struct for Gale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Share settings
    pub share: ShareConfig,
    /// Network settings
    pub network: NetworkConfig,
    /// Security settings
    pub security: SecurityConfig,
}

/// General configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Display name announced to the network
    pub device_name: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            device_name: hostname::get().map_or_else(
                |_| "Gale Device".to_string(),
                |h| h.to_string_lossy().to_string(),
            ),
        }
    }
}

/// Share configuration options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Directory tree exposed to peers. Empty means "not configured";
    /// the CLI requires a root before serving.
    pub root: PathBuf,
}

/// Network configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// HTTP port for the file API
    pub port: u16,
    /// Discovery port (UDP)
    pub discovery_port: u16,
    /// Interval between presence broadcasts
    #[serde(with = "duration_secs")]
    pub broadcast_interval: Duration,
    /// Bind the HTTP server to localhost only
    pub localhost_only: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: crate::DEFAULT_SHARE_PORT,
            discovery_port: crate::DEFAULT_DISCOVERY_PORT,
            broadcast_interval: crate::DEFAULT_BROADCAST_INTERVAL,
            localhost_only: false,
        }
    }
}

/// Security configuration options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Caller addresses admitted without a secret
    pub allowed_ips: HashSet<IpAddr>,
    /// Shared secret required from callers not on the allow list.
    /// Empty means anyone may connect.
    pub access_secret: String,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// If the configuration file doesn't exist, returns the default
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be
    /// read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::Error::Config(format!("failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| crate::error::Error::Config(format!("failed to parse config: {e}")))
    }

    /// Save configuration to the default location.
    ///
    /// Creates the configuration directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                crate::error::Error::Config(format!("failed to create config directory: {e}"))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::Error::Config(format!("failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| crate::error::Error::Config(format!("failed to write config: {e}")))
    }

    /// Get the default configuration directory path.
    #[must_use]
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "gale", "Gale")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the full path to the configuration file.
    #[must_use]
    pub fn config_path() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.strip_suffix('s')
            .map(|secs| {
                secs.parse()
                    .map(Duration::from_secs)
                    .map_err(serde::de::Error::custom)
            })
            .or_else(|| {
                s.strip_suffix('m').map(|mins| {
                    mins.parse::<u64>()
                        .map(|m| Duration::from_secs(m * 60))
                        .map_err(serde::de::Error::custom)
                })
            })
            .unwrap_or_else(|| Err(serde::de::Error::custom("invalid duration format")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.network.port, crate::DEFAULT_SHARE_PORT);
        assert_eq!(config.network.discovery_port, crate::DEFAULT_DISCOVERY_PORT);
        assert_eq!(
            config.network.broadcast_interval,
            crate::DEFAULT_BROADCAST_INTERVAL
        );
        assert!(config.security.allowed_ips.is_empty());
        assert!(config.security.access_secret.is_empty());
        assert!(!config.general.device_name.is_empty());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.general.device_name = "Test Device".into();
        config.share.root = PathBuf::from("/srv/public");
        config.network.port = 9000;
        config.network.broadcast_interval = Duration::from_secs(2);
        config.security.access_secret = "hunter2".into();
        config
            .security
            .allowed_ips
            .insert("192.168.1.5".parse().unwrap());

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded.general.device_name, "Test Device");
        assert_eq!(loaded.share.root, PathBuf::from("/srv/public"));
        assert_eq!(loaded.network.port, 9000);
        assert_eq!(loaded.network.broadcast_interval, Duration::from_secs(2));
        assert_eq!(loaded.security.access_secret, "hunter2");
        assert!(loaded
            .security
            .allowed_ips
            .contains(&"192.168.1.5".parse().unwrap()));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.network.port, crate::DEFAULT_SHARE_PORT);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[network]\nport = 9999\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.network.port, 9999);
        assert_eq!(config.network.discovery_port, crate::DEFAULT_DISCOVERY_PORT);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not valid toml [[").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_duration_minutes_suffix() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[network]\nbroadcast_interval = \"2m\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.network.broadcast_interval, Duration::from_secs(120));
    }
}
