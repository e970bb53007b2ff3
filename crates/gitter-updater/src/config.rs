//! Configuration for the update system.
//!
//! Defines polling cadence, notification cadence, and network settings.
//! All intervals have fixed defaults matching the app's shipped behavior;
//! a TOML file can override them.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::UpdateError;

/// Main update configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// URL of the remote update manifest
    #[serde(default = "default_manifest_url")]
    pub manifest_url: String,

    /// Seconds between update checks, counted from the completion of the
    /// previous check
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Seconds between re-displays of an "update available" notification
    #[serde(default = "default_notify_interval")]
    pub notify_interval_secs: u64,

    /// Seconds to let a freshly started new version come up before the
    /// installer process exits
    #[serde(default = "default_restart_grace")]
    pub restart_grace_secs: u64,

    /// Directory for staging downloaded packages (empty = system temp dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,

    /// Network configuration
    #[serde(default)]
    pub network: NetworkConfig,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            manifest_url: default_manifest_url(),
            check_interval_secs: default_check_interval(),
            notify_interval_secs: default_notify_interval(),
            restart_grace_secs: default_restart_grace(),
            staging_dir: None,
            network: NetworkConfig::default(),
        }
    }
}

impl UpdateConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self, UpdateError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| UpdateError::ConfigError(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), UpdateError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| UpdateError::ConfigError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Interval between update checks.
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Interval between notification re-displays.
    pub fn notify_interval(&self) -> Duration {
        Duration::from_secs(self.notify_interval_secs)
    }

    /// Grace delay before the installer process exits.
    pub fn restart_grace(&self) -> Duration {
        Duration::from_secs(self.restart_grace_secs)
    }

    /// Get the staging directory, using the system temp dir if not set.
    pub fn staging_dir(&self) -> PathBuf {
        if let Some(dir) = &self.staging_dir {
            dir.clone()
        } else {
            std::env::temp_dir().join("gitter-update")
        }
    }
}

/// Network configuration for manifest fetches and downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Read timeout for streaming downloads in seconds
    #[serde(default = "default_read_timeout")]
    pub read_timeout_seconds: u64,

    /// User agent string (empty = crate name and version)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            read_timeout_seconds: default_read_timeout(),
            user_agent: None,
        }
    }
}

impl NetworkConfig {
    /// Get the user agent, using the crate default if not set.
    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("gitter-updater/{}", env!("CARGO_PKG_VERSION")))
    }
}

// Default value functions for serde

fn default_manifest_url() -> String {
    "https://update.gitter.im/manifest.json".to_string()
}

fn default_check_interval() -> u64 {
    30 * 60 // 30 minutes
}

fn default_notify_interval() -> u64 {
    30
}

fn default_restart_grace() -> u64 {
    5
}

fn default_timeout() -> u64 {
    30
}

fn default_read_timeout() -> u64 {
    60
}
