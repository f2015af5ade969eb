// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration module.
//!
//! Handles loading and saving printer settings.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Placeholder used for devices that do not report a name.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown";

/// Shortest connection attempt the configuration may ask for.
pub const MIN_CONNECT_TIMEOUT_SECS: u64 = 1;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bluetooth settings.
    pub bluetooth: BluetoothConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// Adapter to use (e.g. "hci0"). The default adapter when unset.
    pub adapter: Option<String>,

    /// Power the adapter on at startup if it is off.
    pub power_on: bool,

    /// Upper bound for a single connection attempt, in seconds.
    /// Values below [`MIN_CONNECT_TIMEOUT_SECS`] are raised to it.
    pub connect_timeout_secs: u64,

    /// Fixed RFCOMM channel of the printer.
    /// When unset the channel is resolved through the SPP service record.
    pub rfcomm_channel: Option<u8>,

    /// Name reported for devices without one.
    pub unknown_device_name: String,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            adapter: None,
            power_on: true,
            connect_timeout_secs: 15,
            rfcomm_channel: None,
            unknown_device_name: UNKNOWN_DEVICE_NAME.to_string(),
        }
    }
}

impl BluetoothConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(MIN_CONNECT_TIMEOUT_SECS))
    }
}

impl Config {
    /// Default location of the configuration file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("spp-printer")
            .join("config.toml")
    }

    /// Load configuration from the default file or create it.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from `path`, writing defaults there if it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            if config.bluetooth.connect_timeout_secs < MIN_CONNECT_TIMEOUT_SECS {
                warn!(
                    "connect_timeout_secs = {} is too short, using {}s",
                    config.bluetooth.connect_timeout_secs, MIN_CONNECT_TIMEOUT_SECS
                );
            }
            return Ok(config);
        }

        let config = Self::default();
        config.save_to(path)?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.bluetooth.connect_timeout_secs, 15);
        assert_eq!(config.bluetooth.unknown_device_name, "Unknown");
        assert!(config.bluetooth.power_on);
        assert!(config.bluetooth.rfcomm_channel.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bluetooth]\nrfcomm_channel = 1\nadapter = \"hci1\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.bluetooth.rfcomm_channel, Some(1));
        assert_eq!(config.bluetooth.adapter.as_deref(), Some("hci1"));
        assert_eq!(config.bluetooth.connect_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.bluetooth.connect_timeout_secs = 5;
        config.bluetooth.unknown_device_name = "Printer".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.bluetooth.connect_timeout_secs, 5);
        assert_eq!(loaded.bluetooth.unknown_device_name, "Printer");
    }

    #[test]
    fn test_zero_timeout_is_raised() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bluetooth]\nconnect_timeout_secs = 0\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(
            config.bluetooth.connect_timeout(),
            Duration::from_secs(MIN_CONNECT_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bluetooth\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }
}
