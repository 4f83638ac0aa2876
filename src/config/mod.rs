//! # Configuration Management Module
//!
//! TOML-backed configuration for the hammerkit binary, with serde defaults
//! so a partial (or missing) file still yields a runnable setup.
//!
//! ## Configuration Structure
//!
//! The configuration is organized into logical sections:
//!
//! - [`GameConfig`] - Gameplay pacing for the demo loop
//! - [`StorageConfig`] - Where the settings database lives
//! - [`StoreConfig`] - Sandbox storefront seeding
//! - [`LoggingConfig`] - Logging level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hammerkit::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("data dir: {}", config.storage.data_dir);
//!
//!     // Write a fresh default configuration file
//!     Config::create_default("config.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [game]
//! auto_hammer_interval_ms = 100
//!
//! [storage]
//! data_dir = "./data"
//!
//! [store]
//! sandbox_owned = ["ht1"]
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Milliseconds between automatic hammer strikes in the demo loop.
    #[serde(default = "default_auto_hammer_interval_ms")]
    pub auto_hammer_interval_ms: u64,
}

fn default_auto_hammer_interval_ms() -> u64 {
    100
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            auto_hammer_interval_ms: default_auto_hammer_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Optional override for the settings database path; defaults to
    /// `<data_dir>/settings`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_db_path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            settings_db_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Product ids the sandbox storefront treats as already purchased
    /// platform-side, as if bought on another device.
    #[serde(default)]
    pub sandbox_owned: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Where the settings database lives: the explicit override, or
    /// `<data_dir>/settings`.
    pub fn settings_db_path(&self) -> PathBuf {
        match &self.storage.settings_db_path {
            Some(path) => PathBuf::from(path),
            None => Path::new(&self.storage.data_dir).join("settings"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_runnable() {
        let config = Config::default();
        assert_eq!(config.game.auto_hammer_interval_ms, 100);
        assert_eq!(config.storage.data_dir, "./data");
        assert!(config.store.sandbox_owned.is_empty());
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn empty_file_parses_to_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.game.auto_hammer_interval_ms, 100);
        assert_eq!(config.storage.data_dir, "./data");
    }

    #[test]
    fn partial_sections_keep_their_defaults() {
        let config: Config = toml::from_str(
            r#"
            [store]
            sandbox_owned = ["ht1", "hw1"]

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.store.sandbox_owned, vec!["ht1", "hw1"]);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.game.auto_hammer_interval_ms, 100);
    }

    #[test]
    fn settings_db_path_joins_the_data_dir() {
        let config = Config::default();
        assert_eq!(config.settings_db_path(), PathBuf::from("./data/settings"));
    }

    #[test]
    fn settings_db_path_override_wins() {
        let mut config = Config::default();
        config.storage.settings_db_path = Some("/tmp/alt-settings".to_string());
        assert_eq!(
            config.settings_db_path(),
            PathBuf::from("/tmp/alt-settings")
        );
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let content = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&content).unwrap();
        assert_eq!(parsed.storage.data_dir, "./data");
        assert_eq!(parsed.logging.level, "info");
    }
}
