pub mod persistence;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::capability::types::Pattern;
use crate::core::error::{Result, WardenError};

pub use persistence::ConfigWriter;

pub fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .map(|h| h.join("Library/Application Support/warden"))
    }

    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
            .map(|c| c.join("warden"))
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .map(|a| a.join("warden"))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .map(|h| h.join(".config/warden"))
    }
}

/// Where outcomes are delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Spawned onto the tokio runtime.
    #[default]
    Runtime,
    /// Queued for a dedicated delivery loop.
    Queued,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub mode: DeliveryMode,
}

/// Static capability table for hosts without a platform binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub known: Vec<Pattern>,
    pub granted: Vec<Pattern>,
    pub permanently_denied: Vec<Pattern>,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    #[default]
    Grant,
    Deny,
    DenyPermanently,
    Fail,
    Abandon,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenterConfig {
    pub answer: Answer,
    pub delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub delivery: DeliveryConfig,
    pub platform: PlatformConfig,
    pub presenter: PresenterConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
            delivery: DeliveryConfig::default(),
            platform: PlatformConfig::default(),
            presenter: PresenterConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the default config file (if any) plus `WARDEN_*` overrides,
    /// falling back to defaults on error.
    #[must_use]
    pub fn load() -> Self {
        let mut builder = Config::builder();

        if let Some(path) = Self::get_config_path() {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder
            .add_source(Self::environment())
            .build()
            .and_then(Config::try_deserialize)
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config: {e}");
                Self::default()
            })
    }

    /// Loads an explicit config file plus `WARDEN_*` overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        Config::builder()
            .add_source(File::from(path).required(true))
            .add_source(Self::environment())
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| WardenError::Config(format!("{}: {e}", path.display())))
    }

    fn environment() -> Environment {
        Environment::with_prefix("WARDEN")
            .prefix_separator("_")
            .separator("__")
    }

    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        get_config_dir().map(|dir| dir.join("config.toml"))
    }
}
