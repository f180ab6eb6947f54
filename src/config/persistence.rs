use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};

use super::{AppConfig, get_config_dir};
use crate::core::error::{Result, WardenError};

pub struct ConfigWriter {
    config_path: PathBuf,
    write_lock: Mutex<()>,
}

impl ConfigWriter {
    #[must_use]
    pub const fn new(config_path: PathBuf) -> Self {
        Self {
            config_path,
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_default_path() -> Option<Self> {
        get_config_dir().map(|dir| Self::new(dir.join("config.toml")))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Writes a default config, refusing to overwrite an existing file.
    pub fn init_default(&self) -> Result<PathBuf> {
        let _lock = self.write_lock.lock();

        if self.config_path.exists() {
            return Err(WardenError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("Config file already exists at {}", self.config_path.display()),
            )));
        }

        self.atomic_write(&AppConfig::default())?;
        Ok(self.config_path.clone())
    }

    fn atomic_write(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_content = toml::to_string_pretty(config)
            .map_err(|e| WardenError::Config(format!("Failed to render config: {e}")))?;
        let content = format!(
            "# Warden Configuration\n\
             # Capability patterns use {{ type = \"exact\" | \"glob\" | \"regex\", pattern = \"...\" }}.\n\n\
             {toml_content}"
        );

        let temp_path = self.config_path.with_extension("toml.tmp");
        fs::write(&temp_path, &content)?;

        fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}
