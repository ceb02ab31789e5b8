//! Configuration file handling

use crate::coordinator::JobOptions;
use crate::engine::EngineOptions;
use crate::error::{ReconError, Result};
use crate::loader::LoaderOptions;
use crate::notify::NotificationConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// All settings, usually read from `<store>/config.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcylConfig {
    pub loader: LoaderOptions,
    pub engine: EngineOptions,
    pub jobs: JobOptions,
    /// Outbound delivery; notifications are skipped when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationConfig>,
}

impl ReconcylConfig {
    /// Read and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ReconError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            ReconError::config(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given and present, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Configuration written by `init`: defaults plus a notification section,
    /// so recipients given at submit time are delivered
    pub fn starter() -> Self {
        Self {
            notification: Some(NotificationConfig::default()),
            ..Self::default()
        }
    }

    /// Write the starter configuration. Existing files are kept unless `force` is set.
    /// Returns whether a file was written.
    pub fn write_default(path: &Path, force: bool) -> Result<bool> {
        if path.exists() && !force {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&Self::starter())?)?;
        Ok(true)
    }

    pub fn validate(&self) -> Result<()> {
        self.loader.validate()?;
        self.jobs.validate()?;
        if let Some(notification) = &self.notification {
            if notification.sender.trim().is_empty() {
                return Err(ReconError::config("notification.sender must not be empty"));
            }
        }
        Ok(())
    }
}
