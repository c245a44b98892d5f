//! User settings for deployer-backup
//!
//! Manages defaults for export encoding, restore merge mode, audit logging
//! and the log filter.

use serde::{Deserialize, Serialize};

use super::paths::DeployerPaths;
use crate::backup::MergeMode;
use crate::error::DeployerError;

/// Settings for deployer-backup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Merge mode used by `import` when none is given
    #[serde(default)]
    pub default_merge_mode: MergeMode,

    /// Whether exported envelopes are pretty-printed
    #[serde(default = "default_true")]
    pub pretty_export: bool,

    /// Whether records written by an import are recorded in the audit log
    #[serde(default = "default_true")]
    pub audit_imports: bool,

    /// `tracing` filter directive used when RUST_LOG is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            default_merge_mode: MergeMode::default(),
            pretty_export: true,
            audit_imports: true,
            log_filter: default_log_filter(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or fall back to defaults if the file doesn't exist
    pub fn load_or_create(paths: &DeployerPaths) -> Result<Self, DeployerError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
                DeployerError::Io(format!("Failed to read settings file: {}", e))
            })?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                DeployerError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &DeployerPaths) -> Result<(), DeployerError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            DeployerError::Config(format!("Failed to serialize settings: {}", e))
        })?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| DeployerError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}
