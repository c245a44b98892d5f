//! Path management for deployer-backup
//!
//! Provides XDG-compliant path resolution for configuration, entity data, and
//! the audit log.
//!
//! ## Path Resolution Order
//!
//! 1. `DEPLOYER_BACKUP_DATA_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/deployer-backup` or `~/.config/deployer-backup`
//! 3. Windows: `%APPDATA%\deployer-backup`

use std::path::PathBuf;

use crate::error::DeployerError;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "DEPLOYER_BACKUP_DATA_DIR";

/// Manages all paths used by deployer-backup
#[derive(Debug, Clone)]
pub struct DeployerPaths {
    /// Base directory for all deployer-backup data
    base_dir: PathBuf,
}

impl DeployerPaths {
    /// Create a new DeployerPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home or config directory can be determined.
    pub fn new() -> Result<Self, DeployerError> {
        let base_dir = if let Ok(custom) = std::env::var(DATA_DIR_ENV) {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create DeployerPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory holding the entity files
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the audit log
    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    pub fn deployment_targets_file(&self) -> PathBuf {
        self.data_dir().join("deployment_targets.json")
    }

    pub fn target_configurations_file(&self) -> PathBuf {
        self.data_dir().join("target_configurations.json")
    }

    pub fn deployment_jobs_file(&self) -> PathBuf {
        self.data_dir().join("deployment_jobs.json")
    }

    pub fn deployment_history_file(&self) -> PathBuf {
        self.data_dir().join("deployment_history.json")
    }

    /// Ensure the base and data directories exist
    pub fn ensure_directories(&self) -> Result<(), DeployerError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| DeployerError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| DeployerError::Io(format!("Failed to create data directory: {}", e)))?;

        Ok(())
    }
}

/// Resolve the default data directory path based on platform
#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, DeployerError> {
    let config_base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) => PathBuf::from(xdg),
        Err(_) => {
            let home = std::env::var("HOME").map_err(|_| {
                DeployerError::Config("HOME environment variable not set".into())
            })?;
            PathBuf::from(home).join(".config")
        }
    };
    Ok(config_base.join("deployer-backup"))
}

/// Resolve the default data directory path based on platform
#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, DeployerError> {
    let appdata = std::env::var("APPDATA")
        .map_err(|_| DeployerError::Config("Could not determine APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join("deployer-backup"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = DeployerPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.data_dir(), temp_dir.path().join("data"));
        assert_eq!(paths.audit_log(), temp_dir.path().join("audit.log"));
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = DeployerPaths::with_base_dir(temp_dir.path().join("nested"));

        paths.ensure_directories().unwrap();

        assert!(paths.base_dir().exists());
        assert!(paths.data_dir().exists());
    }

    #[test]
    fn test_entity_file_paths() {
        let temp_dir = TempDir::new().unwrap();
        let paths = DeployerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let data = temp_dir.path().join("data");

        assert_eq!(
            paths.deployment_targets_file(),
            data.join("deployment_targets.json")
        );
        assert_eq!(
            paths.deployment_history_file(),
            data.join("deployment_history.json")
        );
    }
}
