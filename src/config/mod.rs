//! Configuration module for deployer-backup
//!
//! This module provides configuration management including:
//! - XDG-compliant path resolution
//! - Settings persistence

pub mod paths;
pub mod settings;

pub use paths::DeployerPaths;
pub use settings::Settings;
