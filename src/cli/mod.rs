//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup service.

pub mod audit;
pub mod backup;

pub use audit::{handle_audit_command, AuditArgs};
pub use backup::{handle_backup_command, BackupCommands};
