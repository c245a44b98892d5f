//! deployer-backup - Tenant-aware backup and restore for deployment configuration
//!
//! This library exports the certificate-deployment entity graph (deployment
//! targets, target configurations, deployment jobs and deployment history)
//! into a versioned, self-describing envelope, and restores such envelopes
//! into an entity store under a configurable merge policy.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: The four entity kinds and their typed identifiers
//! - `storage`: JSON file entity store
//! - `audit`: Audit logging of restore writes
//! - `backup`: Export planning, envelope codec, restore authorization and reconciliation
//! - `cli`: Command handlers
//! - `display`: Terminal output formatting
//!
//! # Example
//!
//! ```rust,ignore
//! use deployer_backup::backup::{BackupService, CallerIdentity, MergeMode};
//! use deployer_backup::config::paths::DeployerPaths;
//! use deployer_backup::storage::Storage;
//!
//! let mut storage = Storage::new(DeployerPaths::new()?)?;
//! storage.load_all()?;
//!
//! let caller = CallerIdentity::tenant(TenantId(7));
//! let export = BackupService::new(&storage).export_backup(&caller, None)?;
//! ```

pub mod audit;
pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod storage;

pub use error::{DeployerError, DeployerResult};
