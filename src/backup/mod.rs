//! Tenant-aware backup export and restore
//!
//! Provides versioned, self-describing snapshots of the deployment entity
//! graph and restores them against an entity store.
//!
//! # Architecture
//!
//! - `ExportPlanner`: resolves the export scope and collects records kind by kind
//! - `BackupEnvelope`: the exchangeable document and its JSON codec
//! - `RestoreAuthorizer`: module/version gating and full-restore permission
//! - `ImportReconciler`: per-record create/update/skip decisions with fault isolation
//! - `BackupService`: the export, import and inspect entry points
//!
//! # Backup Format
//!
//! ```json
//! {
//!   "module": "deployer",
//!   "version": "1.0",
//!   "exportedAt": "2025-06-01T12:00:00Z",
//!   "tenantId": 7,
//!   "fullBackup": false,
//!   "data": {
//!     "deploymentTargets": [...],
//!     "targetConfigurations": [...],
//!     "deploymentJobs": [...],
//!     "deploymentHistory": [...]
//!   }
//! }
//! ```
//!
//! Collections are always processed in that order, so referenced records
//! are restored before the records referencing them.
//!
//! # Example
//!
//! ```rust,ignore
//! use deployer_backup::backup::{BackupService, CallerIdentity, MergeMode};
//!
//! let caller = CallerIdentity::tenant(TenantId(7));
//! let service = BackupService::new(&storage);
//!
//! let export = service.export_backup(&caller, None)?;
//! let outcome = service.import_backup(&caller, &export.data, MergeMode::Skip)?;
//! for warning in &outcome.warnings {
//!     eprintln!("{}", warning);
//! }
//! ```

mod authorize;
mod envelope;
mod export;
mod reconcile;
mod service;

pub use authorize::{AuthorizedRestore, CallerIdentity, RestoreAuthorizer, RestoreScope};
pub use envelope::{BackupEntities, BackupEnvelope, EntityCounts, EnvelopeSummary};
pub use export::{ExportPlanner, ExportScope};
pub use reconcile::{
    EntityImportResult, ImportReconciler, ImportReport, KindReconciler, MergeMode,
    RecordOutcome, RecordReconciler,
};
pub use service::{BackupService, ExportOutcome, ImportOutcome};

use crate::models::{DeploymentHistory, DeploymentJob, DeploymentTarget, TargetConfiguration};
use crate::storage::EntityStore;

/// Module identity written into and required from every envelope
pub const BACKUP_MODULE: &str = "deployer";

/// Envelope format version; other versions are rejected
pub const BACKUP_VERSION: &str = "1.0";

/// A store holding all four backed-up entity kinds
pub trait BackupStore:
    EntityStore<DeploymentTarget>
    + EntityStore<TargetConfiguration>
    + EntityStore<DeploymentJob>
    + EntityStore<DeploymentHistory>
{
}

impl<S> BackupStore for S where
    S: EntityStore<DeploymentTarget>
        + EntityStore<TargetConfiguration>
        + EntityStore<DeploymentJob>
        + EntityStore<DeploymentHistory>
{
}
