//! Audit logging for restore writes
//!
//! Every record an import creates or overwrites is appended to an
//! append-only JSONL log, with before/after snapshots for updates.
//! Credentials are stripped from snapshots before they are written.
//!
//! # Example
//!
//! ```rust,ignore
//! use deployer_backup::audit::{AuditEntry, AuditLogger};
//! use deployer_backup::models::EntityKind;
//!
//! let logger = AuditLogger::new(paths.audit_log());
//! let entry = AuditEntry::create(EntityKind::DeploymentTarget, id, Some(tenant), snapshot);
//! logger.log(&entry)?;
//! ```

mod entry;
mod logger;

pub use entry::{AuditEntry, Operation};
pub use logger::AuditLogger;
