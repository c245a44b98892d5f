//! Core data models for deployer-backup
//!
//! The four entity kinds covered by backups, their typed identifiers, and the
//! `Record` trait the store and the backup engine work through.

pub mod configuration;
pub mod history;
pub mod ids;
pub mod job;
pub mod record;
pub mod target;

pub use configuration::{ConfigurationStatus, TargetConfiguration};
pub use history::{DeploymentHistory, HistoryAction, HistoryResult};
pub use ids::{
    DeploymentHistoryId, DeploymentJobId, DeploymentTargetId, TargetConfigurationId, TenantId,
};
pub use job::{DeploymentJob, JobStatus, TriggerSource};
pub use record::{AuditFields, EntityKind, Record};
pub use target::DeploymentTarget;
