//! Deployment job model
//!
//! A job records one attempt to push a certificate to a target or a single
//! configuration. Jobs are only stored and restored here, never executed.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{DeploymentJobId, DeploymentTargetId, TargetConfigurationId, TenantId};
use super::record::{AuditFields, EntityKind, Record};

/// Lifecycle state of a deployment job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Retrying,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Processing => write!(f, "Processing"),
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::Retrying => write!(f, "Retrying"),
        }
    }
}

/// What caused a job to be created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerSource {
    #[default]
    Manual,
    Event,
    AutoRenewal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentJob {
    pub id: DeploymentJobId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_target_id: Option<DeploymentTargetId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_configuration_id: Option<TargetConfigurationId>,

    /// Set on the per-configuration children of a target-level job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_job_id: Option<DeploymentJobId>,

    pub certificate_id: String,

    #[serde(default)]
    pub certificate_serial: String,

    #[serde(default)]
    pub status: JobStatus,

    #[serde(default)]
    pub status_message: String,

    /// Completion percentage, 0-100
    #[serde(default)]
    pub progress: u32,

    #[serde(default)]
    pub retry_count: u32,

    #[serde(default)]
    pub max_retries: u32,

    #[serde(default)]
    pub triggered_by: TriggerSource,

    /// Provider result blob
    #[serde(default)]
    pub result: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub audit: AuditFields,
}

impl DeploymentJob {
    pub fn new(tenant_id: TenantId, certificate_id: impl Into<String>) -> Self {
        Self {
            id: DeploymentJobId::new(),
            tenant_id: Some(tenant_id),
            deployment_target_id: None,
            target_configuration_id: None,
            parent_job_id: None,
            certificate_id: certificate_id.into(),
            certificate_serial: String::new(),
            status: JobStatus::default(),
            status_message: String::new(),
            progress: 0,
            retry_count: 0,
            max_retries: 3,
            triggered_by: TriggerSource::default(),
            result: serde_json::Value::Null,
            started_at: None,
            audit: AuditFields {
                create_time: Some(Utc::now()),
                ..AuditFields::default()
            },
        }
    }

    /// Create a job bound to a deployment target
    pub fn for_target(
        tenant_id: TenantId,
        target_id: DeploymentTargetId,
        certificate_id: impl Into<String>,
    ) -> Self {
        let mut job = Self::new(tenant_id, certificate_id);
        job.deployment_target_id = Some(target_id);
        job
    }
}

impl Record for DeploymentJob {
    type Id = DeploymentJobId;

    const KIND: EntityKind = EntityKind::DeploymentJob;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn id_string(&self) -> String {
        self.id.as_uuid().to_string()
    }

    fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    fn assign_tenant(&mut self, tenant: TenantId) {
        self.tenant_id = Some(tenant);
    }

    fn create_time(&self) -> Option<DateTime<Utc>> {
        self.audit.create_time
    }

    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.audit.create_time.get_or_insert(now);
    }

    fn merge_from(&mut self, incoming: Self, now: DateTime<Utc>) {
        // Absent references leave the stored relationship in place.
        if incoming.deployment_target_id.is_some() {
            self.deployment_target_id = incoming.deployment_target_id;
        }
        if incoming.target_configuration_id.is_some() {
            self.target_configuration_id = incoming.target_configuration_id;
        }
        if incoming.parent_job_id.is_some() {
            self.parent_job_id = incoming.parent_job_id;
        }
        self.certificate_id = incoming.certificate_id;
        self.certificate_serial = incoming.certificate_serial;
        self.status = incoming.status;
        self.status_message = incoming.status_message;
        self.progress = incoming.progress;
        self.retry_count = incoming.retry_count;
        self.max_retries = incoming.max_retries;
        self.triggered_by = incoming.triggered_by;
        self.result = incoming.result;
        if incoming.started_at.is_some() {
            self.started_at = incoming.started_at;
        }
        self.audit.merge_from(&incoming.audit, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_references_are_not_serialized() {
        let job = DeploymentJob::new(TenantId(1), "cert-1");
        let json = serde_json::to_value(&job).unwrap();
        assert!(json.get("deployment_target_id").is_none());
        assert!(json.get("parent_job_id").is_none());
        assert_eq!(json["status"], "PENDING");
    }

    #[test]
    fn test_merge_does_not_clear_references() {
        let target_id = DeploymentTargetId::new();
        let mut stored = DeploymentJob::for_target(TenantId(1), target_id, "cert-1");

        let mut incoming = stored.clone();
        incoming.deployment_target_id = None;
        incoming.status = JobStatus::Completed;
        incoming.progress = 100;

        stored.merge_from(incoming, Utc::now());

        assert_eq!(stored.deployment_target_id, Some(target_id));
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.progress, 100);
    }

    #[test]
    fn test_merge_replaces_present_references() {
        let mut stored = DeploymentJob::for_target(TenantId(1), DeploymentTargetId::new(), "c");
        let replacement = DeploymentTargetId::new();
        let parent = DeploymentJobId::new();

        let mut incoming = stored.clone();
        incoming.deployment_target_id = Some(replacement);
        incoming.parent_job_id = Some(parent);

        stored.merge_from(incoming, Utc::now());
        assert_eq!(stored.deployment_target_id, Some(replacement));
        assert_eq!(stored.parent_job_id, Some(parent));
    }
}
