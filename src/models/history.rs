//! Deployment history model
//!
//! One row per action taken while running a job. History rows have no tenant
//! column; they belong to whichever tenant owns the parent job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{DeploymentHistoryId, DeploymentJobId, TenantId};
use super::record::{EntityKind, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    #[default]
    Deploy,
    Verify,
    Rollback,
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryResult {
    #[default]
    Success,
    Failure,
    Partial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentHistory {
    pub id: DeploymentHistoryId,

    pub job_id: DeploymentJobId,

    #[serde(default)]
    pub action: HistoryAction,

    #[serde(default)]
    pub result: HistoryResult,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub duration_ms: u64,

    #[serde(default)]
    pub details: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
}

impl DeploymentHistory {
    pub fn new(id: u64, job_id: DeploymentJobId, action: HistoryAction) -> Self {
        Self {
            id: DeploymentHistoryId(id),
            job_id,
            action,
            result: HistoryResult::default(),
            message: String::new(),
            duration_ms: 0,
            details: serde_json::Value::Null,
            create_time: Some(Utc::now()),
        }
    }
}

impl Record for DeploymentHistory {
    type Id = DeploymentHistoryId;

    const KIND: EntityKind = EntityKind::DeploymentHistory;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn id_string(&self) -> String {
        self.id.to_string()
    }

    fn tenant_id(&self) -> Option<TenantId> {
        None
    }

    fn assign_tenant(&mut self, _tenant: TenantId) {}

    fn create_time(&self) -> Option<DateTime<Utc>> {
        self.create_time
    }

    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.create_time.get_or_insert(now);
    }

    fn merge_from(&mut self, incoming: Self, _now: DateTime<Utc>) {
        self.job_id = incoming.job_id;
        self.action = incoming.action;
        self.result = incoming.result;
        self.message = incoming.message;
        self.duration_ms = incoming.duration_ms;
        self.details = incoming.details;
    }
}
