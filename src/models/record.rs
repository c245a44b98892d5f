//! Shared record behaviour for the four backed-up entity kinds
//!
//! `Record` is what the store, the export planner and the import reconciler
//! know about an entity. Every kind declares its place in the dependency order
//! through `EntityKind`.

use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::ids::TenantId;

/// The four entity kinds, declared in foreign-key dependency order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "deploymentTargets")]
    DeploymentTarget,
    #[serde(rename = "targetConfigurations")]
    TargetConfiguration,
    #[serde(rename = "deploymentJobs")]
    DeploymentJob,
    #[serde(rename = "deploymentHistory")]
    DeploymentHistory,
}

impl EntityKind {
    /// All kinds, referenced kinds first
    pub const DEPENDENCY_ORDER: [EntityKind; 4] = [
        EntityKind::DeploymentTarget,
        EntityKind::TargetConfiguration,
        EntityKind::DeploymentJob,
        EntityKind::DeploymentHistory,
    ];

    /// Name of the envelope collection holding this kind (also its serde name)
    pub fn collection_name(&self) -> &'static str {
        match self {
            Self::DeploymentTarget => "deploymentTargets",
            Self::TargetConfiguration => "targetConfigurations",
            Self::DeploymentJob => "deploymentJobs",
            Self::DeploymentHistory => "deploymentHistory",
        }
    }

    /// Human-readable entity name used in errors
    pub fn entity_name(&self) -> &'static str {
        match self {
            Self::DeploymentTarget => "DeploymentTarget",
            Self::TargetConfiguration => "TargetConfiguration",
            Self::DeploymentJob => "DeploymentJob",
            Self::DeploymentHistory => "DeploymentHistory",
        }
    }

    /// Whether records of this kind carry their own tenant column
    pub fn has_tenant_column(&self) -> bool {
        !matches!(self, Self::DeploymentHistory)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.collection_name())
    }
}

/// Who created and last touched a record, and when
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_by: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_by: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
}

impl AuditFields {
    /// Apply the audit fields of an incoming record on update
    ///
    /// `create_time` is kept; absent actors leave the stored actor in place.
    pub fn merge_from(&mut self, incoming: &AuditFields, now: DateTime<Utc>) {
        if incoming.create_by.is_some() {
            self.create_by = incoming.create_by;
        }
        if incoming.update_by.is_some() {
            self.update_by = incoming.update_by;
        }
        self.update_time = Some(now);
    }
}

/// A persisted entity that can be exported and reconciled on import
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Id: Copy + Eq + Hash + fmt::Display + Send + Sync + 'static;

    const KIND: EntityKind;

    fn id(&self) -> Self::Id;

    /// Full identifier, as it appears in the serialized record
    fn id_string(&self) -> String;

    /// Tenant column of the record, if the kind has one and it is set
    fn tenant_id(&self) -> Option<TenantId>;

    /// Overwrite the tenant column (no-op for kinds without one)
    fn assign_tenant(&mut self, tenant: TenantId);

    fn create_time(&self) -> Option<DateTime<Utc>>;

    /// Set the creation timestamp unless the record already has one
    fn stamp_created(&mut self, now: DateTime<Utc>);

    /// Copy every mutable field from `incoming`. Id and tenant stay untouched.
    fn merge_from(&mut self, incoming: Self, now: DateTime<Utc>);

    /// JSON snapshot written to the audit log
    fn audit_snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
