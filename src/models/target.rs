//! Deployment target model
//!
//! A deployment target groups the configurations certificates get pushed to,
//! and decides whether renewals trigger a deployment automatically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{DeploymentTargetId, TenantId};
use super::record::{AuditFields, EntityKind, Record};

/// A named deployment destination owned by a tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentTarget {
    pub id: DeploymentTargetId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Deploy automatically when a matching certificate renews
    #[serde(default)]
    pub auto_deploy_on_renewal: bool,

    /// Certificate selection rules, kept as opaque JSON objects
    #[serde(default)]
    pub certificate_filters: Vec<serde_json::Value>,

    #[serde(flatten)]
    pub audit: AuditFields,
}

impl DeploymentTarget {
    pub fn new(tenant_id: TenantId, name: impl Into<String>) -> Self {
        Self {
            id: DeploymentTargetId::new(),
            tenant_id: Some(tenant_id),
            name: name.into(),
            description: String::new(),
            auto_deploy_on_renewal: false,
            certificate_filters: Vec::new(),
            audit: AuditFields {
                create_time: Some(Utc::now()),
                ..AuditFields::default()
            },
        }
    }
}

impl Record for DeploymentTarget {
    type Id = DeploymentTargetId;

    const KIND: EntityKind = EntityKind::DeploymentTarget;

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
        self.name = incoming.name;
        self.description = incoming.description;
        self.auto_deploy_on_renewal = incoming.auto_deploy_on_renewal;
        self.certificate_filters = incoming.certificate_filters;
        self.audit.merge_from(&incoming.audit, now);
    }
}
