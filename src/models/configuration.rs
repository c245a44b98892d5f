//! Target configuration model
//!
//! Provider-specific settings and encrypted credentials for one delivery
//! endpoint. The credentials are ciphertext produced elsewhere; this crate
//! only moves them between stores and keeps them out of logs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{TargetConfigurationId, TenantId};
use super::record::{AuditFields, EntityKind, Record};

/// Health of a target configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigurationStatus {
    #[default]
    Active,
    Inactive,
    Error,
}

impl fmt::Display for ConfigurationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Inactive => write!(f, "Inactive"),
            Self::Error => write!(f, "Error"),
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfiguration {
    pub id: TargetConfigurationId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Provider key, e.g. "webhook" or "aws_acm"
    pub provider_type: String,

    #[serde(default)]
    pub credentials_encrypted: String,

    /// Provider settings blob
    #[serde(default)]
    pub config: serde_json::Value,

    #[serde(default)]
    pub status: ConfigurationStatus,

    #[serde(default)]
    pub status_message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_deployment_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub audit: AuditFields,
}

impl TargetConfiguration {
    pub fn new(
        tenant_id: TenantId,
        name: impl Into<String>,
        provider_type: impl Into<String>,
    ) -> Self {
        Self {
            id: TargetConfigurationId::new(),
            tenant_id: Some(tenant_id),
            name: name.into(),
            description: String::new(),
            provider_type: provider_type.into(),
            credentials_encrypted: String::new(),
            config: serde_json::Value::Null,
            status: ConfigurationStatus::default(),
            status_message: String::new(),
            last_deployment_at: None,
            audit: AuditFields {
                create_time: Some(Utc::now()),
                ..AuditFields::default()
            },
        }
    }
}

// Credentials never reach Debug output.
impl fmt::Debug for TargetConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfiguration")
            .field("id", &self.id)
            .field("tenant_id", &self.tenant_id)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("provider_type", &self.provider_type)
            .field("credentials_encrypted", &"<redacted>")
            .field("config", &self.config)
            .field("status", &self.status)
            .field("status_message", &self.status_message)
            .field("last_deployment_at", &self.last_deployment_at)
            .field("audit", &self.audit)
            .finish()
    }
}

impl Record for TargetConfiguration {
    type Id = TargetConfigurationId;

    const KIND: EntityKind = EntityKind::TargetConfiguration;

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
        self.provider_type = incoming.provider_type;
        self.credentials_encrypted = incoming.credentials_encrypted;
        self.config = incoming.config;
        self.status = incoming.status;
        self.status_message = incoming.status_message;
        if incoming.last_deployment_at.is_some() {
            self.last_deployment_at = incoming.last_deployment_at;
        }
        self.audit.merge_from(&incoming.audit, now);
    }

    fn audit_snapshot(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(object) = value.as_object_mut() {
            object.remove("credentials_encrypted");
        }
        value
    }
}
