//! Backup envelope format
//!
//! The envelope is a self-describing JSON document: module identity, format
//! version, export time, tenant, the full-backup flag, and one collection of
//! serialized records per entity kind. Records stay opaque JSON values here;
//! they are only turned into entities by the reconciler.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{DeployerError, DeployerResult};
use crate::models::{EntityKind, TenantId};

use super::{BACKUP_MODULE, BACKUP_VERSION};

/// Record counts keyed by entity kind, in dependency order
pub type EntityCounts = BTreeMap<EntityKind, usize>;

/// Read an explicit `null` the same way as an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The exchangeable backup document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub module: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub exported_at: DateTime<Utc>,

    /// Exported tenant; `0` together with `full_backup` means every tenant
    #[serde(default, deserialize_with = "null_as_default")]
    pub tenant_id: TenantId,

    #[serde(default, deserialize_with = "null_as_default")]
    pub full_backup: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub data: BackupEntities,
}

/// Serialized records per entity kind
///
/// An absent or empty collection means the backup holds no records of that
/// kind; it never means "delete what is there".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntities {
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub deployment_targets: Vec<serde_json::Value>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub target_configurations: Vec<serde_json::Value>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub deployment_jobs: Vec<serde_json::Value>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub deployment_history: Vec<serde_json::Value>,
}

impl BackupEntities {
    pub fn collection(&self, kind: EntityKind) -> &[serde_json::Value] {
        match kind {
            EntityKind::DeploymentTarget => &self.deployment_targets,
            EntityKind::TargetConfiguration => &self.target_configurations,
            EntityKind::DeploymentJob => &self.deployment_jobs,
            EntityKind::DeploymentHistory => &self.deployment_history,
        }
    }

    pub fn set_collection(&mut self, kind: EntityKind, records: Vec<serde_json::Value>) {
        match kind {
            EntityKind::DeploymentTarget => self.deployment_targets = records,
            EntityKind::TargetConfiguration => self.target_configurations = records,
            EntityKind::DeploymentJob => self.deployment_jobs = records,
            EntityKind::DeploymentHistory => self.deployment_history = records,
        }
    }

    /// Number of records per kind, every kind included
    pub fn counts(&self) -> EntityCounts {
        EntityKind::DEPENDENCY_ORDER
            .iter()
            .map(|kind| (*kind, self.collection(*kind).len()))
            .collect()
    }

    pub fn total(&self) -> usize {
        self.counts().values().sum()
    }
}

impl BackupEnvelope {
    /// Wrap exported collections for the current module and format version
    pub fn new(tenant_id: TenantId, full_backup: bool, data: BackupEntities) -> Self {
        Self {
            module: BACKUP_MODULE.to_string(),
            version: BACKUP_VERSION.to_string(),
            exported_at: Utc::now(),
            tenant_id,
            full_backup,
            data,
        }
    }

    /// Serialize to bytes
    pub fn encode(&self, pretty: bool) -> DeployerResult<Vec<u8>> {
        if pretty {
            serde_json::to_vec_pretty(self)
        } else {
            serde_json::to_vec(self)
        }
        .map_err(|e| DeployerError::Export(format!("marshal backup: {}", e)))
    }

    /// Parse bytes into an envelope
    ///
    /// Only structure is checked; module and version are the authorizer's job.
    pub fn decode(bytes: &[u8]) -> DeployerResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| DeployerError::MalformedEnvelope(e.to_string()))
    }

    /// Describe the envelope without applying it
    pub fn summary(&self) -> EnvelopeSummary {
        EnvelopeSummary {
            module: self.module.clone(),
            version: self.version.clone(),
            exported_at: self.exported_at,
            tenant_id: self.tenant_id,
            full_backup: self.full_backup,
            entity_counts: self.data.counts(),
            compatible: self.module == BACKUP_MODULE && self.version == BACKUP_VERSION,
        }
    }
}

/// What an envelope contains, as reported by `inspect`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeSummary {
    pub module: String,
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub tenant_id: TenantId,
    pub full_backup: bool,
    pub entity_counts: EntityCounts,
    /// Whether module and version match this build
    pub compatible: bool,
}
