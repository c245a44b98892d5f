//! Export planning: scope resolution and per-kind collection

use tracing::debug;

use crate::error::{DeployerError, DeployerResult};
use crate::models::{
    DeploymentHistory, DeploymentJob, DeploymentTarget, EntityKind, Record, TargetConfiguration,
    TenantId,
};
use crate::storage::{EntityStore, QueryScope};

use super::authorize::CallerIdentity;
use super::envelope::BackupEntities;
use super::BackupStore;

/// Which records an export covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportScope {
    /// Every tenant
    Full,
    Tenant(TenantId),
}

impl ExportScope {
    /// Resolve the effective scope for a caller and an optional tenant override
    ///
    /// Only platform administrators may pick a tenant; tenant `0` means every
    /// tenant. Anyone else always exports their own tenant, and an override is
    /// ignored.
    pub fn resolve(caller: &CallerIdentity, requested: Option<TenantId>) -> Self {
        let scope = match requested {
            Some(tenant) if caller.platform_admin && tenant.is_platform() => Self::Full,
            Some(tenant) if caller.platform_admin => Self::Tenant(tenant),
            _ => Self::Tenant(caller.tenant_id),
        };
        debug!(caller = %caller.tenant_id, ?requested, ?scope, "resolved export scope");
        scope
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }

    /// Tenant tag written into the envelope (`0` for a full backup)
    pub fn envelope_tenant(&self) -> TenantId {
        match self {
            Self::Full => TenantId::PLATFORM,
            Self::Tenant(tenant) => *tenant,
        }
    }

    fn query_scope(&self) -> QueryScope {
        match self {
            Self::Full => QueryScope::All,
            Self::Tenant(tenant) => QueryScope::Tenant(*tenant),
        }
    }
}

/// Collects every record in scope, kind by kind
pub struct ExportPlanner<'a, S> {
    store: &'a S,
}

impl<'a, S: BackupStore> ExportPlanner<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Query and serialize all four kinds in dependency order
    ///
    /// Any failed query or record aborts the whole export.
    pub fn collect(&self, scope: ExportScope) -> DeployerResult<BackupEntities> {
        let mut entities = BackupEntities::default();
        for kind in EntityKind::DEPENDENCY_ORDER {
            let records = match kind {
                EntityKind::DeploymentTarget => self.collect_kind::<DeploymentTarget>(scope)?,
                EntityKind::TargetConfiguration => {
                    self.collect_kind::<TargetConfiguration>(scope)?
                }
                EntityKind::DeploymentJob => self.collect_kind::<DeploymentJob>(scope)?,
                EntityKind::DeploymentHistory => self.collect_kind::<DeploymentHistory>(scope)?,
            };
            entities.set_collection(kind, records);
        }
        Ok(entities)
    }

    fn collect_kind<E>(&self, scope: ExportScope) -> DeployerResult<Vec<serde_json::Value>>
    where
        E: Record,
        S: EntityStore<E>,
    {
        let kind = E::KIND;
        let records = <S as EntityStore<E>>::query(self.store, scope.query_scope()).map_err(|e| {
            DeployerError::Export(format!("export {}: {}", kind.collection_name(), e))
        })?;

        let values = records
            .iter()
            .map(|record| {
                serde_json::to_value(record).map_err(|e| {
                    DeployerError::Export(format!(
                        "marshal {} {}: {}",
                        kind.entity_name(),
                        record.id_string(),
                        e
                    ))
                })
            })
            .collect::<DeployerResult<Vec<_>>>()?;

        debug!(kind = %kind, count = values.len(), "collected records");
        Ok(values)
    }
}
