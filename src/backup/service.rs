//! Backup service entry points
//!
//! Export: planner, then codec. Import: codec and authorizer, then the
//! reconciler. Inspect: codec only.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::DeployerResult;
use crate::models::TenantId;

use super::authorize::{CallerIdentity, RestoreAuthorizer};
use super::envelope::{BackupEnvelope, EntityCounts, EnvelopeSummary};
use super::export::{ExportPlanner, ExportScope};
use super::reconcile::{EntityImportResult, ImportReconciler, MergeMode};
use super::BackupStore;

/// A finished export
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    /// Encoded envelope
    pub data: Vec<u8>,
    pub module: String,
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub tenant_id: TenantId,
    pub full_backup: bool,
    pub entity_counts: EntityCounts,
}

/// A finished import, possibly with failed records
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    /// The import ran to completion; per-record failures are in `warnings`
    pub success: bool,
    pub results: Vec<EntityImportResult>,
    pub warnings: Vec<String>,
    pub cancelled: bool,
}

impl ImportOutcome {
    pub fn total_failed(&self) -> usize {
        self.results.iter().map(|r| r.failed).sum()
    }
}

/// Export, import and inspect backups against an entity store
pub struct BackupService<'a, S> {
    store: &'a S,
    pretty: bool,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, S: BackupStore> BackupService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            pretty: true,
            cancel: None,
        }
    }

    /// Indent exported envelopes (the default) or write them compact
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Observe `flag` between records during import
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Export every record the caller may see
    ///
    /// Either the whole export succeeds or nothing is returned.
    pub fn export_backup(
        &self,
        caller: &CallerIdentity,
        requested_tenant: Option<TenantId>,
    ) -> DeployerResult<ExportOutcome> {
        let scope = ExportScope::resolve(caller, requested_tenant);
        let entities = ExportPlanner::new(self.store).collect(scope)?;

        let envelope = BackupEnvelope::new(scope.envelope_tenant(), scope.is_full(), entities);
        let data = envelope.encode(self.pretty)?;
        let entity_counts = envelope.data.counts();

        info!(
            module = %envelope.module,
            tenant = %envelope.tenant_id,
            full = envelope.full_backup,
            records = envelope.data.total(),
            "exported backup"
        );

        Ok(ExportOutcome {
            data,
            module: envelope.module,
            version: envelope.version,
            exported_at: envelope.exported_at,
            tenant_id: envelope.tenant_id,
            full_backup: envelope.full_backup,
            entity_counts,
        })
    }

    /// Restore an encoded envelope
    ///
    /// Errors are structural only (malformed envelope, module or version
    /// mismatch, forbidden full restore); nothing is written when one occurs.
    pub fn import_backup(
        &self,
        caller: &CallerIdentity,
        data: &[u8],
        mode: MergeMode,
    ) -> DeployerResult<ImportOutcome> {
        let restore = RestoreAuthorizer::new(*caller).authorize(data)?;

        let mut reconciler = ImportReconciler::new(self.store, restore.scope, mode);
        if let Some(flag) = &self.cancel {
            reconciler = reconciler.with_cancellation(Arc::clone(flag));
        }
        let report = reconciler.run(&restore.envelope.data);

        info!(
            module = %restore.envelope.module,
            tenant = %caller.tenant_id,
            full = restore.scope.is_full(),
            mode = %mode,
            results = report.results.len(),
            warnings = report.warnings.len(),
            cancelled = report.cancelled,
            "imported backup"
        );

        Ok(ImportOutcome {
            success: true,
            results: report.results,
            warnings: report.warnings,
            cancelled: report.cancelled,
        })
    }

    /// Describe an encoded envelope without touching the store
    pub fn inspect_backup(&self, data: &[u8]) -> DeployerResult<EnvelopeSummary> {
        Ok(BackupEnvelope::decode(data)?.summary())
    }
}
