//! Storage layer for deployer-backup
//!
//! Provides the JSON file store for the four entity kinds and the
//! `EntityStore` interface the backup engine reads and writes through.

pub mod file_io;
pub mod repository;

pub use file_io::{read_json, write_atomic, write_json_atomic};
pub use repository::Repository;

use chrono::Utc;
use tracing::warn;

use crate::audit::{AuditEntry, AuditLogger};
use crate::config::paths::DeployerPaths;
use crate::error::{DeployerError, DeployerResult};
use crate::models::{
    DeploymentHistory, DeploymentJob, DeploymentTarget, Record, TargetConfiguration, TenantId,
};

/// Which tenants a query covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryScope {
    /// Every tenant
    All,
    /// Records whose effective tenant is the given one
    Tenant(TenantId),
}

/// Tenant-aware access to one entity kind
///
/// `create` and `update` are durable when they return `Ok`; there is no
/// transaction spanning several calls.
///
/// On `Storage` each successful write rewrites and syncs the whole file of
/// its kind, so importing N records of one kind costs O(N²) serialization
/// and N syncs.
pub trait EntityStore<E: Record> {
    /// Records within `scope`, oldest first
    fn query(&self, scope: QueryScope) -> DeployerResult<Vec<E>>;

    fn get_by_id(&self, id: &E::Id) -> DeployerResult<Option<E>>;

    /// Create a record; fails with `Duplicate` if the id is taken
    fn create(&self, record: E) -> DeployerResult<()>;

    /// Overwrite the mutable fields of an existing record
    fn update(&self, id: &E::Id, incoming: E) -> DeployerResult<E>;

    /// Tenant a record belongs to, following references for kinds without a
    /// tenant column
    fn tenant_of(&self, record: &E) -> DeployerResult<Option<TenantId>>;
}

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: DeployerPaths,
    pub targets: Repository<DeploymentTarget>,
    pub configurations: Repository<TargetConfiguration>,
    pub jobs: Repository<DeploymentJob>,
    pub history: Repository<DeploymentHistory>,
    audit: Option<AuditLogger>,
}

impl Storage {
    /// Create a new Storage instance
    pub fn new(paths: DeployerPaths) -> Result<Self, DeployerError> {
        paths.ensure_directories()?;

        Ok(Self {
            targets: Repository::new(paths.deployment_targets_file()),
            configurations: Repository::new(paths.target_configurations_file()),
            jobs: Repository::new(paths.deployment_jobs_file()),
            history: Repository::new(paths.deployment_history_file()),
            audit: None,
            paths,
        })
    }

    /// Record every create/update in the audit log at the standard location
    pub fn with_audit_log(mut self) -> Self {
        self.audit = Some(AuditLogger::new(self.paths.audit_log()));
        self
    }

    pub fn audit_logger(&self) -> Option<&AuditLogger> {
        self.audit.as_ref()
    }

    /// Load all data from disk
    pub fn load_all(&mut self) -> Result<(), DeployerError> {
        self.targets.load()?;
        self.configurations.load()?;
        self.jobs.load()?;
        self.history.load()?;
        Ok(())
    }

    /// Tenant an audit entry is filed under; history is filed under its job's
    fn audit_tenant<E: Stored>(&self, record: &E) -> Option<TenantId> {
        E::owner(self, record).unwrap_or_else(|_| record.tenant_id())
    }

    fn record_audit(&self, entry: AuditEntry) {
        if let Some(logger) = &self.audit {
            // The write is already durable; a lost audit line must not undo it.
            if let Err(e) = logger.log(&entry) {
                warn!(
                    entity = %entry.entity_kind,
                    id = %entry.entity_id,
                    error = %e,
                    "failed to append audit entry"
                );
            }
        }
    }
}

/// Binds an entity kind to its repository inside `Storage`
pub trait Stored: Record {
    fn repository(storage: &Storage) -> &Repository<Self>;

    /// Tenant owning the record
    fn owner(_storage: &Storage, record: &Self) -> DeployerResult<Option<TenantId>> {
        Ok(record.tenant_id())
    }
}

impl Stored for DeploymentTarget {
    fn repository(storage: &Storage) -> &Repository<Self> {
        &storage.targets
    }
}

impl Stored for TargetConfiguration {
    fn repository(storage: &Storage) -> &Repository<Self> {
        &storage.configurations
    }
}

impl Stored for DeploymentJob {
    fn repository(storage: &Storage) -> &Repository<Self> {
        &storage.jobs
    }
}

impl Stored for DeploymentHistory {
    fn repository(storage: &Storage) -> &Repository<Self> {
        &storage.history
    }

    // History has no tenant column; it inherits the parent job's tenant.
    fn owner(storage: &Storage, record: &Self) -> DeployerResult<Option<TenantId>> {
        Ok(storage
            .jobs
            .get(&record.job_id)?
            .and_then(|job| job.tenant_id))
    }
}

impl<E: Stored> EntityStore<E> for Storage {
    fn query(&self, scope: QueryScope) -> DeployerResult<Vec<E>> {
        let records = E::repository(self).get_all()?;
        match scope {
            QueryScope::All => Ok(records),
            QueryScope::Tenant(tenant) => {
                let mut scoped = Vec::with_capacity(records.len());
                for record in records {
                    if E::owner(self, &record)? == Some(tenant) {
                        scoped.push(record);
                    }
                }
                Ok(scoped)
            }
        }
    }

    fn get_by_id(&self, id: &E::Id) -> DeployerResult<Option<E>> {
        E::repository(self).get(id)
    }

    fn create(&self, record: E) -> DeployerResult<()> {
        let repo = E::repository(self);
        let id = record.id();
        let entry = AuditEntry::create(
            E::KIND,
            record.id_string(),
            self.audit_tenant(&record),
            record.audit_snapshot(),
        );

        repo.insert(record)?;
        if let Err(e) = repo.save() {
            repo.remove(&id)?;
            return Err(e);
        }

        self.record_audit(entry);
        Ok(())
    }

    fn update(&self, id: &E::Id, incoming: E) -> DeployerResult<E> {
        let repo = E::repository(self);
        let now = Utc::now();

        let (before, after) = repo.modify(id, |existing| existing.merge_from(incoming, now))?;
        if let Err(e) = repo.save() {
            repo.upsert(before)?;
            return Err(e);
        }

        self.record_audit(AuditEntry::update(
            E::KIND,
            after.id_string(),
            self.audit_tenant(&after),
            before.audit_snapshot(),
            after.audit_snapshot(),
        ));
        Ok(after)
    }

    fn tenant_of(&self, record: &E) -> DeployerResult<Option<TenantId>> {
        E::owner(self, record)
    }
}
