//! Import reconciliation
//!
//! Each entity kind has a handler that turns one serialized record into a
//! create, update, skip or failure. `ImportReconciler` drives the handlers in
//! dependency order and aggregates their outcomes. A failing record never
//! stops the import; it is counted and reported as a warning.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::DeployerError;
use crate::models::{
    DeploymentHistory, DeploymentJob, DeploymentTarget, EntityKind, Record, TargetConfiguration,
};
use crate::storage::EntityStore;

use super::authorize::RestoreScope;
use super::envelope::BackupEntities;
use super::BackupStore;

/// What to do with a record whose id already exists
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Keep the stored record untouched
    #[default]
    Skip,
    /// Replace the stored record's mutable fields
    #[value(alias = "update")]
    #[serde(alias = "update")]
    Overwrite,
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Overwrite => write!(f, "overwrite"),
        }
    }
}

impl FromStr for MergeMode {
    type Err = DeployerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "overwrite" | "update" => Ok(Self::Overwrite),
            other => Err(DeployerError::Validation(format!(
                "unknown merge mode '{}', expected skip or overwrite",
                other
            ))),
        }
    }
}

/// Result of reconciling a single record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Created,
    Updated,
    Skipped,
    /// The record was not applied; the string is the warning
    Failed(String),
}

/// Counters for one entity kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityImportResult {
    pub entity_type: EntityKind,
    /// Records of this kind in the envelope
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl EntityImportResult {
    pub fn new(entity_type: EntityKind, total: usize) -> Self {
        Self {
            entity_type,
            total,
            created: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
        }
    }

    pub fn record(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Created => self.created += 1,
            RecordOutcome::Updated => self.updated += 1,
            RecordOutcome::Skipped => self.skipped += 1,
            RecordOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Records that reached an outcome
    pub fn processed(&self) -> usize {
        self.created + self.updated + self.skipped + self.failed
    }
}

/// Reconciles the records of one entity kind against a store
pub trait KindReconciler<S> {
    fn kind(&self) -> EntityKind;

    fn reconcile(
        &self,
        store: &S,
        raw: &serde_json::Value,
        scope: RestoreScope,
        mode: MergeMode,
    ) -> RecordOutcome;
}

/// The handler for entity kind `E`
pub struct RecordReconciler<E>(PhantomData<fn() -> E>);

impl<E> RecordReconciler<E> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E> Default for RecordReconciler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, S> KindReconciler<S> for RecordReconciler<E>
where
    E: Record,
    S: EntityStore<E>,
{
    fn kind(&self) -> EntityKind {
        E::KIND
    }

    fn reconcile(
        &self,
        store: &S,
        raw: &serde_json::Value,
        scope: RestoreScope,
        mode: MergeMode,
    ) -> RecordOutcome {
        let kind = E::KIND;

        let incoming = match E::deserialize(raw) {
            Ok(record) => record,
            Err(e) => return RecordOutcome::Failed(format!("{}: unmarshal error: {}", kind, e)),
        };
        let id = incoming.id();
        let id_string = incoming.id_string();
        let tenant = scope.resolve_tenant(incoming.tenant_id());

        let existing = match store.get_by_id(&id) {
            Ok(existing) => existing,
            Err(e) => return RecordOutcome::Failed(format!("{}: lookup {}: {}", kind, id_string, e)),
        };

        if let RestoreScope::Tenant(tenant) = scope {
            // A tenant restore may only touch what the tenant owns.
            let mut owners = Vec::with_capacity(2);
            if let Some(current) = &existing {
                owners.push(store.tenant_of(current));
            }
            if !kind.has_tenant_column() {
                owners.push(store.tenant_of(&incoming));
            }
            for owner in owners {
                match owner {
                    Ok(Some(owner)) if owner != tenant => {
                        return RecordOutcome::Failed(format!(
                            "{}: {}: belongs to another tenant",
                            kind, id_string
                        ))
                    }
                    Ok(_) => {}
                    Err(e) => {
                        return RecordOutcome::Failed(format!(
                            "{}: lookup {}: {}",
                            kind, id_string, e
                        ))
                    }
                }
            }
        }

        match existing {
            Some(_) if mode == MergeMode::Skip => RecordOutcome::Skipped,
            Some(_) => match store.update(&id, incoming) {
                Ok(_) => RecordOutcome::Updated,
                Err(e) => RecordOutcome::Failed(format!("{}: update {}: {}", kind, id_string, e)),
            },
            None => {
                let mut record = incoming;
                record.assign_tenant(tenant);
                record.stamp_created(Utc::now());
                match store.create(record) {
                    Ok(()) => RecordOutcome::Created,
                    Err(e) => {
                        RecordOutcome::Failed(format!("{}: create {}: {}", kind, id_string, e))
                    }
                }
            }
        }
    }
}

/// Aggregated result of reconciling an envelope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// One entry per kind present in the envelope, in dependency order
    pub results: Vec<EntityImportResult>,
    pub warnings: Vec<String>,
    /// The import stopped early; applied records stay applied
    pub cancelled: bool,
}

/// Applies every collection of an envelope, kind by kind
pub struct ImportReconciler<'a, S> {
    store: &'a S,
    scope: RestoreScope,
    mode: MergeMode,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, S: BackupStore> ImportReconciler<'a, S> {
    pub fn new(store: &'a S, scope: RestoreScope, mode: MergeMode) -> Self {
        Self {
            store,
            scope,
            mode,
            cancel: None,
        }
    }

    /// Stop before the next record once `flag` is set
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    pub fn run(&self, entities: &BackupEntities) -> ImportReport {
        let targets = RecordReconciler::<DeploymentTarget>::new();
        let configurations = RecordReconciler::<TargetConfiguration>::new();
        let jobs = RecordReconciler::<DeploymentJob>::new();
        let history = RecordReconciler::<DeploymentHistory>::new();
        let handlers: [&dyn KindReconciler<S>; 4] = [&targets, &configurations, &jobs, &history];

        let mut report = ImportReport::default();
        for handler in handlers {
            let kind = handler.kind();
            let records = entities.collection(kind);
            if records.is_empty() {
                continue;
            }

            let mut result = EntityImportResult::new(kind, records.len());
            for raw in records {
                if self.is_cancelled() {
                    warn!(kind = %kind, processed = result.processed(), "import cancelled");
                    report.results.push(result);
                    report.cancelled = true;
                    return report;
                }

                let outcome = handler.reconcile(self.store, raw, self.scope, self.mode);
                if let RecordOutcome::Failed(warning) = &outcome {
                    warn!(kind = %kind, "{}", warning);
                    report.warnings.push(warning.clone());
                }
                result.record(&outcome);
            }

            debug!(
                kind = %kind,
                created = result.created,
                updated = result.updated,
                skipped = result.skipped,
                failed = result.failed,
                "reconciled collection"
            );
            report.results.push(result);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::DeployerPaths;
    use crate::error::DeployerResult;
    use crate::models::{DeploymentHistoryId, HistoryAction, TenantId};
    use crate::storage::{QueryScope, Storage, Stored};
    use serde_json::json;
    use std::cell::RefCell;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = DeployerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    /// Wraps `Storage`, recording the kind of every write and failing writes
    /// of one kind on demand
    struct RecordingStore {
        inner: Storage,
        writes: RefCell<Vec<EntityKind>>,
        fail_writes_of: Option<EntityKind>,
    }

    impl RecordingStore {
        fn new(inner: Storage) -> Self {
            Self {
                inner,
                writes: RefCell::new(Vec::new()),
                fail_writes_of: None,
            }
        }

        fn write(&self, kind: EntityKind) -> DeployerResult<()> {
            self.writes.borrow_mut().push(kind);
            if self.fail_writes_of == Some(kind) {
                return Err(DeployerError::Storage("disk full".into()));
            }
            Ok(())
        }
    }

    impl<E: Stored> EntityStore<E> for RecordingStore {
        fn query(&self, scope: QueryScope) -> DeployerResult<Vec<E>> {
            <Storage as EntityStore<E>>::query(&self.inner, scope)
        }

        fn get_by_id(&self, id: &E::Id) -> DeployerResult<Option<E>> {
            <Storage as EntityStore<E>>::get_by_id(&self.inner, id)
        }

        fn create(&self, record: E) -> DeployerResult<()> {
            self.write(E::KIND)?;
            <Storage as EntityStore<E>>::create(&self.inner, record)
        }

        fn update(&self, id: &E::Id, incoming: E) -> DeployerResult<E> {
            self.write(E::KIND)?;
            <Storage as EntityStore<E>>::update(&self.inner, id, incoming)
        }

        fn tenant_of(&self, record: &E) -> DeployerResult<Option<TenantId>> {
            <Storage as EntityStore<E>>::tenant_of(&self.inner, record)
        }
    }

    fn to_value<E: Serialize>(record: &E) -> serde_json::Value {
        serde_json::to_value(record).unwrap()
    }

    #[test]
    fn test_merge_mode_parsing() {
        assert_eq!("skip".parse::<MergeMode>().unwrap(), MergeMode::Skip);
        assert_eq!("Overwrite".parse::<MergeMode>().unwrap(), MergeMode::Overwrite);
        assert_eq!("update".parse::<MergeMode>().unwrap(), MergeMode::Overwrite);
        assert!("merge".parse::<MergeMode>().is_err());
        assert_eq!(
            <MergeMode as clap::ValueEnum>::from_str("update", false).unwrap(),
            MergeMode::Overwrite
        );
        assert_eq!(
            serde_json::from_str::<MergeMode>("\"update\"").unwrap(),
            MergeMode::Overwrite
        );
        assert_eq!(MergeMode::default(), MergeMode::Skip);
        assert_eq!(serde_json::to_string(&MergeMode::Overwrite).unwrap(), "\"overwrite\"");
    }

    #[test]
    fn test_create_forces_caller_tenant() {
        let (_temp, storage) = create_test_storage();
        let target = DeploymentTarget::new(TenantId(9), "edge");

        let outcome = RecordReconciler::<DeploymentTarget>::new().reconcile(
            &storage,
            &to_value(&target),
            RestoreScope::Tenant(TenantId(2)),
            MergeMode::Skip,
        );
        assert_eq!(outcome, RecordOutcome::Created);

        let stored: DeploymentTarget = storage.get_by_id(&target.id).unwrap().unwrap();
        assert_eq!(stored.tenant_id, Some(TenantId(2)));
        assert_eq!(stored.audit.create_time, target.audit.create_time);
    }

    #[test]
    fn test_create_stamps_missing_create_time() {
        let (_temp, storage) = create_test_storage();
        let raw = json!({
            "id": crate::models::DeploymentTargetId::new(),
            "name": "bare",
        });

        let outcome = RecordReconciler::<DeploymentTarget>::new().reconcile(
            &storage,
            &raw,
            RestoreScope::RecordTenants,
            MergeMode::Skip,
        );
        assert_eq!(outcome, RecordOutcome::Created);

        let all: Vec<DeploymentTarget> = storage.query(QueryScope::All).unwrap();
        assert_eq!(all[0].tenant_id, Some(TenantId(0)));
        assert!(all[0].audit.create_time.is_some());
    }

    #[test]
    fn test_skip_and_overwrite_existing() {
        let (_temp, storage) = create_test_storage();
        let target = DeploymentTarget::new(TenantId(1), "edge");
        storage.create(target.clone()).unwrap();

        let mut incoming = target.clone();
        incoming.name = "renamed".into();
        let handler = RecordReconciler::<DeploymentTarget>::new();
        let scope = RestoreScope::Tenant(TenantId(1));

        let outcome = handler.reconcile(&storage, &to_value(&incoming), scope, MergeMode::Skip);
        assert_eq!(outcome, RecordOutcome::Skipped);
        let stored: DeploymentTarget = storage.get_by_id(&target.id).unwrap().unwrap();
        assert_eq!(stored.name, "edge");

        let outcome =
            handler.reconcile(&storage, &to_value(&incoming), scope, MergeMode::Overwrite);
        assert_eq!(outcome, RecordOutcome::Updated);
        let stored: DeploymentTarget = storage.get_by_id(&target.id).unwrap().unwrap();
        assert_eq!(stored.name, "renamed");
    }

    #[test]
    fn test_foreign_record_is_not_touched() {
        let (_temp, storage) = create_test_storage();
        let target = DeploymentTarget::new(TenantId(1), "theirs");
        storage.create(target.clone()).unwrap();

        let mut incoming = target.clone();
        incoming.name = "mine".into();
        let outcome = RecordReconciler::<DeploymentTarget>::new().reconcile(
            &storage,
            &to_value(&incoming),
            RestoreScope::Tenant(TenantId(2)),
            MergeMode::Overwrite,
        );

        match outcome {
            RecordOutcome::Failed(warning) => {
                assert!(warning.starts_with("deploymentTargets: "));
                assert!(warning.contains("another tenant"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        let stored: DeploymentTarget = storage.get_by_id(&target.id).unwrap().unwrap();
        assert_eq!(stored.name, "theirs");
    }

    #[test]
    fn test_history_into_foreign_job_fails() {
        let (_temp, storage) = create_test_storage();
        let job = DeploymentJob::new(TenantId(1), "cert");
        storage.create(job.clone()).unwrap();

        let history = DeploymentHistory::new(11, job.id, HistoryAction::Deploy);
        let handler = RecordReconciler::<DeploymentHistory>::new();

        let outcome = handler.reconcile(
            &storage,
            &to_value(&history),
            RestoreScope::Tenant(TenantId(2)),
            MergeMode::Skip,
        );
        assert!(matches!(outcome, RecordOutcome::Failed(_)));

        let outcome = handler.reconcile(
            &storage,
            &to_value(&history),
            RestoreScope::Tenant(TenantId(1)),
            MergeMode::Skip,
        );
        assert_eq!(outcome, RecordOutcome::Created);
        let stored: Option<DeploymentHistory> =
            storage.get_by_id(&DeploymentHistoryId(11)).unwrap();
        assert!(stored.is_some());
    }

    #[test]
    fn test_unmarshal_warning() {
        let (_temp, storage) = create_test_storage();
        let outcome = RecordReconciler::<DeploymentJob>::new().reconcile(
            &storage,
            &json!({"id": "not-a-uuid"}),
            RestoreScope::Tenant(TenantId(1)),
            MergeMode::Skip,
        );
        match outcome {
            RecordOutcome::Failed(warning) => {
                assert!(warning.starts_with("deploymentJobs: unmarshal error: "))
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_write_failure_is_isolated() {
        let (_temp, storage) = create_test_storage();
        let mut store = RecordingStore::new(storage);
        store.fail_writes_of = Some(EntityKind::TargetConfiguration);

        let target = DeploymentTarget::new(TenantId(1), "edge");
        let configuration = TargetConfiguration::new(TenantId(1), "lb", "nginx");
        let entities = BackupEntities {
            deployment_targets: vec![to_value(&target)],
            target_configurations: vec![to_value(&configuration)],
            ..BackupEntities::default()
        };

        let report = ImportReconciler::new(&store, RestoreScope::Tenant(TenantId(1)), MergeMode::Skip)
            .run(&entities);

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[0].created, 1);
        assert_eq!(report.results[1].failed, 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.warnings[0],
            format!(
                "targetConfigurations: create {}: Storage error: disk full",
                configuration.id.as_uuid()
            )
        );
    }

    #[test]
    fn test_kinds_processed_in_dependency_order() {
        let (_temp, storage) = create_test_storage();
        let store = RecordingStore::new(storage);

        let target = DeploymentTarget::new(TenantId(1), "edge");
        let configuration = TargetConfiguration::new(TenantId(1), "lb", "nginx");
        let job = DeploymentJob::for_target(TenantId(1), target.id, "cert");
        let history = DeploymentHistory::new(1, job.id, HistoryAction::Deploy);
        let entities = BackupEntities {
            deployment_history: vec![to_value(&history)],
            deployment_jobs: vec![to_value(&job)],
            target_configurations: vec![to_value(&configuration)],
            deployment_targets: vec![to_value(&target)],
        };

        let report = ImportReconciler::new(&store, RestoreScope::Tenant(TenantId(1)), MergeMode::Skip)
            .run(&entities);

        assert_eq!(*store.writes.borrow(), EntityKind::DEPENDENCY_ORDER.to_vec());
        let kinds: Vec<EntityKind> = report.results.iter().map(|r| r.entity_type).collect();
        assert_eq!(kinds, EntityKind::DEPENDENCY_ORDER.to_vec());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_empty_collections_have_no_result() {
        let (_temp, storage) = create_test_storage();
        let entities = BackupEntities {
            deployment_jobs: vec![to_value(&DeploymentJob::new(TenantId(1), "cert"))],
            ..BackupEntities::default()
        };

        let report =
            ImportReconciler::new(&storage, RestoreScope::Tenant(TenantId(1)), MergeMode::Skip)
                .run(&entities);

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].entity_type, EntityKind::DeploymentJob);
    }

    #[test]
    fn test_cancellation_stops_before_next_record() {
        let (_temp, storage) = create_test_storage();
        let entities = BackupEntities {
            deployment_targets: vec![to_value(&DeploymentTarget::new(TenantId(1), "a"))],
            ..BackupEntities::default()
        };
        let flag = Arc::new(AtomicBool::new(true));

        let report =
            ImportReconciler::new(&storage, RestoreScope::Tenant(TenantId(1)), MergeMode::Skip)
                .with_cancellation(flag)
                .run(&entities);

        assert!(report.cancelled);
        assert_eq!(report.results[0].total, 1);
        assert_eq!(report.results[0].processed(), 0);
        let all: Vec<DeploymentTarget> = storage.query(QueryScope::All).unwrap();
        assert!(all.is_empty());
    }
}
