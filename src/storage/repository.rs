//! Generic JSON-file repository
//!
//! One repository per entity kind, each backed by its own JSON file. Records
//! are held in memory behind an `RwLock` and written back atomically.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::error::DeployerError;
use crate::models::Record;

use super::file_io::{read_json, write_json_atomic};

/// On-disk layout of a repository file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "E: serde::de::DeserializeOwned"))]
struct RecordFile<E> {
    #[serde(default)]
    records: Vec<E>,
}

impl<E> Default for RecordFile<E> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

/// Repository for one entity kind
pub struct Repository<E: Record> {
    path: PathBuf,
    data: RwLock<HashMap<E::Id, E>>,
}

impl<E: Record> Repository<E> {
    /// Create a new, empty repository bound to a file
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<E::Id, E>>, DeployerError> {
        self.data
            .read()
            .map_err(|e| DeployerError::Storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<E::Id, E>>, DeployerError> {
        self.data
            .write()
            .map_err(|e| DeployerError::Storage(format!("Failed to acquire write lock: {}", e)))
    }

    /// Load records from disk, replacing what is in memory
    pub fn load(&self) -> Result<(), DeployerError> {
        let file_data: RecordFile<E> = read_json(&self.path)?;

        let mut data = self.write()?;
        data.clear();
        for record in file_data.records {
            data.insert(record.id(), record);
        }

        Ok(())
    }

    /// Save records to disk
    pub fn save(&self) -> Result<(), DeployerError> {
        let file_data = RecordFile {
            records: self.get_all()?,
        };

        write_json_atomic(&self.path, &file_data)
    }

    pub fn get(&self, id: &E::Id) -> Result<Option<E>, DeployerError> {
        Ok(self.read()?.get(id).cloned())
    }

    /// All records, oldest first
    pub fn get_all(&self) -> Result<Vec<E>, DeployerError> {
        let data = self.read()?;
        let mut records: Vec<_> = data.values().cloned().collect();
        records.sort_by(|a, b| {
            a.create_time()
                .cmp(&b.create_time())
                .then_with(|| a.id_string().cmp(&b.id_string()))
        });
        Ok(records)
    }

    /// Insert a new record
    ///
    /// The existence check and the insert happen under one write lock, so two
    /// writers racing on the same id cannot both succeed.
    pub fn insert(&self, record: E) -> Result<(), DeployerError> {
        let mut data = self.write()?;
        let id = record.id();
        if data.contains_key(&id) {
            return Err(DeployerError::duplicate(
                E::KIND.entity_name(),
                record.id_string(),
            ));
        }
        data.insert(id, record);
        Ok(())
    }

    /// Apply `change` to an existing record, returning its before and after states
    pub fn modify<F>(&self, id: &E::Id, change: F) -> Result<(E, E), DeployerError>
    where
        F: FnOnce(&mut E),
    {
        let mut data = self.write()?;
        let record = data
            .get_mut(id)
            .ok_or_else(|| DeployerError::not_found(E::KIND.entity_name(), id.to_string()))?;

        let before = record.clone();
        change(record);
        Ok((before, record.clone()))
    }

    /// Insert or replace a record
    pub fn upsert(&self, record: E) -> Result<(), DeployerError> {
        self.write()?.insert(record.id(), record);
        Ok(())
    }

    pub fn remove(&self, id: &E::Id) -> Result<bool, DeployerError> {
        Ok(self.write()?.remove(id).is_some())
    }
}
