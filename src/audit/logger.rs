//! Append-only JSONL audit log
//!
//! One JSON object per line, appended and flushed per entry.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{DeployerError, DeployerResult};
use crate::models::TenantId;

use super::entry::AuditEntry;

/// Writes restore operations to the audit log
pub struct AuditLogger {
    log_path: PathBuf,
    // One appender at a time
    write_lock: Mutex<()>,
}

impl AuditLogger {
    pub fn new(log_path: PathBuf) -> Self {
        Self {
            log_path,
            write_lock: Mutex::new(()),
        }
    }

    /// Append one entry
    pub fn log(&self, entry: &AuditEntry) -> DeployerResult<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| DeployerError::Storage("audit log lock poisoned".into()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| DeployerError::Io(format!("open {}: {}", self.log_path.display(), e)))?;
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }

    /// Every entry, oldest first
    pub fn read_all(&self) -> DeployerResult<Vec<AuditEntry>> {
        let file = match File::open(&self.log_path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line).map_err(|e| {
                DeployerError::Json(format!("audit log line {}: {}", index + 1, e))
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Entries recorded against one tenant
    pub fn read_for_tenant(&self, tenant: TenantId) -> DeployerResult<Vec<AuditEntry>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|entry| entry.tenant_id == Some(tenant))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::Operation;
    use crate::models::EntityKind;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_logger() -> (AuditLogger, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let logger = AuditLogger::new(temp_dir.path().join("audit.log"));
        (logger, temp_dir)
    }

    #[test]
    fn test_log_and_read() {
        let (logger, _temp) = create_test_logger();
        let entry = AuditEntry::create(EntityKind::DeploymentTarget, "t-1", None, json!({}));

        logger.log(&entry).unwrap();

        let entries = logger.read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, Operation::Create);
        assert_eq!(entries[0].entity_kind, EntityKind::DeploymentTarget);
    }

    #[test]
    fn test_read_for_tenant() {
        let (logger, _temp) = create_test_logger();
        for tenant in [1, 2, 1] {
            let entry = AuditEntry::create(
                EntityKind::DeploymentJob,
                format!("job-{}", tenant),
                Some(TenantId(tenant)),
                json!({}),
            );
            logger.log(&entry).unwrap();
        }
        logger
            .log(&AuditEntry::create(EntityKind::DeploymentHistory, "7", None, json!({})))
            .unwrap();

        assert_eq!(logger.read_for_tenant(TenantId(1)).unwrap().len(), 2);
        assert_eq!(logger.read_all().unwrap().len(), 4);
    }

    #[test]
    fn test_missing_log_is_empty() {
        let (logger, _temp) = create_test_logger();
        assert!(logger.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_line_reports_position() {
        let (logger, temp) = create_test_logger();
        logger
            .log(&AuditEntry::create(EntityKind::DeploymentTarget, "t-1", None, json!({})))
            .unwrap();
        let mut file = OpenOptions::new()
            .append(true)
            .open(temp.path().join("audit.log"))
            .unwrap();
        writeln!(file, "not json").unwrap();

        let err = logger.read_all().unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
