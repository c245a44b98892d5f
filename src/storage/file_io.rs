//! Atomic file writes and tolerant JSON reads
//!
//! Entity files and exported backups are written to a sibling temp file,
//! synced, then renamed over the target, so a crash leaves either the old
//! or the new contents.

use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::DeployerError;

/// Read a JSON file; a missing file yields `T::default()`
pub fn read_json<T, P>(path: P) -> Result<T, DeployerError>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => {
            return Err(DeployerError::Storage(format!(
                "open {}: {}",
                path.display(),
                e
            )))
        }
    };

    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| DeployerError::Storage(format!("parse {}: {}", path.display(), e)))
}

/// Serialize `data` as indented JSON and write it atomically
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), DeployerError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let bytes = serde_json::to_vec_pretty(data)
        .map_err(|e| DeployerError::Storage(format!("serialize {}: {}", path.display(), e)))?;
    write_atomic(path, &bytes)
}

/// Replace the contents of `path` with `bytes` in one step
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DeployerError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            DeployerError::Storage(format!("create directory {}: {}", parent.display(), e))
        })?;
    }

    // Same directory as the target, or the rename is not atomic.
    let temp_path = temp_path_for(path);
    let result = (|| {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    result.map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        DeployerError::Storage(format!("write {}: {}", path.display(), e))
    })
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
