//! Singleton pattern to ensure only one server runs against a database.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// A lock guard that releases the lock when dropped
pub struct LockGuard {
    _file: File,
}

/// `calendar.db` locks `calendar.db.lock`, next to it.
pub fn lock_path(database_path: &Path) -> PathBuf {
    let mut name = database_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("calkiosk"));
    name.push(".lock");
    database_path.with_file_name(name)
}

/// Acquire an exclusive lock, failing if another instance is running
pub fn acquire_lock(database_path: &Path) -> Result<LockGuard> {
    let path = lock_path(database_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let file = File::create(&path).context("Failed to create lock file")?;

    file.try_lock_exclusive().map_err(|_| {
        anyhow::anyhow!(
            "Another calkiosk-server instance is already using this database.\n\
            If you believe this is an error, remove: {}",
            path.display()
        )
    })?;

    Ok(LockGuard { _file: file })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_path_sits_next_to_database() {
        assert_eq!(
            lock_path(Path::new("./data/calendar.db")),
            PathBuf::from("./data/calendar.db.lock")
        );
    }

    #[test]
    fn test_second_lock_fails_until_first_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("kiosk").join("calendar.db");

        let first = acquire_lock(&db).unwrap();
        let err = acquire_lock(&db).err().unwrap();
        assert!(err.to_string().contains("already using this database"));

        drop(first);
        assert!(acquire_lock(&db).is_ok());
    }
}
