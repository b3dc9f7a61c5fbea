//! Advisory file lock serializing mutating fwset invocations.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

pub const LOCK_FILE: &str = "/run/fwset.lock";

/// Holds an exclusive lock until dropped.
#[derive(Debug)]
pub struct LockGuard {
    _file: File,
}

impl LockGuard {
    /// Lock [`LOCK_FILE`], failing fast if another instance holds it.
    pub fn acquire() -> Result<Self> {
        Self::acquire_at(LOCK_FILE)
    }

    pub fn acquire_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let lock_path = path.as_ref();
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).ok();
        }

        // No truncate: the file may be held by another process
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

        fs::set_permissions(lock_path, fs::Permissions::from_mode(0o600))
            .context("Failed to set lock file permissions")?;

        file.try_lock_exclusive().map_err(|_| {
            anyhow::anyhow!(
                "Another fwset instance is modifying the firewall.\n\
                 Wait for it to finish, or remove a stale lock file: {}",
                lock_path.display()
            )
        })?;

        Ok(Self { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_acquire_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fwset.lock");

        let guard = LockGuard::acquire_at(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        drop(guard);

        assert!(LockGuard::acquire_at(&path).is_ok());
    }

    #[test]
    fn test_lock_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fwset.lock");

        let _held = LockGuard::acquire_at(&path).unwrap();
        let err = LockGuard::acquire_at(&path).unwrap_err();
        assert!(err.to_string().contains("Another fwset instance"));
    }

    #[test]
    fn test_lock_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("fwset.lock");
        assert!(LockGuard::acquire_at(&path).is_ok());
    }
}
