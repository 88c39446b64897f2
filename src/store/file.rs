//! File-backed key-value store.
//!
//! Each key lives in `<data_dir>/<key>.json`. Writes go to a temporary file in
//! the same directory and are renamed into place, so a crash mid-write leaves
//! the previous value intact. The directory is locked exclusively for as long
//! as the store is open.

use super::KeyValueStore;
use crate::constants::{STORE_FILE_EXTENSION, STORE_LOCK_FILE};
use crate::errors::{AppError, AppResult, LockError, StorageError};
use async_trait::async_trait;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// A [`KeyValueStore`] persisting each key as a JSON file.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    // Held for the lifetime of the store; the OS releases the lock on close.
    _lock: File,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `AppError::Config` if `dir` is not absolute
    /// - `AppError::Io` if the directory cannot be created
    /// - `AppError::Lock` if another process holds the directory
    pub fn open(dir: &Path) -> AppResult<Self> {
        if !dir.is_absolute() {
            return Err(AppError::Config(format!(
                "Data directory path must be absolute: {}",
                dir.display()
            )));
        }

        if !dir.exists() {
            fs::create_dir_all(dir)?;

            #[cfg(unix)]
            {
                fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
                debug!("Set 0o700 permissions on data directory");
            }
        }

        let lock_path = dir.join(STORE_LOCK_FILE);
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|source| LockError::AcquisitionFailed {
                path: lock_path.clone(),
                source,
            })?;

        if let Err(e) = lock.try_lock_exclusive() {
            if e.kind() == fs2::lock_contended_error().kind() {
                return Err(LockError::StoreBusy { path: lock_path }.into());
            }
            return Err(LockError::AcquisitionFailed {
                path: lock_path,
                source: e,
            }
            .into());
        }

        debug!("Opened file store at {:?}", dir);
        Ok(Self {
            dir: dir.to_path_buf(),
            _lock: lock,
        })
    }

    /// The directory this store writes to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> AppResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(AppError::Validation(format!("Invalid storage key: {:?}", key)));
        }
        Ok(self
            .dir
            .join(format!("{}.{}", key, STORE_FILE_EXTENSION)))
    }
}

fn io_error(key: &str, source: io::Error) -> AppError {
    StorageError::Io {
        key: key.to_string(),
        source,
    }
    .into()
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let path = self.path_for(key)?;
        let result = tokio::task::spawn_blocking(move || fs::read_to_string(path))
            .await
            .map_err(|e| io_error(key, io::Error::other(e)))?;

        match result {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key, e)),
        }
    }

    async fn set(&self, key: &str, value: String) -> AppResult<()> {
        let path = self.path_for(key)?;
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || -> io::Result<()> {
            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(value.as_bytes())?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| io_error(key, io::Error::other(e)))?
        .map_err(|e| io_error(key, e))
    }
}
