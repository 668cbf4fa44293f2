//! Stateless view of the spool directory.
//!
//! Everything here is answered from the filesystem on every call; nothing is
//! cached, so a [`Spool`] can be cloned freely between the producer and the
//! distributor without sharing any state.

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::spool::SpoolError;
use crate::spool::bucket::{BucketKey, DATA_EXTENSION, LOCK_EXTENSION};

/// Where a bucket stands in the handoff protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketState {
    /// No data file on disk.
    Absent,
    /// A lock marker exists; the producer owns the bucket.
    Locked,
    /// Data file present without a marker; eligible for distribution.
    Distributable,
}

/// Handle on a spool directory.
#[derive(Debug, Clone)]
pub struct Spool {
    dir: PathBuf,
}

impl Spool {
    /// Open a spool directory, creating it if it does not exist yet.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SpoolError> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| SpoolError::io(&dir, e))?;
            tracing::info!(dir = %dir.display(), "Created spool directory");
        }
        Ok(Self { dir })
    }

    /// Spool directory path.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a bucket's data file.
    pub fn data_path(&self, key: BucketKey) -> PathBuf {
        self.dir.join(key.data_file_name())
    }

    /// Path of a bucket's lock marker.
    pub fn lock_path(&self, key: BucketKey) -> PathBuf {
        self.dir.join(key.lock_file_name())
    }

    /// Current protocol state of a bucket.
    pub fn bucket_state(&self, key: BucketKey) -> BucketState {
        if self.lock_path(key).exists() {
            BucketState::Locked
        } else if self.data_path(key).is_file() {
            BucketState::Distributable
        } else {
            BucketState::Absent
        }
    }

    /// Create (or truncate) the zero-length lock marker for a bucket.
    pub(crate) fn create_lock(&self, key: BucketKey) -> Result<(), SpoolError> {
        let path = self.lock_path(key);
        File::create(&path).map_err(|e| SpoolError::io(&path, e))?;
        tracing::info!(path = %path.display(), "Created lock file");
        Ok(())
    }

    /// Remove a bucket's lock marker. Returns `false` if there was none.
    pub(crate) fn remove_lock(&self, key: BucketKey) -> Result<bool, SpoolError> {
        let path = self.lock_path(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Removed lock file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SpoolError::io(&path, e)),
        }
    }

    /// Remove every lock marker whose bucket is strictly older than `current`.
    ///
    /// Markers for `current` or later buckets, and files whose name does not
    /// parse as a marker, are left untouched. Returns how many were removed.
    pub fn reclaim_stale_locks(&self, current: BucketKey) -> Result<usize, SpoolError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| SpoolError::io(&self.dir, e))?;
        let mut removed = 0;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(dir = %self.dir.display(), error = %e, "Failed to read spool entry");
                    continue;
                }
            };

            let name = entry.file_name();
            let Some(key) = name.to_str().and_then(BucketKey::from_lock_file_name) else {
                continue;
            };
            if key >= current {
                continue;
            }

            let path = entry.path();
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::info!(path = %path.display(), bucket = %key, "Removed stale lock file");
                    removed += 1;
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Failed to remove stale lock file");
                }
            }
        }

        Ok(removed)
    }

    /// List data files that may be handed to the distributor.
    ///
    /// A file qualifies when it is a regular file with the data extension, is
    /// not itself a lock marker, and has no lock marker next to it. The result
    /// is sorted by path.
    pub fn list_distributable(&self) -> Result<Vec<PathBuf>, SpoolError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| SpoolError::io(&self.dir, e))?;
        let mut files = Vec::new();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(dir = %self.dir.display(), error = %e, "Failed to read spool entry");
                    continue;
                }
            };
            let path = entry.path();

            let is_file = fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false);
            if !is_file {
                tracing::warn!(path = %path.display(), "Spool directory contains non regular file");
                continue;
            }

            if !is_data_file(&path) {
                continue;
            }

            if lock_path_for(&path).exists() {
                tracing::debug!(path = %path.display(), "Skipping distribution, file is locked");
                continue;
            }

            files.push(path);
        }

        files.sort();
        Ok(files)
    }
}

/// `<name>.data`, where `<name>` itself does not end in `.lock`.
fn is_data_file(path: &Path) -> bool {
    let has_data_ext = path.extension().is_some_and(|ext| ext == DATA_EXTENSION);
    let stem_is_lock = path
        .file_stem()
        .map(Path::new)
        .and_then(Path::extension)
        .is_some_and(|ext| ext == LOCK_EXTENSION);
    has_data_ext && !stem_is_lock
}

/// Marker path for an arbitrary data file path.
fn lock_path_for(data_path: &Path) -> PathBuf {
    let mut name = OsString::from(data_path.as_os_str());
    name.push(".");
    name.push(LOCK_EXTENSION);
    PathBuf::from(name)
}
